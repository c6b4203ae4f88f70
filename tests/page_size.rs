//! Process-wide page size setting.
//!
//! Kept in its own test binary since it mutates global state.

use std::sync::Arc;

use heapstore::datum::Type;
use heapstore::heap::{HeapError, HeapFile};
use heapstore::storage::{page_size, reset_page_size, set_page_size, StorageConfig, DEFAULT_PAGE_SIZE};
use heapstore::tuple::Schema;

#[test]
fn test_page_size_is_captured_at_open() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = Arc::new(Schema::anonymous(vec![Type::Int]).unwrap());
    assert_eq!(page_size(), DEFAULT_PAGE_SIZE);

    let before = HeapFile::open(temp_dir.path().join("a.dat"), schema.clone()).unwrap();
    assert_eq!(before.page_size(), DEFAULT_PAGE_SIZE);

    set_page_size(64);
    assert_eq!(page_size(), 64);
    assert_eq!(StorageConfig::default().page_size, 64);

    let after = HeapFile::open(temp_dir.path().join("b.dat"), schema.clone()).unwrap();
    assert_eq!(after.page_size(), 64);
    // w = 4, P = 64: n = 512 / 33 = 15.
    assert_eq!(after.slots_per_page(), 15);
    assert_eq!(before.page_size(), DEFAULT_PAGE_SIZE);

    // A text record does not fit on a 64-byte page.
    let text = Arc::new(Schema::anonymous(vec![Type::Text]).unwrap());
    assert!(matches!(
        HeapFile::open(temp_dir.path().join("c.dat"), text),
        Err(HeapError::RecordTooLarge { .. })
    ));

    reset_page_size();
    assert_eq!(page_size(), DEFAULT_PAGE_SIZE);
}
