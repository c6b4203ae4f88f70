//! File-backed page storage.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::storage::error::StorageError;
use crate::storage::page::{PageId, StorageConfig, TableId};

/// File-backed page storage for a single table.
///
/// Stores pages as contiguous fixed-size blocks in a single file.
///
/// # File Layout
///
/// ```text
/// +------------------+------------------+------------------+
/// | Page 0           | Page 1           | Page 2           | ...
/// +------------------+------------------+------------------+
/// ^ offset 0         ^ offset P         ^ offset 2P         (P = page size)
/// ```
///
/// # Concurrency
///
/// Uses a mutex around the file handle to serialize seek+read/write pairs.
/// The page count is not cached: it is derived from the file length on each
/// call, so appends made through any handle are always observed.
///
/// # Durability
///
/// Nothing is synced implicitly. Call [`sync_all`](Self::sync_all) to force
/// data to disk.
#[derive(Debug)]
pub struct FileStorage {
    /// Canonical path to the storage file.
    path: PathBuf,
    /// Table id derived from `path`.
    table_id: TableId,
    /// Page size captured at open time.
    page_size: usize,
    /// File handle, serialized across readers and writers.
    file: Mutex<File>,
}

impl FileStorage {
    /// Opens or creates a storage file at the given path.
    ///
    /// The file is created empty if it does not exist. Its length is not
    /// validated here; a malformed length is reported by
    /// [`page_count`](Self::page_count).
    pub fn open(path: impl AsRef<Path>, config: StorageConfig) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        let path = path.as_ref().canonicalize()?;
        let table_id = TableId::from_path(&path);

        debug!(path = %path.display(), %table_id, page_size = config.page_size, "opened table file");

        Ok(Self {
            path,
            table_id,
            page_size: config.page_size,
            file: Mutex::new(file),
        })
    }

    /// Returns the canonical path to the storage file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the table id derived from the file path.
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Returns the page size of this file.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of pages in the file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupted` if the file length is not a
    /// multiple of the page size.
    pub fn page_count(&self) -> Result<usize, StorageError> {
        let file = self.file.lock();
        self.page_count_of(&file)
    }

    fn page_count_of(&self, file: &File) -> Result<usize, StorageError> {
        let len = file.metadata()?.len();
        if len % self.page_size as u64 != 0 {
            return Err(StorageError::Corrupted(format!(
                "file size {} is not a multiple of page size {}",
                len, self.page_size
            )));
        }
        Ok((len / self.page_size as u64) as usize)
    }

    /// Reads a page into a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// - `StorageError::TableMismatch` if the page belongs to another table
    /// - `StorageError::PageOutOfRange` if the page number is past the end
    /// - `StorageError::Truncated` if the file ends mid-page
    /// - `StorageError::InvalidBufferSize` if `buf` is not one page long
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        self.check_buffer(buf.len())?;
        self.check_table(page_id)?;

        let mut file = self.file.lock();
        let page_count = self.page_count_of(&file)?;
        if page_id.page_num >= page_count {
            return Err(StorageError::PageOutOfRange {
                page_id,
                page_count,
            });
        }

        file.seek(SeekFrom::Start(page_id.byte_offset(self.page_size)))?;
        match file.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                Err(StorageError::Truncated { page_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes a page in place from a caller-provided buffer.
    ///
    /// Writing at or past the end of the file extends it; callers that must
    /// not grow the file check the page count first.
    ///
    /// # Errors
    ///
    /// - `StorageError::TableMismatch` if the page belongs to another table
    /// - `StorageError::InvalidBufferSize` if `buf` is not one page long
    pub fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        self.check_buffer(buf.len())?;
        self.check_table(page_id)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id.byte_offset(self.page_size)))?;
        file.write_all(buf)?;
        Ok(())
    }

    /// Appends one page to the end of the file and returns its id.
    ///
    /// The page number is taken under the file lock, so concurrent appends
    /// receive distinct pages.
    pub fn append_page(&self, buf: &[u8]) -> Result<PageId, StorageError> {
        self.check_buffer(buf.len())?;

        let mut file = self.file.lock();
        let page_id = PageId::new(self.table_id, self.page_count_of(&file)?);
        file.seek(SeekFrom::Start(page_id.byte_offset(self.page_size)))?;
        file.write_all(buf)?;

        debug!(%page_id, "appended page");
        Ok(page_id)
    }

    /// Syncs all pending writes to physical disk (fsync).
    pub fn sync_all(&self) -> Result<(), StorageError> {
        let file = self.file.lock();
        file.sync_all()?;
        Ok(())
    }

    fn check_buffer(&self, len: usize) -> Result<(), StorageError> {
        if len != self.page_size {
            return Err(StorageError::InvalidBufferSize {
                expected: self.page_size,
                actual: len,
            });
        }
        Ok(())
    }

    fn check_table(&self, page_id: PageId) -> Result<(), StorageError> {
        if page_id.table_id != self.table_id {
            return Err(StorageError::TableMismatch {
                expected: self.table_id,
                page_id,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    const PAGE: usize = 64;

    /// Helper for creating temporary FileStorage instances for testing.
    struct TempFileStorage {
        dir: TempDir,
    }

    impl TempFileStorage {
        fn new() -> Self {
            Self {
                dir: tempdir().unwrap(),
            }
        }

        fn path(&self) -> PathBuf {
            self.dir.path().join("test.dat")
        }

        fn storage(&self) -> FileStorage {
            FileStorage::open(self.path(), StorageConfig::with_page_size(PAGE)).unwrap()
        }
    }

    #[test]
    fn test_create_new_file() {
        let temp = TempFileStorage::new();
        let storage = temp.storage();
        assert_eq!(storage.page_count().unwrap(), 0);
        assert!(temp.path().exists());
    }

    #[test]
    fn test_append_and_read() {
        let temp = TempFileStorage::new();
        let storage = temp.storage();

        let id0 = storage.append_page(&[1u8; PAGE]).unwrap();
        let id1 = storage.append_page(&[2u8; PAGE]).unwrap();
        assert_eq!(id0.page_num, 0);
        assert_eq!(id1.page_num, 1);
        assert_eq!(storage.page_count().unwrap(), 2);

        let mut buf = [0u8; PAGE];
        storage.read_page(id1, &mut buf).unwrap();
        assert_eq!(buf, [2u8; PAGE]);
    }

    #[test]
    fn test_write_in_place() {
        let temp = TempFileStorage::new();
        let storage = temp.storage();

        let id0 = storage.append_page(&[0u8; PAGE]).unwrap();
        storage.append_page(&[0u8; PAGE]).unwrap();
        storage.write_page(id0, &[9u8; PAGE]).unwrap();

        assert_eq!(storage.page_count().unwrap(), 2);
        let mut buf = [0u8; PAGE];
        storage.read_page(id0, &mut buf).unwrap();
        assert_eq!(buf, [9u8; PAGE]);
    }

    #[test]
    fn test_page_out_of_range() {
        let temp = TempFileStorage::new();
        let storage = temp.storage();
        storage.append_page(&[0u8; PAGE]).unwrap();

        let mut buf = [0u8; PAGE];
        let result = storage.read_page(PageId::new(storage.table_id(), 1), &mut buf);
        assert!(matches!(
            result,
            Err(StorageError::PageOutOfRange { page_count: 1, .. })
        ));
    }

    #[test]
    fn test_table_mismatch() {
        let temp = TempFileStorage::new();
        let storage = temp.storage();
        storage.append_page(&[0u8; PAGE]).unwrap();

        let other = TableId(storage.table_id().as_u32().wrapping_add(1));
        let mut buf = [0u8; PAGE];
        assert!(matches!(
            storage.read_page(PageId::new(other, 0), &mut buf),
            Err(StorageError::TableMismatch { .. })
        ));
        assert!(matches!(
            storage.write_page(PageId::new(other, 0), &buf),
            Err(StorageError::TableMismatch { .. })
        ));
    }

    #[test]
    fn test_buffer_size_validation() {
        let temp = TempFileStorage::new();
        let storage = temp.storage();
        let result = storage.append_page(&[0u8; PAGE - 1]);
        assert!(matches!(
            result,
            Err(StorageError::InvalidBufferSize {
                expected: PAGE,
                actual: 63
            })
        ));
    }

    #[test]
    fn test_fractional_page_is_corrupted() {
        let temp = TempFileStorage::new();
        std::fs::write(temp.path(), vec![0u8; PAGE + 10]).unwrap();
        let storage = temp.storage();
        assert!(matches!(
            storage.page_count(),
            Err(StorageError::Corrupted(_))
        ));
    }

    #[test]
    fn test_persistence_across_instances() {
        let temp = TempFileStorage::new();
        let table_id = {
            let storage = temp.storage();
            for i in 0..3u8 {
                storage.append_page(&[i * 10; PAGE]).unwrap();
            }
            storage.sync_all().unwrap();
            storage.table_id()
        };

        let storage = temp.storage();
        assert_eq!(storage.table_id(), table_id);
        assert_eq!(storage.page_count().unwrap(), 3);
        let mut buf = [0u8; PAGE];
        storage.read_page(PageId::new(table_id, 2), &mut buf).unwrap();
        assert_eq!(buf, [20u8; PAGE]);
    }
}
