pub mod buffer;
pub mod datum;
pub mod executor;
pub mod heap;
pub mod storage;
pub mod tuple;
pub mod tx;
