//! State store implementations.
//!
//! Available backends:
//! - `MemoryStateStore` - In-memory state for tests and dry runs
//! - `FileStateStore` - Singer state document on disk

pub mod file;
pub mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;
