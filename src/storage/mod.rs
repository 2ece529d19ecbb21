//! Progress and profile storage.
//!
//! Progress is kept per course level, with file-based and in-memory
//! backends. The learner profile has its own create-once store.

pub mod file;
pub mod memory;
pub mod profile;
pub mod traits;

pub use file::FileProgressStore;
pub use memory::MemoryProgressStore;
pub use profile::ProfileStore;
pub use traits::ProgressStore;
