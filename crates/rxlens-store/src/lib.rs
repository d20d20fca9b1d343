//! Persistence for extraction results: the append-only Result Store and the
//! per-result file archive.

pub mod archive;
pub mod confine;
pub mod records;

pub use archive::{archive_filename, ResultArchive, ARCHIVE_EXTENSION};
pub use confine::confine;
pub use records::{JsonFileStore, MemoryStore, RecordStore};
