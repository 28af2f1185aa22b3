//! Storage Adapters

mod chunk_storage;

pub use chunk_storage::{FileChunkStore, DEFAULT_CHUNK_PREFIX, DEFAULT_INDEX_WIDTH};
