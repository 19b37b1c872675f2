pub mod content_copy;
pub mod events;
pub mod metadata_store;
pub mod registry;
pub mod storage;
