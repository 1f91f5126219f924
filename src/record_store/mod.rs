mod memory_store;
mod models;
mod pocketbase;
mod trait_def;

pub use memory_store::InMemoryRecordStore;
pub use models::{parse_tags, AudioRecord, AudioRecordUpdate, NewAudioRecord};
pub use pocketbase::PocketBaseStore;
pub use trait_def::{RecordStore, StoreError, NOT_FOUND_MESSAGE};
