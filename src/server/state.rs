use axum::extract::FromRef;

use crate::record_store::RecordStore;
use std::sync::Arc;
use std::time::Instant;

pub type GuardedRecordStore = Arc<dyn RecordStore>;

#[derive(Clone)]
pub struct ServerState {
    pub start_time: Instant,
    pub record_store: GuardedRecordStore,
    pub hash: String,
}

impl ServerState {
    pub fn new(record_store: GuardedRecordStore) -> ServerState {
        ServerState {
            start_time: Instant::now(),
            record_store,
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

impl FromRef<ServerState> for GuardedRecordStore {
    fn from_ref(input: &ServerState) -> Self {
        input.record_store.clone()
    }
}
