//! In-memory record store.
//!
//! Mirrors the hosted store's observable behavior (ids, timestamps,
//! newest-first listing, 404 on unknown ids) without any network access.
//! Used by tests and for local runs with `--store memory`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

use super::models::{AudioRecord, AudioRecordUpdate, NewAudioRecord};
use super::trait_def::{RecordStore, StoreError};

const RECORD_ID_LEN: usize = 15;
const FILENAME_SUFFIX_LEN: usize = 10;

struct StoredRecord {
    seq: u64,
    record: AudioRecord,
    data: Vec<u8>,
}

#[derive(Default)]
struct MemoryState {
    next_seq: u64,
    records: HashMap<String, StoredRecord>,
}

pub struct InMemoryRecordStore {
    base_url: String,
    collection: String,
    required_authorization: Option<String>,
    state: Mutex<MemoryState>,
}

fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%d %H:%M:%S%.3fZ")
        .to_string()
}

fn random_token(len: usize) -> String {
    Uuid::new_v4().simple().to_string()[..len].to_string()
}

/// `My Clip.WAV` -> `my_clip_<random>.wav`
fn stored_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem: String = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() {
        "audio".to_string()
    } else {
        stem
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!(
            "{}_{}.{}",
            stem,
            random_token(FILENAME_SUFFIX_LEN),
            ext.to_ascii_lowercase()
        ),
        None => format!("{}_{}", stem, random_token(FILENAME_SUFFIX_LEN)),
    }
}

impl InMemoryRecordStore {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            required_authorization: None,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Makes deletes fail with 403 unless the caller's Authorization header
    /// matches `authorization`, like a store-side access rule would.
    pub fn with_required_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.required_authorization = Some(authorization.into());
        self
    }

    /// Inserts a fully formed record, e.g. test fixtures with fixed ids.
    pub fn insert(&self, record: AudioRecord) {
        let mut state = self.state.lock().unwrap();
        state.next_seq += 1;
        let seq = state.next_seq;
        state.records.insert(
            record.id.clone(),
            StoredRecord {
                seq,
                record,
                data: Vec::new(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes of a record's audio payload.
    pub fn file_data(&self, id: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(id)
            .map(|stored| stored.data.clone())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create(&self, record: NewAudioRecord) -> Result<AudioRecord, StoreError> {
        let timestamp = now_timestamp();
        let created = AudioRecord {
            id: random_token(RECORD_ID_LEN),
            collection_id: self.collection.clone(),
            collection_name: self.collection.clone(),
            audio: stored_filename(&record.filename),
            latitude: record.latitude,
            longitude: record.longitude,
            loudness: record.loudness,
            tags: record.tags,
            created: timestamp.clone(),
            updated: timestamp,
        };

        let mut state = self.state.lock().unwrap();
        state.next_seq += 1;
        let seq = state.next_seq;
        state.records.insert(
            created.id.clone(),
            StoredRecord {
                seq,
                record: created.clone(),
                data: record.data,
            },
        );
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<AudioRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut stored: Vec<&StoredRecord> = state.records.values().collect();
        stored.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(stored.into_iter().map(|s| s.record.clone()).collect())
    }

    async fn get(&self, id: &str) -> Result<AudioRecord, StoreError> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(id)
            .map(|stored| stored.record.clone())
            .ok_or_else(StoreError::not_found)
    }

    async fn update(
        &self,
        id: &str,
        update: AudioRecordUpdate,
    ) -> Result<AudioRecord, StoreError> {
        let mut state = self.state.lock().unwrap();
        let stored = state.records.get_mut(id).ok_or_else(StoreError::not_found)?;
        update.apply_to(&mut stored.record);
        stored.record.updated = now_timestamp();
        Ok(stored.record.clone())
    }

    async fn delete(&self, id: &str, authorization: Option<&str>) -> Result<(), StoreError> {
        if let Some(required) = &self.required_authorization {
            if authorization != Some(required.as_str()) {
                return Err(StoreError::Api {
                    status: 403,
                    message: "Only superusers can perform this action.".to_string(),
                });
            }
        }

        self.state
            .lock()
            .unwrap()
            .records
            .remove(id)
            .map(|_| ())
            .ok_or_else(StoreError::not_found)
    }

    fn file_url(&self, record: &AudioRecord) -> String {
        format!(
            "{}/api/files/{}/{}/{}",
            self.base_url,
            urlencoding::encode(&record.collection_id),
            urlencoding::encode(&record.id),
            urlencoding::encode(&record.audio)
        )
    }
}
