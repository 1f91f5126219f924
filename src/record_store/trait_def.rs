//! RecordStore trait definition.

use super::models::{AudioRecord, AudioRecordUpdate, NewAudioRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Message the store uses for missing records.
pub const NOT_FOUND_MESSAGE: &str = "The requested resource wasn't found.";

/// Errors that can occur when talking to the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered with an error status; forwarded to API clients as-is.
    #[error("Store error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    pub fn not_found() -> Self {
        StoreError::Api {
            status: 404,
            message: NOT_FOUND_MESSAGE.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Api { status: 404, .. })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::InvalidResponse(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Trait for audio record storage backends.
///
/// The server holds an `Arc<dyn RecordStore>`, so the hosted store and the
/// in-memory store are interchangeable.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name, for logs.
    fn name(&self) -> &str;

    /// Create a record, uploading its audio payload.
    async fn create(&self, record: NewAudioRecord) -> Result<AudioRecord, StoreError>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<AudioRecord>, StoreError>;

    async fn get(&self, id: &str) -> Result<AudioRecord, StoreError>;

    async fn update(&self, id: &str, update: AudioRecordUpdate)
        -> Result<AudioRecord, StoreError>;

    /// Delete a record. `authorization` is the caller's Authorization header,
    /// passed through so the store can apply its own access rules.
    async fn delete(&self, id: &str, authorization: Option<&str>) -> Result<(), StoreError>;

    /// Public URL of the record's audio file.
    fn file_url(&self, record: &AudioRecord) -> String;
}
