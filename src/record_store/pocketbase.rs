//! HTTP client for a PocketBase record store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::models::{AudioRecord, AudioRecordUpdate, NewAudioRecord};
use super::trait_def::{RecordStore, StoreError};

/// Records fetched per page when listing.
const PAGE_SIZE: u32 = 200;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordPage {
    page: u32,
    total_pages: u32,
    #[serde(default)]
    items: Vec<AudioRecord>,
}

/// Turns a non-2xx response into `StoreError::Api`, keeping the store's message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn parse_record(response: reqwest::Response) -> Result<AudioRecord, StoreError> {
    check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| StoreError::InvalidResponse(e.to_string()))
}

/// Record store backed by a PocketBase collection.
pub struct PocketBaseStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl PocketBaseStore {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the PocketBase instance (e.g., "http://127.0.0.1:8090")
    /// * `collection` - Name of the collection holding audio records
    /// * `timeout_sec` - Request timeout in seconds, `None` for the client default
    pub fn new(base_url: String, collection: String, timeout_sec: Option<u64>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_sec) = timeout_sec {
            builder = builder.timeout(Duration::from_secs(timeout_sec));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            collection,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn records_url(&self) -> String {
        format!(
            "{}/api/collections/{}/records",
            self.base_url,
            urlencoding::encode(&self.collection)
        )
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{}", self.records_url(), urlencoding::encode(id))
    }

    async fn fetch_page(&self, page: u32) -> Result<RecordPage, StoreError> {
        let response = self
            .client
            .get(self.records_url())
            .query(&[
                ("page", page.to_string()),
                ("perPage", PAGE_SIZE.to_string()),
                ("sort", "-created".to_string()),
            ])
            .send()
            .await?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RecordStore for PocketBaseStore {
    fn name(&self) -> &str {
        "pocketbase"
    }

    async fn create(&self, record: NewAudioRecord) -> Result<AudioRecord, StoreError> {
        let tags = serde_json::to_string(&record.tags)
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        let part = Part::bytes(record.data).file_name(record.filename);
        let part = match record.content_type {
            Some(content_type) => part.mime_str(&content_type)?,
            None => part,
        };

        let form = Form::new()
            .text("latitude", record.latitude.to_string())
            .text("longitude", record.longitude.to_string())
            .text("loudness", record.loudness.to_string())
            .text("tags", tags)
            .part("audio", part);

        let response = self
            .client
            .post(self.records_url())
            .multipart(form)
            .send()
            .await?;

        parse_record(response).await
    }

    async fn list(&self) -> Result<Vec<AudioRecord>, StoreError> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let body = self.fetch_page(page).await?;
            let exhausted = body.items.is_empty() || body.page >= body.total_pages;
            records.extend(body.items);
            if exhausted {
                break;
            }
            page += 1;
        }

        debug!("Fetched {} records in {} page(s)", records.len(), page);
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<AudioRecord, StoreError> {
        let response = self.client.get(self.record_url(id)).send().await?;
        parse_record(response).await
    }

    async fn update(
        &self,
        id: &str,
        update: AudioRecordUpdate,
    ) -> Result<AudioRecord, StoreError> {
        let response = self
            .client
            .patch(self.record_url(id))
            .json(&update)
            .send()
            .await?;
        parse_record(response).await
    }

    async fn delete(&self, id: &str, authorization: Option<&str>) -> Result<(), StoreError> {
        let mut request = self.client.delete(self.record_url(id));
        if let Some(authorization) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }
        let response = request.send().await?;
        check_status(response).await?;
        Ok(())
    }

    fn file_url(&self, record: &AudioRecord) -> String {
        let collection = if record.collection_id.is_empty() {
            &self.collection
        } else {
            &record.collection_id
        };
        format!(
            "{}/api/files/{}/{}/{}",
            self.base_url,
            urlencoding::encode(collection),
            urlencoding::encode(&record.id),
            urlencoding::encode(&record.audio)
        )
    }
}
