//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all audio endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

/// Fields of an upload request; `None` fields are left out of the form
#[derive(Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub tags: Option<String>,
}

impl Upload {
    pub fn wav(data: Vec<u8>, latitude: f64, longitude: f64) -> Self {
        Self {
            filename: "clip.wav".to_string(),
            content_type: "audio/wav".to_string(),
            data,
            latitude: Some(latitude.to_string()),
            longitude: Some(longitude.to_string()),
            tags: None,
        }
    }

    pub fn with_file(mut self, filename: &str, content_type: &str) -> Self {
        self.filename = filename.to_string();
        self.content_type = content_type.to_string();
        self
    }

    pub fn with_latitude(mut self, latitude: Option<&str>) -> Self {
        self.latitude = latitude.map(str::to_string);
        self
    }

    pub fn with_longitude(mut self, longitude: Option<&str>) -> Self {
        self.longitude = longitude.map(str::to_string);
        self
    }

    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags = Some(tags.to_string());
        self
    }
}

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            // Redirects are asserted on, not followed
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Server
    // ========================================================================

    /// GET /
    pub async fn get_status(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Status request failed")
    }

    // ========================================================================
    // Audio Endpoints
    // ========================================================================

    /// POST /audio
    pub async fn upload_audio(&self, upload: Upload) -> Response {
        let part = Part::bytes(upload.data)
            .file_name(upload.filename)
            .mime_str(&upload.content_type)
            .expect("Invalid content type");

        let mut form = Form::new().part("audio", part);
        if let Some(latitude) = upload.latitude {
            form = form.text("latitude", latitude);
        }
        if let Some(longitude) = upload.longitude {
            form = form.text("longitude", longitude);
        }
        if let Some(tags) = upload.tags {
            form = form.text("tags", tags);
        }

        self.client
            .post(format!("{}/audio", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    /// POST /audio with only coordinate fields (no file part)
    pub async fn upload_without_file(&self, latitude: &str, longitude: &str) -> Response {
        let form = Form::new()
            .text("latitude", latitude.to_string())
            .text("longitude", longitude.to_string());

        self.client
            .post(format!("{}/audio", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    /// GET /audio
    pub async fn list_audio(&self) -> Response {
        self.client
            .get(format!("{}/audio", self.base_url))
            .send()
            .await
            .expect("List request failed")
    }

    /// GET /audio?latitude=..&longitude=..&radius=..
    pub async fn search_audio(&self, latitude: &str, longitude: &str, radius: &str) -> Response {
        self.search_audio_raw(&[
            ("latitude", latitude),
            ("longitude", longitude),
            ("radius", radius),
        ])
        .await
    }

    /// GET /audio with arbitrary query parameters
    pub async fn search_audio_raw(&self, params: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/audio", self.base_url))
            .query(params)
            .send()
            .await
            .expect("Search request failed")
    }

    /// GET /audio/{id}
    pub async fn get_audio(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/audio/{}", self.base_url, id))
            .send()
            .await
            .expect("Get request failed")
    }

    /// GET /audio/{id}?download
    pub async fn download_audio(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/audio/{}?download", self.base_url, id))
            .send()
            .await
            .expect("Download request failed")
    }

    /// PUT /audio/{id}
    pub async fn update_audio(&self, id: &str, body: &Value) -> Response {
        self.client
            .put(format!("{}/audio/{}", self.base_url, id))
            .json(body)
            .send()
            .await
            .expect("Update request failed")
    }

    /// DELETE /audio/{id}
    pub async fn delete_audio(&self, id: &str, authorization: Option<&str>) -> Response {
        let mut request = self
            .client
            .delete(format!("{}/audio/{}", self.base_url, id));
        if let Some(authorization) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }
        request.send().await.expect("Delete request failed")
    }
}
