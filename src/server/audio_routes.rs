//! Audio HTTP routes.
//!
//! Provides endpoints for:
//! - Uploading geotagged audio (loudness is extracted before storing)
//! - Listing records, or searching them by distance from a point
//! - Fetching, updating and deleting a single record

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::features::{analyze_audio, DecodeError, SharedBytes};
use crate::geo::{validate_coordinates, validate_latitude, validate_longitude, GeoQuery};
use crate::record_store::{parse_tags, AudioRecord, AudioRecordUpdate, NewAudioRecord, StoreError};

use super::error::ApiError;
use super::metrics::{
    record_feature_extraction, record_store_error, record_store_request, record_upload,
};
use super::state::{GuardedRecordStore, ServerState};

pub const NO_RECORDS_MESSAGE: &str = "No records found";
pub const MISSING_SEARCH_PARAMS_MESSAGE: &str =
    "Missing search parameters. latitude, longitude and radius are required.";
pub const MISSING_FILE_MESSAGE: &str = "No audio file uploaded.";
pub const INVALID_FILE_TYPE_MESSAGE: &str = "Invalid file type. Only audio files are allowed.";
pub const MISSING_COORDINATES_MESSAGE: &str = "Latitude and longitude are required.";
pub const INVALID_LOUDNESS_MESSAGE: &str = "Loudness must be a non-negative number.";
pub const INVALID_AUTHORIZATION_MESSAGE: &str = "Invalid Authorization header.";

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

fn store_error_kind(err: &StoreError) -> &'static str {
    match err {
        StoreError::Api { .. } => "api",
        StoreError::Transport(_) => "transport",
        StoreError::InvalidResponse(_) => "invalid_response",
    }
}

/// Times a store round trip and counts its failures.
async fn observe<T, F>(operation: &'static str, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let start = Instant::now();
    let result = call.await;
    record_store_request(operation, start.elapsed());
    if let Err(err) = &result {
        debug!("Store {} failed: {}", operation, err);
        record_store_error(operation, store_error_kind(err));
    }
    result
}

fn parse_number(raw: &str, error_message: &str) -> Result<f64, ApiError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ApiError::bad_request(error_message))
}

/// Validated search parameters, or `None` when the request is a plain listing.
fn parse_search_params(params: &HashMap<String, String>) -> Result<Option<GeoQuery>, ApiError> {
    if params.is_empty() {
        return Ok(None);
    }

    let (latitude, longitude, radius) = match (
        params.get("latitude"),
        params.get("longitude"),
        params.get("radius"),
    ) {
        (Some(lat), Some(lon), Some(radius)) => (lat, lon, radius),
        _ => return Err(ApiError::bad_request(MISSING_SEARCH_PARAMS_MESSAGE)),
    };

    let latitude = parse_number(latitude, "Latitude must be a number.")?;
    let longitude = parse_number(longitude, "Longitude must be a number.")?;
    let radius = parse_number(radius, "Radius must be a non-negative number.")?;

    Ok(Some(GeoQuery::new(latitude, longitude, radius)?))
}

/// GET / - List all records, or search by distance when query parameters are present
async fn list_or_search_audio(
    State(store): State<GuardedRecordStore>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<AudioRecord>>, ApiError> {
    let query = parse_search_params(&params)?;

    let records = observe("list", store.list()).await?;

    let Some(query) = query else {
        return Ok(Json(records));
    };

    let total = records.len();
    let matches: Vec<AudioRecord> = records
        .into_iter()
        .filter(|r| query.contains(r.latitude, r.longitude))
        .collect();
    debug!(
        "Search ({}, {}) r={}km matched {} of {} records",
        query.latitude,
        query.longitude,
        query.radius,
        matches.len(),
        total
    );

    if matches.is_empty() {
        return Err(ApiError::NotFound(NO_RECORDS_MESSAGE.to_string()));
    }
    Ok(Json(matches))
}

fn is_audio_payload(data: &[u8], declared_content_type: Option<&str>) -> bool {
    match infer::get(data) {
        Some(kind) => kind.mime_type().starts_with("audio/"),
        None => declared_content_type
            .map(|ct| ct.starts_with("audio/"))
            .unwrap_or(false),
    }
}

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    latitude: Option<String>,
    longitude: Option<String>,
    tags: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "audio" => {
                let filename = field.file_name().unwrap_or("audio").to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await?.to_vec();
                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            }
            "latitude" => form.latitude = Some(field.text().await?),
            "longitude" => form.longitude = Some(field.text().await?),
            "tags" => form.tags = Some(field.text().await?),
            other => debug!("Ignoring unknown upload field '{}'", other),
        }
    }

    Ok(form)
}

/// Checks the upload form and turns it into a store request (without loudness).
fn validate_upload(form: UploadForm) -> Result<NewAudioRecord, ApiError> {
    let file = match form.file {
        Some(file) if !file.data.is_empty() => file,
        _ => return Err(ApiError::bad_request(MISSING_FILE_MESSAGE)),
    };

    if !is_audio_payload(&file.data, file.content_type.as_deref()) {
        return Err(ApiError::bad_request(INVALID_FILE_TYPE_MESSAGE));
    }

    let (latitude, longitude) = match (form.latitude, form.longitude) {
        (Some(lat), Some(lon)) if !lat.trim().is_empty() && !lon.trim().is_empty() => (
            parse_number(&lat, "Latitude must be a number.")?,
            parse_number(&lon, "Longitude must be a number.")?,
        ),
        _ => return Err(ApiError::bad_request(MISSING_COORDINATES_MESSAGE)),
    };
    validate_coordinates(latitude, longitude)?;

    Ok(NewAudioRecord {
        filename: file.filename,
        content_type: file.content_type,
        data: file.data,
        latitude,
        longitude,
        loudness: 0.0,
        tags: form.tags.as_deref().map(parse_tags).unwrap_or_default(),
    })
}

/// Runs decoding and loudness extraction on the blocking pool.
///
/// The file bytes are moved into the task and handed back with the result.
async fn analyze_in_background(
    data: Vec<u8>,
    extension: Option<String>,
) -> Result<(Vec<u8>, Result<Option<f32>, DecodeError>), ApiError> {
    tokio::task::spawn_blocking(move || {
        let shared = Arc::new(data);
        let result = analyze_audio(SharedBytes(shared.clone()), extension.as_deref());
        // The decoder is gone by now, so this is the only handle left
        let data = Arc::try_unwrap(shared).unwrap_or_else(|shared| Vec::clone(&shared));
        (data, result)
    })
    .await
    .map_err(|e| {
        warn!("Feature extraction task failed: {}", e);
        ApiError::internal()
    })
}

/// POST / - Upload an audio file with its coordinates (multipart/form-data)
async fn upload_audio(
    State(store): State<GuardedRecordStore>,
    multipart: Multipart,
) -> Result<Json<AudioRecord>, ApiError> {
    let mut new_record = match read_upload_form(multipart)
        .await
        .and_then(validate_upload)
    {
        Ok(record) => record,
        Err(err) => {
            record_upload("rejected");
            return Err(err);
        }
    };

    let extension = FsPath::new(&new_record.filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let start = Instant::now();
    let (data, analysis) = analyze_in_background(std::mem::take(&mut new_record.data), extension)
        .await
        .inspect_err(|_| record_upload("extraction_failed"))?;
    record_feature_extraction(start.elapsed());
    new_record.data = data;

    let loudness = match analysis {
        Ok(loudness) => loudness,
        Err(err) => {
            record_upload("extraction_failed");
            return Err(ApiError::feature_extraction(&err));
        }
    };

    new_record.loudness = match loudness {
        Some(loudness) => loudness as f64,
        None => {
            warn!(
                "No loudness could be computed for '{}', storing 0",
                new_record.filename
            );
            0.0
        }
    };

    let filename = new_record.filename.clone();
    let created = match observe("create", store.create(new_record)).await {
        Ok(record) => record,
        Err(err) => {
            record_upload("store_failed");
            return Err(err.into());
        }
    };

    record_upload("created");
    info!(
        "Stored audio record {} from '{}' at ({}, {}), loudness {:.3}",
        created.id, filename, created.latitude, created.longitude, created.loudness
    );
    Ok(Json(created))
}

/// GET /{id} - Fetch a record, or redirect to its file with `?download`
async fn get_audio(
    State(store): State<GuardedRecordStore>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let record = observe("get", store.get(&id)).await?;

    if params.contains_key("download") {
        let url = store.file_url(&record);
        debug!("Redirecting download of {} to {}", id, url);
        return Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response());
    }

    Ok(Json(record).into_response())
}

fn validate_update(update: &AudioRecordUpdate) -> Result<(), ApiError> {
    if let Some(latitude) = update.latitude {
        validate_latitude(latitude)?;
    }
    if let Some(longitude) = update.longitude {
        validate_longitude(longitude)?;
    }
    if let Some(loudness) = update.loudness {
        if !loudness.is_finite() || loudness < 0.0 {
            return Err(ApiError::bad_request(INVALID_LOUDNESS_MESSAGE));
        }
    }
    Ok(())
}

/// PUT /{id} - Update coordinates, loudness or tags
async fn update_audio(
    State(store): State<GuardedRecordStore>,
    Path(id): Path<String>,
    payload: Result<Json<AudioRecordUpdate>, JsonRejection>,
) -> Result<Json<AudioRecord>, ApiError> {
    let Json(update) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    validate_update(&update)?;

    if update.is_empty() {
        debug!("Empty update for record {}", id);
    }

    let updated = observe("update", store.update(&id, update)).await?;
    info!("Updated audio record {}", updated.id);
    Ok(Json(updated))
}

/// The caller's Authorization header, rejected when it is not visible ASCII.
fn authorization_header(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    match headers.get(header::AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value.to_str().map(Some).map_err(|_| {
            warn!("Rejecting request with a non-ASCII Authorization header");
            ApiError::bad_request(INVALID_AUTHORIZATION_MESSAGE)
        }),
    }
}

/// DELETE /{id} - Delete a record, forwarding the caller's Authorization header
async fn delete_audio(
    State(store): State<GuardedRecordStore>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<DeleteResponse>, ApiError> {
    let authorization = authorization_header(&headers)?;

    observe("delete", store.delete(&id, authorization)).await?;
    info!("Deleted audio record {}", id);
    Ok(Json(DeleteResponse { success: true }))
}

pub fn make_audio_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_or_search_audio).post(upload_audio))
        .route(
            "/{id}",
            get(get_audio).put(update_audio).delete(delete_audio),
        )
        .with_state(state)
}
