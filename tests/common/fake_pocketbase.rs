//! Minimal PocketBase stand-in
//!
//! Serves the records API of a single collection from memory so the real
//! `PocketBaseStore` client can be exercised over HTTP.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Collection id reported in records, distinct from the collection name
pub const FAKE_COLLECTION_ID: &str = "pbc_1234567890";

/// Authorization value the fake accepts for deletes
pub const FAKE_SUPERUSER_TOKEN: &str = "Bearer superuser";

#[derive(Default)]
pub struct FakeState {
    /// Records in insertion order
    pub records: Vec<Value>,
    /// Files uploaded with each record, keyed by record id
    pub files: HashMap<String, Vec<u8>>,
    /// "METHOD path?query" for every request received
    pub requests: Vec<String>,
    next_id: u64,
}

type SharedState = Arc<Mutex<FakeState>>;

fn pb_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "message": message, "data": {} })),
    )
        .into_response()
}

fn not_found() -> Response {
    pb_error(StatusCode::NOT_FOUND, "The requested resource wasn't found.")
}

fn log_request(state: &SharedState, request: String) {
    state.lock().unwrap().requests.push(request);
}

fn new_record_json(state: &mut FakeState, fields: Map<String, Value>) -> Value {
    state.next_id += 1;
    let mut record = Map::new();
    record.insert("id".into(), json!(format!("rec{:012}", state.next_id)));
    record.insert("collectionId".into(), json!(FAKE_COLLECTION_ID));
    record.insert("collectionName".into(), json!("audio"));
    let created = json!(format!("2024-01-01 00:00:{:02}.000Z", state.next_id % 60));
    record.insert("created".into(), created.clone());
    record.insert("updated".into(), created);
    record.extend(fields);
    Value::Object(record)
}

async fn list_records(
    State(state): State<SharedState>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    query.sort();
    log_request(
        &state,
        format!("GET /api/collections/{}/records?{}", collection, query.join("&")),
    );

    if collection != "audio" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "backend exploded").into_response();
    }

    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page: usize = params
        .get("perPage")
        .and_then(|p| p.parse().ok())
        .unwrap_or(30);

    let state = state.lock().unwrap();
    // Newest first
    let sorted: Vec<&Value> = state.records.iter().rev().collect();
    let total_items = sorted.len();
    let total_pages = total_items.div_ceil(per_page);
    let items: Vec<&Value> = sorted
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Json(json!({
        "page": page,
        "perPage": per_page,
        "totalItems": total_items,
        "totalPages": total_pages,
        "items": items,
    }))
    .into_response()
}

async fn create_record(
    State(state): State<SharedState>,
    Path(collection): Path<String>,
    mut multipart: Multipart,
) -> Response {
    log_request(&state, format!("POST /api/collections/{}/records", collection));

    let mut fields = Map::new();
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        if name == "audio" {
            let filename = field.file_name().unwrap_or("file").to_string();
            let data = field.bytes().await.unwrap().to_vec();
            file = Some((filename, data));
            continue;
        }

        let text = field.text().await.unwrap();
        let value = match name.as_str() {
            "latitude" | "longitude" | "loudness" => match text.parse::<f64>() {
                Ok(n) => json!(n),
                Err(_) => {
                    return pb_error(StatusCode::BAD_REQUEST, "Failed to create record.")
                }
            },
            "tags" => serde_json::from_str(&text).unwrap_or(json!([])),
            _ => json!(text),
        };
        fields.insert(name, value);
    }

    let Some((filename, data)) = file else {
        return pb_error(StatusCode::BAD_REQUEST, "Failed to create record.");
    };
    fields.insert("audio".into(), json!(format!("stored_{}", filename)));

    let mut state = state.lock().unwrap();
    let record = new_record_json(&mut state, fields);
    let id = record["id"].as_str().unwrap().to_string();
    state.files.insert(id, data);
    state.records.push(record.clone());
    Json(record).into_response()
}

async fn get_record(
    State(state): State<SharedState>,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    log_request(&state, format!("GET /api/collections/{}/records/{}", collection, id));

    let state = state.lock().unwrap();
    match state.records.iter().find(|r| r["id"] == id.as_str()) {
        Some(record) => Json(record.clone()).into_response(),
        None => not_found(),
    }
}

async fn update_record(
    State(state): State<SharedState>,
    Path((collection, id)): Path<(String, String)>,
    Json(patch): Json<Map<String, Value>>,
) -> Response {
    log_request(&state, format!("PATCH /api/collections/{}/records/{}", collection, id));

    let mut state = state.lock().unwrap();
    let Some(record) = state.records.iter_mut().find(|r| r["id"] == id.as_str()) else {
        return not_found();
    };
    if let Value::Object(existing) = record {
        existing.extend(patch);
        existing.insert("updated".into(), json!("2024-01-02 00:00:00.000Z"));
    }
    Json(record.clone()).into_response()
}

async fn delete_record(
    State(state): State<SharedState>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    log_request(&state, format!("DELETE /api/collections/{}/records/{}", collection, id));

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(FAKE_SUPERUSER_TOKEN);

    let mut state = state.lock().unwrap();
    let Some(index) = state.records.iter().position(|r| r["id"] == id.as_str()) else {
        return not_found();
    };
    if !authorized {
        return pb_error(
            StatusCode::FORBIDDEN,
            "Only superusers can perform this action.",
        );
    }
    state.records.remove(index);
    state.files.remove(&id);
    StatusCode::NO_CONTENT.into_response()
}

/// Running fake PocketBase; shuts down when dropped
pub struct FakePocketBase {
    pub base_url: String,
    pub state: SharedState,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakePocketBase {
    pub async fn spawn() -> Self {
        let state: SharedState = Arc::new(Mutex::new(FakeState::default()));

        let app = Router::new()
            .route(
                "/api/collections/{collection}/records",
                get(list_records).post(create_record),
            )
            .route(
                "/api/collections/{collection}/records/{id}",
                get(get_record).patch(update_record).delete(delete_record),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake PocketBase failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Adds records directly, bypassing the HTTP API.
    pub fn seed(&self, count: usize, latitude: f64, longitude: f64) -> Vec<String> {
        let mut state = self.state.lock().unwrap();
        (0..count)
            .map(|i| {
                let mut fields = Map::new();
                fields.insert("audio".into(), json!(format!("seed_{}.wav", i)));
                fields.insert("latitude".into(), json!(latitude));
                fields.insert("longitude".into(), json!(longitude));
                fields.insert("loudness".into(), json!(1.0));
                fields.insert("tags".into(), Value::Null);
                let record = new_record_json(&mut state, fields);
                let id = record["id"].as_str().unwrap().to_string();
                state.records.push(record);
                id
            })
            .collect()
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }
}

impl Drop for FakePocketBase {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
