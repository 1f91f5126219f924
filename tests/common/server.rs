//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own in-memory record store.

use super::constants::*;
use geoaudio_server::server::{make_app, GuardedRecordStore, RequestsLoggingLevel, ServerConfig};
use geoaudio_server::InMemoryRecordStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Test server instance backed by an in-memory record store
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    memory_store: Option<Arc<InMemoryRecordStore>>,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with an empty store
    pub async fn spawn() -> Self {
        Self::spawn_with_store(InMemoryRecordStore::new(TEST_STORE_URL, TEST_COLLECTION)).await
    }

    /// Spawns a new test server on a random port using the given store
    ///
    /// # Panics
    ///
    /// Panics if port binding fails or the server doesn't become ready within timeout
    pub async fn spawn_with_store(store: InMemoryRecordStore) -> Self {
        let store = Arc::new(store);
        let mut server = Self::spawn_with_record_store(store.clone()).await;
        server.memory_store = Some(store);
        server
    }

    /// Spawns a new test server on a random port in front of any record store
    pub async fn spawn_with_record_store(record_store: GuardedRecordStore) -> Self {
        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };

        let app = make_app(config, record_store);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            memory_store: None,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// The in-memory store behind this server, for direct inspection
    ///
    /// # Panics
    ///
    /// Panics if the server was spawned with another kind of store
    pub fn store(&self) -> &InMemoryRecordStore {
        self.memory_store
            .as_deref()
            .expect("Test server is not backed by an in-memory store")
    }

    /// Waits for the server to become ready by polling the / endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
