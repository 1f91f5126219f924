//! Shared constants for end-to-end tests
//!
//! When test data or timeouts change, update only this file.

// ============================================================================
// Record Store
// ============================================================================

/// Base URL the in-memory store uses for file links
pub const TEST_STORE_URL: &str = "http://files.test:8090";

/// Collection name used by test stores
pub const TEST_COLLECTION: &str = "audio";

/// Authorization header value accepted by stores that require one
pub const ADMIN_AUTHORIZATION: &str = "Bearer admin-token";

// ============================================================================
// Audio Fixtures
// ============================================================================

pub const TEST_SAMPLE_RATE: u32 = 44100;

/// Enough samples for eight full analysis frames
pub const TEST_CLIP_SAMPLES: usize = 2048 * 8;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Per-request timeout for the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Interval between readiness probes
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
