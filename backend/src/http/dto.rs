//! Data Transfer Objects for the HTTP API.
//!
//! Products travel as [`Product`](crate::models::Product) directly; only the
//! service-level responses need their own shapes.

use serde::{Deserialize, Serialize};

/// Name of the header carrying the unpaged match count on listings.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// `connected`, `disconnected` or `error: <reason>`
    pub database: String,
    /// Store implementation serving requests, e.g. `local`
    pub backend: String,
}
