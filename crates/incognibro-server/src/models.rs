//! API request and response models.
//!
//! Settings and block list updates are returned as the core types
//! ([`PrivacySettings`](incognibro_core::PrivacySettings),
//! [`BlocklistUpdateResult`](incognibro_core::BlocklistUpdateResult)).

use serde::{Deserialize, Serialize};

/// Header carrying the caller's principal.
pub const PRINCIPAL_HEADER: &str = "x-principal";

/// Request body for POST and DELETE /api/blocklist.
#[derive(Debug, Serialize, Deserialize)]
pub struct DomainRequest {
    pub domain: String,
}

/// Request and response body for PUT /api/settings/auto-stop.
#[derive(Debug, Serialize, Deserialize)]
pub struct AutoStopRequest {
    pub auto_stop_tracking: bool,
}

/// Response body for GET /api/health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
