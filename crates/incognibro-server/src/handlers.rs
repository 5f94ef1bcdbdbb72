//! API route handlers.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::{debug, info};

use incognibro_core::profile::UserProfile;
use incognibro_core::settings::{BlocklistUpdateResult, PrivacySettings};

use crate::error::{ApiError, Result};
use crate::models::{AutoStopRequest, DomainRequest, HealthResponse, PRINCIPAL_HEADER};
use crate::state::AppState;

/// Reads the caller's principal from the request headers.
fn principal(headers: &HeaderMap) -> Result<String> {
    headers
        .get(PRINCIPAL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthorized)
}

/// GET /api/health - Liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/settings - Get the caller's privacy settings.
pub async fn get_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PrivacySettings>> {
    let principal = principal(&headers)?;
    debug!(principal = %principal, "Loading privacy settings");

    Ok(Json(state.db.get_privacy_settings(&principal)?))
}

/// PUT /api/settings/auto-stop - Store the auto-stop preference.
pub async fn set_auto_stop(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AutoStopRequest>,
) -> Result<Json<AutoStopRequest>> {
    let principal = principal(&headers)?;

    state
        .db
        .set_auto_stop_tracking(&principal, req.auto_stop_tracking)?;

    info!(
        principal = %principal,
        enabled = req.auto_stop_tracking,
        "Auto-stop tracking updated"
    );

    Ok(Json(req))
}

/// POST /api/blocklist - Add a domain to the caller's block list.
pub async fn add_block_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DomainRequest>,
) -> Result<Json<BlocklistUpdateResult>> {
    let principal = principal(&headers)?;

    if req.domain.trim().is_empty() {
        return Err(ApiError::BadRequest("domain is required".to_string()));
    }

    let result = state.db.add_block_entry(&principal, &req.domain)?;
    debug!(principal = %principal, success = result.success, "{}", result.message);

    Ok(Json(result))
}

/// DELETE /api/blocklist - Remove a domain from the caller's block list.
pub async fn remove_block_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DomainRequest>,
) -> Result<Json<BlocklistUpdateResult>> {
    let principal = principal(&headers)?;

    if req.domain.trim().is_empty() {
        return Err(ApiError::BadRequest("domain is required".to_string()));
    }

    let result = state.db.remove_block_entry(&principal, &req.domain)?;
    debug!(principal = %principal, success = result.success, "{}", result.message);

    Ok(Json(result))
}

/// GET /api/profile - Get the caller's profile (`null` if never saved).
pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Option<UserProfile>>> {
    let principal = principal(&headers)?;
    Ok(Json(state.db.get_user_profile(&principal)?))
}

/// PUT /api/profile - Save the caller's profile.
pub async fn save_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UserProfile>,
) -> Result<Json<UserProfile>> {
    let principal = principal(&headers)?;
    let saved = state.db.save_user_profile(&principal, &req)?;

    info!(principal = %principal, "Profile updated");
    Ok(Json(saved))
}
