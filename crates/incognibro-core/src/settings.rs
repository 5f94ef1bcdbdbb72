//! Privacy settings model and the remote settings seam.
//!
//! The settings record is owned by a settings service (the HTTP API in
//! production, the local database in `--local` mode). The core only talks to
//! it through [`SettingsService`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-user privacy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacySettings {
    /// Custom blocked domains, in insertion order.
    #[serde(default)]
    pub block_list: Vec<String>,
    /// Whether detected trackers count as blocked.
    #[serde(default = "default_auto_stop")]
    pub auto_stop_tracking: bool,
}

fn default_auto_stop() -> bool {
    true
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            block_list: Vec::new(),
            auto_stop_tracking: default_auto_stop(),
        }
    }
}

impl PrivacySettings {
    /// Returns a copy with `domain` appended to the block list.
    pub fn with_entry_added(&self, domain: &str) -> Self {
        let mut next = self.clone();
        next.block_list.push(domain.to_string());
        next
    }

    /// Returns a copy with every occurrence of `domain` removed.
    pub fn with_entry_removed(&self, domain: &str) -> Self {
        let mut next = self.clone();
        next.block_list.retain(|d| d != domain);
        next
    }

    /// Returns a copy with the auto-stop flag replaced.
    pub fn with_auto_stop(&self, enabled: bool) -> Self {
        Self {
            block_list: self.block_list.clone(),
            auto_stop_tracking: enabled,
        }
    }
}

/// Outcome of a block list mutation as decided by the settings service.
///
/// `success == false` means the service treated the request as a no-op
/// (duplicate add, unknown remove). It is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocklistUpdateResult {
    /// The authoritative block list after the operation.
    pub new_blocklist: Vec<String>,
    pub message: String,
    pub success: bool,
}

impl BlocklistUpdateResult {
    pub fn applied(new_blocklist: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            new_blocklist,
            message: message.into(),
            success: true,
        }
    }

    pub fn unchanged(new_blocklist: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            new_blocklist,
            message: message.into(),
            success: false,
        }
    }
}

/// Failure talking to the settings service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never got a usable response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with an error.
    #[error("rejected by settings service: {0}")]
    Rejected(String),

    /// The caller is not signed in.
    #[error("not authenticated")]
    Unauthenticated,

    /// The service is not reachable or not configured.
    #[error("settings service unavailable")]
    Unavailable,
}

/// Result type for settings service calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Read/write access to the signed-in user's privacy settings.
#[async_trait]
pub trait SettingsService: Send + Sync {
    /// Loads the current settings.
    async fn get_privacy_settings(&self) -> RemoteResult<PrivacySettings>;

    /// Stores the auto-stop preference.
    async fn set_auto_stop_tracking(&self, enabled: bool) -> RemoteResult<()>;

    /// Adds `domain` to the user's block list.
    async fn add_block_entry(&self, domain: &str) -> RemoteResult<BlocklistUpdateResult>;

    /// Removes `domain` from the user's block list.
    async fn remove_block_entry(&self, domain: &str) -> RemoteResult<BlocklistUpdateResult>;
}
