//! Optimistic block list mutations.
//!
//! The settings service owns the user's privacy settings; the coordinator
//! keeps a local copy for display and applies changes to it before the
//! service confirms them.
//!
//! ## Protocol
//!
//! 1. Snapshot the cached settings.
//! 2. Publish the optimistic value (domain appended / filtered out).
//! 3. Call the settings service.
//! 4. On a response, adopt the service's `new_blocklist` and record its
//!    message as a success notice (`success == true`) or an info notice.
//! 5. On failure, restore the snapshot and record an error notice.
//!
//! Every mutation supersedes whatever was in flight for the settings record,
//! so a slow response can never overwrite a newer optimistic value. A
//! response that could not be adopted (superseded, or nothing was cached)
//! triggers a re-read instead, which lands once no mutation is pending.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{PendingMutation, QueryCache};
use crate::notices::{Notice, NoticeBoard};
use crate::settings::{
    BlocklistUpdateResult, PrivacySettings, RemoteError, RemoteResult, SettingsService,
};

/// Cache key of the privacy settings record.
pub const PRIVACY_SETTINGS_KEY: &str = "privacy_settings";

/// How a mutation settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome<T> {
    /// The service answered and the cache now reflects its answer.
    Settled(T),
    /// The service answered, but a newer mutation owns the cache.
    Superseded(T),
    /// The call failed. `rolled_back` is false when a newer mutation already
    /// owned the cache and the snapshot was left alone.
    Failed { error: RemoteError, rolled_back: bool },
}

impl<T> MutationOutcome<T> {
    /// The service's answer, if there was one.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Settled(value) | Self::Superseded(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&RemoteError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled(_))
    }
}

/// Reconciles local privacy settings with the settings service.
pub struct BlocklistCoordinator<S: ?Sized = dyn SettingsService> {
    service: Arc<S>,
    cache: Arc<QueryCache<PrivacySettings>>,
    notices: NoticeBoard,
}

impl<S: ?Sized> Clone for BlocklistCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache: Arc::clone(&self.cache),
            notices: self.notices.clone(),
        }
    }
}

impl<S: SettingsService + ?Sized> BlocklistCoordinator<S> {
    /// Creates a coordinator with an empty cache.
    pub fn new(service: Arc<S>) -> Self {
        Self::with_cache(service, Arc::new(QueryCache::new()), NoticeBoard::new())
    }

    /// Creates a coordinator sharing an existing cache and notice board.
    pub fn with_cache(
        service: Arc<S>,
        cache: Arc<QueryCache<PrivacySettings>>,
        notices: NoticeBoard,
    ) -> Self {
        Self {
            service,
            cache,
            notices,
        }
    }

    /// Cached settings, if loaded.
    pub fn settings(&self) -> Option<PrivacySettings> {
        self.cache.get(PRIVACY_SETTINGS_KEY)
    }

    /// Follows the published settings.
    pub fn subscribe(&self) -> watch::Receiver<Option<PrivacySettings>> {
        self.cache.subscribe(PRIVACY_SETTINGS_KEY)
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Loads the settings from the service into the cache.
    ///
    /// The fetched value is not stored if a mutation started meanwhile or
    /// one is still awaiting its response.
    pub async fn refresh(&self) -> RemoteResult<PrivacySettings> {
        let ticket = self.cache.begin_fetch(PRIVACY_SETTINGS_KEY);
        let settings = self.service.get_privacy_settings().await?;

        if !self.cache.complete_fetch(&ticket, settings.clone()) {
            debug!("Discarding superseded settings fetch");
        }

        Ok(settings)
    }

    /// Adds `domain` to the user's block list.
    pub async fn add_block_entry(&self, domain: &str) -> MutationOutcome<BlocklistUpdateResult> {
        let pending = self
            .cache
            .begin_mutation(PRIVACY_SETTINGS_KEY, |s| s.with_entry_added(domain));

        let response = self.service.add_block_entry(domain).await;
        self.settle_blocklist(pending, response, "add", domain).await
    }

    /// Removes `domain` from the user's block list.
    pub async fn remove_block_entry(
        &self,
        domain: &str,
    ) -> MutationOutcome<BlocklistUpdateResult> {
        let pending = self
            .cache
            .begin_mutation(PRIVACY_SETTINGS_KEY, |s| s.with_entry_removed(domain));

        let response = self.service.remove_block_entry(domain).await;
        self.settle_blocklist(pending, response, "remove", domain)
            .await
    }

    /// Stores the auto-stop preference, then re-reads the settings.
    pub async fn set_auto_stop_tracking(&self, enabled: bool) -> MutationOutcome<()> {
        let pending = self
            .cache
            .begin_mutation(PRIVACY_SETTINGS_KEY, |s| s.with_auto_stop(enabled));

        match self.service.set_auto_stop_tracking(enabled).await {
            Ok(()) => {
                info!(enabled, "Auto-stop tracking updated");

                let committed = self
                    .cache
                    .commit(&pending.ticket, |current| current.cloned());
                self.reload().await;

                if committed {
                    MutationOutcome::Settled(())
                } else {
                    MutationOutcome::Superseded(())
                }
            }
            Err(error) => {
                let rolled_back = self.cache.rollback(&pending);
                self.notices
                    .push(Notice::error(format!("Failed to update setting: {}", error)));
                MutationOutcome::Failed { error, rolled_back }
            }
        }
    }

    /// Re-reads the settings after a confirmed change. Errors are logged.
    async fn reload(&self) {
        if let Err(e) = self.refresh().await {
            warn!("Failed to reload settings after update: {}", e);
        }
    }

    async fn settle_blocklist(
        &self,
        pending: PendingMutation<PrivacySettings>,
        response: RemoteResult<BlocklistUpdateResult>,
        verb: &str,
        domain: &str,
    ) -> MutationOutcome<BlocklistUpdateResult> {
        match response {
            Ok(result) => {
                info!(
                    domain,
                    operation = verb,
                    success = result.success,
                    entries = result.new_blocklist.len(),
                    "Block list update confirmed"
                );

                self.notices.push(if result.success {
                    Notice::success(result.message.clone())
                } else {
                    Notice::info(result.message.clone())
                });

                let new_blocklist = result.new_blocklist.clone();
                let committed = self.cache.commit(&pending.ticket, |current| {
                    current.map(|settings| PrivacySettings {
                        block_list: new_blocklist,
                        auto_stop_tracking: settings.auto_stop_tracking,
                    })
                });

                if !committed {
                    debug!(domain, operation = verb, "Superseded response, reloading");
                    self.reload().await;
                    return MutationOutcome::Superseded(result);
                }

                if pending.previous.is_none() {
                    self.reload().await;
                }
                MutationOutcome::Settled(result)
            }
            Err(error) => {
                warn!(domain, operation = verb, "Block list update failed: {}", error);

                let rolled_back = self.cache.rollback(&pending);
                self.notices.push(Notice::error(format!(
                    "Failed to {} domain: {}",
                    verb, error
                )));

                MutationOutcome::Failed { error, rolled_back }
            }
        }
    }
}
