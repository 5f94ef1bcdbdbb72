//! The signed-in user's display profile.
//!
//! A principal without a stored profile reads as `None`; the dashboard asks
//! for a name before anything else in that case.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::QueryCache;
use crate::coordinator::MutationOutcome;
use crate::notices::{Notice, NoticeBoard};
use crate::settings::{RemoteError, RemoteResult};

/// Cache key of the current user's profile.
pub const USER_PROFILE_KEY: &str = "current_user_profile";

/// Display profile of a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
}

impl UserProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Read/write access to the signed-in user's profile.
#[async_trait]
pub trait ProfileService: Send + Sync {
    /// Loads the profile, `None` if the user never saved one.
    async fn get_user_profile(&self) -> RemoteResult<Option<UserProfile>>;

    /// Stores the profile.
    async fn save_user_profile(&self, profile: &UserProfile) -> RemoteResult<()>;
}

/// Keeps a cached copy of the profile in step with the profile service.
pub struct ProfileManager<S: ?Sized = dyn ProfileService> {
    service: Arc<S>,
    cache: Arc<QueryCache<Option<UserProfile>>>,
    notices: NoticeBoard,
}

impl<S: ?Sized> Clone for ProfileManager<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache: Arc::clone(&self.cache),
            notices: self.notices.clone(),
        }
    }
}

impl<S: ProfileService + ?Sized> ProfileManager<S> {
    pub fn new(service: Arc<S>, notices: NoticeBoard) -> Self {
        Self {
            service,
            cache: Arc::new(QueryCache::new()),
            notices,
        }
    }

    /// Cached profile. `None` until loaded, `Some(None)` when there is none.
    pub fn profile(&self) -> Option<Option<UserProfile>> {
        self.cache.get(USER_PROFILE_KEY)
    }

    /// Whether the profile is loaded and the user still has to pick a name.
    pub fn needs_setup(&self) -> bool {
        matches!(self.profile(), Some(None))
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Loads the profile from the service into the cache.
    pub async fn refresh(&self) -> RemoteResult<Option<UserProfile>> {
        let ticket = self.cache.begin_fetch(USER_PROFILE_KEY);
        let profile = self.service.get_user_profile().await?;

        if !self.cache.complete_fetch(&ticket, profile.clone()) {
            debug!("Discarding superseded profile fetch");
        }

        Ok(profile)
    }

    /// Saves `name` (trimmed) as the user's display name, then re-reads the
    /// profile.
    pub async fn save(&self, name: &str) -> MutationOutcome<UserProfile> {
        let name = name.trim();
        if name.is_empty() {
            let error = RemoteError::Rejected("name must not be empty".into());
            self.notices
                .push(Notice::error(format!("Failed to save profile: {}", error)));
            return MutationOutcome::Failed {
                error,
                rolled_back: false,
            };
        }

        let profile = UserProfile::new(name);
        let pending = self
            .cache
            .begin_mutation(USER_PROFILE_KEY, |_| Some(profile.clone()));

        match self.service.save_user_profile(&profile).await {
            Ok(()) => {
                info!(name = %profile.name, "Profile saved");
                self.notices.push(Notice::success("Profile saved successfully"));

                let committed = self
                    .cache
                    .commit(&pending.ticket, |current| current.cloned());
                if let Err(e) = self.refresh().await {
                    warn!("Failed to reload profile after save: {}", e);
                }

                if committed {
                    MutationOutcome::Settled(profile)
                } else {
                    MutationOutcome::Superseded(profile)
                }
            }
            Err(error) => {
                warn!("Profile save failed: {}", error);

                let rolled_back = self.cache.rollback(&pending);
                self.notices
                    .push(Notice::error(format!("Failed to save profile: {}", error)));
                MutationOutcome::Failed { error, rolled_back }
            }
        }
    }
}
