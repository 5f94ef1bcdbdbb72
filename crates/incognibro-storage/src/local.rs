//! Settings service backed directly by the local database.
//!
//! Used when the CLI runs with `--local` instead of talking to a settings
//! server. Behaves exactly like the server: the same normalization, the same
//! messages, the same soft failures.

use async_trait::async_trait;
use incognibro_core::profile::{ProfileService, UserProfile};
use incognibro_core::settings::{
    BlocklistUpdateResult, PrivacySettings, RemoteError, RemoteResult, SettingsService,
};

use crate::database::Database;
use crate::error::StorageError;

impl From<StorageError> for RemoteError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidDomain(_) | StorageError::InvalidProfile(_) => {
                RemoteError::Rejected(err.to_string())
            }
            other => RemoteError::Transport(other.to_string()),
        }
    }
}

/// A principal's settings and profile in a local database.
#[derive(Clone)]
pub struct LocalSettingsService {
    db: Database,
    principal: String,
}

impl LocalSettingsService {
    pub fn new(db: Database, principal: impl Into<String>) -> Self {
        Self {
            db,
            principal: principal.into(),
        }
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }
}

#[async_trait]
impl SettingsService for LocalSettingsService {
    async fn get_privacy_settings(&self) -> RemoteResult<PrivacySettings> {
        Ok(self.db.get_privacy_settings(&self.principal)?)
    }

    async fn set_auto_stop_tracking(&self, enabled: bool) -> RemoteResult<()> {
        Ok(self.db.set_auto_stop_tracking(&self.principal, enabled)?)
    }

    async fn add_block_entry(&self, domain: &str) -> RemoteResult<BlocklistUpdateResult> {
        Ok(self.db.add_block_entry(&self.principal, domain)?)
    }

    async fn remove_block_entry(&self, domain: &str) -> RemoteResult<BlocklistUpdateResult> {
        Ok(self.db.remove_block_entry(&self.principal, domain)?)
    }
}

#[async_trait]
impl ProfileService for LocalSettingsService {
    async fn get_user_profile(&self) -> RemoteResult<Option<UserProfile>> {
        Ok(self.db.get_user_profile(&self.principal)?)
    }

    async fn save_user_profile(&self, profile: &UserProfile) -> RemoteResult<()> {
        self.db.save_user_profile(&self.principal, profile)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use incognibro_core::coordinator::BlocklistCoordinator;
    use incognibro_core::notices::NoticeBoard;
    use incognibro_core::profile::ProfileManager;

    use super::*;

    fn service() -> LocalSettingsService {
        LocalSettingsService::new(Database::in_memory().unwrap(), "alice")
    }

    #[tokio::test]
    async fn test_add_and_read_back() {
        let service = service();

        let result = service.add_block_entry("Tracker.Example").await.unwrap();
        assert!(result.success);

        let settings = service.get_privacy_settings().await.unwrap();
        assert_eq!(settings.block_list, ["tracker.example"]);
    }

    #[test]
    fn test_invalid_domain_is_rejected() {
        let service = service();

        let err = tokio_test::block_on(service.add_block_entry("!!!")).unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_drives_coordinator() {
        let service = Arc::new(service());
        let coordinator = BlocklistCoordinator::new(Arc::clone(&service));
        coordinator.refresh().await.unwrap();

        assert!(coordinator.add_block_entry("a.com").await.is_settled());
        assert!(coordinator.set_auto_stop_tracking(false).await.is_settled());

        let cached = coordinator.settings().unwrap();
        assert_eq!(cached.block_list, ["a.com"]);
        assert!(!cached.auto_stop_tracking);
        assert_eq!(cached, service.get_privacy_settings().await.unwrap());
    }

    #[tokio::test]
    async fn test_profiles_are_per_principal() {
        let db = Database::in_memory().unwrap();
        let alice = Arc::new(LocalSettingsService::new(db.clone(), "alice"));
        let bob = LocalSettingsService::new(db, "bob");

        let profiles = ProfileManager::new(Arc::clone(&alice), NoticeBoard::new());
        profiles.refresh().await.unwrap();
        assert!(profiles.needs_setup());

        assert!(profiles.save("Alice").await.is_settled());
        assert_eq!(
            alice.get_user_profile().await.unwrap(),
            Some(UserProfile::new("Alice"))
        );
        assert_eq!(bob.get_user_profile().await.unwrap(), None);
    }

    #[test]
    fn test_blank_profile_is_rejected() {
        let service = service();
        let err = tokio_test::block_on(service.save_user_profile(&UserProfile::new("")))
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
    }

    #[test]
    fn test_storage_errors_map_to_remote_errors() {
        let err: RemoteError = StorageError::Config("no data dir".into()).into();
        assert_eq!(
            err,
            RemoteError::Transport("Configuration error: no data dir".into())
        );
    }
}
