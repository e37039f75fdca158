//! Subscription persistence
//!
//! The whole `userId → SubscriptionRecord` mapping is stored and loaded as a
//! unit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::premium::SubscriptionRecord;

/// Storage key for the subscription mapping.
pub const STORE_KEY: &str = "minigram_premium_users";

pub type SubscriptionMap = HashMap<String, SubscriptionRecord>;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Loads the full mapping. An absent store is an empty mapping.
    async fn load_all(&self) -> Result<SubscriptionMap>;

    /// Replaces the stored mapping.
    async fn save_all(&self, records: &SubscriptionMap) -> Result<()>;
}

// == JSON File Repository ==
/// Keeps the mapping as one JSON object in a file.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/minigram_premium_users.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", STORE_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SubscriptionRepository for JsonFileRepository {
    async fn load_all(&self) -> Result<SubscriptionMap> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let records: SubscriptionMap = serde_json::from_slice(&bytes)?;
                debug!(path = %self.path.display(), count = records.len(), "Loaded subscriptions");
                Ok(records)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(SubscriptionMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_all(&self, records: &SubscriptionMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so a crash never leaves a truncated store
        let bytes = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), count = records.len(), "Saved subscriptions");
        Ok(())
    }
}

// == In-Memory Repository ==
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    records: Mutex<SubscriptionMap>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: SubscriptionMap) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryRepository {
    async fn load_all(&self) -> Result<SubscriptionMap> {
        Ok(self.records.lock().await.clone())
    }

    async fn save_all(&self, records: &SubscriptionMap) -> Result<()> {
        *self.records.lock().await = records.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::payment::PaymentResult;
    use crate::premium::{Plan, User};
    use chrono::{Duration, Utc};

    fn sample_map() -> SubscriptionMap {
        let now = Utc::now();
        let user = User {
            id: "1".to_string(),
            email: "user@example.com".to_string(),
            name: "Test User".to_string(),
        };
        let payment = PaymentResult {
            success: true,
            payment_id: "pay_1".to_string(),
            amount: 9999,
            currency: "USD".to_string(),
            plan: Plan::Yearly,
            subscription_end: now + Duration::days(365),
        };
        let mut map = SubscriptionMap::new();
        map.insert(
            "1".to_string(),
            SubscriptionRecord::activate(&user, &payment, now, payment.subscription_end),
        );
        map
    }

    #[tokio::test]
    async fn test_json_file_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::in_dir(dir.path());

        assert!(repo.load_all().await.unwrap().is_empty());
        assert!(repo.path().ends_with("minigram_premium_users.json"));
    }

    #[tokio::test]
    async fn test_json_file_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::in_dir(dir.path().join("nested"));
        let map = sample_map();

        repo.save_all(&map).await.unwrap();

        let reopened = JsonFileRepository::in_dir(dir.path().join("nested"));
        assert_eq!(reopened.load_all().await.unwrap(), map);
    }

    #[tokio::test]
    async fn test_json_file_is_keyed_by_user_id() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::in_dir(dir.path());
        repo.save_all(&sample_map()).await.unwrap();

        let raw = std::fs::read_to_string(repo.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["1"]["userId"], "1");
        assert_eq!(json["1"]["plan"], "yearly");
    }

    #[tokio::test]
    async fn test_json_file_corrupt_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::in_dir(dir.path());
        std::fs::write(repo.path(), b"{not json").unwrap();

        assert!(matches!(repo.load_all().await, Err(AppError::Storage(_))));
    }

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let repo = InMemoryRepository::new();
        assert!(repo.load_all().await.unwrap().is_empty());

        let map = sample_map();
        repo.save_all(&map).await.unwrap();
        assert_eq!(repo.load_all().await.unwrap(), map);
    }
}
