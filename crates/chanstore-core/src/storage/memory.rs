use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{
    provider::{StorageError, StorageProvider},
    records::{UserSettingsRecord, UserSettingsView},
};

#[derive(Debug, Default)]
struct Tables {
    auth: HashMap<String, Value>,
    user_settings: HashMap<String, UserSettingsRecord>,
}

/// In-memory provider for tests and smoke runs.
/// Nothing survives the process; use the file provider for real storage.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorageProvider {
    inner: Arc<Mutex<Tables>>,
}

impl InMemoryStorageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.inner.lock().map_err(|err| StorageError::Io {
            path: "memory".to_string(),
            reason: format!("lock poisoned: {err}"),
        })
    }
}

fn compose(tables: &Tables, channel_label: &str) -> Result<UserSettingsView, StorageError> {
    let record = tables
        .user_settings
        .get(channel_label)
        .cloned()
        .ok_or_else(|| StorageError::NotFound {
            channel_label: channel_label.to_string(),
        })?;
    let auth_tokens = record
        .credentials_key()
        .and_then(|key| tables.auth.get(key))
        .cloned();
    Ok(record.into_view(channel_label, auth_tokens))
}

#[async_trait]
impl StorageProvider for InMemoryStorageProvider {
    async fn store_auth_tokens(
        &self,
        credentials_key: &str,
        tokens: &Value,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables()?;
        tables
            .auth
            .insert(credentials_key.to_string(), tokens.clone());
        Ok(())
    }

    async fn get_auth_tokens_by_credentials_key(
        &self,
        credentials_key: &str,
    ) -> Result<Option<Value>, StorageError> {
        let tables = self.tables()?;
        Ok(tables.auth.get(credentials_key).cloned())
    }

    async fn get_auth_tokens_by_channel_label(
        &self,
        channel_label: &str,
    ) -> Result<Option<Value>, StorageError> {
        let tables = self.tables()?;
        Ok(tables
            .user_settings
            .get(channel_label)
            .and_then(UserSettingsRecord::credentials_key)
            .and_then(|key| tables.auth.get(key))
            .cloned())
    }

    async fn store_user_settings(
        &self,
        channel_label: &str,
        user_settings: &Value,
        credentials_key: &str,
    ) -> Result<u64, StorageError> {
        let mut tables = self.tables()?;
        let record = tables
            .user_settings
            .entry(channel_label.to_string())
            .or_insert_with(|| UserSettingsRecord::new(user_settings.clone(), credentials_key));
        Ok(record.subscribe())
    }

    async fn remove_user_settings(
        &self,
        channel_label: &str,
    ) -> Result<Option<u64>, StorageError> {
        let mut tables = self.tables()?;
        let Some(record) = tables.user_settings.get_mut(channel_label) else {
            return Ok(None);
        };

        let remaining = record.unsubscribe();
        if record.is_released() {
            tables.user_settings.remove(channel_label);
            debug!(channel_label, "released user settings");
        }
        Ok(Some(remaining))
    }

    async fn get_user_settings(
        &self,
        channel_label: &str,
    ) -> Result<UserSettingsView, StorageError> {
        let tables = self.tables()?;
        compose(&tables, channel_label)
    }

    async fn get_all_user_settings(&self) -> Result<Vec<UserSettingsView>, StorageError> {
        let tables = self.tables()?;
        tables
            .user_settings
            .keys()
            .map(|label| compose(&tables, label))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn auth_tokens_overwrite_and_resolve_through_channel() {
        let store = InMemoryStorageProvider::new();
        store
            .store_auth_tokens("cred", &json!({"token": "old"}))
            .await
            .expect("store auth");
        store
            .store_auth_tokens("cred", &json!({"token": "new"}))
            .await
            .expect("overwrite auth");
        store
            .store_user_settings("ch", &json!({}), "cred")
            .await
            .expect("store settings");

        let by_label = store
            .get_auth_tokens_by_channel_label("ch")
            .await
            .expect("lookup");
        assert_eq!(by_label, Some(json!({"token": "new"})));
        assert_eq!(
            store
                .get_auth_tokens_by_channel_label("missing")
                .await
                .expect("lookup missing"),
            None
        );
    }

    #[tokio::test]
    async fn last_unsubscribe_removes_record() {
        let store = InMemoryStorageProvider::new();
        assert_eq!(
            store
                .store_user_settings("ch", &json!({"v": 1}), "a")
                .await
                .expect("first"),
            1
        );
        assert_eq!(
            store
                .store_user_settings("ch", &json!({"v": 2}), "b")
                .await
                .expect("second"),
            2
        );

        let view = store.get_user_settings("ch").await.expect("view");
        assert_eq!(view.user_settings, json!({"v": 1}));

        assert_eq!(store.remove_user_settings("ch").await.expect("rm"), Some(1));
        assert_eq!(store.remove_user_settings("ch").await.expect("rm"), Some(0));
        assert_eq!(store.remove_user_settings("ch").await.expect("rm"), None);

        let err = store
            .get_user_settings("ch")
            .await
            .expect_err("record should be gone");
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn lists_every_channel() {
        let store = InMemoryStorageProvider::new();
        for label in ["a", "b"] {
            store
                .store_user_settings(label, &json!(null), "k")
                .await
                .expect("store");
        }

        let labels: BTreeSet<String> = store
            .get_all_user_settings()
            .await
            .expect("list")
            .into_iter()
            .map(|view| view.channel_label)
            .collect();
        assert_eq!(labels, BTreeSet::from(["a".to_string(), "b".to_string()]));
    }
}
