use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted user settings for one channel, shared by `count` subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingsRecord {
    /// Number of subscribers referencing this record.
    pub count: u64,
    /// Opaque settings payload, fixed at creation.
    #[serde(default)]
    pub user_settings: Value,
    /// Auth record this channel authenticates with, fixed at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_key: Option<String>,
}

impl UserSettingsRecord {
    /// Fresh record with no subscribers yet.
    pub fn new(user_settings: Value, credentials_key: impl Into<String>) -> Self {
        Self {
            count: 0,
            user_settings,
            credentials_key: Some(credentials_key.into()),
        }
    }

    /// Add a subscriber and return the new count.
    pub fn subscribe(&mut self) -> u64 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// Drop a subscriber and return the remaining count. Never goes below zero.
    pub fn unsubscribe(&mut self) -> u64 {
        self.count = self.count.saturating_sub(1);
        self.count
    }

    /// True once the last subscriber is gone and the record should be deleted.
    pub fn is_released(&self) -> bool {
        self.count == 0
    }

    /// The referenced credentials key, treating an empty string as absent.
    pub fn credentials_key(&self) -> Option<&str> {
        self.credentials_key.as_deref().filter(|key| !key.is_empty())
    }

    pub fn into_view(
        self,
        channel_label: impl Into<String>,
        auth_tokens: Option<Value>,
    ) -> UserSettingsView {
        UserSettingsView {
            channel_label: channel_label.into(),
            user_settings: self.user_settings,
            auth_tokens,
        }
    }
}

/// Channel settings joined with the auth tokens they reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingsView {
    pub channel_label: String,
    pub user_settings: Value,
    /// `None` when no tokens are stored for the record's credentials key.
    pub auth_tokens: Option<Value>,
}
