use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::records::UserSettingsView;

/// Errors produced by storage provider implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// No user settings record exists for the channel.
    #[error("no user settings for channel: {channel_label}")]
    NotFound { channel_label: String },
    /// A stored document could not be parsed.
    #[error("malformed document at {path}: {reason}")]
    Decode { path: String, reason: String },
    /// A payload could not be serialized.
    #[error("failed to encode document: {reason}")]
    Encode { reason: String },
    /// Underlying storage failure other than a missing record.
    #[error("storage failure at {path}: {reason}")]
    Io { path: String, reason: String },
    /// The key cannot be used to address a record.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },
}

/// Contract for auth token and per-channel user settings persistence.
///
/// Auth tokens are keyed by credentials key and overwritten on every store.
/// User settings are keyed by channel label and reference-counted: each
/// [`store_user_settings`](StorageProvider::store_user_settings) adds a
/// subscriber, each [`remove_user_settings`](StorageProvider::remove_user_settings)
/// drops one, and the record disappears with its last subscriber.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Persist tokens under a credentials key, replacing any existing value.
    async fn store_auth_tokens(
        &self,
        credentials_key: &str,
        tokens: &Value,
    ) -> Result<(), StorageError>;

    /// Tokens stored under a credentials key, or `None` if never stored.
    async fn get_auth_tokens_by_credentials_key(
        &self,
        credentials_key: &str,
    ) -> Result<Option<Value>, StorageError>;

    /// Tokens referenced by a channel's settings record.
    ///
    /// `None` when the channel has no settings, the settings carry no
    /// credentials key, or no tokens exist for that key.
    async fn get_auth_tokens_by_channel_label(
        &self,
        channel_label: &str,
    ) -> Result<Option<Value>, StorageError>;

    /// Subscribe to a channel's settings and return the new reference count.
    ///
    /// The first call creates the record from `user_settings` and
    /// `credentials_key`; later calls only bump the count and leave both
    /// values as first stored.
    async fn store_user_settings(
        &self,
        channel_label: &str,
        user_settings: &Value,
        credentials_key: &str,
    ) -> Result<u64, StorageError>;

    /// Unsubscribe from a channel's settings.
    ///
    /// Returns `None` if the channel had no record, otherwise the remaining
    /// count. At zero the record is deleted.
    async fn remove_user_settings(&self, channel_label: &str)
        -> Result<Option<u64>, StorageError>;

    /// Composed view of a channel's settings; fails with
    /// [`StorageError::NotFound`] when the channel has no record.
    async fn get_user_settings(&self, channel_label: &str)
        -> Result<UserSettingsView, StorageError>;

    /// Views for every stored channel. Any failure aborts the whole listing.
    async fn get_all_user_settings(&self) -> Result<Vec<UserSettingsView>, StorageError>;
}
