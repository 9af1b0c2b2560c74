use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chanstore_core::storage::{
    StorageError, StorageProvider, UserSettingsRecord, UserSettingsView,
};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::{
    json_file::{delete_record, io_err, read_record, write_record},
    layout::{auth_path, channel_label_from_file_name, user_settings_path},
};

/// Storage provider keeping every record as a JSON file in one directory.
///
/// The directory is the only source of truth: nothing is cached between
/// calls. Subscribe and unsubscribe on the same channel are serialized
/// within this process so the reference count never loses an update.
pub struct FileSystemStorageProvider {
    root: PathBuf,
    /// Per-channel locks guarding the settings read-modify-write. An entry
    /// lives while its channel has a record or a call in flight.
    channel_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileSystemStorageProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            channel_locks: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn channel_lock(&self, channel_label: &str) -> Arc<Mutex<()>> {
        self.channel_locks
            .entry(channel_label.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget a channel's lock once no other call holds or awaits it.
    /// Must run while `lock` is still held so the count check cannot race.
    fn release_channel_lock(&self, channel_label: &str, lock: &Arc<Mutex<()>>) {
        self.channel_locks.remove_if(channel_label, |_, held| {
            Arc::ptr_eq(held, lock) && Arc::strong_count(held) == 2
        });
    }

    fn read_auth(&self, credentials_key: &str) -> Result<Option<Value>, StorageError> {
        read_record(&auth_path(&self.root, credentials_key)?)
    }

    fn read_settings(&self, channel_label: &str) -> Result<Option<UserSettingsRecord>, StorageError> {
        read_record(&user_settings_path(&self.root, channel_label)?)
    }

    /// Settings joined with their tokens; `None` if the channel has no record.
    fn load_view(&self, channel_label: &str) -> Result<Option<UserSettingsView>, StorageError> {
        let Some(record) = self.read_settings(channel_label)? else {
            return Ok(None);
        };
        let auth_tokens = match record.credentials_key() {
            Some(key) => self.read_auth(key)?,
            None => None,
        };
        Ok(Some(record.into_view(channel_label, auth_tokens)))
    }

    /// Channel labels of every settings document, in directory order.
    fn list_channel_labels(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_err(&self.root, err)),
        };

        let mut labels = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.root, e))?;
            let Ok(file_name) = entry.file_name().into_string() else {
                continue;
            };
            let Some(label) = channel_label_from_file_name(&file_name) else {
                continue;
            };
            // Follows symlinks: only names resolving to regular files count.
            let path = entry.path();
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => labels.push(label.to_string()),
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(io_err(&path, err)),
            }
        }
        Ok(labels)
    }

    /// Compose views for listed labels, skipping ones unsubscribed since the listing.
    fn compose_views(&self, labels: Vec<String>) -> Result<Vec<UserSettingsView>, StorageError> {
        let mut views = Vec::with_capacity(labels.len());
        for label in labels {
            match self.load_view(&label)? {
                Some(view) => views.push(view),
                None => debug!(channel_label = %label, "record vanished during listing"),
            }
        }
        Ok(views)
    }

    /// Decrement and persist or delete. Caller holds the channel lock.
    fn unsubscribe_locked(&self, path: &Path) -> Result<Option<u64>, StorageError> {
        let Some(mut record) = read_record::<UserSettingsRecord>(path)? else {
            return Ok(None);
        };
        let remaining = record.unsubscribe();
        if record.is_released() {
            debug!("last subscriber gone, deleting user settings record");
            delete_record(path)?;
        } else {
            write_record(path, &record)?;
        }
        Ok(Some(remaining))
    }
}

#[async_trait]
impl StorageProvider for FileSystemStorageProvider {
    #[instrument(skip_all, fields(credentials_key = %credentials_key))]
    async fn store_auth_tokens(
        &self,
        credentials_key: &str,
        tokens: &Value,
    ) -> Result<(), StorageError> {
        let path = auth_path(&self.root, credentials_key)?;
        write_record(&path, tokens)
    }

    #[instrument(skip_all, fields(credentials_key = %credentials_key))]
    async fn get_auth_tokens_by_credentials_key(
        &self,
        credentials_key: &str,
    ) -> Result<Option<Value>, StorageError> {
        self.read_auth(credentials_key)
    }

    #[instrument(skip_all, fields(channel_label = %channel_label))]
    async fn get_auth_tokens_by_channel_label(
        &self,
        channel_label: &str,
    ) -> Result<Option<Value>, StorageError> {
        let record = self.read_settings(channel_label)?;
        match record.as_ref().and_then(UserSettingsRecord::credentials_key) {
            Some(key) => self.read_auth(key),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(channel_label = %channel_label))]
    async fn store_user_settings(
        &self,
        channel_label: &str,
        user_settings: &Value,
        credentials_key: &str,
    ) -> Result<u64, StorageError> {
        let path = user_settings_path(&self.root, channel_label)?;
        let lock = self.channel_lock(channel_label);
        let _guard = lock.lock().await;

        let mut record = match read_record::<UserSettingsRecord>(&path)? {
            Some(existing) => existing,
            None => {
                debug!("creating user settings record");
                UserSettingsRecord::new(user_settings.clone(), credentials_key)
            }
        };
        let count = record.subscribe();
        write_record(&path, &record)?;
        Ok(count)
    }

    #[instrument(skip_all, fields(channel_label = %channel_label))]
    async fn remove_user_settings(
        &self,
        channel_label: &str,
    ) -> Result<Option<u64>, StorageError> {
        let path = user_settings_path(&self.root, channel_label)?;
        let lock = self.channel_lock(channel_label);
        let _guard = lock.lock().await;

        let result = self.unsubscribe_locked(&path);
        if matches!(result, Ok(None) | Ok(Some(0))) {
            self.release_channel_lock(channel_label, &lock);
        }
        result
    }

    #[instrument(skip_all, fields(channel_label = %channel_label))]
    async fn get_user_settings(
        &self,
        channel_label: &str,
    ) -> Result<UserSettingsView, StorageError> {
        self.load_view(channel_label)?
            .ok_or_else(|| StorageError::NotFound {
                channel_label: channel_label.to_string(),
            })
    }

    #[instrument(skip_all)]
    async fn get_all_user_settings(&self) -> Result<Vec<UserSettingsView>, StorageError> {
        let labels = self.list_channel_labels()?;
        self.compose_views(labels)
    }
}
