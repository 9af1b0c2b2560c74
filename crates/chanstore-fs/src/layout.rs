use std::path::{Path, PathBuf};

use chanstore_core::storage::StorageError;

pub const AUTH_SUFFIX: &str = ".auth.json";
pub const USER_SETTINGS_SUFFIX: &str = ".userSettings.json";

/// Path of the auth document for a credentials key.
pub fn auth_path(root: &Path, credentials_key: &str) -> Result<PathBuf, StorageError> {
    record_path(root, credentials_key, AUTH_SUFFIX)
}

/// Path of the settings document for a channel label.
pub fn user_settings_path(root: &Path, channel_label: &str) -> Result<PathBuf, StorageError> {
    record_path(root, channel_label, USER_SETTINGS_SUFFIX)
}

/// Channel label encoded in a settings file name, if the name is one.
pub fn channel_label_from_file_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(USER_SETTINGS_SUFFIX)
        .filter(|label| validate_key(label).is_ok())
}

/// Keys become file name stems, so they must stay inside the storage directory.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.contains(['/', '\\']) {
        "key contains a path separator"
    } else if key.contains('\0') {
        "key contains a NUL byte"
    } else {
        return Ok(());
    };

    Err(StorageError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

fn record_path(root: &Path, key: &str, suffix: &str) -> Result<PathBuf, StorageError> {
    validate_key(key)?;
    Ok(root.join(format!("{key}{suffix}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_paths_with_suffixes() {
        let root = Path::new("/data");
        assert_eq!(
            auth_path(root, "cred1").expect("auth path"),
            PathBuf::from("/data/cred1.auth.json")
        );
        assert_eq!(
            user_settings_path(root, "ch1").expect("settings path"),
            PathBuf::from("/data/ch1.userSettings.json")
        );
    }

    #[test]
    fn rejects_keys_that_escape_the_directory() {
        for key in ["", "../etc/passwd", "a\\b", "nul\0byte"] {
            let err = auth_path(Path::new("/data"), key).expect_err("should reject");
            assert!(matches!(err, StorageError::InvalidKey { .. }), "{key:?}");
        }
    }

    #[test]
    fn dotted_keys_are_allowed() {
        assert!(validate_key("team.alpha").is_ok());
        assert!(validate_key("..").is_ok());
    }

    #[test]
    fn extracts_channel_label_from_settings_files_only() {
        assert_eq!(
            channel_label_from_file_name("ch1.userSettings.json"),
            Some("ch1")
        );
        assert_eq!(
            channel_label_from_file_name("a.b.userSettings.json"),
            Some("a.b")
        );
        assert_eq!(channel_label_from_file_name("cred1.auth.json"), None);
        assert_eq!(channel_label_from_file_name(".userSettings.json"), None);
        assert_eq!(channel_label_from_file_name("ch1.usersettings.json"), None);
    }
}
