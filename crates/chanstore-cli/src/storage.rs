use std::path::{Path, PathBuf};

use crate::config::Config;
use chanstore_fs::FileSystemStorageProvider;
use color_eyre::{eyre::eyre, Result};
use dirs::{config_dir, data_dir};
use tracing::debug;

const APP_DIR: &str = "chanstore";

/// Config file location: `--config`, then `<platform config dir>/chanstore/config.toml`.
pub fn config_path(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    let base = config_dir().ok_or_else(|| eyre!("no config dir available"))?;
    Ok(base.join(APP_DIR).join("config.toml"))
}

/// Storage directory: `--data-dir`, then `data_dir` from config, then the platform data dir.
pub fn resolve_data_dir(config: &Config, flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = flag.or(config.data_dir.as_deref()) {
        return Ok(root.to_path_buf());
    }
    let base = data_dir().ok_or_else(|| eyre!("no data dir available"))?;
    Ok(base.join(APP_DIR))
}

/// Build the file-backed provider for the resolved directory.
pub fn store_from_config(config: &Config, flag: Option<&Path>) -> Result<FileSystemStorageProvider> {
    let root = resolve_data_dir(config, flag)?;
    debug!(?root, "opening storage directory");
    Ok(FileSystemStorageProvider::new(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_dir(dir: &str) -> Config {
        Config {
            data_dir: Some(PathBuf::from(dir)),
            log_filter: None,
        }
    }

    #[test]
    fn config_flag_wins_over_platform_default() {
        let path = config_path(Some(Path::new("/etc/chanstore.toml"))).expect("resolve");
        assert_eq!(path, PathBuf::from("/etc/chanstore.toml"));
    }

    #[test]
    fn data_dir_flag_wins_over_config() {
        let root = resolve_data_dir(&config_with_dir("/from/config"), Some(Path::new("/from/flag")))
            .expect("resolve");
        assert_eq!(root, PathBuf::from("/from/flag"));
    }

    #[test]
    fn config_wins_over_default() {
        let store = store_from_config(&config_with_dir("/from/config"), None).expect("store");
        assert_eq!(store.root(), Path::new("/from/config"));
    }
}
