//! Directory-backed storage provider: one JSON document per record.
//! Auth tokens live in `<credentialsKey>.auth.json`, channel settings in
//! `<channelLabel>.userSettings.json`.

pub mod fs_provider;
pub mod json_file;
pub mod layout;

pub use fs_provider::FileSystemStorageProvider;
