mod memory;
mod provider;
mod records;

pub use memory::InMemoryStorageProvider;
pub use provider::{StorageError, StorageProvider};
pub use records::{UserSettingsRecord, UserSettingsView};
