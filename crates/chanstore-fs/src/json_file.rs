use std::{
    fs::{self, File},
    io::{ErrorKind, Read, Write},
    path::Path,
};

use chanstore_core::storage::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

/// Read and decode a JSON document. A missing file is `Ok(None)`.
pub fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(path, err)),
    };

    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(|e| io_err(path, e))?;
    serde_json::from_slice(&buf)
        .map(Some)
        .map_err(|e| StorageError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Encode a document and atomically replace whatever is at `path`.
pub fn write_record<T: Serialize + ?Sized>(path: &Path, record: &T) -> Result<(), StorageError> {
    let json = serde_json::to_vec(record).map_err(|e| StorageError::Encode {
        reason: e.to_string(),
    })?;

    let parent = path.parent().ok_or_else(|| StorageError::Io {
        path: path.display().to_string(),
        reason: "invalid storage path".to_string(),
    })?;
    fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| io_err(parent, e))?;
    tmp.write_all(&json).map_err(|e| io_err(path, e))?;
    tmp.flush().map_err(|e| io_err(path, e))?;
    tmp.persist(path).map_err(|e| io_err(path, e.error))?;
    Ok(())
}

/// Remove a document. Already gone counts as removed.
pub fn delete_record(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}

pub(crate) fn io_err(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
