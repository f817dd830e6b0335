use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionState;

const HISTORY_MARKER: &str = "\n=== HISTORY ===\n";
const SESSION_EXTENSION: &str = "session";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML header: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("failed to encode TOML header: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("failed to parse history line {line}: {source}")]
    JsonDecode {
        line: usize,
        source: serde_json::Error,
    },
    #[error("failed to encode history snapshot: {0}")]
    JsonEncode(serde_json::Error),
    #[error("no saved session with name {0}")]
    NotFound(String),
    #[error("invalid session name: {0:?}")]
    InvalidName(String),
}

/// Named-blob persistence for session snapshots.
pub trait SessionStore {
    /// Rejects names this store could never save under.
    fn check_name(&self, _name: &str) -> Result<(), StorageError> {
        Ok(())
    }
    fn exists(&self, name: &str) -> bool;
    fn save(&self, name: &str, state: &SessionState) -> Result<(), StorageError>;
    fn load(&self, name: &str) -> Result<SessionState, StorageError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionHeader {
    schema_version: u32,
    name: String,
    history_pos: usize,
    base_date: NaiveDate,
    saved_at: DateTime<Utc>,
}

/// Stores each session as `<root>/<name>.session`: a TOML header, a marker
/// line, then one JSON line per history snapshot.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.root.join(format!("{name}.{SESSION_EXTENSION}")))
    }
}

impl SessionStore for FileStore {
    fn check_name(&self, name: &str) -> Result<(), StorageError> {
        validate_name(name)
    }

    fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|path| path.is_file()).unwrap_or(false)
    }

    fn save(&self, name: &str, state: &SessionState) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root)?;

        let header = SessionHeader {
            schema_version: SCHEMA_VERSION,
            name: state.name.clone(),
            history_pos: state.history_pos,
            base_date: state.base_date,
            saved_at: Utc::now(),
        };
        let mut blob = toml::to_string_pretty(&header)?;
        blob.push_str(HISTORY_MARKER);
        for snapshot in &state.edit_history {
            blob.push_str(&serde_json::to_string(snapshot).map_err(StorageError::JsonEncode)?);
            blob.push('\n');
        }

        // A failed save leaves the previous file in place.
        let staging = path.with_extension(format!("{SESSION_EXTENSION}.tmp"));
        let mut file = fs::File::create(&staging)?;
        file.write_all(blob.as_bytes())?;
        file.sync_all()?;
        fs::rename(&staging, &path)?;

        debug!(
            "wrote {} snapshots to {}",
            state.edit_history.len(),
            path.display()
        );
        Ok(())
    }

    fn load(&self, name: &str) -> Result<SessionState, StorageError> {
        let path = self.path_for(name)?;
        let raw = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()));
            }
            Err(err) => return Err(StorageError::Io(err)),
        };

        let (header_blob, history_blob) = raw
            .split_once(HISTORY_MARKER)
            .unwrap_or((raw.as_str(), ""));
        let header: SessionHeader = toml::from_str(header_blob)?;

        let mut edit_history = Vec::new();
        for (index, line) in history_blob.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let snapshot = serde_json::from_str(line).map_err(|source| StorageError::JsonDecode {
                line: index + 1,
                source,
            })?;
            edit_history.push(snapshot);
        }

        debug!(
            "read {} snapshots from {} (schema {})",
            edit_history.len(),
            path.display(),
            header.schema_version
        );
        Ok(SessionState {
            name: header.name,
            edit_history,
            history_pos: header.history_pos,
            base_date: header.base_date,
        })
    }
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if invalid {
        Err(StorageError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}
