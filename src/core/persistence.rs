//! Durable key-value storage for the conversation and the theme flag.
//!
//! Backends only provide raw string slots. The typed operations on
//! [`PersistenceAdapter`] handle JSON encoding and degrade any missing or
//! malformed value to its default instead of returning an error.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::message::Message;

pub const CONVERSATION_KEY: &str = "chat_messages";
pub const THEME_KEY: &str = "dark_mode";

#[derive(Debug)]
pub enum PersistenceError {
    /// Writing or removing a key on disk failed.
    Io { key: String, source: io::Error },

    /// A value could not be encoded as JSON.
    Encode {
        key: String,
        source: serde_json::Error,
    },

    /// The backing store is unusable (for example a poisoned lock).
    Unavailable(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Io { key, source } => {
                write!(f, "Failed to store '{key}': {source}")
            }
            PersistenceError::Encode { key, source } => {
                write!(f, "Failed to encode '{key}': {source}")
            }
            PersistenceError::Unavailable(reason) => write!(f, "Storage unavailable: {reason}"),
        }
    }
}

impl StdError for PersistenceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            PersistenceError::Io { source, .. } => Some(source),
            PersistenceError::Encode { source, .. } => Some(source),
            PersistenceError::Unavailable(_) => None,
        }
    }
}

pub trait PersistenceAdapter: Send + Sync {
    /// Raw stored value, or `None` when the key is absent or unreadable.
    fn read(&self, key: &str) -> Option<String>;

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;

    fn load_conversation(&self) -> Vec<Message> {
        let Some(raw) = self.read(CONVERSATION_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) => messages,
            Err(err) => {
                debug!(error = %err, "Ignoring malformed stored conversation");
                Vec::new()
            }
        }
    }

    fn save_conversation(&self, messages: &[Message]) -> Result<(), PersistenceError> {
        let encoded =
            serde_json::to_string(messages).map_err(|source| PersistenceError::Encode {
                key: CONVERSATION_KEY.to_string(),
                source,
            })?;
        self.write(CONVERSATION_KEY, &encoded)
    }

    fn clear_conversation(&self) -> Result<(), PersistenceError> {
        self.remove(CONVERSATION_KEY)
    }

    fn load_theme(&self) -> bool {
        self.read(THEME_KEY)
            .and_then(|raw| serde_json::from_str::<bool>(&raw).ok())
            .unwrap_or(false)
    }

    fn save_theme(&self, dark: bool) -> Result<(), PersistenceError> {
        self.write(THEME_KEY, if dark { "true" } else { "false" })
    }
}

/// Stores each key as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn write_atomic(&self, path: &Path, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut temp_file = NamedTempFile::new_in(&self.dir)?;
        temp_file.write_all(value.as_bytes())?;
        temp_file.as_file_mut().sync_all()?;
        temp_file.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl PersistenceAdapter for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read stored value");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.write_atomic(&self.key_path(key), value)
            .map_err(|source| PersistenceError::Io {
                key: key.to_string(),
                source,
            })
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistenceError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl PersistenceAdapter for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| PersistenceError::Unavailable(err.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| PersistenceError::Unavailable(err.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
