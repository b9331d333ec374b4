//! File-backed session persistence.
//!
//! A [`SessionStore`] pairs a [`SessionStorage`] strategy, which decides where
//! the bytes of a session live, with a [`SessionSerializer`], which decides
//! what those bytes look like. The shipped combination is [`FileStorage`] with
//! [`YamlSerializer`]: one human-readable `.yml` file per session.
//!
//! Session files are plain text and are not encrypted.

pub mod file;
pub mod yaml;

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub use file::FileStorage;
pub use yaml::YamlSerializer;

/// Errors from session storage and encoding.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session id '{0}'")]
    InvalidId(String),
    #[error("session '{0}' not found")]
    NotFound(String),
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The key/value data of one client session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionRecord {
    data: BTreeMap<String, Value>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Set a value, returning the previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl FromIterator<(String, Value)> for SessionRecord {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

/// Where session bytes are kept
pub trait SessionStorage {
    fn write(&self, id: &str, bytes: &[u8]) -> Result<(), SessionError>;

    /// Read a stored session; a missing session is [`SessionError::NotFound`]
    fn read(&self, id: &str) -> Result<Vec<u8>, SessionError>;

    fn exists(&self, id: &str) -> Result<bool, SessionError>;

    /// Remove a stored session; removing a missing session succeeds
    fn delete(&self, id: &str) -> Result<(), SessionError>;
}

/// Encoding of a session record to and from a byte stream
pub trait SessionSerializer {
    /// Short name of the format, used in logs
    fn format(&self) -> &'static str;

    fn serialize(&self, stream: &mut dyn Write, data: &SessionRecord) -> Result<(), SessionError>;

    fn deserialize(&self, stream: &mut dyn Read) -> Result<SessionRecord, SessionError>;
}

/// Session persistence built from a storage strategy and a serializer
pub struct SessionStore<S, F> {
    storage: S,
    serializer: F,
}

impl<S: SessionStorage, F: SessionSerializer> SessionStore<S, F> {
    pub fn new(storage: S, serializer: F) -> Self {
        Self {
            storage,
            serializer,
        }
    }

    /// Serialize `record` and store it under `id`, replacing any previous content
    pub fn save(&self, id: &str, record: &SessionRecord) -> Result<(), SessionError> {
        let mut buf = Vec::new();
        self.serializer.serialize(&mut buf, record)?;
        self.storage.write(id, &buf)?;
        debug!(session = %id, format = self.serializer.format(), bytes = buf.len(), "session saved");
        Ok(())
    }

    /// Load the record stored under `id`, or `None` if there is none
    pub fn load(&self, id: &str) -> Result<Option<SessionRecord>, SessionError> {
        let bytes = match self.storage.read(id) {
            Ok(bytes) => bytes,
            Err(SessionError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let record = self.serializer.deserialize(&mut bytes.as_slice())?;
        debug!(session = %id, keys = record.len(), "session loaded");
        Ok(Some(record))
    }

    pub fn exists(&self, id: &str) -> Result<bool, SessionError> {
        self.storage.exists(id)
    }

    pub fn delete(&self, id: &str) -> Result<(), SessionError> {
        self.storage.delete(id)?;
        debug!(session = %id, "session deleted");
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn serializer(&self) -> &F {
        &self.serializer
    }
}
