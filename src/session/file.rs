use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{SessionError, SessionStorage};
use crate::config::SessionConfig;

/// Stores each session in its own file: `<dir>/<prefix><id><suffix>`
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    prefix: String,
    suffix: String,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.dir, &config.prefix, &config.suffix)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a session id
    pub fn path_for(&self, id: &str) -> Result<PathBuf, SessionError> {
        validate_id(id)?;
        Ok(self
            .dir
            .join(format!("{}{}{}", self.prefix, id, self.suffix)))
    }

    /// Ids of all sessions in the directory, sorted
    pub fn list_ids(&self) -> Result<Vec<String>, SessionError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let id = file_name
                .strip_prefix(self.prefix.as_str())
                .and_then(|rest| rest.strip_suffix(self.suffix.as_str()));
            if let Some(id) = id {
                if validate_id(id).is_ok() {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl SessionStorage for FileStorage {
    fn write(&self, id: &str, bytes: &[u8]) -> Result<(), SessionError> {
        let path = self.path_for(id)?;
        fs::create_dir_all(&self.dir)?;

        // Write beside the target and rename so readers never see a partial file
        let tmp = self.dir.join(format!(".{}{}{}.tmp", self.prefix, id, self.suffix));
        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(path = %path.display(), bytes = bytes.len(), "session file written");
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Vec<u8>, SessionError> {
        let path = self.path_for(id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SessionError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, id: &str) -> Result<bool, SessionError> {
        Ok(self.path_for(id)?.is_file())
    }

    fn delete(&self, id: &str) -> Result<(), SessionError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "session file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session ids become file names, so only `[A-Za-z0-9_-]` is allowed
fn validate_id(id: &str) -> Result<(), SessionError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidId(id.to_string()))
    }
}
