use std::io::{Read, Write};

use super::{SessionError, SessionRecord, SessionSerializer};

/// Serializes session records as YAML
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSerializer;

impl YamlSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl SessionSerializer for YamlSerializer {
    fn format(&self) -> &'static str {
        "yaml"
    }

    fn serialize(&self, stream: &mut dyn Write, data: &SessionRecord) -> Result<(), SessionError> {
        serde_yaml::to_writer(stream, data)?;
        Ok(())
    }

    fn deserialize(&self, stream: &mut dyn Read) -> Result<SessionRecord, SessionError> {
        Ok(serde_yaml::from_reader(stream)?)
    }
}
