use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Component loader configuration
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Session storage configuration
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Directories probed for component manifests, in order
    #[serde(default)]
    pub search_roots: Vec<PathBuf>,
    #[serde(default = "default_manifest_extension")]
    pub manifest_extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_session_prefix")]
    pub prefix: String,
    #[serde(default = "default_session_suffix")]
    pub suffix: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_manifest_extension() -> String {
    "toml".to_string()
}

fn default_session_dir() -> PathBuf {
    PathBuf::from("sessions")
}

fn default_session_prefix() -> String {
    "sess_".to_string()
}

fn default_session_suffix() -> String {
    ".yml".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            loader: LoaderConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            search_roots: Vec::new(),
            manifest_extension: default_manifest_extension(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: default_session_dir(),
            prefix: default_session_prefix(),
            suffix: default_session_suffix(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(
            search_roots = config.loader.search_roots.len(),
            session_dir = %config.session.dir.display(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parsed `log_level`, falling back to INFO when unrecognised
    pub fn max_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}
