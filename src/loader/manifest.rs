//! On-disk component manifests found under search roots.
//!
//! A manifest is a TOML file at `<root>/<Name/Space/Leaf>.<ext>`:
//!
//! ```toml
//! version = "1.4.0"
//! description = "Flash messages for form handlers"
//! exports = ["flash", "flash_now"]
//! ```
//!
//! Activating a manifest component exports its symbols into the caller's
//! [`ImportContext`]. With no arguments every symbol is exported; with
//! arguments exactly the listed ones are.

use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;

use super::{Component, ComponentError, ImportContext, LoaderError, ModuleName};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub exports: Vec<String>,
}

impl Manifest {
    /// Read and validate the manifest for `name` at `path`
    pub fn from_file(path: &Path, name: &ModuleName) -> Result<Self, LoaderError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoaderError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let manifest: Manifest = toml::from_str(&content).map_err(|e| LoaderError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let expected = name.to_string();
        if let Some(declared) = &manifest.name {
            if *declared != expected {
                return Err(LoaderError::Manifest {
                    path: path.to_path_buf(),
                    reason: format!("declares name '{}' but was resolved as '{}'", declared, expected),
                });
            }
        }

        Ok(manifest)
    }
}

/// Component backed by a manifest file
pub struct ManifestComponent {
    name: String,
    path: PathBuf,
    exports: Vec<String>,
}

impl ManifestComponent {
    pub fn new(name: &ModuleName, path: PathBuf, manifest: &Manifest) -> Self {
        Self {
            name: name.to_string(),
            path,
            exports: manifest.exports.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Component for ManifestComponent {
    fn has_activation_hook(&self) -> bool {
        !self.exports.is_empty()
    }

    fn activate(&mut self, ctx: &mut ImportContext, args: &[&str]) -> Result<(), ComponentError> {
        if args.is_empty() {
            for symbol in &self.exports {
                ctx.export(&self.name, symbol);
            }
            return Ok(());
        }

        // Validate the whole list before exporting anything
        if let Some(unknown) = args.iter().find(|a| !self.exports.iter().any(|e| e == *a)) {
            return Err(format!("\"{}\" is not exported by {}", unknown, self.name).into());
        }
        for symbol in args {
            ctx.export(&self.name, symbol);
        }
        Ok(())
    }
}
