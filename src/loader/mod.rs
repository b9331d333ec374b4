//! On-demand component loading.
//!
//! Components are looked up by name in a [`ComponentRegistry`] populated at
//! startup, or found as manifest files under the loader's search roots.
//! Resolution instantiates a component; activation additionally runs its
//! activation hook, which exports symbols into the loader's [`ImportContext`].

pub mod builtin;
pub mod manifest;
pub mod name;
pub mod registry;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use builtin::register_builtins;
pub use manifest::{Manifest, ManifestComponent};
pub use name::ModuleName;
pub use registry::ComponentRegistry;

use crate::config::LoaderConfig;

/// Error type returned by activation hooks
pub type ComponentError = Box<dyn std::error::Error + Send + Sync>;

/// Factory function stored in the registry
pub type ComponentFactory = fn() -> Box<dyn Component>;

/// A loadable component
pub trait Component: Send {
    /// Whether the component defines an activation hook
    fn has_activation_hook(&self) -> bool {
        false
    }

    /// Run the activation hook with the caller's import arguments
    fn activate(&mut self, _ctx: &mut ImportContext, _args: &[&str]) -> Result<(), ComponentError> {
        Ok(())
    }
}

/// Where a resolved component came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentOrigin {
    Builtin,
    Manifest(PathBuf),
}

/// Component metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    pub version: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub origin: ComponentOrigin,
}

/// Errors from component resolution and activation.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("invalid component name '{0}'")]
    InvalidName(String),
    #[error("can't locate {name} ({token}) in registry or search path [{searched}]")]
    NotFound {
        name: String,
        token: String,
        searched: String,
    },
    #[error("invalid version '{0}'")]
    InvalidVersion(String),
    #[error("{name} does not define a version (required {required})")]
    MissingVersion { name: String, required: Version },
    #[error("{name} version {required} required--this is only version {found}")]
    VersionTooLow {
        name: String,
        required: Version,
        found: Version,
    },
    #[error("invalid manifest {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },
    #[error("activation of {name} failed: {reason}")]
    Activation { name: String, reason: String },
    #[error("invalid search path entry '{0}'")]
    InvalidSearchPath(String),
}

/// Outcome of a loader operation: a success flag plus, on failure, the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadStatus {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.success
    }
}

impl<T> From<Result<T, LoaderError>> for LoadStatus {
    fn from(result: Result<T, LoaderError>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

/// Symbols exported into the caller by activation hooks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportContext {
    symbols: BTreeMap<String, String>,
}

impl ImportContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `symbol` as provided by `component`; a later export of the same symbol wins
    pub fn export(&mut self, component: &str, symbol: &str) {
        debug!(component = %component, symbol = %symbol, "exporting symbol");
        self.symbols.insert(symbol.to_string(), component.to_string());
    }

    /// Name of the component that provides `symbol`
    pub fn provider(&self, symbol: &str) -> Option<&str> {
        self.symbols.get(symbol).map(String::as_str)
    }

    /// All imported symbols with their providers, sorted by symbol
    pub fn symbols(&self) -> impl Iterator<Item = (&str, &str)> {
        self.symbols.iter().map(|(s, c)| (s.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Parse a requested minimum version, padding `1` and `1.2` to full semver
pub fn parse_min_version(raw: &str) -> Result<Version, LoaderError> {
    let trimmed = raw.trim().trim_start_matches('v');
    if let Ok(version) = Version::parse(trimmed) {
        return Ok(version);
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(LoaderError::InvalidVersion(raw.to_string()));
    }
    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| LoaderError::InvalidVersion(raw.to_string()))?;
    }
    Ok(Version::new(numbers[0], numbers[1], numbers[2]))
}

struct LoadedComponent {
    info: ComponentInfo,
    instance: Box<dyn Component>,
}

/// Resolves and activates components by name
pub struct Loader {
    registry: ComponentRegistry,
    search_path: Vec<PathBuf>,
    manifest_extension: String,
    loaded: HashMap<String, LoadedComponent>,
    context: ImportContext,
}

impl Loader {
    /// Create a loader over `registry` with the given initial search roots
    pub fn new(registry: ComponentRegistry, search_path: Vec<PathBuf>) -> Self {
        Self {
            registry,
            search_path,
            manifest_extension: LoaderConfig::default().manifest_extension,
            loaded: HashMap::new(),
            context: ImportContext::new(),
        }
    }

    /// Create a loader with the built-in components registered
    pub fn with_builtins(config: &LoaderConfig) -> Self {
        let mut registry = ComponentRegistry::new();
        register_builtins(&mut registry);
        Self::new(registry, config.search_roots.clone())
            .with_manifest_extension(&config.manifest_extension)
    }

    pub fn with_manifest_extension(mut self, extension: &str) -> Self {
        self.manifest_extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Resolve and activate `name`, then check it against `min_version`
    pub fn load(&mut self, name: &str, min_version: Option<&str>) -> LoadStatus {
        self.try_load(name, min_version).into()
    }

    /// Resolve `name` without activating it
    pub fn resolve(&mut self, name: &str) -> LoadStatus {
        self.try_resolve(name).into()
    }

    /// Resolve `name` and pass `args` to its activation hook, if it has one
    pub fn load_with_params(&mut self, name: &str, args: &[&str]) -> LoadStatus {
        self.try_load_with_params(name, args).into()
    }

    /// Append directories to the search roots
    pub fn use_lib<I, P>(&mut self, paths: I) -> LoadStatus
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.try_use_lib(paths).into()
    }

    pub fn try_load(&mut self, name: &str, min_version: Option<&str>) -> Result<(), LoaderError> {
        // Parse before resolving so a bad request has no side effects
        let required = min_version.map(parse_min_version).transpose()?;

        self.try_resolve(name)?;
        self.activate(name, &[])?;

        let Some(required) = required else {
            return Ok(());
        };
        let info = self.loaded_info(name)?;
        match &info.version {
            None => Err(LoaderError::MissingVersion {
                name: info.name.clone(),
                required,
            }),
            Some(found) if *found < required => Err(LoaderError::VersionTooLow {
                name: info.name.clone(),
                required,
                found: found.clone(),
            }),
            Some(_) => Ok(()),
        }
    }

    pub fn try_load_with_params(&mut self, name: &str, args: &[&str]) -> Result<(), LoaderError> {
        self.try_resolve(name)?;
        self.activate(name, args)
    }

    /// Resolve `name`, returning its metadata
    pub fn try_resolve(&mut self, name: &str) -> Result<ComponentInfo, LoaderError> {
        let module = ModuleName::parse(name)?;
        let key = module.to_string();

        if let Some(loaded) = self.loaded.get(&key) {
            return Ok(loaded.info.clone());
        }

        let loaded = match self.registry.instantiate(&key) {
            Some((info, instance)) => LoadedComponent { info, instance },
            None => self.resolve_from_search_path(&module)?,
        };

        info!(
            component = %key,
            version = %loaded.info.version.as_ref().map(Version::to_string).unwrap_or_default(),
            "component resolved"
        );
        let info = loaded.info.clone();
        self.loaded.insert(key, loaded);
        Ok(info)
    }

    pub fn try_use_lib<I, P>(&mut self, paths: I) -> Result<(), LoaderError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        if let Some(bad) = paths.iter().find(|p| p.as_os_str().is_empty()) {
            return Err(LoaderError::InvalidSearchPath(bad.display().to_string()));
        }

        for path in paths {
            if self.search_path.contains(&path) {
                continue;
            }
            if !path.is_dir() {
                warn!(path = %path.display(), "search root is not a directory");
            }
            info!(path = %path.display(), "adding search root");
            self.search_path.push(path);
        }
        Ok(())
    }

    /// Whether `name` has been resolved
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Version of a resolved component
    pub fn loaded_version(&self, name: &str) -> Option<&Version> {
        self.loaded.get(name).and_then(|l| l.info.version.as_ref())
    }

    /// Metadata of every resolved component, sorted by name
    pub fn loaded_components(&self) -> Vec<ComponentInfo> {
        let mut infos: Vec<ComponentInfo> = self.loaded.values().map(|l| l.info.clone()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    pub fn context(&self) -> &ImportContext {
        &self.context
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    fn loaded_info(&self, name: &str) -> Result<&ComponentInfo, LoaderError> {
        let module = ModuleName::parse(name)?;
        self.loaded
            .get(&module.to_string())
            .map(|l| &l.info)
            .ok_or_else(|| self.not_found(&module))
    }

    fn activate(&mut self, name: &str, args: &[&str]) -> Result<(), LoaderError> {
        let module = ModuleName::parse(name)?;
        let key = module.to_string();
        let loaded = match self.loaded.get_mut(&key) {
            Some(loaded) => loaded,
            None => return Err(self.not_found(&module)),
        };

        if !loaded.instance.has_activation_hook() {
            debug!(component = %key, "no activation hook, skipping");
            return Ok(());
        }

        loaded
            .instance
            .activate(&mut self.context, args)
            .map_err(|e| {
                warn!(component = %key, error = %e, "activation failed");
                LoaderError::Activation {
                    name: key.clone(),
                    reason: e.to_string(),
                }
            })?;
        info!(component = %key, args = args.len(), "component activated");
        Ok(())
    }

    fn resolve_from_search_path(&self, module: &ModuleName) -> Result<LoadedComponent, LoaderError> {
        let relative = module.relative_path(&self.manifest_extension);

        for root in &self.search_path {
            let candidate = root.join(&relative);
            debug!(path = %candidate.display(), "probing for component manifest");
            if !candidate.is_file() {
                continue;
            }

            let manifest = Manifest::from_file(&candidate, module)?;
            let info = ComponentInfo {
                name: module.to_string(),
                version: manifest.version.clone(),
                description: manifest.description.clone(),
                origin: ComponentOrigin::Manifest(candidate.clone()),
            };
            let instance = Box::new(ManifestComponent::new(module, candidate, &manifest));
            return Ok(LoadedComponent { info, instance });
        }

        Err(self.not_found(module))
    }

    fn not_found(&self, module: &ModuleName) -> LoaderError {
        let searched = self
            .search_path
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        LoaderError::NotFound {
            name: module.to_string(),
            token: module.relative_path(&self.manifest_extension).display().to_string(),
            searched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    static HOOKLESS_ACTIVATIONS: AtomicUsize = AtomicUsize::new(0);

    /// Component that counts activation attempts even though it reports no hook
    struct Hookless;

    impl Component for Hookless {
        fn activate(&mut self, _ctx: &mut ImportContext, _args: &[&str]) -> Result<(), ComponentError> {
            HOOKLESS_ACTIVATIONS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Component that exports its arguments as symbols
    struct Echo;

    impl Component for Echo {
        fn has_activation_hook(&self) -> bool {
            true
        }

        fn activate(&mut self, ctx: &mut ImportContext, args: &[&str]) -> Result<(), ComponentError> {
            if args.contains(&"fail") {
                return Err("deliberate failure".into());
            }
            for arg in args {
                ctx.export("Echo", arg);
            }
            if args.is_empty() {
                ctx.export("Echo", "echo");
            }
            Ok(())
        }
    }

    fn loader() -> Loader {
        let mut registry = ComponentRegistry::new();
        registry.register("Echo", Some(Version::new(1, 2, 0)), None, || Box::new(Echo));
        registry.register("Hookless", Some(Version::new(0, 3, 0)), None, || Box::new(Hookless));
        registry.register("Unversioned", None, None, || Box::new(Hookless));
        Loader::new(registry, Vec::new())
    }

    fn write_manifest(root: &Path, relative: &str, body: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn test_load_status_constructors() {
        assert_eq!(LoadStatus::ok(), LoadStatus { success: true, error: None });
        let status = LoadStatus::err("boom");
        assert!(!status.is_ok());
        assert_eq!(status.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_load_missing_component() {
        let mut loader = loader();
        let status = loader.load("NonexistentPkg123", None);
        assert!(!status.success);
        let msg = status.error.unwrap();
        assert!(!msg.is_empty());
        assert!(msg.contains("NonexistentPkg123"));
    }

    #[test]
    fn test_load_success_runs_hook() {
        let mut loader = loader();
        let status = loader.load("Echo", None);
        assert!(status.success);
        assert!(status.error.is_none());
        assert!(loader.is_loaded("Echo"));
        assert_eq!(loader.context().provider("echo"), Some("Echo"));
    }

    #[test]
    fn test_load_min_version_satisfied() {
        let mut loader = loader();
        assert!(loader.load("Echo", Some("1.2")).success);
        assert!(loader.load("Echo", Some("1.1.9")).success);
        assert!(loader.load("Echo", Some("1")).success);
    }

    #[test]
    fn test_load_min_version_too_high() {
        let mut loader = loader();
        let status = loader.load("Echo", Some("2.0.0"));
        assert!(!status.success);
        assert!(status.error.unwrap().contains("2.0.0"));
    }

    #[test]
    fn test_load_min_version_unversioned() {
        let mut loader = loader();
        let status = loader.load("Unversioned", Some("0.1"));
        assert!(!status.success);
        assert!(status.error.unwrap().contains("does not define a version"));
    }

    #[test]
    fn test_load_invalid_min_version_has_no_side_effects() {
        let mut loader = loader();
        let status = loader.load("Echo", Some("one.two"));
        assert!(!status.success);
        assert!(!loader.is_loaded("Echo"));
    }

    #[test]
    fn test_resolve_does_not_activate() {
        let mut loader = loader();
        assert!(loader.resolve("Echo").success);
        assert!(loader.is_loaded("Echo"));
        assert!(loader.context().is_empty());
    }

    #[test]
    fn test_resolve_invalid_name() {
        let mut loader = loader();
        let status = loader.resolve("Foo/Bar");
        assert!(!status.success);
        assert!(status.error.unwrap().contains("invalid component name"));
    }

    #[test]
    fn test_load_with_params_forwards_args() {
        let mut loader = loader();
        let status = loader.load_with_params("Echo", &["alpha", "beta"]);
        assert!(status.success);
        assert_eq!(loader.context().provider("alpha"), Some("Echo"));
        assert_eq!(loader.context().provider("beta"), Some("Echo"));
        assert!(loader.context().provider("echo").is_none());
    }

    #[test]
    fn test_load_with_params_without_hook() {
        let mut loader = loader();
        let before = HOOKLESS_ACTIVATIONS.load(Ordering::SeqCst);
        let status = loader.load_with_params("Hookless", &["x", "y"]);
        assert!(status.success);
        assert!(status.error.is_none());
        assert_eq!(HOOKLESS_ACTIVATIONS.load(Ordering::SeqCst), before);
        assert!(loader.context().is_empty());
    }

    #[test]
    fn test_load_with_params_activation_failure() {
        let mut loader = loader();
        let status = loader.load_with_params("Echo", &["fail"]);
        assert!(!status.success);
        assert!(status.error.unwrap().contains("deliberate failure"));
        // Resolution still happened
        assert!(loader.is_loaded("Echo"));
    }

    #[test]
    fn test_use_lib_then_resolve_manifest() {
        let dir = tempdir().unwrap();
        write_manifest(
            dir.path(),
            "Forms/Flash.toml",
            "version = \"0.4.1\"\nexports = [\"flash\"]\n",
        );

        let mut loader = loader();
        assert!(!loader.resolve("Forms::Flash").success);

        assert!(loader.use_lib([dir.path()]).success);
        assert_eq!(loader.search_path(), &[dir.path().to_path_buf()]);

        assert!(loader.resolve("Forms::Flash").success);
        assert_eq!(loader.loaded_version("Forms::Flash"), Some(&Version::new(0, 4, 1)));
        assert!(loader.context().is_empty());

        let info = &loader.loaded_components()[0];
        assert_eq!(
            info.origin,
            ComponentOrigin::Manifest(dir.path().join("Forms").join("Flash.toml"))
        );
    }

    #[test]
    fn test_load_manifest_with_params() {
        let dir = tempdir().unwrap();
        write_manifest(
            dir.path(),
            "Forms/Flash.toml",
            "exports = [\"flash\", \"flash_now\"]\n",
        );

        let mut loader = loader();
        loader.use_lib([dir.path()]);
        assert!(loader.load_with_params("Forms::Flash", &["flash_now"]).success);
        assert_eq!(loader.context().provider("flash_now"), Some("Forms::Flash"));
        assert!(loader.context().provider("flash").is_none());
    }

    #[test]
    fn test_registry_shadows_search_path() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), "Echo.toml", "version = \"9.0.0\"\n");

        let mut loader = loader();
        loader.use_lib([dir.path()]);
        assert!(loader.resolve("Echo").success);
        assert_eq!(loader.loaded_version("Echo"), Some(&Version::new(1, 2, 0)));
    }

    #[test]
    fn test_first_search_root_wins() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        write_manifest(first.path(), "Widget.toml", "version = \"1.0.0\"\n");
        write_manifest(second.path(), "Widget.toml", "version = \"2.0.0\"\n");

        let mut loader = loader();
        loader.use_lib([first.path(), second.path()]);
        assert!(loader.resolve("Widget").success);
        assert_eq!(loader.loaded_version("Widget"), Some(&Version::new(1, 0, 0)));
    }

    #[test]
    fn test_resolve_is_cached() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), "Widget.toml", "version = \"1.0.0\"\n");

        let mut loader = loader();
        loader.use_lib([dir.path()]);
        assert!(loader.resolve("Widget").success);

        std::fs::remove_file(dir.path().join("Widget.toml")).unwrap();
        assert!(loader.resolve("Widget").success);
    }

    #[test]
    fn test_use_lib_rejects_empty_and_dedupes() {
        let mut loader = loader();
        let status = loader.use_lib([""]);
        assert!(!status.success);
        assert!(loader.search_path().is_empty());

        assert!(loader.use_lib(["/srv/a", "/srv/b", "/srv/a"]).success);
        assert_eq!(
            loader.search_path(),
            &[PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
        );
    }

    #[test]
    fn test_bad_manifest_reports_path() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), "Broken.toml", "version = [1, 2]\n");

        let mut loader = loader();
        loader.use_lib([dir.path()]);
        let status = loader.resolve("Broken");
        assert!(!status.success);
        assert!(status.error.unwrap().contains("Broken.toml"));
    }

    #[test]
    fn test_parse_min_version() {
        assert_eq!(parse_min_version("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(parse_min_version("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(parse_min_version("v1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(
            parse_min_version("1.0.0-beta.1").unwrap(),
            Version::parse("1.0.0-beta.1").unwrap()
        );
        assert!(parse_min_version("").is_err());
        assert!(parse_min_version("1.2.3.4").is_err());
        assert!(parse_min_version("abc").is_err());
    }
}
