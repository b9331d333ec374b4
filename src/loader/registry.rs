use std::collections::HashMap;

use semver::Version;
use tracing::{info, warn};

use super::{Component, ComponentFactory, ComponentInfo, ComponentOrigin};

/// A registered factory together with the metadata used for version gating
struct Registration {
    version: Option<Version>,
    description: Option<String>,
    factory: ComponentFactory,
}

/// Registry that maps component names to factory functions
pub struct ComponentRegistry {
    entries: HashMap<String, Registration>,
}

impl ComponentRegistry {
    /// Create a new empty component registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a component factory under `name`, replacing any previous registration
    pub fn register(
        &mut self,
        name: &str,
        version: Option<Version>,
        description: Option<&str>,
        factory: ComponentFactory,
    ) {
        let registration = Registration {
            version,
            description: description.map(str::to_string),
            factory,
        };
        if self.entries.insert(name.to_string(), registration).is_some() {
            warn!(component = %name, "replacing existing component registration");
        } else {
            info!(component = %name, "registering component");
        }
    }

    /// Remove a registration; returns whether one existed
    pub fn unregister(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Check if a component is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Build a fresh instance of a registered component
    pub fn instantiate(&self, name: &str) -> Option<(ComponentInfo, Box<dyn Component>)> {
        let registration = self.entries.get(name)?;
        Some((Self::info(name, registration), (registration.factory)()))
    }

    /// Get information about a registered component
    pub fn get(&self, name: &str) -> Option<ComponentInfo> {
        self.entries
            .get(name)
            .map(|registration| Self::info(name, registration))
    }

    /// Get information about all registered components, sorted by name
    pub fn list(&self) -> Vec<ComponentInfo> {
        let mut infos: Vec<ComponentInfo> = self
            .entries
            .iter()
            .map(|(name, registration)| Self::info(name, registration))
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Get the number of registered components
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn info(name: &str, registration: &Registration) -> ComponentInfo {
        ComponentInfo {
            name: name.to_string(),
            version: registration.version.clone(),
            description: registration.description.clone(),
            origin: ComponentOrigin::Builtin,
        }
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
