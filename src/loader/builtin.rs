use semver::Version;

use super::{Component, ComponentError, ComponentRegistry, ImportContext};

pub const YAML_SERIALIZER: &str = "Session::Serialize::Yaml";
pub const FILE_DRIVER: &str = "Session::Driver::File";

const YAML_EXPORTS: [&str; 2] = ["serialize", "deserialize"];

/// Register the components that ship with the crate
pub fn register_builtins(registry: &mut ComponentRegistry) {
    let version = Version::parse(env!("CARGO_PKG_VERSION")).ok();

    registry.register(
        YAML_SERIALIZER,
        version.clone(),
        Some("YAML encoding for file-backed sessions"),
        || Box::new(YamlSerializerComponent),
    );
    registry.register(
        FILE_DRIVER,
        version,
        Some("one file per session under a directory"),
        || Box::new(FileDriverComponent),
    );
}

struct YamlSerializerComponent;

impl Component for YamlSerializerComponent {
    fn has_activation_hook(&self) -> bool {
        true
    }

    fn activate(&mut self, ctx: &mut ImportContext, args: &[&str]) -> Result<(), ComponentError> {
        let requested: &[&str] = if args.is_empty() { &YAML_EXPORTS } else { args };
        if let Some(unknown) = requested.iter().find(|s| !YAML_EXPORTS.contains(s)) {
            return Err(format!("\"{}\" is not exported by {}", unknown, YAML_SERIALIZER).into());
        }
        for symbol in requested {
            ctx.export(YAML_SERIALIZER, symbol);
        }
        Ok(())
    }
}

/// The file driver is configured, not imported; it has no hook
struct FileDriverComponent;

impl Component for FileDriverComponent {}
