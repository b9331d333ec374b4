use std::fmt;
use std::path::PathBuf;

use super::LoaderError;

/// Separator between namespace segments of a component name
pub const NAMESPACE_SEPARATOR: &str = "::";

/// A validated component name such as `Session::Serialize::Yaml`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleName {
    segments: Vec<String>,
}

impl ModuleName {
    /// Parse and validate a component name
    pub fn parse(name: &str) -> Result<Self, LoaderError> {
        let segments: Vec<String> = name
            .split(NAMESPACE_SEPARATOR)
            .map(str::to_string)
            .collect();

        if name.is_empty() || !segments.iter().all(|s| is_identifier(s)) {
            return Err(LoaderError::InvalidName(name.to_string()));
        }

        Ok(Self { segments })
    }

    /// Namespace segments in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Path-like token for the name: `Foo::Bar::Baz` becomes `Foo/Bar/Baz`
    pub fn path_token(&self) -> String {
        self.segments.join("/")
    }

    /// Relative file path probed under a search root
    pub fn relative_path(&self, extension: &str) -> PathBuf {
        let mut path: PathBuf = self.segments.iter().collect();
        let extension = extension.trim_start_matches('.');
        if !extension.is_empty() {
            path.set_extension(extension);
        }
        path
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(NAMESPACE_SEPARATOR))
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_single_segment() {
        let name = ModuleName::parse("Widgets").unwrap();
        assert_eq!(name.segments(), &["Widgets".to_string()]);
        assert_eq!(name.path_token(), "Widgets");
    }

    #[test]
    fn test_nested_path_token() {
        let name = ModuleName::parse("Session::Serialize::Yaml").unwrap();
        assert_eq!(name.path_token(), "Session/Serialize/Yaml");
        assert_eq!(name.to_string(), "Session::Serialize::Yaml");
    }

    #[test]
    fn test_relative_path_with_extension() {
        let name = ModuleName::parse("Foo::Bar_2").unwrap();
        assert_eq!(name.relative_path("toml"), Path::new("Foo").join("Bar_2.toml"));
        assert_eq!(name.relative_path(".toml"), Path::new("Foo").join("Bar_2.toml"));
        assert_eq!(name.relative_path(""), Path::new("Foo").join("Bar_2"));
    }

    #[test]
    fn test_rejects_invalid_names() {
        for bad in [
            "",
            "::Foo",
            "Foo::",
            "Foo:::Bar",
            "Foo/Bar",
            "../etc",
            "9Lives",
            "Foo Bar",
            "Foo-Bar",
        ] {
            assert!(
                matches!(ModuleName::parse(bad), Err(LoaderError::InvalidName(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_accepts_underscores() {
        assert!(ModuleName::parse("_private::inner_mod").is_ok());
    }
}
