pub mod config;
/// On-demand component loading: registry, search roots and activation hooks.
pub mod loader;
/// File-backed session persistence with a YAML encoder.
pub mod session;
