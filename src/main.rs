use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use framekit::config::Config;
use framekit::loader::{LoadStatus, Loader};
use framekit::session::{FileStorage, SessionRecord, SessionStore, YamlSerializer};

/// Framekit runtime tools - load components on demand and inspect session files
#[derive(Parser, Debug)]
#[command(name = "framekit", version, about)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve and activate a component
    Load {
        name: String,
        /// Minimum acceptable version
        #[arg(long)]
        min_version: Option<String>,
        /// Extra search root (repeatable)
        #[arg(short = 'I', long = "lib")]
        libs: Vec<PathBuf>,
        /// Import argument forwarded to the activation hook (repeatable)
        #[arg(long = "arg")]
        args: Vec<String>,
    },
    /// Resolve a component without activating it
    Resolve {
        name: String,
        /// Extra search root (repeatable)
        #[arg(short = 'I', long = "lib")]
        libs: Vec<PathBuf>,
    },
    /// List registered components
    Components,
    /// Inspect or edit stored sessions
    Session {
        /// Session directory, overriding the configuration
        #[arg(short, long)]
        dir: Option<PathBuf>,
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    /// List stored session ids
    List,
    /// Print a session as YAML
    Show { id: String },
    /// Set a key; the value is parsed as JSON, falling back to a plain string
    Set { id: String, key: String, value: String },
    /// Delete a session
    Delete { id: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(config.max_level())
        .init();

    match args.command {
        Command::Load {
            name,
            min_version,
            libs,
            args,
        } => {
            let mut loader = Loader::with_builtins(&config.loader);
            let status = with_libs(&mut loader, &libs, |loader| {
                if args.is_empty() {
                    loader.load(&name, min_version.as_deref())
                } else {
                    let args: Vec<&str> = args.iter().map(String::as_str).collect();
                    loader.load_with_params(&name, &args)
                }
            });
            report(&status)?;
            for (symbol, provider) in loader.context().symbols() {
                println!("{}\t{}", symbol, provider);
            }
        }
        Command::Resolve { name, libs } => {
            let mut loader = Loader::with_builtins(&config.loader);
            let status = with_libs(&mut loader, &libs, |loader| loader.resolve(&name));
            report(&status)?;
            for component in loader.loaded_components() {
                println!("{}", serde_json::to_string(&component)?);
            }
        }
        Command::Components => {
            let loader = Loader::with_builtins(&config.loader);
            for component in loader.registry().list() {
                let version = component
                    .version
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\t{}",
                    component.name,
                    version,
                    component.description.unwrap_or_default()
                );
            }
        }
        Command::Session { dir, action } => {
            let mut session_config = config.session.clone();
            if let Some(dir) = dir {
                session_config.dir = dir;
            }
            run_session(&session_config, action)?;
        }
    }

    Ok(())
}

/// Apply `-I` roots before running `op`; a bad root short-circuits
fn with_libs(
    loader: &mut Loader,
    libs: &[PathBuf],
    op: impl FnOnce(&mut Loader) -> LoadStatus,
) -> LoadStatus {
    if !libs.is_empty() {
        let status = loader.use_lib(libs);
        if !status.success {
            return status;
        }
    }
    op(loader)
}

fn report(status: &LoadStatus) -> Result<(), Box<dyn std::error::Error>> {
    match &status.error {
        None => {
            info!("ok");
            Ok(())
        }
        Some(e) => {
            warn!(error = %e, "component operation failed");
            Err(e.clone().into())
        }
    }
}

fn run_session(
    config: &framekit::config::SessionConfig,
    action: SessionAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SessionStore::new(FileStorage::from_config(config), YamlSerializer::new());

    match action {
        SessionAction::List => {
            for id in store.storage().list_ids()? {
                println!("{}", id);
            }
        }
        SessionAction::Show { id } => match store.load(&id)? {
            Some(record) => print!("{}", serde_yaml::to_string(&record)?),
            None => return Err(format!("session '{}' not found", id).into()),
        },
        SessionAction::Set { id, key, value } => {
            let mut record = store.load(&id)?.unwrap_or_else(SessionRecord::new);
            let value = serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
            record.set(key, value);
            store.save(&id, &record)?;
            info!(session = %id, "session updated");
        }
        SessionAction::Delete { id } => {
            store.delete(&id)?;
        }
    }

    Ok(())
}
