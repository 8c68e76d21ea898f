//! Runtime context for CLI commands

use anyhow::{Context, Result};
use dq_core::DomainConfig;
use dq_db::{Backend, DuckDbBackend};
use dq_engine::{ConsoleNotifier, LogNotifier, Notifiers};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Runtime context containing the loaded domain and database connection
pub struct RuntimeContext {
    /// The loaded domain configuration
    pub config: Arc<DomainConfig>,

    /// Configuration file the domain was loaded from
    pub config_path: PathBuf,

    /// Verbose output enabled
    pub verbose: bool,

    project_dir: PathBuf,
    database: Option<String>,
}

impl RuntimeContext {
    /// Load the domain configuration from global arguments
    pub fn new(args: &GlobalArgs) -> Result<Self> {
        let project_dir = PathBuf::from(&args.project_dir);
        let config_path = match &args.config {
            Some(path) => PathBuf::from(path),
            None => find_config(&project_dir),
        };

        let config = DomainConfig::load(&config_path)
            .context("Failed to load domain configuration")?;

        Ok(Self {
            config: Arc::new(config),
            config_path,
            verbose: args.verbose,
            project_dir,
            database: args.database.clone(),
        })
    }

    /// Open the data platform connection
    pub fn backend(&self) -> Result<Arc<dyn Backend>> {
        let path = self
            .database
            .clone()
            .unwrap_or_else(|| self.config.database_path());
        let path = resolve_path(&self.project_dir, &path);
        self.verbose(&format!("Connecting to {}", path));

        let db = DuckDbBackend::new(&path).context("Failed to connect to database")?;
        Ok(Arc::new(db))
    }

    /// Notification sinks for this invocation
    pub fn notifiers(&self) -> Notifiers {
        let notifiers = Notifiers::new().with(Arc::new(LogNotifier));
        if self.verbose {
            notifiers.with(Arc::new(ConsoleNotifier))
        } else {
            notifiers
        }
    }

    /// Config file name as shown in specification locations
    pub fn source_name(&self) -> String {
        self.config_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.config_path.display().to_string())
    }

    /// Print verbose output if enabled
    pub fn verbose(&self, msg: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", msg);
        }
    }
}

/// dq.yml in the project directory, falling back to dq.yaml
fn find_config(project_dir: &Path) -> PathBuf {
    let yaml = project_dir.join("dq.yaml");
    if !project_dir.join("dq.yml").exists() && yaml.exists() {
        yaml
    } else {
        project_dir.join("dq.yml")
    }
}

/// Relative database paths are taken from the project directory
fn resolve_path(project_dir: &Path, path: &str) -> String {
    if path == ":memory:" || Path::new(path).is_absolute() {
        path.to_string()
    } else {
        project_dir.join(path).display().to_string()
    }
}

/// Split a comma-separated selection into names
pub fn parse_selection(select: Option<&str>) -> Option<Vec<String>> {
    select.map(|s| {
        s.split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    })
}
