/// Runtime configuration: where data lives and which backend stores it
///
/// The backend is chosen once per process. Native builds have embedded
/// SQLite available; `wasm32` builds do not and fall back to the key-value
/// backend. `HABIT_TRACKER_BACKEND` overrides the detected choice.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// SQLite database file name inside the data directory
pub const DATABASE_FILE: &str = "habits.db";

/// Sub-directory holding the key-value backend's blobs
pub const KEY_VALUE_DIR: &str = "kv";

/// Environment variable that forces a backend ("sqlite" or "kv")
pub const BACKEND_ENV_VAR: &str = "HABIT_TRACKER_BACKEND";

/// Errors raised while assembling the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown storage backend '{0}', expected 'sqlite' or 'kv'")]
    UnknownBackend(String),

    #[error("No writable data directory found: {0}")]
    NoDataDir(#[from] std::io::Error),
}

/// The two interchangeable storage engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Relational backend on an embedded SQLite file
    Sqlite,
    /// JSON blobs in a simple key-value store
    KeyValue,
}

impl BackendKind {
    /// Backend suited to the environment this binary was built for
    pub fn detect() -> Self {
        if cfg!(target_arch = "wasm32") {
            BackendKind::KeyValue
        } else {
            BackendKind::Sqlite
        }
    }

    /// Backend requested through `HABIT_TRACKER_BACKEND`, if set
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        match std::env::var(BACKEND_ENV_VAR) {
            Ok(value) if !value.trim().is_empty() => value.parse().map(Some),
            _ => Ok(None),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::KeyValue => "kv",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sql" | "relational" => Ok(BackendKind::Sqlite),
            "kv" | "key-value" | "keyvalue" | "web" => Ok(BackendKind::KeyValue),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Where the tracker keeps its data and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub data_dir: PathBuf,
    pub backend: BackendKind,
}

impl TrackerConfig {
    pub fn new(data_dir: impl Into<PathBuf>, backend: BackendKind) -> Self {
        Self {
            data_dir: data_dir.into(),
            backend,
        }
    }

    /// Default data directory and the detected (or overridden) backend
    pub fn from_environment() -> Result<Self, ConfigError> {
        Self::resolve(None, None)
    }

    /// Use the given values, filling in only what is missing
    ///
    /// The environment and the default data directory are consulted only
    /// for values not passed in.
    pub fn resolve(data_dir: Option<PathBuf>, backend: Option<BackendKind>) -> Result<Self, ConfigError> {
        let backend = match backend {
            Some(backend) => backend,
            None => BackendKind::from_env()?.unwrap_or_else(BackendKind::detect),
        };
        let data_dir = match data_dir {
            Some(data_dir) => data_dir,
            None => default_data_dir()?,
        };
        Ok(Self::new(data_dir, backend))
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn key_value_dir(&self) -> PathBuf {
        self.data_dir.join(KEY_VALUE_DIR)
    }
}

/// Pick the first writable data directory
///
/// Tries the home directory, then the platform data and config
/// directories, then the working directory, and finally the temp dir.
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let candidates = [
        dirs::home_dir().map(|p| p.join(".habit_tracker")),
        dirs::data_dir().map(|p| p.join("habit_tracker")),
        dirs::config_dir().map(|p| p.join("habit_tracker")),
        std::env::current_dir().ok().map(|p| p.join(".habit_tracker")),
    ];

    for candidate in candidates.iter().flatten() {
        if is_writable_dir(candidate) {
            return Ok(candidate.clone());
        }
    }

    let temp_path = std::env::temp_dir().join("habit_tracker");
    std::fs::create_dir_all(&temp_path)?;

    tracing::warn!("Using temporary directory for data: {}", temp_path.display());
    Ok(temp_path)
}

fn is_writable_dir(path: &PathBuf) -> bool {
    if std::fs::create_dir_all(path).is_err() {
        return false;
    }
    let probe = path.join(".test_write");
    let writable = std::fs::write(&probe, "test").is_ok();
    let _ = std::fs::remove_file(&probe);
    writable
}
