//! Engine configuration loaded from TOML.
//!
//! # Invariants
//! - Every field is optional in the file; missing fields take defaults.
//! - A config returned by [`EngineConfig::load`] or
//!   [`EngineConfig::from_toml_str`] has already passed `validate()`.

use crate::logging::default_log_level;
use crate::model::board::MAX_COLUMN_TITLE_CHARS;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_STARTER_COLUMNS: [&str; 3] = ["To Do", "In Progress", "Done"];

/// Runtime settings for stores, board creation and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// SQLite database file; callers may override it.
    pub database_path: Option<PathBuf>,
    /// Upper bound for acquiring one scope lock set.
    pub lock_timeout_ms: u64,
    /// Upper bound for waiting on the SQLite write lock.
    pub busy_timeout_ms: u64,
    /// Column titles given to every new board, in order.
    pub starter_columns: Vec<String>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            starter_columns: DEFAULT_STARTER_COLUMNS
                .iter()
                .map(|title| (*title).to_string())
                .collect(),
            log_level: None,
            log_dir: None,
        }
    }
}

impl EngineConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "lock_timeout_ms must be positive".to_string(),
            ));
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "busy_timeout_ms must be positive".to_string(),
            ));
        }
        if self.starter_columns.is_empty() {
            return Err(ConfigError::Invalid(
                "starter_columns must name at least one column".to_string(),
            ));
        }
        for (index, title) in self.starter_columns.iter().enumerate() {
            let chars = title.trim().chars().count();
            if chars == 0 {
                return Err(ConfigError::Invalid(format!(
                    "starter_columns[{index}] is blank"
                )));
            }
            if chars > MAX_COLUMN_TITLE_CHARS {
                return Err(ConfigError::Invalid(format!(
                    "starter_columns[{index}] exceeds {MAX_COLUMN_TITLE_CHARS} characters"
                )));
            }
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Configured log level, or the build-mode default.
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }
}

/// Errors from loading engine configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config TOML: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use std::time::Duration;

    #[test]
    fn empty_file_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.lock_timeout(), Duration::from_secs(2));
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert_eq!(config.starter_columns, vec!["To Do", "In Progress", "Done"]);
    }

    #[test]
    fn fields_override_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            database_path = "/var/lib/taskboard/board.db"
            lock_timeout_ms = 250
            starter_columns = ["Backlog", "Doing"]
            log_level = "warn"
            "#,
        )
        .unwrap();
        assert_eq!(config.lock_timeout(), Duration::from_millis(250));
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert_eq!(config.starter_columns, vec!["Backlog", "Doing"]);
        assert_eq!(config.log_level(), "warn");
    }

    #[test]
    fn rejects_empty_or_blank_starter_columns() {
        let empty = EngineConfig::from_toml_str("starter_columns = []").unwrap_err();
        assert!(matches!(empty, ConfigError::Invalid(_)));

        let blank = EngineConfig::from_toml_str(r#"starter_columns = ["Ok", "  "]"#).unwrap_err();
        assert!(blank.to_string().contains("starter_columns[1]"));
    }

    #[test]
    fn rejects_zero_timeouts_and_unknown_keys() {
        assert!(matches!(
            EngineConfig::from_toml_str("busy_timeout_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("lock_timeout = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
