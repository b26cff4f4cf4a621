//! Core configuration loaded from TOML with `AUDITORIUM_*` overrides.
//!
//! # Invariants
//! - Every section is optional in the file; absent keys take documented defaults.
//! - A config returned by [`CoreConfig::load`] has passed [`CoreConfig::validate`].

use crate::db::DbTarget;
use crate::pagination::PageLimits;
use crate::schedule::SchedulingPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "AUDITORIUM_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "AUDITORIUM_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "AUDITORIUM_LOG_DIR";
pub const ENV_PAGE_DEFAULT_LIMIT: &str = "AUDITORIUM_PAGE_DEFAULT_LIMIT";
pub const ENV_PAGE_MAX_LIMIT: &str = "AUDITORIUM_PAGE_MAX_LIMIT";
pub const ENV_CONFLICT_CAP: &str = "AUDITORIUM_CONFLICT_CAP";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    /// An override variable holds a value of the wrong shape.
    InvalidOverride { key: &'static str, value: String },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::InvalidOverride { key, value } => {
                write!(f, "invalid value `{value}` for {key}")
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub pagination: PaginationSettings,
    #[serde(default)]
    pub scheduling: SchedulingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// `[database]`. No `path` means an in-memory database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationSettings {
    #[serde(default = "default_page_limit")]
    pub default_limit: u32,
    #[serde(default = "default_max_page_limit")]
    pub max_limit: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulingSettings {
    /// Upper bound on conflicts reported per rejected proposal.
    #[serde(default = "default_conflict_cap")]
    pub conflict_cap: u32,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            conflict_cap: default_conflict_cap(),
        }
    }
}

/// `[logging]`. Without `log_dir`, logs go to stderr.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_page_limit() -> u32 {
    10
}

fn default_max_page_limit() -> u32 {
    50
}

fn default_conflict_cap() -> u32 {
    10
}

fn default_log_level() -> String {
    crate::logging::default_log_level().to_string()
}

impl CoreConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Reads `path` when given (defaults otherwise), applies process
    /// environment overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = read(ENV_DB_PATH) {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            self.logging.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = read(ENV_PAGE_DEFAULT_LIMIT) {
            self.pagination.default_limit = parse_override(ENV_PAGE_DEFAULT_LIMIT, value)?;
        }
        if let Some(value) = read(ENV_PAGE_MAX_LIMIT) {
            self.pagination.max_limit = parse_override(ENV_PAGE_MAX_LIMIT, value)?;
        }
        if let Some(value) = read(ENV_CONFLICT_CAP) {
            self.scheduling.conflict_cap = parse_override(ENV_CONFLICT_CAP, value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pagination = &self.pagination;
        if pagination.default_limit == 0 || pagination.max_limit == 0 {
            return Err(ConfigError::Invalid(
                "pagination limits must be greater than zero".to_string(),
            ));
        }
        if pagination.default_limit > pagination.max_limit {
            return Err(ConfigError::Invalid(format!(
                "pagination.default_limit ({}) exceeds pagination.max_limit ({})",
                pagination.default_limit, pagination.max_limit
            )));
        }
        if self.scheduling.conflict_cap == 0 {
            return Err(ConfigError::Invalid(
                "scheduling.conflict_cap must be greater than zero".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.pagination.default_limit,
            max_limit: self.pagination.max_limit,
        }
    }

    pub fn scheduling_policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::new(self.scheduling.conflict_cap)
    }

    pub fn db_target(&self) -> DbTarget {
        match &self.database.path {
            Some(path) => DbTarget::File(path.clone()),
            None => DbTarget::Memory,
        }
    }
}

fn parse_override(key: &'static str, value: String) -> Result<u32, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidOverride { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config.page_limits(), PageLimits::default());
        assert_eq!(config.scheduling.conflict_cap, 10);
        assert_eq!(config.db_target(), DbTarget::Memory);
        config.validate().unwrap();
    }

    #[test]
    fn parses_all_sections() {
        let config = CoreConfig::from_toml_str(
            r#"
[database]
path = "/var/lib/auditorium/core.db"

[pagination]
default_limit = 5
max_limit = 20

[scheduling]
conflict_cap = 3

[logging]
level = "warn"
log_dir = "/var/log/auditorium"
"#,
        )
        .unwrap();

        assert_eq!(
            config.db_target(),
            DbTarget::File(PathBuf::from("/var/lib/auditorium/core.db"))
        );
        assert_eq!(config.pagination.default_limit, 5);
        assert_eq!(config.scheduling_policy().conflict_cap(), 3);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            CoreConfig::from_toml_str("[pagination]\npage_size = 4\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_PAGE_MAX_LIMIT, "100"),
            (ENV_CONFLICT_CAP, " 4 "),
            (ENV_LOG_LEVEL, ""),
        ]);
        let mut config = CoreConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|value| value.to_string()))
            .unwrap();

        assert_eq!(config.pagination.max_limit, 100);
        assert_eq!(config.scheduling.conflict_cap, 4);
        assert_eq!(config.logging.level, default_log_level());
    }

    #[test]
    fn malformed_override_is_reported() {
        let mut config = CoreConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_PAGE_DEFAULT_LIMIT).then(|| "ten".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride {
                key: ENV_PAGE_DEFAULT_LIMIT,
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_inconsistent_limits() {
        let mut config = CoreConfig::default();
        config.pagination.default_limit = 60;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = CoreConfig::default();
        config.scheduling.conflict_cap = 0;
        assert!(config.validate().is_err());
    }
}
