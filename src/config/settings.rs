//! TOML-based configuration for relq.
//!
//! Supports a config file (relq.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [compiler]
//! dialect = "${RELQ_DIALECT}"
//! with_total_count = false
//!
//! [cache]
//! enabled = true
//! max_entries = 2048
//!
//! [metadata]
//! naming = "snake_case"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::cache::{StatementCache, DEFAULT_MAX_ENTRIES};
use crate::compile::CompileOptions;
use crate::metadata::NamingConvention;
use crate::sql::dialect::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub compiler: CompilerSettings,
    pub cache: CacheSettings,
    pub metadata: MetadataSettings,
}

/// Compiler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Dialect preset name (tsql, tsql_legacy, postgres, mysql, sqlite, duckdb).
    pub dialect: String,

    /// Attach a total-count statement to every compiled query.
    pub with_total_count: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default().name().to_string(),
            with_total_count: false,
        }
    }
}

/// Statement cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Metadata configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetadataSettings {
    /// Column naming convention for members without an explicit column.
    pub naming: String,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            naming: "as_is".to_string(),
        }
    }
}

impl FromStr for Settings {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        content.parse()
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `RELQ_CONFIG`
    /// 2. `./relq.toml`
    /// 3. `<config dir>/relq/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("RELQ_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("relq.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("relq").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// The configured dialect preset.
    pub fn dialect(&self) -> Result<Dialect, SettingsError> {
        let name = expand_env_vars(&self.compiler.dialect)?;
        name.parse().map_err(SettingsError::InvalidConfig)
    }

    /// The configured naming convention, for metadata builders.
    pub fn naming(&self) -> Result<NamingConvention, SettingsError> {
        let name = expand_env_vars(&self.metadata.naming)?;
        name.parse().map_err(SettingsError::InvalidConfig)
    }

    /// Build compile options from the `[compiler]` section.
    pub fn compile_options(&self) -> Result<CompileOptions, SettingsError> {
        Ok(CompileOptions::default()
            .with_dialect(self.dialect()?)
            .with_total_count(self.compiler.with_total_count))
    }

    /// Build the statement cache from the `[cache]` section; `None` when
    /// disabled.
    pub fn statement_cache(&self) -> Result<Option<Arc<StatementCache>>, SettingsError> {
        if !self.cache.enabled {
            return Ok(None);
        }
        if self.cache.max_entries == 0 {
            return Err(SettingsError::InvalidConfig(
                "cache.max_entries must be greater than zero".to_string(),
            ));
        }
        Ok(Some(Arc::new(StatementCache::new(self.cache.max_entries))))
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Lone `$`
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::PagingStrategy;

    #[test]
    fn test_expand_env_vars_braces() {
        env::set_var("RELQ_TEST_VAR", "hello");
        assert_eq!(expand_env_vars("${RELQ_TEST_VAR}").unwrap(), "hello");
        assert_eq!(
            expand_env_vars("prefix_${RELQ_TEST_VAR}_suffix").unwrap(),
            "prefix_hello_suffix"
        );
        env::remove_var("RELQ_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        env::set_var("RELQ_TEST_VAR2", "world");
        assert_eq!(expand_env_vars("$RELQ_TEST_VAR2").unwrap(), "world");
        assert_eq!(expand_env_vars("$RELQ_TEST_VAR2!").unwrap(), "world!");
        assert_eq!(expand_env_vars("cost $").unwrap(), "cost $");
        env::remove_var("RELQ_TEST_VAR2");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("${NONEXISTENT_VAR_12345}");
        assert!(matches!(result, Err(SettingsError::MissingEnvVar(_))));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[compiler]
dialect = "tsql_legacy"
with_total_count = true

[cache]
enabled = true
max_entries = 64

[metadata]
naming = "snake_case"
"#;

        let settings: Settings = toml.parse().unwrap();

        let options = settings.compile_options().unwrap();
        assert_eq!(options.dialect.paging_strategy, PagingStrategy::RowNumber);
        assert!(options.with_total_count);

        let cache = settings.statement_cache().unwrap().unwrap();
        assert_eq!(cache.max_entries(), 64);
        assert_eq!(settings.naming().unwrap(), NamingConvention::SnakeCase);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.dialect().unwrap(), Dialect::TSql);
        assert!(!settings.compiler.with_total_count);
        assert!(settings.statement_cache().unwrap().is_some());
        assert_eq!(settings.naming().unwrap(), NamingConvention::AsIs);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings = "[compiler]\ndialect = \"postgres\"\n".parse().unwrap();
        assert_eq!(settings.dialect().unwrap(), Dialect::Postgres);
        assert_eq!(settings.cache.max_entries, DEFAULT_MAX_ENTRIES);
    }

    #[test]
    fn test_invalid_values() {
        let settings: Settings = "[compiler]\ndialect = \"oracle\"\n".parse().unwrap();
        assert!(matches!(settings.compile_options(), Err(SettingsError::InvalidConfig(_))));

        let settings: Settings = "[cache]\nmax_entries = 0\n".parse().unwrap();
        assert!(matches!(settings.statement_cache(), Err(SettingsError::InvalidConfig(_))));

        let settings: Settings = "[cache]\nenabled = false\nmax_entries = 0\n".parse().unwrap();
        assert!(settings.statement_cache().unwrap().is_none());
    }

    #[test]
    fn test_dialect_from_environment() {
        env::set_var("RELQ_TEST_DIALECT", "mysql");
        let settings: Settings = "[compiler]\ndialect = \"${RELQ_TEST_DIALECT}\"\n".parse().unwrap();
        assert_eq!(settings.dialect().unwrap(), Dialect::MySql);
        env::remove_var("RELQ_TEST_DIALECT");
    }
}
