use std::path::Path;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;

use crate::domain::errors::ConfigurationError;
use crate::domain::models::{Config, LlmProvider};

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".sqlpilot";

/// Environment variable consulted when `llm.api_key` is unset.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .sqlpilot/config.yaml (project config, created by init)
    /// 3. .sqlpilot/local.yaml (project local overrides, optional)
    /// 4. Environment variables (SQLPILOT_* prefix, `__` separates nesting)
    pub fn load() -> Result<Config, ConfigurationError> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(Path::new(CONFIG_DIR).join("config.yaml")))
            .merge(Yaml::file(Path::new(CONFIG_DIR).join("local.yaml")))
            .merge(Env::prefixed("SQLPILOT_").split("__"))
            .extract()?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file. Environment overrides still
    /// apply on top of the file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config, ConfigurationError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigurationError::Load(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("SQLPILOT_").split("__"))
            .extract()?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigurationError> {
        let text2sql = &config.agents.text2sql;
        if !(0.0..=1.0).contains(&text2sql.temperature) {
            return Err(invalid(
                "agents.text2sql.temperature",
                format!("{} is outside 0.0..=1.0", text2sql.temperature),
            ));
        }
        if !(0.0..=1.0).contains(&text2sql.format_temperature) {
            return Err(invalid(
                "agents.text2sql.format_temperature",
                format!("{} is outside 0.0..=1.0", text2sql.format_temperature),
            ));
        }
        if text2sql.max_tokens == 0 {
            return Err(invalid("agents.text2sql.max_tokens", "must be at least 1"));
        }
        if text2sql.max_sql_length == 0 {
            return Err(invalid("agents.text2sql.max_sql_length", "must be at least 1"));
        }
        if text2sql.model.trim().is_empty() {
            return Err(invalid("agents.text2sql.model", "cannot be empty"));
        }

        if config.llm.timeout_secs == 0 {
            return Err(invalid("llm.timeout_secs", "must be at least 1"));
        }
        if config.llm.requests_per_minute == 0 {
            return Err(invalid("llm.requests_per_minute", "must be at least 1"));
        }

        if config.database.url.trim().is_empty() {
            return Err(invalid("database.url", "cannot be empty"));
        }
        if config.database.max_connections == 0 {
            return Err(invalid("database.max_connections", "must be at least 1"));
        }
        if config.database.query_timeout_secs == 0 {
            return Err(invalid("database.query_timeout_secs", "must be at least 1"));
        }
        if config.database.max_rows == 0 {
            return Err(invalid("database.max_rows", "must be at least 1"));
        }

        if !VALID_LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(invalid(
                "logging.level",
                format!(
                    "{}; must be one of: {}",
                    config.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        for (keyword, target) in &config.task_routing {
            if keyword.trim().is_empty() || target.trim().is_empty() {
                return Err(ConfigurationError::InvalidRoutingRule(format!(
                    "task_routing entry '{keyword}' -> '{target}' has an empty side"
                )));
            }
        }

        Ok(())
    }

    /// Resolve the gateway API key: configuration first, then the
    /// `ANTHROPIC_API_KEY` environment variable.
    pub fn resolve_api_key(config: &Config) -> Result<Option<String>, ConfigurationError> {
        let configured = config
            .llm
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        let key = configured.or_else(|| {
            std::env::var(API_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty())
        });

        match (config.llm.provider, key) {
            (LlmProvider::Anthropic, None) => {
                Err(ConfigurationError::MissingApiKey("anthropic".to_string()))
            }
            (_, key) => Ok(key),
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.database.url, "sqlite:.sqlpilot/data.db");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_load_from_file_merges_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
task_routing:
  "how many": text2sql
database:
  url: "sqlite:/tmp/shop.db"
  max_rows: 50
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.database.url, "sqlite:/tmp/shop.db");
        assert_eq!(config.database.max_rows, 50);
        assert_eq!(config.database.query_timeout_secs, 5);
        assert_eq!(config.task_routing.len(), 1);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let result = ConfigLoader::load_from_file("/nonexistent/sqlpilot.yaml");
        assert!(matches!(result, Err(ConfigurationError::Load(_))));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigurationError::InvalidValue { field, .. }) => assert_eq!(field, "logging.level"),
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.database.query_timeout_secs = 0;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = Config::default();
        config.database.max_rows = 0;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = Config::default();
        config.llm.requests_per_minute = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_temperature_range() {
        let mut config = Config::default();
        config.agents.text2sql.temperature = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_empty_task_routing_target() {
        let mut config = Config::default();
        config.task_routing.insert("how many".into(), " ".into());
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigurationError::InvalidRoutingRule(_))
        ));
    }

    #[test]
    fn test_resolve_api_key_prefers_config() {
        let mut config = Config::default();
        config.llm.api_key = Some("from-config".into());
        temp_env::with_var(API_KEY_ENV, Some("from-env"), || {
            assert_eq!(
                ConfigLoader::resolve_api_key(&config).unwrap().as_deref(),
                Some("from-config")
            );
        });
    }

    #[test]
    fn test_resolve_api_key_falls_back_to_env() {
        let config = Config::default();
        temp_env::with_var(API_KEY_ENV, Some("from-env"), || {
            assert_eq!(
                ConfigLoader::resolve_api_key(&config).unwrap().as_deref(),
                Some("from-env")
            );
        });
        temp_env::with_var_unset(API_KEY_ENV, || {
            assert!(matches!(
                ConfigLoader::resolve_api_key(&config),
                Err(ConfigurationError::MissingApiKey(_))
            ));
        });
    }

    #[test]
    fn test_mock_provider_needs_no_key() {
        let mut config = Config::default();
        config.llm.provider = LlmProvider::Mock;
        temp_env::with_var_unset(API_KEY_ENV, || {
            assert_eq!(ConfigLoader::resolve_api_key(&config).unwrap(), None);
        });
    }
}
