//! Load: config loading from file and environment variables.

use std::fs;
use std::path::Path;

use super::error::ConfigError;
use super::model::TraceConfig;

/// Environment variable naming the config file.
pub const CONFIG_FILE_ENV: &str = "BLUETRACE_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "bluetrace.toml";

impl TraceConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var(CONFIG_FILE_ENV)
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&config_path)
    }

    /// Same as [`TraceConfig::load`] with an explicit file path.
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let mut config = if Path::new(config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(config_path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", config_path);
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    fn from_toml_str(contents: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Environment variables override file values for critical settings
    fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(output) = lookup("BLUETRACE_OUTPUT") {
            self.output.path = Some(output);
        }
        if let Some(flush) = lookup("BLUETRACE_FLUSH_ON_EOF").and_then(|s| s.parse().ok()) {
            self.flush_on_eof = flush;
        }
        if let Some(pattern) = lookup("BLUETRACE_FILTER") {
            self.filter.pattern = Some(pattern);
        }
    }

    /// Validate that configuration values are sane
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_sizes.is_empty() {
            return Err(ConfigError::Invalid("block_sizes must not be empty".to_string()));
        }
        if self.block_sizes.contains(&0) {
            return Err(ConfigError::Invalid("block_sizes must all be > 0".to_string()));
        }
        if self.max_line_size == 0 {
            return Err(ConfigError::Invalid("max_line_size must be > 0".to_string()));
        }
        if let Some(ms) = self.min_elapsed_ms {
            if ms.is_nan() || ms < 0.0 {
                return Err(ConfigError::Invalid("min_elapsed_ms must be >= 0".to_string()));
            }
        }
        if self.filter.pattern.is_some() && !self.record_raw_lines {
            return Err(ConfigError::Invalid(
                "filter.pattern needs record_raw_lines = true".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "block_sizes = [4096]\nrecord_raw_lines = false\n\n[output]\npretty = true").unwrap();

        let config = TraceConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.block_sizes, vec![4096]);
        assert!(!config.record_raw_lines);
        assert!(config.output.pretty);
    }

    #[test]
    fn test_from_file_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "block_sizes = \"lots\"").unwrap();

        let err = TraceConfig::from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = TraceConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.block_sizes, vec![512, 4096]);
    }

    #[test]
    fn test_from_file_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TraceConfig::from_file(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BLUETRACE_OUTPUT", "/tmp/out.json"),
            ("BLUETRACE_FLUSH_ON_EOF", "true"),
            ("BLUETRACE_FILTER", "deferred"),
        ]);
        let mut config = TraceConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.output.path.as_deref(), Some("/tmp/out.json"));
        assert!(config.flush_on_eof);
        assert_eq!(config.filter.pattern.as_deref(), Some("deferred"));
    }

    #[test]
    fn test_unparseable_override_ignored() {
        let mut config = TraceConfig::default();
        config.apply_overrides(|key| (key == "BLUETRACE_FLUSH_ON_EOF").then(|| "maybe".to_string()));
        assert!(!config.flush_on_eof);
    }

    #[test]
    fn test_validate() {
        assert!(TraceConfig::default().validate().is_ok());

        let bad = [
            TraceConfig { block_sizes: vec![], ..TraceConfig::default() },
            TraceConfig { block_sizes: vec![512, 0], ..TraceConfig::default() },
            TraceConfig { max_line_size: 0, ..TraceConfig::default() },
            TraceConfig { min_elapsed_ms: Some(-1.0), ..TraceConfig::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_validate_filter_needs_raw_lines() {
        let mut config = TraceConfig { record_raw_lines: false, ..TraceConfig::default() };
        config.filter.pattern = Some("x".into());
        assert!(config.validate().is_err());
    }
}
