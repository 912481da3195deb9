//! Run configuration
//!
//! A single YAML document describes one fetch setup: retry and backoff
//! settings, the pacing profile, the page cap, and optionally the HTTP
//! source and login endpoint. Every section has defaults, so an empty
//! file is a valid (if not very useful) config.
//!
//! Login body values may reference environment variables as `${VAR}`;
//! they are expanded when the file is loaded so credentials never have
//! to live in the config itself.

use crate::auth::LoginConfig;
use crate::error::{Error, Result};
use crate::http::SourceConfig;
use crate::pacing::PacingConfig;
use crate::pagination::PER_PAGE_CAP;
use crate::rate_limit::RateLimitConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

/// Regex for matching environment references: ${NAME}
static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}").unwrap());

// ============================================================================
// Fetch Config
// ============================================================================

/// Complete configuration loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Retry, backoff, and throttling settings
    pub rate_limit: RateLimitConfig,
    /// Human pacing settings
    pub pacing: PacingConfig,
    /// Largest batch requested per call
    pub page_cap: usize,
    /// HTTP feed source
    pub source: Option<SourceConfig>,
    /// Session login endpoint
    pub login: Option<LoginConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            pacing: PacingConfig::default(),
            page_cap: PER_PAGE_CAP,
            source: None,
            login: None,
        }
    }
}

impl FetchConfig {
    /// Parse a config from YAML, expanding `${VAR}` in login body values
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        if let Some(login) = config.login.as_mut() {
            for value in login.body.values_mut() {
                *value = expand_env(value)?;
            }
        }

        Ok(config)
    }

    /// Check every section's value ranges
    pub fn validate(&self) -> Result<()> {
        if self.page_cap == 0 {
            return Err(Error::invalid_value("page_cap", "must be at least 1"));
        }
        self.rate_limit.validate()?;
        self.pacing.validate()?;
        if let Some(source) = &self.source {
            source.validate()?;
        }
        if let Some(login) = &self.login {
            login.validate()?;
        }
        Ok(())
    }

    /// Get the source section or fail with a config error
    pub fn require_source(&self) -> Result<&SourceConfig> {
        self.source
            .as_ref()
            .ok_or_else(|| Error::config("Config has no 'source' section"))
    }
}

/// Load and validate a config file
pub fn load_config(path: impl AsRef<Path>) -> Result<FetchConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    let config = FetchConfig::from_yaml_str(&content)?;
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Environment Expansion
// ============================================================================

/// Expand `${VAR}` references from the process environment
pub fn expand_env(template: &str) -> Result<String> {
    expand_with(template, |name| std::env::var(name).ok())
}

/// Expand `${VAR}` references using `lookup`.
///
/// Every undefined name is reported in a single error.
pub fn expand_with<F>(template: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(template.len());
    let mut missing = Vec::new();
    let mut last = 0;

    for cap in ENV_VAR_REGEX.captures_iter(template) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        result.push_str(&template[last..whole.start()]);
        match lookup(name.as_str()) {
            Some(value) => result.push_str(&value),
            None => missing.push(name.as_str().to_string()),
        }
        last = whole.end();
    }
    result.push_str(&template[last..]);

    if missing.is_empty() {
        Ok(result)
    } else {
        Err(Error::config(format!(
            "Undefined environment variables: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::PacingProfile;
    use crate::types::BackoffType;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FetchConfig::from_yaml_str("").unwrap();
        assert_eq!(config, FetchConfig::default());
        assert_eq!(config.page_cap, 20);
        assert_eq!(config.rate_limit.max_retries, 3);
        assert_eq!(config.pacing.long_break_every, 10);
        assert!(config.source.is_none());
        assert!(config.login.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
rate_limit:
  max_retries: 5
  base_delay: 2.0
  backoff_type: linear
  jitter: false
  requests_per_minute: 30
pacing:
  profile:
    kind: uniform
  long_break_every: 5
page_cap: 10
source:
  base_url: https://feed.example.com/api
  items_path: results
login:
  login_url: https://feed.example.com/login
  body:
    username: alice
"#;
        let config = FetchConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.rate_limit.max_retries, 5);
        assert_eq!(config.rate_limit.backoff_type, BackoffType::Linear);
        assert!(!config.rate_limit.jitter);
        assert_eq!(config.rate_limit.requests_per_minute, Some(30));
        assert!(matches!(config.pacing.profile, PacingProfile::Uniform(_)));
        assert_eq!(config.pacing.long_break_every, 5);
        assert_eq!(config.page_cap, 10);

        let source = config.require_source().unwrap();
        assert_eq!(source.items_path, "results");
        assert_eq!(source.search_path, "/search");

        let login = config.login.as_ref().unwrap();
        assert_eq!(login.body.get("username").map(String::as_str), Some("alice"));
        assert_eq!(login.token_path, "access_token");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = FetchConfig::from_yaml_str("rate_limit: [1, 2");
        assert!(matches!(result, Err(Error::YamlParse(_))));
    }

    #[test]
    fn test_validate_page_cap() {
        let config = FetchConfig {
            page_cap: 0,
            ..FetchConfig::default()
        };
        match config.validate() {
            Err(Error::InvalidConfigValue { field, .. }) => assert_eq!(field, "page_cap"),
            other => panic!("Expected InvalidConfigValue, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_checks_sections() {
        let config = FetchConfig::from_yaml_str("source:\n  base_url: not a url\n").unwrap();
        assert!(config.validate().is_err());

        let config = FetchConfig::from_yaml_str("rate_limit:\n  base_delay: 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_require_source_missing() {
        assert!(FetchConfig::default().require_source().is_err());
    }

    #[test]
    fn test_expand_with() {
        let vars = lookup(&[("USER", "alice"), ("PASS", "s3cret")]);
        assert_eq!(expand_with("${USER}", &vars).unwrap(), "alice");
        assert_eq!(
            expand_with("u=${USER}:${ PASS }!", &vars).unwrap(),
            "u=alice:s3cret!"
        );
        assert_eq!(expand_with("plain", &vars).unwrap(), "plain");
        assert_eq!(expand_with("$USER", &vars).unwrap(), "$USER");
    }

    #[test]
    fn test_expand_with_reports_all_missing() {
        let vars = lookup(&[]);
        let err = expand_with("${A}-${B}", vars).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("A, B"), "{message}");
    }

    #[test]
    fn test_login_body_expanded_from_env() {
        std::env::set_var("FEEDPACE_TEST_LOGIN_USER", "bob");
        let yaml = r#"
login:
  login_url: https://feed.example.com/login
  body:
    username: "${FEEDPACE_TEST_LOGIN_USER}"
"#;
        let config = FetchConfig::from_yaml_str(yaml).unwrap();
        let login = config.login.unwrap();
        assert_eq!(login.body.get("username").map(String::as_str), Some("bob"));
    }

    #[test]
    fn test_login_body_missing_env_fails() {
        let yaml = r#"
login:
  login_url: https://feed.example.com/login
  body:
    password: "${FEEDPACE_TEST_DEFINITELY_UNSET}"
"#;
        assert!(FetchConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_cap: 5\nrate_limit:\n  max_retries: 1").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.page_cap, 5);
        assert_eq!(config.rate_limit.max_retries, 1);
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_cap: 0").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
