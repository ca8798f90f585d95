use crate::analysis::selectors::validate_selector_syntax;
use crate::config::types::{AuthConfig, AuthType, Config, FiltersConfig, PolitenessConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration. Invalid regex, an empty/unparseable
/// seed list, or an unreachable login configuration are `FatalConfig`
/// (§7): the session never starts.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_seeds(&config.seeds)?;
    validate_politeness(&config.politeness)?;
    validate_filters(&config.filters)?;
    validate_auth(&config.authentication)?;
    validate_user_agent(&config.user_agent.crawler_name)?;
    for rule in config.custom_search.iter().chain(config.custom_extraction.iter()) {
        validate_selector_syntax(&rule.selector).map_err(|e| {
            ConfigError::Validation(format!("custom rule '{}': {}", rule.name, e))
        })?;
    }
    Ok(())
}

fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }
    for seed in seeds {
        let url = Url::parse(seed).map_err(|_| ConfigError::InvalidUrl(seed.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(seed.clone()));
        }
    }
    Ok(())
}

fn validate_politeness(config: &PolitenessConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 {
        return Err(ConfigError::Validation(
            "politeness.concurrency must be >= 1".to_string(),
        ));
    }
    if config.requests_per_second <= 0.0 {
        return Err(ConfigError::Validation(
            "politeness.requests-per-second must be > 0".to_string(),
        ));
    }
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "politeness.timeout-secs must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_filters(config: &FiltersConfig) -> Result<(), ConfigError> {
    for pattern in config.include_patterns.iter().chain(config.exclude_patterns.iter()) {
        Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidPattern(format!("{pattern}: {e}")))?;
    }
    Ok(())
}

fn validate_auth(config: &AuthConfig) -> Result<(), ConfigError> {
    match config.auth_type {
        AuthType::None => {}
        AuthType::Basic => {
            if config.username.is_none() || config.password.is_none() {
                return Err(ConfigError::Validation(
                    "basic auth requires username and password".to_string(),
                ));
            }
        }
        AuthType::Bearer => {
            if config.token.is_none() {
                return Err(ConfigError::Validation(
                    "bearer auth requires a token".to_string(),
                ));
            }
        }
        AuthType::Cookie => {
            if config.cookie_files.is_empty() {
                return Err(ConfigError::Validation(
                    "cookie auth requires at least one cookie file".to_string(),
                ));
            }
        }
        AuthType::Form => {
            let login_url = config.login_url.as_ref().ok_or_else(|| {
                ConfigError::Validation("form auth requires a login-url".to_string())
            })?;
            Url::parse(login_url).map_err(|_| ConfigError::InvalidUrl(login_url.clone()))?;
            if config.success_url.is_none() && config.success_text.is_none() {
                return Err(ConfigError::Validation(
                    "form auth requires success-url or success-text".to_string(),
                ));
            }
            if config.form_fields.is_empty() {
                return Err(ConfigError::Validation(
                    "form auth requires at least one form field".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn validate_user_agent(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.crawler-name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{OutputConfig, UserAgentConfig};

    fn base_config() -> Config {
        Config {
            seeds: vec!["https://example.com/".to_string()],
            traversal: Default::default(),
            politeness: Default::default(),
            redirects: Default::default(),
            robots: Default::default(),
            filters: Default::default(),
            normalisation: Default::default(),
            authentication: Default::default(),
            storage_flags: Default::default(),
            thresholds: Default::default(),
            custom_search: Vec::new(),
            custom_extraction: Vec::new(),
            user_agent: UserAgentConfig {
                crawler_name: "TestBot".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            output: OutputConfig {
                database_path: "./test.db".to_string(),
                summary_path: "./summary.md".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_empty_seeds_rejected() {
        let mut config = base_config();
        config.seeds.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_non_http_seed_rejected() {
        let mut config = base_config();
        config.seeds = vec!["ftp://example.com/".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = base_config();
        config.politeness.concurrency = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let mut config = base_config();
        config.filters.include_patterns.push("(".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_form_auth_without_login_url_rejected() {
        let mut config = base_config();
        config.authentication.auth_type = AuthType::Form;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_basic_auth_without_credentials_rejected() {
        let mut config = base_config();
        config.authentication.auth_type = AuthType::Basic;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_custom_selector_rejected() {
        let mut config = base_config();
        config.custom_search.push(crate::config::types::CustomRule {
            name: "bad".to_string(),
            selector: "div > p".to_string(),
        });
        assert!(validate(&config).is_err());
    }
}
