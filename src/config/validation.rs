use crate::config::types::{Config, CrawlerConfig, OutputConfig, StorageConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Deepest crawl a configuration may ask for
pub const MAX_DEPTH_LIMIT: u32 = 32;

/// Largest batch size and batch count
pub const MAX_BATCH_LIMIT: usize = 50;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
pub fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_depth > MAX_DEPTH_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_depth must be at most {}, got {}",
            MAX_DEPTH_LIMIT, config.max_depth
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if !(0.0..=1.0).contains(&config.priority) {
        return Err(ConfigError::Validation(format!(
            "priority must be between 0.0 and 1.0, got {}",
            config.priority
        )));
    }

    if config.request_timeout < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 100ms, got {}ms",
            config.request_timeout
        )));
    }

    for (name, value) in [
        ("batch_size", config.batch_size),
        ("concurrent_batches", config.concurrent_batches),
    ] {
        if !(1..=MAX_BATCH_LIMIT).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_BATCH_LIMIT, value
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::Validation(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.retain_on_overflow < 1 {
        return Err(ConfigError::Validation(
            "retain_on_overflow must be >= 1".to_string(),
        ));
    }

    if config.max_snapshot_bytes == Some(0) {
        return Err(ConfigError::Validation(
            "max_snapshot_bytes must be > 0 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.sitemap_path.is_empty() {
        return Err(ConfigError::Validation(
            "sitemap_path cannot be empty".to_string(),
        ));
    }

    if let Some(hostname) = &config.hostname {
        let url = Url::parse(hostname)
            .map_err(|e| ConfigError::Validation(format!("Invalid hostname '{}': {}", hostname, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "hostname '{}' must use http or https",
                hostname
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_crawler_bounds() {
        let check = |f: fn(&mut CrawlerConfig)| {
            let mut config = CrawlerConfig::default();
            f(&mut config);
            validate_crawler_config(&config)
        };

        assert!(check(|c| c.max_depth = 32).is_ok());
        assert!(check(|c| c.max_depth = 33).is_err());
        assert!(check(|c| c.max_pages = 0).is_err());
        assert!(check(|c| c.priority = 1.5).is_err());
        assert!(check(|c| c.priority = -0.1).is_err());
        assert!(check(|c| c.request_timeout = 99).is_err());
        assert!(check(|c| c.batch_size = 0).is_err());
        assert!(check(|c| c.batch_size = 51).is_err());
        assert!(check(|c| c.concurrent_batches = 50).is_ok());
    }

    #[test]
    fn test_crawler_name() {
        let mut agent = UserAgentConfig::default();
        assert!(validate_user_agent_config(&agent).is_ok());

        agent.crawler_name = "My-Bot2".to_string();
        assert!(validate_user_agent_config(&agent).is_ok());

        agent.crawler_name = "my bot".to_string();
        assert!(validate_user_agent_config(&agent).is_err());

        agent.crawler_name = String::new();
        assert!(validate_user_agent_config(&agent).is_err());
    }

    #[test]
    fn test_contact_url() {
        let agent = UserAgentConfig {
            contact_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(validate_user_agent_config(&agent).is_err());
    }

    #[test]
    fn test_output_hostname() {
        let mut output = OutputConfig::default();
        output.hostname = Some("https://example.com".to_string());
        assert!(validate_output_config(&output).is_ok());

        output.hostname = Some("ftp://example.com".to_string());
        assert!(validate_output_config(&output).is_err());
    }
}
