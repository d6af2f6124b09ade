use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sitemap_ripple::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChangeFrequency;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
max-depth = 2
max-pages = 50
include-images = false
change-frequency = "daily"
priority = 0.5
batch-size = 10

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "2.1"
contact-url = "https://example.com/about"

[storage]
database-path = "./test.db"
ttl = 600
max-snapshot-bytes = 1048576

[output]
sitemap-path = "./out.xml"
pretty = false
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_depth, 2);
        assert_eq!(config.crawler.max_pages, 50);
        assert!(!config.crawler.include_images);
        assert_eq!(config.crawler.change_frequency, ChangeFrequency::Daily);
        assert_eq!(config.crawler.batch_size, 10);
        assert_eq!(config.crawler.concurrent_batches, 3);
        assert_eq!(config.user_agent.crawler_name, "TestCrawler");
        assert_eq!(config.storage.ttl, 600);
        assert_eq!(config.storage.max_snapshot_bytes, Some(1_048_576));
        assert_eq!(config.storage.retain_on_overflow, 100);
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.crawler.max_depth, 3);
        assert_eq!(config.crawler.max_pages, 2000);
        assert_eq!(config.user_agent.user_agent(), "SitemapGenerator/1.0");
        assert_eq!(config.output.sitemap_path, "./sitemap.xml");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawler]
max-depth = 40
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_unknown_change_frequency_rejected() {
        let result = parse_config("[crawler]\nchange-frequency = \"sometimes\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
