use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use validator::Validate;

use crate::core::compiler::FieldMapping;
use crate::core::parser::DEFAULT_MAX_DEPTH;
use crate::core::retrieval::DEFAULT_PAGE_SIZE;
use crate::services::ElasticsearchOptions;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub elasticsearch: ElasticsearchSettings,
    #[serde(default)]
    pub fields: FieldMapping,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElasticsearchSettings {
    pub endpoint: String,
    #[serde(default = "default_index")]
    pub index: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ElasticsearchSettings {
    pub fn to_options(&self) -> ElasticsearchOptions {
        ElasticsearchOptions {
            endpoint: self.endpoint.clone(),
            index: self.index.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            api_key: self.api_key.clone(),
            timeout_secs: self.timeout_secs.unwrap_or(30),
        }
    }
}

fn default_index() -> String { "submissions".to_string() }

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RetrievalSettings {
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 10000))]
    pub page_size: u64,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_page_size() -> u64 { DEFAULT_PAGE_SIZE }
fn default_max_depth() -> usize { DEFAULT_MAX_DEPTH }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with TARGETING__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., TARGETING__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("TARGETING")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_env_shortcuts(settings)?;

        settings.try_deserialize::<Self>()?.checked()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("TARGETING")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize::<Self>()?.checked()
    }

    /// Reject values the service cannot run with
    fn checked(self) -> Result<Self, ConfigError> {
        self.retrieval
            .validate()
            .map_err(|errors| ConfigError::Message(format!("Invalid retrieval settings: {}", errors)))?;
        Ok(self)
    }
}

/// Apply the conventional, unprefixed variables deployment tooling sets
fn apply_env_shortcuts(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("ELASTICSEARCH_URL") {
        builder = builder.set_override("elasticsearch.endpoint", url)?;
    }
    if let Ok(api_key) = env::var("ELASTICSEARCH_API_KEY") {
        builder = builder.set_override("elasticsearch.api_key", api_key)?;
    }
    if let Ok(level) = env::var("LOG_LEVEL") {
        builder = builder.set_override("logging.level", level)?;
    }
    if let Ok(format) = env::var("LOG_FORMAT") {
        builder = builder.set_override("logging.format", format)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_retrieval() {
        let retrieval = RetrievalSettings::default();
        assert_eq!(retrieval.page_size, 1000);
        assert_eq!(retrieval.max_depth, 32);
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_minimal_file_fills_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                r#"
                [server]
                host = "127.0.0.1"
                port = 8080

                [elasticsearch]
                endpoint = "http://localhost:9200"

                [fields]
                geo_query = "geo_shape"
                "#,
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.elasticsearch.index, "submissions");
        assert_eq!(settings.fields.server_time, "serverTime");
        assert_eq!(settings.fields.geo_query, crate::core::GeoQueryStyle::GeoShape);
        assert_eq!(settings.retrieval.page_size, 1000);
        assert_eq!(settings.elasticsearch.to_options().timeout_secs, 30);
    }

    fn with_page_size(page_size: &str) -> Result<Settings, ConfigError> {
        Config::builder()
            .add_source(File::from_str(
                &format!(
                    r#"
                    [server]
                    host = "127.0.0.1"
                    port = 8080

                    [elasticsearch]
                    endpoint = "http://localhost:9200"

                    [retrieval]
                    page_size = {}
                    "#,
                    page_size
                ),
                FileFormat::Toml,
            ))
            .build()?
            .try_deserialize::<Settings>()?
            .checked()
    }

    #[test]
    fn test_page_size_bounds_are_enforced() {
        assert_eq!(with_page_size("1").unwrap().retrieval.page_size, 1);
        assert_eq!(with_page_size("10000").unwrap().retrieval.page_size, 10000);
        assert!(with_page_size("0").is_err());
        assert!(with_page_size("10001").is_err());
        assert!(with_page_size("9223372036854775808").is_err());
    }
}
