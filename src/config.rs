use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Newest scraping profile layout this build understands.
pub const SUPPORTED_PROFILE_VERSION: u32 = 1;

pub const CONFIG_ENV_VAR: &str = "EXIF_INSPECTOR_CONFIG";
const ENV_PREFIX: &str = "EXIF_INSPECTOR";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub search: SearchProfile,
    pub driver: DriverConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: String::from("info"),
            search: SearchProfile::default(),
            driver: DriverConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `exif-inspector.*` in the working directory, then the file named
    /// by `EXIF_INSPECTOR_CONFIG`, then environment variables such as
    /// `EXIF_INSPECTOR_SEARCH__ELEMENT_TIMEOUT_SECS`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().add_source(File::with_name("exif-inspector").required(false));

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::with_name(&path));
        }

        let config: Self = builder
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.version > SUPPORTED_PROFILE_VERSION {
            return Err(ConfigError::Message(format!(
                "search profile version {} is newer than the supported version {}",
                self.search.version, SUPPORTED_PROFILE_VERSION
            )));
        }

        if self.search.max_results == 0 {
            return Err(ConfigError::Message(String::from(
                "search.max_results must be at least 1",
            )));
        }

        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// CSS selectors the scraper relies on. The target site changes its markup without
/// notice, so these live in configuration rather than code.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SearchSelectors {
    pub search_by_image: String,
    pub upload_input: String,
    pub results: String,
    pub links: String,
}

impl Default for SearchSelectors {
    fn default() -> Self {
        Self {
            search_by_image: String::from("div[aria-label='Search by image']"),
            upload_input: String::from("input[type='file']"),
            results: String::from("div[data-lpage], div.g"),
            links: String::from("a[href]"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SearchProfile {
    pub version: u32,
    pub home_url: String,
    pub selectors: SearchSelectors,
    pub max_results: usize,
    pub settle_delay_ms: u64,
    pub element_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for SearchProfile {
    fn default() -> Self {
        Self {
            version: SUPPORTED_PROFILE_VERSION,
            home_url: String::from("https://images.google.com/"),
            selectors: SearchSelectors::default(),
            max_results: 5,
            settle_delay_ms: 3_000,
            element_timeout_secs: 10,
            poll_interval_ms: 250,
        }
    }
}

impl SearchProfile {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DriverConfig {
    /// Explicit chromedriver binary. Falls back to `CHROMEDRIVER`, then `PATH`.
    pub driver_path: Option<PathBuf>,
    /// Already running WebDriver server. When set no driver process is spawned.
    pub webdriver_url: Option<String>,
    pub headless: bool,
    pub browser_args: Vec<String>,
    pub startup_timeout_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            driver_path: None,
            webdriver_url: None,
            headless: true,
            browser_args: vec![
                String::from("--disable-gpu"),
                String::from("--window-size=1280,1024"),
            ],
            startup_timeout_secs: 10,
        }
    }
}

impl DriverConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.search.element_timeout(), Duration::from_secs(10));
        assert!(config.driver.headless);
    }

    #[test]
    fn newer_profile_version_is_rejected() {
        let mut config = AppConfig::default();
        config.search.version = SUPPORTED_PROFILE_VERSION + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_profile_keeps_defaults() {
        let loaded: AppConfig = Config::builder()
            .add_source(File::from_str(
                r#"{ "search": { "max_results": 3, "selectors": { "results": "div.result" } } }"#,
                config::FileFormat::Json,
            ))
            .build()
            .expect("config builds")
            .try_deserialize()
            .expect("config deserializes");

        assert_eq!(loaded.search.max_results, 3);
        assert_eq!(loaded.search.selectors.results, "div.result");
        assert_eq!(loaded.search.selectors.upload_input, "input[type='file']");
        assert_eq!(loaded.search.home_url, "https://images.google.com/");
        assert_eq!(loaded.log_level, "info");
    }

    #[test]
    fn environment_overrides_nested_keys() {
        let mut vars = config::Map::new();
        vars.insert(
            String::from("EXIF_INSPECTOR_SEARCH__ELEMENT_TIMEOUT_SECS"),
            String::from("20"),
        );
        vars.insert(String::from("EXIF_INSPECTOR_LOG_LEVEL"), String::from("debug"));

        let loaded: AppConfig = Config::builder()
            .add_source(environment().source(Some(vars)))
            .build()
            .expect("config builds")
            .try_deserialize()
            .expect("config deserializes");

        assert_eq!(loaded.search.element_timeout(), Duration::from_secs(20));
        assert_eq!(loaded.log_level, "debug");
        assert_eq!(loaded.search.max_results, 5);
    }
}
