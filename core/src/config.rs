//! Handles the configuration of the client.
//!
//! this module is responsible for parsing the Songswap.toml file, layering environment variables
//! and cli arguments on top of it.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use std::{path::PathBuf, str::FromStr, time::Duration};

pub static DEFAULT_CONFIG: &str = include_str!("../Songswap.toml");

#[derive(Clone, Debug, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    /// How to reach the songswap service
    #[serde(default)]
    pub service: ServiceSettings,
    /// Settings for the discovery session
    #[serde(default)]
    pub client: ClientSettings,
}

impl Settings {
    /// Load settings from the config file, environment variables, and CLI arguments.
    ///
    /// The environment variables are prefixed with `SONGSWAP_`, and nested keys are separated by `__`
    /// (e.g. `SONGSWAP_SERVICE__API_URL`).
    ///
    /// # Errors
    ///
    /// This function will return an error if the config file is not found or if the config file is
    /// invalid.
    #[inline]
    pub fn init(
        config: PathBuf,
        api_url: Option<String>,
        log_level: Option<log::LevelFilter>,
    ) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from(config))
            .add_source(Environment::with_prefix("SONGSWAP").separator("__"))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        if let Some(api_url) = api_url {
            settings.service.api_url = api_url;
        }

        if let Some(log_level) = log_level {
            settings.service.log_level = log_level;
        }

        Ok(settings)
    }

    /// Get the (default) path to the config file.
    /// If the config file does not exist at this path, it will be created with the default config.
    ///
    /// See [`crate::get_config_dir`] for more information about where this default path is located.
    ///
    /// # Errors
    ///
    /// This function will return an error if the system config directory (e.g., `~/.config` on linux) could not be found, or if the config file was missing and could not be created.
    #[inline]
    pub fn get_config_path() -> Result<PathBuf, std::io::Error> {
        match crate::get_config_dir() {
            Ok(config_dir) => {
                // if the config directory does not exist, create it
                if !config_dir.exists() {
                    std::fs::create_dir_all(&config_dir)?;
                }
                let config_file = config_dir.join("Songswap.toml");

                if !config_file.exists() {
                    std::fs::write(&config_file, DEFAULT_CONFIG)?;
                }

                Ok(config_file)
            }
            Err(e) => {
                eprintln!("Error: {e}");
                Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Unable to find the config directory for songswap.",
                ))
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ServiceSettings {
    /// The base url of the songswap api.
    /// Default is "http://localhost:8080".
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Request timeout, in seconds.
    /// Default is 10.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// What level of logging to use.
    /// Default is "info".
    #[serde(default = "default_log_level")]
    #[serde(deserialize_with = "de_log_level")]
    pub log_level: log::LevelFilter,
}

impl ServiceSettings {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn de_log_level<'de, D>(deserializer: D) -> Result<log::LevelFilter, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(log::LevelFilter::from_str(&s).unwrap_or_else(|_| default_log_level()))
}

fn default_api_url() -> String {
    "http://localhost:8080".into()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_log_level() -> log::LevelFilter {
    log::LevelFilter::Info
}

impl Default for ServiceSettings {
    #[inline]
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct ClientSettings {
    /// How long a shuffled song in a chain stays highlighted, in milliseconds.
    /// Default is 2000.
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,
}

impl ClientSettings {
    #[must_use]
    pub const fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }
}

const fn default_highlight_ms() -> u64 {
    2000
}

impl Default for ClientSettings {
    #[inline]
    fn default() -> Self {
        Self {
            highlight_ms: default_highlight_ms(),
        }
    }
}
