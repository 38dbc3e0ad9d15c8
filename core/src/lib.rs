use std::path::PathBuf;

use errors::DirectoryError;

pub mod config;
pub mod credentials;
pub mod embed;
pub mod errors;
#[cfg(feature = "http")]
pub mod http;
pub mod logger;
pub mod models;
pub mod service;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

/// Get the directory where songswap keeps its configuration.
///
/// On linux this is `$XDG_CONFIG_HOME/songswap` (usually `~/.config/songswap`).
///
/// # Errors
///
/// Fails if the home directory of the current user cannot be determined.
#[inline]
pub fn get_config_dir() -> Result<PathBuf, DirectoryError> {
    directories::ProjectDirs::from("", "", "songswap")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(DirectoryError::Config)
}

/// Get the directory where songswap keeps persisted session data (the login credential).
///
/// # Errors
///
/// Fails if the home directory of the current user cannot be determined.
#[inline]
pub fn get_data_dir() -> Result<PathBuf, DirectoryError> {
    directories::ProjectDirs::from("", "", "songswap")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(DirectoryError::Data)
}

/// Format a duration as `seconds.millis`, used by the logger.
#[must_use]
pub fn format_duration(duration: &std::time::Duration) -> String {
    format!("{}.{:03}", duration.as_secs(), duration.subsec_millis())
}
