//! Short messages for the user, e.g. why the last action failed.

use std::fmt;

use songswap_core::errors::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    /// The message of the service if it sent one, `fallback` otherwise.
    ///
    /// Authentication failures are not shown to the user: they end the session instead.
    #[must_use]
    pub fn from_service(error: &ServiceError, fallback: &str) -> Option<Self> {
        (!error.is_auth()).then(|| Self::error(error.user_message(fallback)))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Info => write!(f, "{}", self.message),
            Level::Error => write!(f, "error: {}", self.message),
        }
    }
}
