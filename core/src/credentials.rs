//! Storage for the session credential.
//!
//! The credential is injected into whatever needs it (the http service) instead of living in a global.
//! It is hydrated once at start-up and torn down on logout or when the service rejects it.

use std::{
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::CredentialError;

const CREDENTIAL_FILE: &str = "session.json";

/// A logged in session.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub username: String,
}

pub trait CredentialProvider: Send + Sync + 'static {
    /// The current credential, if the user is logged in.
    fn current(&self) -> Option<Credential>;
    /// Replace the current credential.
    ///
    /// # Errors
    ///
    /// Fails if the credential could not be persisted.
    fn store(&self, credential: Credential) -> Result<(), CredentialError>;
    /// Forget the current credential.
    ///
    /// # Errors
    ///
    /// Fails if the persisted credential could not be removed.
    fn clear(&self) -> Result<(), CredentialError>;
}

/// Keeps the credential in memory only, it is gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    credential: RwLock<Option<Credential>>,
}

impl MemoryCredentials {
    #[must_use]
    pub const fn new(credential: Option<Credential>) -> Self {
        Self {
            credential: RwLock::new(credential),
        }
    }
}

impl CredentialProvider for MemoryCredentials {
    fn current(&self) -> Option<Credential> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, credential: Credential) -> Result<(), CredentialError> {
        *self.credential.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        self.credential
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

/// Persists the credential as a json file, and keeps a copy in memory.
#[derive(Debug)]
pub struct FileCredentials {
    path: PathBuf,
    cache: MemoryCredentials,
}

impl FileCredentials {
    /// Load the credential persisted at `path`, if there is one.
    ///
    /// A missing file means "logged out". A file that can't be parsed is treated the same way,
    /// and is logged, the user will just have to log in again.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but can't be read.
    pub fn hydrate(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();

        let credential = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Credential>(&contents) {
                Ok(credential) => Some(credential),
                Err(e) => {
                    warn!("ignoring malformed credential file {}: {e}", path.display());
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        debug!("hydrated credential from {} (logged in: {})", path.display(), credential.is_some());

        Ok(Self {
            path,
            cache: MemoryCredentials::new(credential),
        })
    }

    /// The default location of the credential file, inside the data directory.
    ///
    /// # Errors
    ///
    /// Fails if the data directory can't be found.
    pub fn default_path() -> Result<PathBuf, CredentialError> {
        Ok(crate::get_data_dir()?.join(CREDENTIAL_FILE))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialProvider for FileCredentials {
    fn current(&self) -> Option<Credential> {
        self.cache.current()
    }

    fn store(&self, credential: Credential) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&credential)?)?;
        self.cache.store(credential)
    }

    fn clear(&self) -> Result<(), CredentialError> {
        self.cache.clear()?;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
