//! The data model shared by the remote service and the client.
//!
//! Everything here is owned by the service; the client only holds references to it by id,
//! or short-lived copies for display.

use std::{fmt, num::ParseIntError, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest chain name the service accepts.
pub const CHAIN_NAME_MAX_LEN: usize = 50;
/// Longest chain description the service accepts.
pub const CHAIN_DESCRIPTION_MAX_LEN: usize = 200;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Server assigned identifier of a [`Song`].
    SongId
);
id_type!(
    /// Server assigned identifier of a [`Chain`].
    ChainId
);
id_type!(UserId);

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
/// A song in the pool: a link to somewhere on the web, plus an optional note from whoever submitted it.
pub struct Song {
    /// the unique identifier for this [`Song`].
    pub id: SongId,

    /// The link as submitted, never rewritten.
    pub url: String,

    /// The platform the service classified the link as (`youtube`, `spotify`, `soundcloud`, `other`).
    pub platform: String,

    /// The short note attached on submission.
    #[serde(default)]
    pub context_crumb: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<UserId>,

    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
/// One song having been shown to the user.
pub struct Discovery {
    pub song: Song,
    /// `None` means the user never reacted to it.
    #[serde(default)]
    pub liked: Option<bool>,
    pub discovered_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
/// A named, user-created collection of songs sharing a theme.
pub struct Chain {
    pub id: ChainId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_by: UserId,
    #[serde(default)]
    pub creator_name: Option<String>,
    /// Maintained by the service, never recomputed locally.
    #[serde(default)]
    pub song_count: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
/// What the service answers to a successful login or registration.
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubmitSongRequest {
    pub url: String,
    pub context_crumb: Option<String>,
    pub chain_id: Option<ChainId>,
}

impl SubmitSongRequest {
    /// Build a request, dropping a blank context crumb.
    #[must_use]
    pub fn new(url: impl Into<String>, context_crumb: Option<String>, chain_id: Option<ChainId>) -> Self {
        Self {
            url: url.into(),
            context_crumb: context_crumb.filter(|crumb| !crumb.trim().is_empty()),
            chain_id,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CreateChainRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AddChainSongRequest {
    pub song_id: SongId,
}
