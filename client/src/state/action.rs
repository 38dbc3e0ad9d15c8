//! This module contains the actions that the user can perform.
//! these actions are sent from the front-end to the state stores, which then update the state accordingly.
#![allow(clippy::module_name_repetitions)]

use songswap_core::models::{Chain, ChainId, SongId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// General actions
    General(GeneralAction),
    /// Actions that effect the session store.
    Session(SessionAction),
    /// Actions that effect the chain catalogue store.
    Catalogue(CatalogueAction),
    /// Actions that effect the history store.
    History(HistoryAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneralAction {
    /// Exit the application.
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// One song at a time
    Discovery(DiscoveryAction),
    /// The listing of the active chain
    Chain(ChainAction),
    /// The song submission form
    Submission(SubmissionAction),
    /// Forget the current notice.
    DismissNotice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryAction {
    /// Ask for another song, optionally only from the given chain.
    Next(Option<ChainId>),
    /// Like the song being presented.
    Like,
    /// Take back the like on the song being presented.
    Unlike,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainAction {
    /// Switch to the listing of the given chain.
    Activate(Chain),
    /// Go back to discovering one song at a time.
    Deactivate,
    /// Highlight a random song of the listing.
    Shuffle,
    /// Like one of the songs of the listing.
    Like(SongId),
    /// Add a song to the active chain.
    AddSong(SongId),
    /// Remove a song from the active chain.
    RemoveSong(SongId),
    /// Fetch the listing again.
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionAction {
    Open,
    /// Close the form, what was typed is kept.
    Close,
    SetUrl(String),
    SetContext(String),
    /// Send the song. Without a chain, the active chain (if any) is used.
    Submit(Option<ChainId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogueAction {
    /// Fetch every chain.
    Load,
    /// Create a new chain.
    Create {
        name: String,
        description: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    /// Fetch the discovery history.
    Load,
}
