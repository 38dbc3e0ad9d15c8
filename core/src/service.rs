//! This module contains the remote service definition.
//!
//! The client only ever talks to the service through the [`SongSwap`] trait, so the transport
//! (see [`crate::http`]) can be swapped out, e.g. for an in-memory fake in tests.

use std::future::Future;

use crate::{
    errors::ServiceError,
    models::{AuthResponse, Chain, ChainId, Credentials, Discovery, Song, SongId, SubmitSongRequest},
};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// The capabilities of the songswap service.
///
/// Calls that need a session credential get it from whatever credential provider the
/// implementation was built with, and fail with [`ServiceError::Auth`] when there is none.
pub trait SongSwap: Send + Sync + 'static {
    // accounts
    /// Create an account and log into it.
    fn register(&self, credentials: Credentials) -> impl Future<Output = ServiceResult<AuthResponse>> + Send;
    /// Log into an existing account.
    fn login(&self, credentials: Credentials) -> impl Future<Output = ServiceResult<AuthResponse>> + Send;

    // discovery
    /// Get a random song the user hasn't seen yet, optionally only from the given chain.
    fn discover(&self, chain: Option<ChainId>) -> impl Future<Output = ServiceResult<Song>> + Send;
    /// Like a discovered song.
    fn like_song(&self, song: SongId) -> impl Future<Output = ServiceResult<()>> + Send;
    /// Take back a like.
    fn unlike_song(&self, song: SongId) -> impl Future<Output = ServiceResult<()>> + Send;
    /// Every song the user has discovered, newest first.
    fn get_history(&self) -> impl Future<Output = ServiceResult<Vec<Discovery>>> + Send;

    // the pool
    /// Add a song to the pool (and to a chain, if one is given).
    fn submit_song(&self, request: SubmitSongRequest) -> impl Future<Output = ServiceResult<Song>> + Send;

    // chains
    /// All chains, newest first.
    fn get_chains(&self) -> impl Future<Output = ServiceResult<Vec<Chain>>> + Send;
    /// The songs in a chain, most recently added first.
    fn get_chain_songs(&self, chain: ChainId) -> impl Future<Output = ServiceResult<Vec<Song>>> + Send;
    fn create_chain(
        &self,
        name: String,
        description: Option<String>,
    ) -> impl Future<Output = ServiceResult<Chain>> + Send;
    /// Add an existing song to a chain. Adding a song that is already there is not an error.
    fn add_song_to_chain(&self, chain: ChainId, song: SongId) -> impl Future<Output = ServiceResult<()>> + Send;
    /// Remove a song from a chain, only the chain's creator may do this.
    fn remove_song_from_chain(
        &self,
        chain: ChainId,
        song: SongId,
    ) -> impl Future<Output = ServiceResult<()>> + Send;
}
