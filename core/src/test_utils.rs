//! An in-memory [`SongSwap`] for tests, it records every call it gets
//! and answers with whatever the test scripted.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Semaphore;

use crate::{
    errors::ServiceError,
    models::{AuthResponse, Chain, ChainId, Credentials, Discovery, Song, SongId, SubmitSongRequest, User, UserId},
    service::{ServiceResult, SongSwap},
};

/// A call made against the [`MockService`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Register(String),
    Login(String),
    Discover(Option<ChainId>),
    Like(SongId),
    Unlike(SongId),
    History,
    Submit(SubmitSongRequest),
    Chains,
    ChainSongs(ChainId),
    CreateChain(String, Option<String>),
    AddSong(ChainId, SongId),
    RemoveSong(ChainId, SongId),
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    discover: VecDeque<ServiceResult<Song>>,
    like: VecDeque<ServiceResult<()>>,
    submit: VecDeque<ServiceResult<Song>>,
    history: Option<ServiceResult<Vec<Discovery>>>,
    chains: Option<ServiceResult<Vec<Chain>>>,
    chain_songs: HashMap<ChainId, ServiceResult<Vec<Song>>>,
    create_chain: VecDeque<ServiceResult<Chain>>,
    chain_edit: VecDeque<ServiceResult<()>>,
    gates: HashMap<ChainId, Arc<Semaphore>>,
}

/// A scripted, in-memory implementation of the songswap service.
///
/// Unscripted calls succeed where that makes sense (likes, chain edits),
/// and fail with [`ServiceError::NotFound`] otherwise.
#[derive(Default, Clone)]
pub struct MockService {
    script: Arc<Mutex<Script>>,
}

impl MockService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        f(&mut self.script.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    /// How many calls matched the predicate.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.with(|s| s.calls.iter().filter(|c| predicate(c)).count())
    }

    pub fn push_discover(&self, result: ServiceResult<Song>) {
        self.with(|s| s.discover.push_back(result));
    }

    pub fn push_like(&self, result: ServiceResult<()>) {
        self.with(|s| s.like.push_back(result));
    }

    pub fn push_submit(&self, result: ServiceResult<Song>) {
        self.with(|s| s.submit.push_back(result));
    }

    pub fn set_history(&self, result: ServiceResult<Vec<Discovery>>) {
        self.with(|s| s.history = Some(result));
    }

    pub fn set_chains(&self, result: ServiceResult<Vec<Chain>>) {
        self.with(|s| s.chains = Some(result));
    }

    pub fn set_chain_songs(&self, chain: ChainId, result: ServiceResult<Vec<Song>>) {
        self.with(|s| s.chain_songs.insert(chain, result));
    }

    pub fn push_create_chain(&self, result: ServiceResult<Chain>) {
        self.with(|s| s.create_chain.push_back(result));
    }

    pub fn push_chain_edit(&self, result: ServiceResult<()>) {
        self.with(|s| s.chain_edit.push_back(result));
    }

    /// Hold every `get_chain_songs` call for `chain` until [`Self::release`] is called.
    pub fn hold(&self, chain: ChainId) {
        self.with(|s| s.gates.insert(chain, Arc::new(Semaphore::new(0))));
    }

    /// Let one held `get_chain_songs` call for `chain` through.
    pub fn release(&self, chain: ChainId) {
        if let Some(gate) = self.with(|s| s.gates.get(&chain).cloned()) {
            gate.add_permits(1);
        }
    }

    fn record(&self, call: Call) {
        self.with(|s| s.calls.push(call));
    }
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("not scripted".into())
}

impl SongSwap for MockService {
    async fn register(&self, credentials: Credentials) -> ServiceResult<AuthResponse> {
        self.record(Call::Register(credentials.username.clone()));
        Ok(auth_response(&credentials.username))
    }

    async fn login(&self, credentials: Credentials) -> ServiceResult<AuthResponse> {
        self.record(Call::Login(credentials.username.clone()));
        Ok(auth_response(&credentials.username))
    }

    async fn discover(&self, chain: Option<ChainId>) -> ServiceResult<Song> {
        self.record(Call::Discover(chain));
        self.with(|s| s.discover.pop_front())
            .unwrap_or_else(|| Err(ServiceError::NotFound("No new songs to discover".into())))
    }

    async fn like_song(&self, song: SongId) -> ServiceResult<()> {
        self.record(Call::Like(song));
        self.with(|s| s.like.pop_front()).unwrap_or(Ok(()))
    }

    async fn unlike_song(&self, song: SongId) -> ServiceResult<()> {
        self.record(Call::Unlike(song));
        Ok(())
    }

    async fn get_history(&self) -> ServiceResult<Vec<Discovery>> {
        self.record(Call::History);
        self.with(|s| s.history.clone()).unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn submit_song(&self, request: SubmitSongRequest) -> ServiceResult<Song> {
        self.record(Call::Submit(request));
        self.with(|s| s.submit.pop_front()).unwrap_or_else(|| Err(not_found()))
    }

    async fn get_chains(&self) -> ServiceResult<Vec<Chain>> {
        self.record(Call::Chains);
        self.with(|s| s.chains.clone()).unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_chain_songs(&self, chain: ChainId) -> ServiceResult<Vec<Song>> {
        self.record(Call::ChainSongs(chain));
        if let Some(gate) = self.with(|s| s.gates.get(&chain).cloned()) {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.with(|s| s.chain_songs.get(&chain).cloned())
            .unwrap_or_else(|| Err(ServiceError::NotFound("Chain not found".into())))
    }

    async fn create_chain(&self, name: String, description: Option<String>) -> ServiceResult<Chain> {
        self.record(Call::CreateChain(name, description));
        self.with(|s| s.create_chain.pop_front()).unwrap_or_else(|| Err(not_found()))
    }

    async fn add_song_to_chain(&self, chain: ChainId, song: SongId) -> ServiceResult<()> {
        self.record(Call::AddSong(chain, song));
        self.with(|s| s.chain_edit.pop_front()).unwrap_or(Ok(()))
    }

    async fn remove_song_from_chain(&self, chain: ChainId, song: SongId) -> ServiceResult<()> {
        self.record(Call::RemoveSong(chain, song));
        self.with(|s| s.chain_edit.pop_front()).unwrap_or(Ok(()))
    }
}

/// A fixed point in time, so test data compares equal.
#[must_use]
pub fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

#[must_use]
pub fn song(id: i64, url: &str) -> Song {
    Song {
        id: SongId(id),
        url: url.to_owned(),
        platform: "other".to_owned(),
        context_crumb: None,
        submitted_by: None,
        created_at: timestamp(),
    }
}

#[must_use]
pub fn chain(id: i64, name: &str, song_count: u64) -> Chain {
    Chain {
        id: ChainId(id),
        name: name.to_owned(),
        description: None,
        created_by: UserId(1),
        creator_name: Some("halva".to_owned()),
        song_count,
        created_at: timestamp(),
    }
}

#[must_use]
pub fn discovery(song: Song, liked: Option<bool>) -> Discovery {
    Discovery {
        song,
        liked,
        discovered_at: timestamp(),
    }
}

fn auth_response(username: &str) -> AuthResponse {
    AuthResponse {
        token: format!("token-for-{username}"),
        user: User {
            id: UserId(1),
            username: username.to_owned(),
            created_at: timestamp(),
        },
    }
}
