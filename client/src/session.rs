//! The discovery session: which song is presented, which chain is active, and what the user liked.
//!
//! [`Session`] never talks to the service itself. Operations that need the service return a
//! [`Request`] for the caller to perform, and the caller feeds the outcome back through
//! [`Session::apply`]. Requests that depend on the chain context carry the [`Generation`] they
//! were issued in, completions from an older generation are dropped.
//!
//! Nothing is changed optimistically: a song is only marked as liked once the service
//! acknowledged the like.

use std::collections::BTreeSet;

use log::{debug, warn};
use rand::{Rng, seq::SliceRandom};
use songswap_core::{
    errors::ServiceError,
    models::{Chain, ChainId, Song, SongId, SubmitSongRequest},
    service::ServiceResult,
};

use crate::notice::Notice;

/// Stamped on requests, bumped whenever their answer would no longer apply.
pub type Generation = u64;

/// Where single-song discovery is at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// No song shown yet.
    #[default]
    Idle,
    /// A song is shown, not liked.
    Presented(Song),
    /// A song is shown, and the service acknowledged the like.
    Liked(Song),
}

impl Phase {
    #[must_use]
    pub const fn song(&self) -> Option<&Song> {
        match self {
            Self::Idle => None,
            Self::Presented(song) | Self::Liked(song) => Some(song),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SingleSong {
    pub phase: Phase,
    /// A like or unlike of the presented song is waiting on the service.
    pub pending: bool,
}

/// A shuffled song, until the highlight with the same token expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Highlight {
    pub song: SongId,
    pub token: u64,
}

/// Every song of the active chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    pub chain: Chain,
    pub songs: Vec<Song>,
    /// The songs are being (re)loaded.
    pub loading: bool,
    pub liked: BTreeSet<SongId>,
    liking: BTreeSet<SongId>,
    pub highlight: Option<Highlight>,
    /// Token of the latest load, answers to earlier loads are dropped.
    load: u64,
}

impl Listing {
    const fn new(chain: Chain, load: u64) -> Self {
        Self {
            chain,
            songs: Vec::new(),
            loading: true,
            liked: BTreeSet::new(),
            liking: BTreeSet::new(),
            highlight: None,
            load,
        }
    }
}

/// Single-song discovery and the chain listing never coexist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Discovery(SingleSong),
    Chain(Listing),
}

impl Default for Mode {
    fn default() -> Self {
        Self::Discovery(SingleSong::default())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmissionForm {
    pub open: bool,
    pub url: String,
    pub context: String,
    pub submitting: bool,
}

/// A call to make to the service on behalf of the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Discover {
        chain: Option<ChainId>,
        generation: Generation,
    },
    Like(SongId),
    Unlike(SongId),
    ChainSongs {
        chain: ChainId,
        generation: Generation,
        load: u64,
    },
    LikeInChain {
        song: SongId,
        generation: Generation,
    },
    AddToChain {
        chain: ChainId,
        song: SongId,
        generation: Generation,
    },
    RemoveFromChain {
        chain: ChainId,
        song: SongId,
        generation: Generation,
    },
    Submit(SubmitSongRequest),
    /// Not a service call: report back once the highlight should be cleared.
    ExpireHighlight(u64),
}

/// The outcome of a [`Request`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    Discovered {
        generation: Generation,
        result: ServiceResult<Song>,
    },
    Liked {
        song: SongId,
        result: ServiceResult<()>,
    },
    Unliked {
        song: SongId,
        result: ServiceResult<()>,
    },
    ChainSongs {
        generation: Generation,
        load: u64,
        result: ServiceResult<Vec<Song>>,
    },
    LikedInChain {
        song: SongId,
        generation: Generation,
        result: ServiceResult<()>,
    },
    ChainEdited {
        generation: Generation,
        result: ServiceResult<()>,
    },
    Submitted(ServiceResult<Song>),
    HighlightExpired(u64),
}

impl Completion {
    /// The error, if the service rejected the session credential.
    #[must_use]
    pub fn auth_failure(&self) -> Option<&ServiceError> {
        let error = match self {
            Self::Discovered { result, .. } | Self::Submitted(result) => result.as_ref().err(),
            Self::Liked { result, .. }
            | Self::Unliked { result, .. }
            | Self::LikedInChain { result, .. }
            | Self::ChainEdited { result, .. } => result.as_ref().err(),
            Self::ChainSongs { result, .. } => result.as_ref().err(),
            Self::HighlightExpired(_) => None,
        };
        error.filter(|e| e.is_auth())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    mode: Mode,
    form: SubmissionForm,
    notice: Option<Notice>,
    generation: Generation,
    highlights: u64,
    loads: u64,
    in_flight: usize,
    actions: u64,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn mode(&self) -> &Mode {
        &self.mode
    }

    #[must_use]
    pub const fn form(&self) -> &SubmissionForm {
        &self.form
    }

    #[must_use]
    pub const fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// The phase of single-song discovery, `None` while a chain is active.
    #[must_use]
    pub const fn phase(&self) -> Option<&Phase> {
        match &self.mode {
            Mode::Discovery(single) => Some(&single.phase),
            Mode::Chain(_) => None,
        }
    }

    #[must_use]
    pub fn current_song(&self) -> Option<&Song> {
        self.phase().and_then(Phase::song)
    }

    #[must_use]
    pub const fn liked(&self) -> bool {
        matches!(self.phase(), Some(Phase::Liked(_)))
    }

    #[must_use]
    pub const fn listing(&self) -> Option<&Listing> {
        match &self.mode {
            Mode::Chain(listing) => Some(listing),
            Mode::Discovery(_) => None,
        }
    }

    #[must_use]
    pub fn active_chain(&self) -> Option<&Chain> {
        self.listing().map(|listing| &listing.chain)
    }

    #[must_use]
    pub fn chain_songs(&self) -> &[Song] {
        self.listing()
            .map(|listing| listing.songs.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_liked_in_chain(&self, song: SongId) -> bool {
        self.listing().is_some_and(|listing| listing.liked.contains(&song))
    }

    #[must_use]
    pub fn highlighted_song(&self) -> Option<SongId> {
        self.listing()
            .and_then(|listing| listing.highlight)
            .map(|highlight| highlight.song)
    }

    /// Calls to the service still waiting for an answer, highlight timers not included.
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Actions taken so far, so a snapshot can be matched to the action it answers.
    #[must_use]
    pub const fn actions(&self) -> u64 {
        self.actions
    }

    pub fn count_action(&mut self) {
        self.actions += 1;
    }

    /// Count a request handed to the service, it is settled again by the matching [`Session::apply`].
    pub fn dispatched(&mut self, request: &Request) {
        if !matches!(request, Request::ExpireHighlight(_)) {
            self.in_flight += 1;
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    fn fail(&mut self, error: &ServiceError, fallback: &str) {
        warn!("{fallback}: {error}");
        self.notice = Notice::from_service(error, fallback);
    }

    // ------------------------------------------------------------------ single-song discovery

    /// Ask for another song. Ignored while a chain is active, the listing has no paging.
    pub fn request_next(&mut self, chain: Option<ChainId>) -> Option<Request> {
        if let Mode::Chain(listing) = &self.mode {
            warn!(
                "ignoring a discovery request while chain {} is active",
                listing.chain.id
            );
            return None;
        }

        self.generation += 1;
        self.notice = None;
        Some(Request::Discover {
            chain,
            generation: self.generation,
        })
    }

    /// Like the presented song, at most once.
    pub fn like(&mut self) -> Option<Request> {
        match &mut self.mode {
            Mode::Discovery(SingleSong {
                phase: Phase::Presented(song),
                pending: pending @ false,
            }) => {
                *pending = true;
                Some(Request::Like(song.id))
            }
            _ => {
                debug!("nothing to like");
                None
            }
        }
    }

    /// Take back the like of the presented song.
    pub fn unlike(&mut self) -> Option<Request> {
        match &mut self.mode {
            Mode::Discovery(SingleSong {
                phase: Phase::Liked(song),
                pending: pending @ false,
            }) => {
                *pending = true;
                Some(Request::Unlike(song.id))
            }
            _ => {
                debug!("nothing to unlike");
                None
            }
        }
    }

    // ------------------------------------------------------------------ chain context

    /// Switch to the listing of `chain`, forgetting everything about the previous context.
    pub fn activate(&mut self, chain: Chain) -> Request {
        self.generation += 1;
        self.loads += 1;
        self.notice = None;
        let request = Request::ChainSongs {
            chain: chain.id,
            generation: self.generation,
            load: self.loads,
        };
        self.mode = Mode::Chain(Listing::new(chain, self.loads));
        request
    }

    /// Go back to single-song discovery.
    pub fn deactivate(&mut self) {
        if matches!(self.mode, Mode::Chain(_)) {
            self.generation += 1;
            self.mode = Mode::default();
        }
    }

    /// Fetch the listing of the active chain again, superseding any load still in flight.
    pub fn reload(&mut self) -> Option<Request> {
        let generation = self.generation;
        let Mode::Chain(listing) = &mut self.mode else {
            debug!("no chain to reload");
            return None;
        };
        self.loads += 1;
        listing.load = self.loads;
        listing.loading = true;
        Some(Request::ChainSongs {
            chain: listing.chain.id,
            generation,
            load: self.loads,
        })
    }

    /// Highlight a song of the listing picked uniformly at random.
    ///
    /// Returns the request to clear the highlight later, or nothing if there was no song to pick.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Request> {
        let Mode::Chain(listing) = &mut self.mode else {
            debug!("shuffle outside of a chain");
            return None;
        };
        let song = listing.songs.choose(rng)?.id;

        self.highlights += 1;
        listing.highlight = Some(Highlight {
            song,
            token: self.highlights,
        });
        Some(Request::ExpireHighlight(self.highlights))
    }

    /// Like a song of the listing, at most once per song.
    pub fn like_in_chain(&mut self, song: SongId) -> Option<Request> {
        let generation = self.generation;
        let Mode::Chain(listing) = &mut self.mode else {
            debug!("no chain to like {song} in");
            return None;
        };
        if listing.liked.contains(&song) || !listing.songs.iter().any(|s| s.id == song) {
            return None;
        }
        listing
            .liking
            .insert(song)
            .then_some(Request::LikeInChain { song, generation })
    }

    pub fn add_to_chain(&mut self, song: SongId) -> Option<Request> {
        let chain = self.active_chain()?.id;
        self.notice = None;
        Some(Request::AddToChain {
            chain,
            song,
            generation: self.generation,
        })
    }

    pub fn remove_from_chain(&mut self, song: SongId) -> Option<Request> {
        let chain = self.active_chain()?.id;
        self.notice = None;
        Some(Request::RemoveFromChain {
            chain,
            song,
            generation: self.generation,
        })
    }

    // ------------------------------------------------------------------ submission

    pub fn open_form(&mut self) {
        self.form.open = true;
    }

    pub fn close_form(&mut self) {
        self.form.open = false;
    }

    pub fn set_url(&mut self, url: String) {
        self.form.url = url;
    }

    pub fn set_context(&mut self, context: String) {
        self.form.context = context;
    }

    /// Submit what's in the form. Without an explicit chain, the song goes to the active chain.
    pub fn submit(&mut self, chain: Option<ChainId>) -> Option<Request> {
        if self.form.submitting {
            debug!("a submission is already in flight");
            return None;
        }
        let url = self.form.url.trim();
        if url.is_empty() {
            self.notice = Some(Notice::error("Please enter a song URL"));
            return None;
        }

        let chain = chain.or_else(|| self.active_chain().map(|chain| chain.id));
        let request = SubmitSongRequest::new(url, Some(self.form.context.clone()), chain);
        self.form.submitting = true;
        self.notice = None;
        Some(Request::Submit(request))
    }

    // ------------------------------------------------------------------ completions

    /// Fold the outcome of a request into the session.
    ///
    /// Some outcomes call for a follow-up request, e.g. reloading the listing after a song was added.
    pub fn apply(&mut self, completion: Completion) -> Option<Request> {
        if !matches!(completion, Completion::HighlightExpired(_)) {
            self.in_flight = self.in_flight.saturating_sub(1);
        }

        match completion {
            Completion::Discovered { generation, result } => {
                if generation != self.generation {
                    debug!("dropping a stale discovery (generation {generation})");
                    return None;
                }
                let Mode::Discovery(single) = &mut self.mode else {
                    return None;
                };
                match result {
                    Ok(song) => {
                        *single = SingleSong {
                            phase: Phase::Presented(song),
                            pending: false,
                        };
                    }
                    Err(e) => self.fail(&e, "No songs to discover"),
                }
            }
            Completion::Liked { song, result } => {
                let Mode::Discovery(single) = &mut self.mode else {
                    return None;
                };
                let Phase::Presented(presented) = &single.phase else {
                    return None;
                };
                if presented.id != song {
                    return None;
                }
                single.pending = false;
                match result {
                    Ok(()) => single.phase = Phase::Liked(presented.clone()),
                    Err(e) => self.fail(&e, "Failed to like"),
                }
            }
            Completion::Unliked { song, result } => {
                let Mode::Discovery(single) = &mut self.mode else {
                    return None;
                };
                let Phase::Liked(liked) = &single.phase else {
                    return None;
                };
                if liked.id != song {
                    return None;
                }
                single.pending = false;
                match result {
                    Ok(()) => single.phase = Phase::Presented(liked.clone()),
                    Err(e) => self.fail(&e, "Failed to unlike"),
                }
            }
            Completion::ChainSongs {
                generation,
                load,
                result,
            } => {
                if generation != self.generation {
                    debug!("dropping a stale chain listing (generation {generation})");
                    return None;
                }
                let Mode::Chain(listing) = &mut self.mode else {
                    return None;
                };
                if load != listing.load {
                    debug!("dropping a superseded chain listing (load {load})");
                    return None;
                }
                listing.loading = false;
                match result {
                    Ok(songs) => {
                        // the highlighted song may be gone after a reload
                        if listing
                            .highlight
                            .is_some_and(|h| !songs.iter().any(|s| s.id == h.song))
                        {
                            listing.highlight = None;
                        }
                        listing.songs = songs;
                    }
                    Err(e) => {
                        listing.songs.clear();
                        self.fail(&e, "Failed to load chain songs");
                    }
                }
            }
            Completion::LikedInChain {
                song,
                generation,
                result,
            } => {
                if generation != self.generation {
                    return None;
                }
                let Mode::Chain(listing) = &mut self.mode else {
                    return None;
                };
                listing.liking.remove(&song);
                match result {
                    Ok(()) => {
                        listing.liked.insert(song);
                    }
                    Err(e) => self.fail(&e, "Failed to like"),
                }
            }
            Completion::ChainEdited { generation, result } => {
                if generation != self.generation {
                    return None;
                }
                match result {
                    Ok(()) => return self.reload(),
                    Err(e) => self.fail(&e, "Failed to update chain"),
                }
            }
            Completion::Submitted(result) => {
                self.form.submitting = false;
                match result {
                    Ok(song) => {
                        debug!("submitted song {}", song.id);
                        self.form = SubmissionForm::default();
                        self.notice = Some(Notice::info("Song submitted"));
                        return self.reload();
                    }
                    Err(e) => self.fail(&e, "Failed to submit"),
                }
            }
            Completion::HighlightExpired(token) => {
                if let Mode::Chain(listing) = &mut self.mode {
                    if listing.highlight.is_some_and(|h| h.token == token) {
                        listing.highlight = None;
                    }
                }
            }
        }

        None
    }
}
