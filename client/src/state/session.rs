//! The session state store.
//!
//! Owns the [`Session`] and drives it: actions are applied as they come in, the requests they
//! produce are spawned as tasks, and their completions are folded back in on the same loop.
//! A fresh snapshot is sent after every change.

use std::{sync::Arc, time::Duration};

use log::warn;
use rand::Rng;
use tokio::sync::{
    broadcast,
    mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
};

use songswap_core::{config::ClientSettings, service::SongSwap};

use crate::{
    session::{Completion, Request, Session},
    termination::{Interrupted, Terminator},
};

use super::action::{ChainAction, DiscoveryAction, SessionAction, SubmissionAction};

/// The session state store.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct SessionState {
    state_tx: UnboundedSender<Session>,
}

impl SessionState {
    /// create a new session state store, and return the receiver for listening to state updates.
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<Session>) {
        let (state_tx, state_rx) = unbounded_channel::<Session>();

        (Self { state_tx }, state_rx)
    }

    /// a loop that applies actions and completions to the session until interrupted.
    ///
    /// `rng` picks the song highlighted by a shuffle.
    ///
    /// # Errors
    ///
    /// Fails if the state cannot be sent
    #[allow(clippy::too_many_arguments)]
    pub async fn main_loop<S: SongSwap, R: Rng + Send>(
        &self,
        service: Arc<S>,
        settings: ClientSettings,
        mut rng: R,
        mut terminator: Terminator,
        mut action_rx: UnboundedReceiver<SessionAction>,
        mut interrupt_rx: broadcast::Receiver<Interrupted>,
    ) -> anyhow::Result<Interrupted> {
        let (completion_tx, mut completion_rx) = unbounded_channel::<Completion>();
        let highlight_for = settings.highlight_duration();
        let mut session = Session::new();

        // the initial state once
        self.state_tx.send(session.clone())?;

        let result = loop {
            let request = tokio::select! {
                // Handle the actions coming from the front-end
                Some(action) = action_rx.recv() => handle_action(&mut session, &mut rng, action),
                // Fold the answers of the service back in
                Some(completion) = completion_rx.recv() => {
                    if let Some(e) = completion.auth_failure() {
                        warn!("the session has expired: {e}");
                        if let Err(e) = terminator.terminate(Interrupted::SessionExpired) {
                            warn!("failed to end the session: {e}");
                        }
                    }
                    session.apply(completion)
                },
                // Catch and handle interrupt signal to gracefully shutdown
                Ok(interrupted) = interrupt_rx.recv() => {
                    break interrupted;
                }
            };

            if let Some(request) = request {
                session.dispatched(&request);
                spawn_request(service.clone(), completion_tx.clone(), highlight_for, request);
            }

            self.state_tx.send(session.clone())?;
        };

        Ok(result)
    }
}

/// Apply the action to the session, returning the request it produced, if any.
pub fn handle_action<R: Rng + ?Sized>(
    session: &mut Session,
    rng: &mut R,
    action: SessionAction,
) -> Option<Request> {
    session.count_action();
    match action {
        SessionAction::Discovery(action) => match action {
            DiscoveryAction::Next(chain) => session.request_next(chain),
            DiscoveryAction::Like => session.like(),
            DiscoveryAction::Unlike => session.unlike(),
        },
        SessionAction::Chain(action) => match action {
            ChainAction::Activate(chain) => Some(session.activate(chain)),
            ChainAction::Deactivate => {
                session.deactivate();
                None
            }
            ChainAction::Shuffle => session.shuffle(rng),
            ChainAction::Like(song) => session.like_in_chain(song),
            ChainAction::AddSong(song) => session.add_to_chain(song),
            ChainAction::RemoveSong(song) => session.remove_from_chain(song),
            ChainAction::Reload => session.reload(),
        },
        SessionAction::Submission(action) => match action {
            SubmissionAction::Open => {
                session.open_form();
                None
            }
            SubmissionAction::Close => {
                session.close_form();
                None
            }
            SubmissionAction::SetUrl(url) => {
                session.set_url(url);
                None
            }
            SubmissionAction::SetContext(context) => {
                session.set_context(context);
                None
            }
            SubmissionAction::Submit(chain) => session.submit(chain),
        },
        SessionAction::DismissNotice => {
            session.dismiss_notice();
            None
        }
    }
}

/// Perform the request in the background, and send its completion back to the loop.
fn spawn_request<S: SongSwap>(
    service: Arc<S>,
    completion_tx: UnboundedSender<Completion>,
    highlight_for: Duration,
    request: Request,
) {
    tokio::spawn(async move {
        let completion = perform(service.as_ref(), highlight_for, request).await;
        // the loop may have stopped in the meantime, nobody is waiting for the answer then
        let _ = completion_tx.send(completion);
    });
}

async fn perform<S: SongSwap>(service: &S, highlight_for: Duration, request: Request) -> Completion {
    match request {
        Request::Discover { chain, generation } => Completion::Discovered {
            generation,
            result: service.discover(chain).await,
        },
        Request::Like(song) => Completion::Liked {
            song,
            result: service.like_song(song).await,
        },
        Request::Unlike(song) => Completion::Unliked {
            song,
            result: service.unlike_song(song).await,
        },
        Request::ChainSongs {
            chain,
            generation,
            load,
        } => Completion::ChainSongs {
            generation,
            load,
            result: service.get_chain_songs(chain).await,
        },
        Request::LikeInChain { song, generation } => Completion::LikedInChain {
            song,
            generation,
            result: service.like_song(song).await,
        },
        Request::AddToChain {
            chain,
            song,
            generation,
        } => Completion::ChainEdited {
            generation,
            result: service.add_song_to_chain(chain, song).await,
        },
        Request::RemoveFromChain {
            chain,
            song,
            generation,
        } => Completion::ChainEdited {
            generation,
            result: service.remove_song_from_chain(chain, song).await,
        },
        Request::Submit(request) => Completion::Submitted(service.submit_song(request).await),
        Request::ExpireHighlight(token) => {
            tokio::time::sleep(highlight_for).await;
            Completion::HighlightExpired(token)
        }
    }
}
