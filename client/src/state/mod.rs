use std::sync::Arc;

use action::Action;
use log::{debug, warn};
use rand::{SeedableRng, rngs::SmallRng};
use songswap_core::{config::ClientSettings, service::SongSwap};
use tokio::sync::{
    broadcast,
    mpsc::{self, UnboundedReceiver, UnboundedSender},
};

use crate::{
    session::Session,
    termination::{Interrupted, Terminator},
};

pub mod action;
pub mod catalogue;
pub mod history;
pub mod session;

/// an all-in-one dispactcher for managing state updates.
pub struct Dispatcher {
    session: session::SessionState,
    catalogue: catalogue::CatalogueState,
    history: history::HistoryState,
}

/// a struct that centralized the receivers for all the state stores.
pub struct Receivers {
    pub session: UnboundedReceiver<Session>,
    pub catalogue: UnboundedReceiver<catalogue::Catalogue>,
    pub history: UnboundedReceiver<history::History>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> (Self, Receivers) {
        let (session, session_rx) = session::SessionState::new();
        let (catalogue, catalogue_rx) = catalogue::CatalogueState::new();
        let (history, history_rx) = history::HistoryState::new();

        let dispatcher = Self {
            session,
            catalogue,
            history,
        };
        let state_receivers = Receivers {
            session: session_rx,
            catalogue: catalogue_rx,
            history: history_rx,
        };

        (dispatcher, state_receivers)
    }

    /// Run every store until the application is interrupted.
    ///
    /// # Errors
    ///
    /// Fails if one of the stores fails, or if a store stopped listening for actions.
    pub async fn main_loop<S: SongSwap>(
        &self,
        service: Arc<S>,
        settings: ClientSettings,
        terminator: Terminator,
        action_rx: UnboundedReceiver<Action>,
        mut interrupt_rx: broadcast::Receiver<Interrupted>,
    ) -> anyhow::Result<Interrupted> {
        let (session_action_tx, session_action_rx) = mpsc::unbounded_channel();
        let (catalogue_action_tx, catalogue_action_rx) = mpsc::unbounded_channel();
        let (history_action_tx, history_action_rx) = mpsc::unbounded_channel();

        // run multiple tasks in parallel, and wait for all of them to finish.
        // the tasks are:
        // - the session state store
        // - the catalogue state store
        // - the history state store
        // - the action dispatcher
        tokio::try_join!(
            // the session state store
            self.session.main_loop(
                service.clone(),
                settings,
                SmallRng::from_entropy(),
                terminator.clone(),
                session_action_rx,
                interrupt_rx.resubscribe()
            ),
            // the catalogue state store
            self.catalogue.main_loop(
                service.clone(),
                terminator.clone(),
                catalogue_action_rx,
                interrupt_rx.resubscribe()
            ),
            // the history state store
            self.history.main_loop(
                service.clone(),
                terminator.clone(),
                history_action_rx,
                interrupt_rx.resubscribe()
            ),
            // the action dispatcher
            Self::action_dispatcher(
                terminator,
                action_rx,
                interrupt_rx.resubscribe(),
                session_action_tx,
                catalogue_action_tx,
                history_action_tx,
            ),
        )?;

        // the first interrupt wins, even when more were sent since
        loop {
            match interrupt_rx.recv().await {
                Ok(interrupted) => break Ok(interrupted),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!("missed {missed} interrupts");
                }
                Err(e) => break Err(e.into()),
            }
        }
    }

    async fn action_dispatcher(
        mut terminator: Terminator,
        mut action_rx: UnboundedReceiver<Action>,
        mut interrupt_rx: broadcast::Receiver<Interrupted>,
        session_action_tx: UnboundedSender<action::SessionAction>,
        catalogue_action_tx: UnboundedSender<action::CatalogueAction>,
        history_action_tx: UnboundedSender<action::HistoryAction>,
    ) -> anyhow::Result<()> {
        loop {
            let action = tokio::select! {
                biased;
                // the stores are shutting down, nothing left to dispatch to
                Ok(_) = interrupt_rx.recv() => break,
                Some(action) = action_rx.recv() => action,
                else => break,
            };

            let sent = match action {
                Action::Session(action) => session_action_tx.send(action).is_ok(),
                Action::Catalogue(action) => catalogue_action_tx.send(action).is_ok(),
                Action::History(action) => history_action_tx.send(action).is_ok(),
                Action::General(action) => match action {
                    action::GeneralAction::Exit => {
                        let _ = terminator.terminate(Interrupted::UserInt);

                        break;
                    }
                },
            };
            if !sent {
                warn!("a store has stopped, no longer dispatching actions");
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use songswap_core::{
        errors::ServiceError,
        models::ChainId,
        test_utils::{MockService, chain, song},
    };

    use crate::termination::create_termination;
    use action::{CatalogueAction, ChainAction, DiscoveryAction, GeneralAction, HistoryAction, SessionAction};

    #[rstest]
    #[timeout(Duration::from_secs(5))]
    #[tokio::test]
    async fn test_dispatcher_routes_actions_and_exits() {
        let service = MockService::new();
        service.set_chains(Ok(vec![chain(1, "3am vibes", 1)]));
        service.set_chain_songs(ChainId(1), Ok(vec![song(4, "https://a.example")]));

        let (dispatcher, mut receivers) = Dispatcher::new();
        let (terminator, interrupt_rx) = create_termination();
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            dispatcher
                .main_loop(
                    Arc::new(service),
                    ClientSettings::default(),
                    terminator,
                    action_rx,
                    interrupt_rx,
                )
                .await
        });

        action_tx
            .send(Action::Catalogue(CatalogueAction::Load))
            .unwrap();
        let catalogue = loop {
            let catalogue = receivers.catalogue.recv().await.unwrap();
            if !catalogue.chains.is_empty() {
                break catalogue;
            }
        };

        let chain = catalogue.find(ChainId(1)).unwrap().clone();
        action_tx
            .send(Action::Session(SessionAction::Chain(ChainAction::Activate(chain))))
            .unwrap();
        loop {
            let session = receivers.session.recv().await.unwrap();
            if !session.chain_songs().is_empty() {
                break;
            }
        }

        action_tx
            .send(Action::History(HistoryAction::Load))
            .unwrap();
        while !receivers.history.recv().await.unwrap().loading {}
        let history = receivers.history.recv().await.unwrap();
        assert!(!history.loading);
        assert_eq!(history.notice, None);

        action_tx
            .send(Action::General(GeneralAction::Exit))
            .unwrap();
        assert_eq!(handle.await.unwrap().unwrap(), Interrupted::UserInt);
    }

    #[rstest]
    #[timeout(Duration::from_secs(5))]
    #[tokio::test]
    async fn test_expired_session_stops_everything() {
        let service = MockService::new();
        service.push_discover(Err(ServiceError::Auth("Unauthorized".into())));

        let (dispatcher, _receivers) = Dispatcher::new();
        let (terminator, interrupt_rx) = create_termination();
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            dispatcher
                .main_loop(
                    Arc::new(service),
                    ClientSettings::default(),
                    terminator,
                    action_rx,
                    interrupt_rx,
                )
                .await
        });

        action_tx
            .send(Action::Session(SessionAction::Discovery(DiscoveryAction::Next(
                None,
            ))))
            .unwrap();

        assert_eq!(
            handle.await.unwrap().unwrap(),
            Interrupted::SessionExpired
        );
    }
}
