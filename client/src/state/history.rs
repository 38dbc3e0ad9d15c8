//! The history store: every song the user has been shown, newest first.

use std::sync::Arc;

use log::warn;
use tokio::sync::{
    broadcast,
    mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
};

use songswap_core::{errors::ServiceError, models::Discovery, service::SongSwap};

use crate::{
    notice::Notice,
    termination::{Interrupted, Terminator},
};

use super::action::HistoryAction;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    pub discoveries: Vec<Discovery>,
    pub loading: bool,
    pub notice: Option<Notice>,
}

/// The history store.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct HistoryState {
    state_tx: UnboundedSender<History>,
}

impl HistoryState {
    /// create a new history store, and return the receiver for listening to state updates.
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<History>) {
        let (state_tx, state_rx) = unbounded_channel::<History>();

        (Self { state_tx }, state_rx)
    }

    /// a loop that reloads the history when asked to, until interrupted.
    ///
    /// # Errors
    ///
    /// Fails if the state cannot be sent
    pub async fn main_loop<S: SongSwap>(
        &self,
        service: Arc<S>,
        mut terminator: Terminator,
        mut action_rx: UnboundedReceiver<HistoryAction>,
        mut interrupt_rx: broadcast::Receiver<Interrupted>,
    ) -> anyhow::Result<Interrupted> {
        let mut state = History::default();

        // the initial state once
        self.state_tx.send(state.clone())?;

        loop {
            tokio::select! {
                // Handle the actions coming from the front-end
                Some(action) = action_rx.recv() => {
                    state.loading = true;
                    self.state_tx.send(state.clone())?;

                    if let Err(e) = handle_action(&mut state, service.as_ref(), action).await {
                        warn!("the session has expired: {e}");
                        if let Err(e) = terminator.terminate(Interrupted::SessionExpired) {
                            warn!("failed to end the session: {e}");
                        }
                    }

                    state.loading = false;
                    self.state_tx.send(state.clone())?;
                },
                // Catch and handle interrupt signal to gracefully shutdown
                Ok(interrupted) = interrupt_rx.recv() => {
                    break Ok(interrupted);
                }
            }
        }
    }
}

/// Handle the action. A history that fails to load is shown as empty.
///
/// # Errors
///
/// Only authentication failures are returned.
pub async fn handle_action<S: SongSwap>(
    state: &mut History,
    service: &S,
    action: HistoryAction,
) -> Result<(), ServiceError> {
    match action {
        HistoryAction::Load => match service.get_history().await {
            Ok(discoveries) => {
                state.discoveries = discoveries;
                state.notice = None;
            }
            Err(e) => {
                warn!("failed to load the history: {e}");
                state.discoveries.clear();
                state.notice = Some(Notice::error("Failed to load history"));
                if e.is_auth() {
                    return Err(e);
                }
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use songswap_core::test_utils::{MockService, discovery, song};

    #[rstest]
    #[timeout(Duration::from_secs(5))]
    #[tokio::test]
    async fn test_load_keeps_service_order() {
        let service = MockService::new();
        let history = vec![
            discovery(song(3, "https://c.example"), Some(true)),
            discovery(song(1, "https://a.example"), None),
        ];
        service.set_history(Ok(history.clone()));
        let mut state = History::default();

        handle_action(&mut state, &service, HistoryAction::Load)
            .await
            .unwrap();

        assert_eq!(state.discoveries, history);
        assert_eq!(state.notice, None);
    }

    #[rstest]
    #[timeout(Duration::from_secs(5))]
    #[tokio::test]
    async fn test_failure_is_empty_with_notice() {
        let service = MockService::new();
        service.set_history(Err(ServiceError::Transient("Failed to fetch history".into())));
        let mut state = History {
            discoveries: vec![discovery(song(1, "https://a.example"), None)],
            ..Default::default()
        };

        handle_action(&mut state, &service, HistoryAction::Load)
            .await
            .unwrap();

        assert!(state.discoveries.is_empty());
        assert_eq!(state.notice, Some(Notice::error("Failed to load history")));
    }

    #[rstest]
    #[timeout(Duration::from_secs(5))]
    #[tokio::test]
    async fn test_store_loop() {
        let service = MockService::new();
        service.set_history(Ok(vec![discovery(song(1, "https://a.example"), Some(false))]));
        let (store, mut state_rx) = HistoryState::new();
        let (action_tx, action_rx) = unbounded_channel();
        let (interrupt_tx, interrupt_rx) = broadcast::channel(1);

        let handle = tokio::spawn({
            let terminator = Terminator::new(interrupt_tx.clone());
            async move {
                store
                    .main_loop(Arc::new(service), terminator, action_rx, interrupt_rx)
                    .await
            }
        });

        assert_eq!(state_rx.recv().await.unwrap(), History::default());
        action_tx.send(HistoryAction::Load).unwrap();
        assert!(state_rx.recv().await.unwrap().loading);
        let loaded = state_rx.recv().await.unwrap();
        assert!(!loaded.loading);
        assert_eq!(loaded.discoveries.len(), 1);

        interrupt_tx.send(Interrupted::UserInt).unwrap();
        assert_eq!(handle.await.unwrap().unwrap(), Interrupted::UserInt);
    }

    #[rstest]
    #[timeout(Duration::from_secs(5))]
    #[tokio::test]
    async fn test_auth_failure_ends_the_session() {
        let service = MockService::new();
        service.set_history(Err(ServiceError::Auth("Unauthorized".into())));
        let (store, mut state_rx) = HistoryState::new();
        let (action_tx, action_rx) = unbounded_channel();
        let (interrupt_tx, interrupt_rx) = broadcast::channel(1);

        let handle = tokio::spawn({
            let terminator = Terminator::new(interrupt_tx.clone());
            async move {
                store
                    .main_loop(Arc::new(service), terminator, action_rx, interrupt_rx)
                    .await
            }
        });

        assert_eq!(state_rx.recv().await.unwrap(), History::default());
        action_tx.send(HistoryAction::Load).unwrap();

        assert_eq!(handle.await.unwrap().unwrap(), Interrupted::SessionExpired);
    }
}
