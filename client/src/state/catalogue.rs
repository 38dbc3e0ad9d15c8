//! The chain catalogue store.
//!
//! Lists the chains there are, and creates new ones.

use std::sync::Arc;

use log::warn;
use tokio::sync::{
    broadcast,
    mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
};

use songswap_core::{
    errors::ServiceError,
    models::{CHAIN_DESCRIPTION_MAX_LEN, CHAIN_NAME_MAX_LEN, Chain, ChainId},
    service::SongSwap,
};

use crate::{
    notice::Notice,
    termination::{Interrupted, Terminator},
};

use super::action::CatalogueAction;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalogue {
    /// Newest first, as sent by the service.
    pub chains: Vec<Chain>,
    pub loading: bool,
    pub notice: Option<Notice>,
}

impl Catalogue {
    #[must_use]
    pub fn find(&self, id: ChainId) -> Option<&Chain> {
        self.chains.iter().find(|chain| chain.id == id)
    }
}

/// Check a new chain before sending it, returning the trimmed name and description.
///
/// Lengths are counted in bytes, the way the service counts them.
///
/// # Errors
///
/// Returns the message to show when the name or description is not acceptable.
pub fn validate_chain(name: &str, description: Option<&str>) -> Result<(String, Option<String>), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Chain name is required".into());
    }
    if name.len() > CHAIN_NAME_MAX_LEN {
        return Err(format!(
            "Chain name must be under {CHAIN_NAME_MAX_LEN} characters"
        ));
    }

    let description = description.map(str::trim).filter(|d| !d.is_empty());
    if description.is_some_and(|d| d.len() > CHAIN_DESCRIPTION_MAX_LEN) {
        return Err(format!(
            "Description must be under {CHAIN_DESCRIPTION_MAX_LEN} characters"
        ));
    }

    Ok((name.to_owned(), description.map(str::to_owned)))
}

/// The chain catalogue store.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct CatalogueState {
    state_tx: UnboundedSender<Catalogue>,
}

impl CatalogueState {
    /// create a new catalogue store, and return the receiver for listening to state updates.
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<Catalogue>) {
        let (state_tx, state_rx) = unbounded_channel::<Catalogue>();

        (Self { state_tx }, state_rx)
    }

    /// a loop that handles catalogue actions until interrupted.
    ///
    /// # Errors
    ///
    /// Fails if the state cannot be sent
    pub async fn main_loop<S: SongSwap>(
        &self,
        service: Arc<S>,
        mut terminator: Terminator,
        mut action_rx: UnboundedReceiver<CatalogueAction>,
        mut interrupt_rx: broadcast::Receiver<Interrupted>,
    ) -> anyhow::Result<Interrupted> {
        let mut state = Catalogue::default();

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

/// Handle the action, folding the outcome into the state.
///
/// # Errors
///
/// Only authentication failures are returned, everything else becomes a notice.
pub async fn handle_action<S: SongSwap>(
    state: &mut Catalogue,
    service: &S,
    action: CatalogueAction,
) -> Result<(), ServiceError> {
    state.notice = None;

    match action {
        CatalogueAction::Load => match service.get_chains().await {
            Ok(chains) => state.chains = chains,
            Err(e) => {
                warn!("failed to load chains: {e}");
                state.chains.clear();
                state.notice = Some(Notice::error("Failed to load chains"));
                if e.is_auth() {
                    return Err(e);
                }
            }
        },
        CatalogueAction::Create { name, description } => {
            let (name, description) = match validate_chain(&name, description.as_deref()) {
                Ok(valid) => valid,
                Err(message) => {
                    state.notice = Some(Notice::error(message));
                    return Ok(());
                }
            };

            match service.create_chain(name, description).await {
                Ok(chain) => {
                    state.notice = Some(Notice::info(format!("Created chain \"{}\"", chain.name)));
                    state.chains.insert(0, chain);
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => state.notice = Notice::from_service(&e, "Failed to create chain"),
            }
        }
    }

    Ok(())
}
