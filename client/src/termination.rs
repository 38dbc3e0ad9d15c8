#[cfg(unix)]
use tokio::signal::unix::signal;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    OsSigInt,
    OsSigQuit,
    OsSigTerm,
    UserInt,
    /// The service rejected the session credential, the user has to log in again.
    SessionExpired,
}

#[derive(Debug, Clone)]
pub struct Terminator {
    interrupt_tx: broadcast::Sender<Interrupted>,
}

impl Terminator {
    #[must_use]
    pub const fn new(interrupt_tx: broadcast::Sender<Interrupted>) -> Self {
        Self { interrupt_tx }
    }

    /// Send an interrupt signal to the application.
    ///
    /// # Errors
    ///
    /// Fails if the interrupt signal cannot be sent (e.g. the receiver has been dropped)
    pub fn terminate(&mut self, interrupted: Interrupted) -> anyhow::Result<()> {
        self.interrupt_tx.send(interrupted)?;

        Ok(())
    }
}

#[cfg(unix)]
async fn terminate_by_signal(mut terminator: Terminator) {
    use tokio::signal::unix::SignalKind;

    let (Ok(mut interrupt_signal), Ok(mut term_signal), Ok(mut quit_signal)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::quit()),
    ) else {
        log::error!("failed to register the signal handlers");
        return;
    };

    let interrupted = tokio::select! {
        _ = interrupt_signal.recv() => Interrupted::OsSigInt,
        _ = term_signal.recv() => Interrupted::OsSigTerm,
        _ = quit_signal.recv() => Interrupted::OsSigQuit,
    };

    if let Err(e) = terminator.terminate(interrupted) {
        log::error!("failed to send {interrupted:?}: {e}");
    }
}

#[cfg(not(unix))]
async fn terminate_by_signal(mut terminator: Terminator) {
    if tokio::signal::ctrl_c().await.is_ok() {
        if let Err(e) = terminator.terminate(Interrupted::OsSigInt) {
            log::error!("failed to send the interrupt signal: {e}");
        }
    }
}

// create a broadcast channel for retrieving the application kill signal
#[allow(clippy::module_name_repetitions)]
#[must_use]
pub fn create_termination() -> (Terminator, broadcast::Receiver<Interrupted>) {
    let (tx, rx) = broadcast::channel(1);
    let terminator = Terminator::new(tx);

    tokio::spawn(terminate_by_signal(terminator.clone()));

    (terminator, rx)
}
