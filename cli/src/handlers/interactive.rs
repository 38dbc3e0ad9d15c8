//! The interactive session.
//!
//! Commands are read from stdin one per line and sent to the [`Dispatcher`] as actions.
//! After each command the stores are given time to settle, then the result is printed.

use std::str::FromStr;

use anyhow::Context as _;
use log::{debug, info};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use songswap_client::{
    session::Session,
    state::{
        Dispatcher,
        action::{
            Action, CatalogueAction, ChainAction, DiscoveryAction, GeneralAction, HistoryAction, SessionAction,
            SubmissionAction,
        },
        catalogue::Catalogue,
        history::History,
    },
    termination::{Interrupted, create_termination},
};
use songswap_core::{
    models::{ChainId, SongId},
    service::SongSwap,
};

use super::{Context, printing, utils::StdIn};

pub const HELP: &str = "\
Commands:
\tnext [chain]           get a song you haven't heard yet
\tlike [song]            like the song you were given, or a song of the open chain
\tunlike                 take your like back
\tchains                 list every chain
\tcreate <name> [| desc] create a chain
\topen <chain>           browse the songs of a chain
\tclose                  go back to discovering single songs
\tshuffle                pick a random song of the open chain
\treload                 load the songs of the open chain again
\tadd <song>             add a song to the open chain
\tremove <song>          remove a song from the open chain
\tsubmit <url> [| note]  give a song, to the open chain if there is one
\thistory                every song you have been shown
\tdismiss                clear the last message
\thelp                   show this message
\tquit                   end the session
";

/// One line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Next(Option<ChainId>),
    Like(Option<SongId>),
    Unlike,
    Chains,
    Create {
        name: String,
        description: Option<String>,
    },
    Open(ChainId),
    Close,
    Shuffle,
    Reload,
    Add(SongId),
    Remove(SongId),
    Submit {
        url: String,
        context: Option<String>,
    },
    History,
    Dismiss,
    Help,
    Quit,
}

fn id<T: FromStr>(command: &str, rest: &str, what: &str) -> Result<T, String> {
    rest.parse()
        .map_err(|_| format!("`{command}` needs a {what} id"))
}

fn optional_id<T: FromStr>(command: &str, rest: &str, what: &str) -> Result<Option<T>, String> {
    if rest.is_empty() {
        Ok(None)
    } else {
        id(command, rest, what).map(Some)
    }
}

/// Split `text | note` into the text and the note, if there is one.
fn with_note(rest: &str) -> (String, Option<String>) {
    match rest.split_once('|') {
        Some((text, note)) => (
            text.trim().to_owned(),
            Some(note.trim().to_owned()).filter(|note| !note.is_empty()),
        ),
        None => (rest.trim().to_owned(), None),
    }
}

impl FromStr for Line {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (command, rest) = s
            .split_once(char::is_whitespace)
            .map_or((s, ""), |(command, rest)| (command, rest.trim()));

        match command {
            "next" | "n" => optional_id(command, rest, "chain").map(Self::Next),
            "like" | "l" => optional_id(command, rest, "song").map(Self::Like),
            "unlike" => Ok(Self::Unlike),
            "chains" | "ls" => Ok(Self::Chains),
            "create" => {
                let (name, description) = with_note(rest);
                Ok(Self::Create { name, description })
            }
            "open" => id(command, rest, "chain").map(Self::Open),
            "close" => Ok(Self::Close),
            "shuffle" | "s" => Ok(Self::Shuffle),
            "reload" => Ok(Self::Reload),
            "add" => id(command, rest, "song").map(Self::Add),
            "remove" | "rm" => id(command, rest, "song").map(Self::Remove),
            "submit" => {
                let (url, context) = with_note(rest);
                Ok(Self::Submit { url, context })
            }
            "history" | "h" => Ok(Self::History),
            "dismiss" => Ok(Self::Dismiss),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            _ => Err(format!("Unknown command `{command}`, try `help`")),
        }
    }
}

/// The latest snapshot of every store.
struct View {
    session: Session,
    catalogue: Catalogue,
    history: History,
}

/// Keep only the newest of the snapshots already sent.
fn drain<T>(rx: &mut UnboundedReceiver<T>, latest: &mut T) {
    while let Ok(snapshot) = rx.try_recv() {
        *latest = snapshot;
    }
}

/// Wait until the session took `actions` actions and has no calls in flight.
/// `None` once the store has stopped.
async fn settle_session(
    rx: &mut UnboundedReceiver<Session>,
    latest: &mut Session,
    actions: u64,
) -> Option<()> {
    loop {
        *latest = rx.recv().await?;
        if latest.actions() >= actions && latest.in_flight() == 0 {
            return Some(());
        }
    }
}

/// Wait until a store reports it is done loading. `None` once the store has stopped.
async fn settle_loading<T>(
    rx: &mut UnboundedReceiver<T>,
    latest: &mut T,
    loading: impl Fn(&T) -> bool,
) -> Option<()> {
    loop {
        *latest = rx.recv().await?;
        if !loading(latest) {
            return Some(());
        }
    }
}

struct Repl {
    action_tx: UnboundedSender<Action>,
    receivers: songswap_client::state::Receivers,
    view: View,
    /// Session actions sent so far.
    sent: u64,
}

impl Repl {
    /// Wait for the first snapshot of every store, so later ones can be told apart.
    async fn start(
        action_tx: UnboundedSender<Action>,
        mut receivers: songswap_client::state::Receivers,
    ) -> anyhow::Result<Self> {
        let view = View {
            session: receivers.session.recv().await.context("the session store stopped")?,
            catalogue: receivers
                .catalogue
                .recv()
                .await
                .context("the catalogue store stopped")?,
            history: receivers.history.recv().await.context("the history store stopped")?,
        };

        Ok(Self {
            action_tx,
            receivers,
            view,
            sent: 0,
        })
    }

    /// Send a session action and wait for it to settle. `false` once the session is over.
    async fn session(&mut self, action: SessionAction) -> bool {
        drain(&mut self.receivers.session, &mut self.view.session);
        if self.action_tx.send(Action::Session(action)).is_err() {
            return false;
        }
        self.sent += 1;
        settle_session(&mut self.receivers.session, &mut self.view.session, self.sent)
            .await
            .is_some()
    }

    async fn catalogue(&mut self, action: CatalogueAction) -> bool {
        drain(&mut self.receivers.catalogue, &mut self.view.catalogue);
        if self.action_tx.send(Action::Catalogue(action)).is_err() {
            return false;
        }
        settle_loading(&mut self.receivers.catalogue, &mut self.view.catalogue, |c| {
            c.loading
        })
        .await
        .is_some()
    }

    async fn history(&mut self, action: HistoryAction) -> bool {
        drain(&mut self.receivers.history, &mut self.view.history);
        if self.action_tx.send(Action::History(action)).is_err() {
            return false;
        }
        settle_loading(&mut self.receivers.history, &mut self.view.history, |h| h.loading)
            .await
            .is_some()
    }

    /// Apply one line, printing the outcome. `false` once a store has stopped.
    #[allow(clippy::too_many_lines)]
    async fn apply<W1: std::fmt::Write + Send, W2: std::fmt::Write + Send>(
        &mut self,
        line: Line,
        stdout: &mut W1,
        stderr: &mut W2,
    ) -> anyhow::Result<bool> {
        let alive = match line {
            Line::Next(chain) => {
                self.session(SessionAction::Discovery(DiscoveryAction::Next(chain)))
                    .await
            }
            Line::Like(None) => self.session(SessionAction::Discovery(DiscoveryAction::Like)).await,
            Line::Like(Some(song)) => self.session(SessionAction::Chain(ChainAction::Like(song))).await,
            Line::Unlike => {
                self.session(SessionAction::Discovery(DiscoveryAction::Unlike))
                    .await
            }
            Line::Close => self.session(SessionAction::Chain(ChainAction::Deactivate)).await,
            Line::Shuffle => self.session(SessionAction::Chain(ChainAction::Shuffle)).await,
            Line::Reload => self.session(SessionAction::Chain(ChainAction::Reload)).await,
            Line::Add(song) => self.session(SessionAction::Chain(ChainAction::AddSong(song))).await,
            Line::Remove(song) => {
                self.session(SessionAction::Chain(ChainAction::RemoveSong(song)))
                    .await
            }
            Line::Dismiss => self.session(SessionAction::DismissNotice).await,
            Line::Submit { url, context } => {
                for action in [
                    SubmissionAction::Open,
                    SubmissionAction::SetUrl(url),
                    SubmissionAction::SetContext(context.unwrap_or_default()),
                ] {
                    if !self.session(SessionAction::Submission(action)).await {
                        return Ok(false);
                    }
                }
                self.session(SessionAction::Submission(SubmissionAction::Submit(None)))
                    .await
            }
            Line::Open(id) => {
                if self.view.catalogue.find(id).is_none() && !self.catalogue(CatalogueAction::Load).await {
                    return Ok(false);
                }
                let Some(chain) = self.view.catalogue.find(id).cloned() else {
                    writeln!(stderr, "No chain with id {id}")?;
                    return Ok(true);
                };
                self.session(SessionAction::Chain(ChainAction::Activate(chain)))
                    .await
            }
            Line::Chains => {
                let alive = self.catalogue(CatalogueAction::Load).await;
                write!(stdout, "{}", printing::catalogue(&self.view.catalogue)?)?;
                return Ok(alive);
            }
            Line::Create { name, description } => {
                let alive = self
                    .catalogue(CatalogueAction::Create { name, description })
                    .await;
                write!(stdout, "{}", printing::catalogue(&self.view.catalogue)?)?;
                return Ok(alive);
            }
            Line::History => {
                let alive = self.history(HistoryAction::Load).await;
                write!(stdout, "{}", printing::history_snapshot(&self.view.history)?)?;
                return Ok(alive);
            }
            Line::Help => {
                write!(stdout, "{HELP}")?;
                return Ok(true);
            }
            Line::Quit => return Ok(true),
        };

        if alive {
            write!(stdout, "{}", printing::session(&self.view.session)?)?;
        }
        Ok(alive)
    }
}

/// Run an interactive session until the input ends, the user quits, or the session expires.
///
/// # Errors
///
/// Fails if the output can't be written, or if the stores fail.
pub async fn run<S: SongSwap, W1: std::fmt::Write + Send, W2: std::fmt::Write + Send, I: StdIn>(
    ctx: &Context<S>,
    stdout: &mut W1,
    stderr: &mut W2,
    stdin: &I,
) -> anyhow::Result<()> {
    let (dispatcher, receivers) = Dispatcher::new();
    let (terminator, interrupt_rx) = create_termination();
    let (action_tx, action_rx) = mpsc::unbounded_channel();

    // stdin is read blocking, so an os signal has to end the process itself
    let mut signals = interrupt_rx.resubscribe();
    tokio::spawn(async move {
        if let Ok(
            interrupted @ (Interrupted::OsSigInt | Interrupted::OsSigQuit | Interrupted::OsSigTerm),
        ) = signals.recv().await
        {
            info!("interrupted by {interrupted:?}");
            std::process::exit(130);
        }
    });

    let service = ctx.service.clone();
    let settings = ctx.settings;
    let handle = tokio::spawn(async move {
        dispatcher
            .main_loop(service, settings, terminator, action_rx, interrupt_rx)
            .await
    });

    let mut repl = Repl::start(action_tx, receivers).await?;

    writeln!(stdout, "Give a song, get a song. Type `help` for the commands.")?;
    let mut lines = stdin.lines();
    // set once a store has stopped on its own, e.g. because the session expired
    let mut stopped = false;
    loop {
        if stdin.is_terminal() {
            write!(stdout, "> ")?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Line>() {
            Ok(Line::Quit) => break,
            Ok(line) => {
                debug!("interactive command: {line:?}");
                if !repl.apply(line, stdout, stderr).await? {
                    stopped = true;
                    break;
                }
            }
            Err(message) => writeln!(stderr, "{message}")?,
        }
    }

    if !stopped {
        // the dispatcher may be gone already, there is nothing to stop then
        let _ = repl.action_tx.send(Action::General(GeneralAction::Exit));
    }

    match handle.await?? {
        Interrupted::SessionExpired => {
            writeln!(
                stderr,
                "Your session has expired, log in again with `songswap login <username>`"
            )?;
        }
        interrupted => debug!("session ended: {interrupted:?}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::next("next", Line::Next(None))]
    #[case::next_in_chain("n 4", Line::Next(Some(ChainId(4))))]
    #[case::like("like", Line::Like(None))]
    #[case::like_in_chain("  like   2 ", Line::Like(Some(SongId(2))))]
    #[case::open("open 1", Line::Open(ChainId(1)))]
    #[case::submit(
        "submit https://youtu.be/dQw4w9WgXcQ | for the road",
        Line::Submit { url: "https://youtu.be/dQw4w9WgXcQ".into(), context: Some("for the road".into()) }
    )]
    #[case::submit_without_note(
        "submit https://a.example |",
        Line::Submit { url: "https://a.example".into(), context: None }
    )]
    #[case::create(
        "create 3am vibes | late night",
        Line::Create { name: "3am vibes".into(), description: Some("late night".into()) }
    )]
    #[case::create_blank("create", Line::Create { name: String::new(), description: None })]
    #[case::quit("exit", Line::Quit)]
    fn test_parse_line(#[case] input: &str, #[case] expected: Line) {
        assert_eq!(input.parse::<Line>(), Ok(expected));
    }

    #[rstest]
    #[case::bad_id("open rainy", "`open` needs a chain id")]
    #[case::missing_id("add", "`add` needs a song id")]
    #[case::unknown("play", "Unknown command `play`, try `help`")]
    fn test_parse_line_errors(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(input.parse::<Line>(), Err(expected.to_owned()));
    }

    #[rstest]
    #[timeout(Duration::from_secs(5))]
    #[tokio::test]
    async fn test_settle_waits_for_the_snapshot_of_the_action() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut before = Session::new();
        before.count_action();
        // e.g. a highlight expiring after the previous command settled
        tx.send(before.clone()).unwrap();
        let mut after = before.clone();
        after.count_action();
        after.set_url("https://example.com".into());
        tx.send(after.clone()).unwrap();

        let mut latest = Session::new();
        assert_eq!(settle_session(&mut rx, &mut latest, 2).await, Some(()));
        assert_eq!(latest, after);

        drop(tx);
        assert_eq!(settle_session(&mut rx, &mut latest, 3).await, None);
    }
}
