use std::{sync::Arc, time::Duration};

use clap::Parser;
use pretty_assertions::{assert_eq, assert_str_eq};
use rstest::{fixture, rstest};
use songswap_core::{
    config::ClientSettings,
    credentials::{Credential, CredentialProvider, FileCredentials, MemoryCredentials},
    errors::ServiceError,
    models::{ChainId, SongId},
    test_utils::{Call, MockService, chain, discovery, song},
};
use tempfile::tempdir;

use crate::handlers::{
    ChainsCommand, Command, CommandHandler, Context,
    utils::{StdIn, WriteAdapter},
};

const VIDEO_URL: &str = "https://youtu.be/dQw4w9WgXcQ";

struct StdInMock {
    lines: Vec<String>,
    terminal: bool,
}

impl StdInMock {
    fn new(lines: &[&str], terminal: bool) -> Self {
        Self {
            lines: lines.iter().map(|&line| line.to_owned()).collect(),
            terminal,
        }
    }
}

impl StdIn for StdInMock {
    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn lines(&self) -> impl Iterator<Item = std::io::Result<String>> {
        self.lines.clone().into_iter().map(Ok)
    }
}

#[test]
fn test_cli_args_parse() {
    let args = vec!["songswap", "--api-url", "https://songswap.example"];
    let flags = crate::Flags::try_parse_from(args);
    assert!(flags.is_ok());
    let flags = flags.unwrap();
    assert_eq!(flags.api_url.as_deref(), Some("https://songswap.example"));
    assert_eq!(flags.log_level, None);
    assert!(flags.subcommand.is_none());
}

#[rstest]
#[case::discover(&["songswap", "discover", "--chain", "3"], true)]
#[case::submit(&["songswap", "submit", VIDEO_URL, "--context", "for the road"], true)]
#[case::chains_rm(&["songswap", "chains", "rm", "1", "2"], true)]
#[case::bad_id(&["songswap", "like", "seven"], false)]
#[case::missing_song(&["songswap", "chains", "add", "1"], false)]
fn test_cli_args_parse_commands(#[case] args: &[&str], #[case] ok: bool) {
    assert_eq!(crate::Flags::try_parse_from(args).is_ok(), ok);
}

#[test]
fn test_cli_args_parse_log_level() {
    let flags = crate::Flags::try_parse_from(["songswap", "--log-level", "debug", "whoami"]).unwrap();
    assert_eq!(flags.log_level, Some(log::LevelFilter::Debug));
    assert!(matches!(flags.subcommand, Some(Command::Whoami)));
}

#[fixture]
fn service() -> MockService {
    MockService::new()
}

fn context(service: &MockService, credential: Option<Credential>) -> Context<MockService> {
    Context {
        service: Arc::new(service.clone()),
        credentials: Arc::new(MemoryCredentials::new(credential)),
        settings: ClientSettings {
            highlight_ms: 60_000,
        },
    }
}

fn logged_in() -> Option<Credential> {
    Some(Credential {
        token: "token-for-halva".into(),
        username: "halva".into(),
    })
}

/// Run the command, returning what it wrote to stdout and stderr.
async fn run(
    command: &Command,
    ctx: &Context<MockService>,
    stdin: &StdInMock,
) -> (anyhow::Result<()>, String, String) {
    let stdout = &mut WriteAdapter(Vec::new());
    let stderr = &mut WriteAdapter(Vec::new());

    let result = command.handle(ctx, stdout, stderr, stdin).await;

    (
        result,
        String::from_utf8(stdout.0.clone()).unwrap(),
        String::from_utf8(stderr.0.clone()).unwrap(),
    )
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_login_stores_the_credential(service: MockService) {
    let dir = tempdir().unwrap();
    let credentials = Arc::new(FileCredentials::hydrate(dir.path().join("session.json")).unwrap());
    let ctx = Context {
        service: Arc::new(service.clone()),
        credentials: credentials.clone(),
        settings: ClientSettings::default(),
    };
    let command = Command::Login {
        username: "halva".into(),
        password: None,
    };

    let (result, stdout, stderr) = run(&command, &ctx, &StdInMock::new(&["hunter2"], true)).await;

    assert!(result.is_ok());
    assert_str_eq!(stdout, "Logged in as halva\n");
    assert_str_eq!(stderr, "Password: ");
    assert_eq!(service.calls(), vec![Call::Login("halva".into())]);
    assert_eq!(credentials.current(), logged_in());
    // and it survives a restart
    assert_eq!(
        FileCredentials::hydrate(credentials.path()).unwrap().current(),
        logged_in()
    );
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_login_without_password_fails(service: MockService) {
    let ctx = context(&service, None);
    let command = Command::Register {
        username: "halva".into(),
        password: None,
    };

    let (result, _, _) = run(&command, &ctx, &StdInMock::new(&[], false)).await;

    assert!(result.is_err());
    assert!(service.calls().is_empty());
    assert_eq!(ctx.credentials.current(), None);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_logout_and_whoami(service: MockService) {
    let ctx = context(&service, logged_in());
    let stdin = StdInMock::new(&[], true);

    let (_, stdout, _) = run(&Command::Whoami, &ctx, &stdin).await;
    assert_str_eq!(stdout, "halva\n");

    let (result, stdout, _) = run(&Command::Logout, &ctx, &stdin).await;
    assert!(result.is_ok());
    assert_str_eq!(stdout, "Logged out\n");

    let (_, stdout, _) = run(&Command::Whoami, &ctx, &stdin).await;
    assert_str_eq!(stdout, "Not logged in\n");
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_discover_command(service: MockService) {
    service.push_discover(Ok(song(7, VIDEO_URL)));
    let ctx = context(&service, logged_in());
    let command = Command::Discover {
        chain: Some(ChainId(3)),
    };

    let (result, stdout, stderr) = run(&command, &ctx, &StdInMock::new(&[], true)).await;

    assert!(result.is_ok());
    assert!(stdout.starts_with("Song 7: https://youtu.be/dQw4w9WgXcQ\n"));
    assert!(stdout.contains("https://www.youtube.com/embed/dQw4w9WgXcQ"));
    assert_str_eq!(stderr, "");
    assert_eq!(service.calls(), vec![Call::Discover(Some(ChainId(3)))]);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_discover_nothing_left(service: MockService) {
    let ctx = context(&service, logged_in());

    let (result, stdout, stderr) = run(
        &Command::Discover { chain: None },
        &ctx,
        &StdInMock::new(&[], true),
    )
    .await;

    assert!(result.is_ok());
    assert_str_eq!(stdout, "");
    assert_str_eq!(stderr, "No new songs to discover\n");
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_auth_failure_says_to_log_in(service: MockService) {
    service.push_like(Err(ServiceError::Auth("not logged in".into())));
    let ctx = context(&service, None);

    let (result, _, _) = run(
        &Command::Like { song: SongId(7) },
        &ctx,
        &StdInMock::new(&[], true),
    )
    .await;

    let message = result.unwrap_err().to_string();
    assert!(message.contains("songswap login"), "{message}");
}

#[rstest]
#[case::blank("  ")]
#[case::empty("")]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_submit_needs_a_url(service: MockService, #[case] url: &str) {
    let ctx = context(&service, None);
    let command = Command::Submit {
        url: url.into(),
        context: None,
        chain: None,
    };

    let (result, _, _) = run(&command, &ctx, &StdInMock::new(&[], true)).await;

    assert!(result.is_err());
    assert!(service.calls().is_empty());
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_history_command(service: MockService) {
    service.set_history(Ok(vec![
        discovery(song(2, "https://b.example"), Some(true)),
        discovery(song(1, "https://a.example"), None),
    ]));
    let ctx = context(&service, logged_in());

    let (result, stdout, _) = run(&Command::History, &ctx, &StdInMock::new(&[], true)).await;

    assert!(result.is_ok());
    assert_str_eq!(
        stdout,
        "History:\n\
         \t2024-05-01 12:00 2: https://b.example (liked)\n\
         \t2024-05-01 12:00 1: https://a.example\n"
    );
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_chains_commands(service: MockService) {
    service.set_chains(Ok(vec![chain(1, "3am vibes", 2)]));
    service.set_chain_songs(
        ChainId(1),
        Ok(vec![song(4, "https://a.example"), song(5, "https://b.example")]),
    );
    service.push_create_chain(Ok(chain(2, "rainy", 0)));
    service.push_chain_edit(Err(ServiceError::Forbidden(
        "Only the chain creator can remove songs".into(),
    )));
    let ctx = context(&service, logged_in());
    let stdin = StdInMock::new(&[], true);
    let chains = |command| Command::Chains { command };

    let (_, stdout, _) = run(&chains(ChainsCommand::List), &ctx, &stdin).await;
    assert_str_eq!(stdout, "Chains:\n\t1: \"3am vibes\" (2 songs, by halva)\n");

    let (_, stdout, _) = run(&chains(ChainsCommand::Songs { chain: ChainId(1) }), &ctx, &stdin).await;
    assert_str_eq!(stdout, "  4: https://a.example\n  5: https://b.example\n");

    let (result, stdout, _) = run(
        &chains(ChainsCommand::Create {
            name: " rainy ".into(),
            description: None,
        }),
        &ctx,
        &stdin,
    )
    .await;
    assert!(result.is_ok());
    assert_str_eq!(stdout, "Created chain:\n2: \"rainy\" (0 songs, by halva)\n");

    let (result, _, _) = run(
        &chains(ChainsCommand::Remove {
            chain: ChainId(1),
            song: SongId(4),
        }),
        &ctx,
        &stdin,
    )
    .await;
    assert_eq!(
        result.unwrap_err().to_string(),
        "Only the chain creator can remove songs"
    );

    assert_eq!(
        service.calls(),
        vec![
            Call::Chains,
            Call::ChainSongs(ChainId(1)),
            Call::CreateChain("rainy".into(), None),
            Call::RemoveSong(ChainId(1), SongId(4)),
        ]
    );
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_invalid_chain_is_not_created(service: MockService) {
    let ctx = context(&service, logged_in());
    let command = Command::Chains {
        command: ChainsCommand::Create {
            name: "a".repeat(51),
            description: None,
        },
    };

    let (result, _, _) = run(&command, &ctx, &StdInMock::new(&[], true)).await;

    assert_eq!(
        result.unwrap_err().to_string(),
        "Chain name must be under 50 characters"
    );
    assert!(service.calls().is_empty());
}

#[rstest]
#[case::video(VIDEO_URL, "Video dQw4w9WgXcQ")]
#[case::link("https://bandcamp.example/track/x", "Not embeddable")]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_embed_command(service: MockService, #[case] url: &str, #[case] expected: &str) {
    let ctx = context(&service, None);

    let (result, stdout, _) = run(
        &Command::Embed { url: url.into() },
        &ctx,
        &StdInMock::new(&[], true),
    )
    .await;

    assert!(result.is_ok());
    assert!(stdout.contains(expected), "{stdout}");
    assert!(service.calls().is_empty());
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_session_discover_and_like_once(service: MockService) {
    service.push_discover(Ok(song(7, VIDEO_URL)));
    service.push_discover(Ok(song(8, "https://a.example")));
    let ctx = context(&service, logged_in());
    let stdin = StdInMock::new(&["next", "like", "like", "", "next", "quit"], false);

    let (result, stdout, stderr) = run(&Command::Session, &ctx, &stdin).await;

    assert!(result.is_ok());
    assert_str_eq!(stderr, "");
    assert!(stdout.contains("Song 7: https://youtu.be/dQw4w9WgXcQ"));
    assert!(stdout.contains("\tLiked\n"));
    assert!(stdout.contains("Song 8: https://a.example"));
    assert_eq!(service.count(|call| matches!(call, Call::Like(_))), 1);
    assert_eq!(
        service.calls(),
        vec![
            Call::Discover(None),
            Call::Like(SongId(7)),
            Call::Discover(None),
        ]
    );
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_session_browses_a_chain(service: MockService) {
    service.set_chains(Ok(vec![chain(1, "3am vibes", 1)]));
    service.set_chain_songs(ChainId(1), Ok(vec![song(4, "https://a.example")]));
    let ctx = context(&service, logged_in());
    let stdin = StdInMock::new(&["open 1", "shuffle", "like 4", "next", "close"], false);

    let (result, stdout, stderr) = run(&Command::Session, &ctx, &stdin).await;

    assert!(result.is_ok());
    assert_str_eq!(stderr, "");
    assert!(stdout.contains("Chain \"3am vibes\":\n  4: https://a.example\n"));
    assert!(stdout.contains("> 4: https://a.example\n"));
    assert!(stdout.contains("4: https://a.example (liked)\n"));
    assert!(stdout.ends_with("No song yet, ask for the next one\n"));
    // discovering is ignored while a chain is open
    assert_eq!(
        service.calls(),
        vec![Call::Chains, Call::ChainSongs(ChainId(1)), Call::Like(SongId(4))]
    );
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_session_rejects_bad_input(service: MockService) {
    let ctx = context(&service, logged_in());
    let stdin = StdInMock::new(&["play something", "open 9", "submit"], false);

    let (result, stdout, stderr) = run(&Command::Session, &ctx, &stdin).await;

    assert!(result.is_ok());
    assert_str_eq!(
        stderr,
        "Unknown command `play`, try `help`\nNo chain with id 9\n"
    );
    assert!(stdout.contains("error: Please enter a song URL\n"));
    assert_eq!(service.calls(), vec![Call::Chains]);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_session_expires(service: MockService) {
    service.push_discover(Err(ServiceError::Auth("Unauthorized".into())));
    let ctx = context(&service, logged_in());
    let stdin = StdInMock::new(&["next", "like", "history"], false);

    let (result, _, stderr) = run(&Command::Session, &ctx, &stdin).await;

    assert!(result.is_ok());
    assert!(stderr.ends_with("Your session has expired, log in again with `songswap login <username>`\n"));
    assert_eq!(service.calls().first(), Some(&Call::Discover(None)));
}
