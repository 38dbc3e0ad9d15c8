use anyhow::{anyhow, bail};
use log::debug;
use songswap_core::{
    credentials::Credential,
    errors::ServiceError,
    models::{Credentials, SubmitSongRequest},
    service::SongSwap,
};

use crate::handlers::{interactive, printing, utils};

use super::{ChainsCommand, Command, CommandHandler, Context, utils::StdIn};

/// Turn a service error into something the user can act on.
fn explain(e: ServiceError) -> anyhow::Error {
    match e {
        ServiceError::Auth(_) => anyhow!("{e}\nLog in with `songswap login <username>` first"),
        e => e.into(),
    }
}

/// Get the password from the flag, or from the first line of stdin.
fn password<W: std::fmt::Write, I: StdIn>(
    flag: Option<&String>,
    stderr: &mut W,
    stdin: &I,
) -> anyhow::Result<String> {
    if let Some(password) = flag {
        return Ok(password.clone());
    }

    if stdin.is_terminal() {
        write!(stderr, "Password: ")?;
    }
    match utils::read_line(stdin)? {
        Some(password) if !password.is_empty() => Ok(password),
        _ => bail!("No password given"),
    }
}

impl CommandHandler for Command {
    type Output = anyhow::Result<()>;

    #[allow(clippy::too_many_lines)]
    async fn handle<
        S: SongSwap,
        W1: std::fmt::Write + Send,
        W2: std::fmt::Write + Send,
        I: StdIn,
    >(
        &self,
        ctx: &Context<S>,
        stdout: &mut W1,
        stderr: &mut W2,
        stdin: &I,
    ) -> Self::Output {
        match self {
            Self::Register { username, password } | Self::Login { username, password } => {
                let credentials = Credentials {
                    username: username.clone(),
                    password: self::password(password.as_ref(), stderr, stdin)?,
                };
                let response = if matches!(self, Self::Register { .. }) {
                    ctx.service.register(credentials).await?
                } else {
                    ctx.service.login(credentials).await?
                };
                ctx.credentials.store(Credential {
                    token: response.token,
                    username: response.user.username.clone(),
                })?;
                writeln!(stdout, "Logged in as {}", response.user.username)?;
                Ok(())
            }
            Self::Logout => {
                ctx.credentials.clear()?;
                writeln!(stdout, "Logged out")?;
                Ok(())
            }
            Self::Whoami => {
                match ctx.credentials.current() {
                    Some(credential) => writeln!(stdout, "{}", credential.username)?,
                    None => writeln!(stdout, "Not logged in")?,
                }
                Ok(())
            }
            Self::Discover { chain } => match ctx.service.discover(*chain).await {
                Ok(song) => Ok(write!(stdout, "{}", printing::song(&song)?)?),
                Err(e @ ServiceError::NotFound(_)) => {
                    writeln!(stderr, "{}", e.user_message("No songs to discover"))?;
                    Ok(())
                }
                Err(e) => Err(explain(e)),
            },
            Self::Like { song } => {
                ctx.service.like_song(*song).await.map_err(explain)?;
                writeln!(stdout, "Liked song {song}")?;
                Ok(())
            }
            Self::Unlike { song } => {
                ctx.service.unlike_song(*song).await.map_err(explain)?;
                writeln!(stdout, "Unliked song {song}")?;
                Ok(())
            }
            Self::Submit {
                url,
                context,
                chain,
            } => {
                if url.trim().is_empty() {
                    bail!("Please enter a song URL");
                }
                let request = SubmitSongRequest::new(url.trim(), context.clone(), *chain);
                let song = ctx.service.submit_song(request).await.map_err(explain)?;
                writeln!(stdout, "Song submitted, thanks for sharing!")?;
                write!(stdout, "{}", printing::song(&song)?)?;
                Ok(())
            }
            Self::History => {
                let history = ctx.service.get_history().await.map_err(explain)?;
                write!(stdout, "{}", printing::history(&history)?)?;
                Ok(())
            }
            Self::Chains { command } => command.handle(ctx, stdout, stderr, stdin).await,
            Self::Embed { url } => {
                writeln!(stdout, "{url}")?;
                write!(stdout, "{}", printing::embed(url)?)?;
                Ok(())
            }
            Self::Session => {
                debug!("starting an interactive session");
                interactive::run(ctx, stdout, stderr, stdin).await
            }
        }
    }
}

impl CommandHandler for ChainsCommand {
    type Output = anyhow::Result<()>;

    async fn handle<
        S: SongSwap,
        W1: std::fmt::Write + Send,
        W2: std::fmt::Write + Send,
        I: StdIn,
    >(
        &self,
        ctx: &Context<S>,
        stdout: &mut W1,
        _stderr: &mut W2,
        _stdin: &I,
    ) -> Self::Output {
        match self {
            Self::List => {
                let chains = ctx.service.get_chains().await.map_err(explain)?;
                write!(stdout, "{}", printing::chains(&chains)?)?;
                Ok(())
            }
            Self::Create { name, description } => {
                let (name, description) =
                    songswap_client::state::catalogue::validate_chain(name, description.as_deref())
                        .map_err(|message| anyhow!(message))?;
                let chain = ctx
                    .service
                    .create_chain(name, description)
                    .await
                    .map_err(explain)?;
                writeln!(stdout, "Created chain:")?;
                write!(stdout, "{}", printing::chain(&chain)?)?;
                Ok(())
            }
            Self::Songs { chain } => {
                let songs = ctx.service.get_chain_songs(*chain).await.map_err(explain)?;
                write!(stdout, "{}", printing::chain_songs(&songs, None, |_| false)?)?;
                Ok(())
            }
            Self::Add { chain, song } => {
                ctx.service
                    .add_song_to_chain(*chain, *song)
                    .await
                    .map_err(explain)?;
                writeln!(stdout, "Added song {song} to chain {chain}")?;
                Ok(())
            }
            Self::Remove { chain, song } => {
                ctx.service
                    .remove_song_from_chain(*chain, *song)
                    .await
                    .map_err(explain)?;
                writeln!(stdout, "Removed song {song} from chain {chain}")?;
                Ok(())
            }
        }
    }
}
