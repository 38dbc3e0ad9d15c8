pub mod complete;
pub mod implementations;
pub mod interactive;
pub mod printing;
pub mod utils;

#[cfg(test)]
mod smoke_tests;

use std::sync::Arc;

use clap::Subcommand;
use clap_complete::ArgValueCandidates;
use songswap_core::{
    config::ClientSettings,
    credentials::CredentialProvider,
    models::{ChainId, SongId},
    service::SongSwap,
};

use utils::StdIn;

/// Everything a command needs to talk to the service.
pub struct Context<S> {
    pub service: Arc<S>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub settings: ClientSettings,
}

pub trait CommandHandler {
    type Output;

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
    ) -> Self::Output;
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and log in with it
    Register {
        /// The name to register
        username: String,
        /// The password, read from stdin when omitted
        #[clap(long)]
        password: Option<String>,
    },
    /// Log in, the session is kept until you log out
    Login {
        /// Who to log in as
        username: String,
        /// The password, read from stdin when omitted
        #[clap(long)]
        password: Option<String>,
    },
    /// Log out, forgetting the stored session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Get a song you haven't heard yet
    Discover {
        /// Only discover songs from this chain
        #[clap(long, add = ArgValueCandidates::new(complete::complete_chains))]
        chain: Option<ChainId>,
    },
    /// Like a song
    Like { song: SongId },
    /// Take a like back
    Unlike { song: SongId },
    /// Give a song, to get a song
    Submit {
        /// A link to the song
        url: String,
        /// A short note to go with it
        #[clap(long)]
        context: Option<String>,
        /// Add the song to this chain as well
        #[clap(long, add = ArgValueCandidates::new(complete::complete_chains))]
        chain: Option<ChainId>,
    },
    /// Every song you have been shown, newest first
    History,
    /// Chain commands
    Chains {
        #[clap(subcommand)]
        command: ChainsCommand,
    },
    /// Show how a song link would be played
    Embed {
        /// The link to resolve
        url: String,
    },
    /// Start an interactive discovery session, reading commands from stdin
    #[clap(alias = "repl")]
    Session,
}

#[derive(Debug, Subcommand)]
pub enum ChainsCommand {
    /// List every chain, newest first
    #[clap(alias = "ls")]
    List,
    /// Create a new chain
    Create {
        /// The name of the chain
        name: String,
        /// What the chain is about
        #[clap(long)]
        description: Option<String>,
    },
    /// List the songs of a chain
    Songs {
        #[clap(add = ArgValueCandidates::new(complete::complete_chains))]
        chain: ChainId,
    },
    /// Add a song to a chain
    Add {
        #[clap(add = ArgValueCandidates::new(complete::complete_chains))]
        chain: ChainId,
        song: SongId,
    },
    /// Remove a song from a chain you created
    #[clap(alias = "rm")]
    Remove {
        #[clap(add = ArgValueCandidates::new(complete::complete_chains))]
        chain: ChainId,
        song: SongId,
    },
}
