use std::{path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser};
use songswap_core::{
    config::Settings,
    logger::{init_logger, init_tracing},
};

mod handlers;

use handlers::{
    CommandHandler, Context,
    utils::{WriteAdapter, init_service},
};

/// Options configurable via the CLI.
#[derive(Debug, Parser)]
#[command(name = "songswap", version = env!("CARGO_PKG_VERSION"), about)]
struct Flags {
    /// Set the base url of the songswap api
    #[clap(long, value_hint = clap::ValueHint::Url)]
    api_url: Option<String>,
    /// Set the log level
    #[clap(long)]
    log_level: Option<log::LevelFilter>,
    /// Use a config file other than the default one
    #[clap(long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,
    /// subcommand to run
    #[clap(subcommand)]
    subcommand: Option<handlers::Command>,
}

#[test]
fn verify_cli() {
    Flags::command().debug_assert();
}

#[cfg(not(tarpaulin_include))]
fn main() -> anyhow::Result<()> {
    clap_complete::CompleteEnv::with_factory(Flags::command).complete();

    let flags = Flags::parse();

    let config_file = match flags.config {
        Some(config) => config,
        None => Settings::get_config_path()?,
    };
    let settings = Settings::init(config_file, flags.api_url, flags.log_level)?;

    init_logger(settings.service.log_level);
    tracing::subscriber::set_global_default(init_tracing(settings.service.log_level))?;

    // the interactive session reads stdin blocking, the stores need a thread of their own
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let (service, credentials) = init_service(&settings)?;
        let ctx = Context {
            service: Arc::new(service),
            credentials,
            settings: settings.client,
        };

        let mut stdout_adapter = WriteAdapter(std::io::stdout());
        let mut stderr_adapter = WriteAdapter(std::io::stderr());

        if let Some(command) = flags.subcommand {
            command
                .handle(
                    &ctx,
                    &mut stdout_adapter,
                    &mut stderr_adapter,
                    &std::io::stdin(),
                )
                .await?;
        } else {
            eprintln!("No subcommand provided");
        }

        Ok(())
    })
}
