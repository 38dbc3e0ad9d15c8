//! Completion candidates for arguments that name something on the service, like chain ids.

use clap::builder::StyledStr;
use clap_complete::CompletionCandidate;
use songswap_core::{config::Settings, service::SongSwap};

use super::utils::init_service;

/// Candidates for a chain id, every chain the service knows of.
///
/// Completion must never fail loudly, so anything going wrong just means no candidates.
pub fn complete_chains() -> Vec<CompletionCandidate> {
    // needs to be a multi-threaded runtime or else it will hang on the request
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {e}");
            return vec![];
        }
    };

    let settings = match Settings::get_config_path()
        .map_err(anyhow::Error::from)
        .and_then(|path| Ok(Settings::init(path, None, None)?))
    {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load the config: {e}");
            return vec![];
        }
    };

    let (service, _) = match init_service(&settings) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to reach the service: {e}");
            return vec![];
        }
    };

    match rt.block_on(service.get_chains()) {
        Ok(chains) => chains
            .into_iter()
            .map(|chain| {
                CompletionCandidate::new(chain.id.to_string()).help(Some(StyledStr::from(format!(
                    "\"{}\" ({} songs)",
                    chain.name, chain.song_count
                ))))
            })
            .collect(),
        Err(e) => {
            eprintln!("Failed to fetch chains: {e}");
            vec![]
        }
    }
}
