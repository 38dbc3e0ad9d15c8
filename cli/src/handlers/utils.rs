use core::fmt;
use std::{
    io::{self, BufRead, IsTerminal},
    sync::Arc,
};

use songswap_core::{
    config::Settings,
    credentials::{CredentialProvider, FileCredentials},
    http::HttpService,
};

pub struct WriteAdapter<W>(pub W);

impl<W> fmt::Write for WriteAdapter<W>
where
    W: io::Write,
{
    fn write_str(&mut self, s: &str) -> Result<(), fmt::Error> {
        self.0.write_all(s.as_bytes()).map_err(|_| fmt::Error)
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<(), fmt::Error> {
        self.0.write_fmt(args).map_err(|_| fmt::Error)
    }
}

pub trait StdIn: Send + Sync {
    fn is_terminal(&self) -> bool;
    fn lines(&self) -> impl Iterator<Item = io::Result<String>>;
}

impl StdIn for io::Stdin {
    fn is_terminal(&self) -> bool {
        self.lock().is_terminal()
    }
    fn lines(&self) -> impl Iterator<Item = io::Result<String>> {
        io::BufReader::new(self.lock()).lines()
    }
}

/// Read the first line of stdin, without its line ending.
pub fn read_line<I: StdIn>(stdin: &I) -> io::Result<Option<String>> {
    stdin
        .lines()
        .next()
        .transpose()
        .map(|line| line.map(|l| l.trim_end_matches(['\r', '\n']).to_owned()))
}

/// Build the http service, along with the credential store it authenticates with.
///
/// # Errors
///
/// Fails if the credential file can't be read, or if the http client can't be built.
pub fn init_service(settings: &Settings) -> anyhow::Result<(HttpService, Arc<dyn CredentialProvider>)> {
    let credentials: Arc<dyn CredentialProvider> =
        Arc::new(FileCredentials::hydrate(FileCredentials::default_path()?)?);
    let service = HttpService::new(
        &settings.service.api_url,
        settings.service.timeout(),
        credentials.clone(),
    )?;

    Ok((service, credentials))
}
