//! The [`SongSwap`] service spoken over HTTP.
//!
//! This is the transport: it builds the requests, attaches the bearer token of the current
//! credential, and turns status codes into [`ServiceError`]s. A `401` on an authenticated call
//! tears the credential down, the same as logging out.

use std::{sync::Arc, time::Duration};

use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    credentials::CredentialProvider,
    errors::ServiceError,
    models::{
        AddChainSongRequest, AuthResponse, Chain, ChainId, CreateChainRequest, Credentials, Discovery, Song,
        SongId, SubmitSongRequest,
    },
    service::{ServiceResult, SongSwap},
};

/// Whether a request carries the session credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Auth {
    /// The call fails locally when logged out.
    Required,
    /// The token is attached when there is one.
    Optional,
    None,
}

#[derive(Clone)]
pub struct HttpService {
    base_url: String,
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for HttpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpService")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpService {
    /// Create a service talking to the api at `base_url`.
    ///
    /// # Errors
    ///
    /// Fails if the underlying http client can't be built (e.g. no TLS backend).
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("songswap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
            credentials,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, auth: Auth) -> ServiceResult<RequestBuilder> {
        let request = self.client.request(method, format!("{}{path}", self.base_url));

        match (auth, self.credentials.current()) {
            (Auth::Required | Auth::Optional, Some(credential)) => Ok(request.bearer_auth(credential.token)),
            (Auth::Required, None) => Err(ServiceError::Auth("not logged in".into())),
            (Auth::Optional | Auth::None, _) => Ok(request),
        }
    }

    /// Send the request, turning any non-success status into an error.
    async fn send(&self, request: RequestBuilder, auth: Auth) -> ServiceResult<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // the service answers errors with a plain text body
        let body = response.text().await.unwrap_or_default().trim().to_owned();
        debug!("service responded {status}: {body}");

        if status == StatusCode::UNAUTHORIZED && auth != Auth::None {
            warn!("the service rejected the session credential, logging out");
            if let Err(e) = self.credentials.clear() {
                warn!("failed to clear the credential: {e}");
            }
        }

        Err(status_error(status, body))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder, auth: Auth) -> ServiceResult<T> {
        self.send(request, auth)
            .await?
            .json::<T>()
            .await
            .map_err(transport_error)
    }

    async fn ack(&self, request: RequestBuilder, auth: Auth) -> ServiceResult<()> {
        self.send(request, auth).await.map(drop)
    }
}

/// Map an unsuccessful status code to the error taxonomy.
fn status_error(status: StatusCode, body: String) -> ServiceError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::Validation(body)
        }
        StatusCode::UNAUTHORIZED => ServiceError::Auth(body),
        StatusCode::FORBIDDEN => ServiceError::Forbidden(body),
        StatusCode::NOT_FOUND => ServiceError::NotFound(body),
        _ if body.is_empty() => ServiceError::Transient(status.to_string()),
        _ => ServiceError::Transient(format!("{status}: {body}")),
    }
}

#[allow(clippy::needless_pass_by_value)]
fn transport_error(e: reqwest::Error) -> ServiceError {
    ServiceError::Transient(e.to_string())
}

impl SongSwap for HttpService {
    #[tracing::instrument(level = "debug", skip_all, fields(username = %credentials.username))]
    async fn register(&self, credentials: Credentials) -> ServiceResult<AuthResponse> {
        let request = self.request(Method::POST, "/register", Auth::None)?.json(&credentials);
        self.json(request, Auth::None).await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(username = %credentials.username))]
    async fn login(&self, credentials: Credentials) -> ServiceResult<AuthResponse> {
        let request = self.request(Method::POST, "/login", Auth::None)?.json(&credentials);
        self.json(request, Auth::None).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn discover(&self, chain: Option<ChainId>) -> ServiceResult<Song> {
        let mut request = self.request(Method::GET, "/discover", Auth::Required)?;
        if let Some(chain) = chain {
            request = request.query(&[("chain", chain.0)]);
        }
        self.json(request, Auth::Required).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn like_song(&self, song: SongId) -> ServiceResult<()> {
        let request = self.request(Method::POST, &format!("/songs/{song}/like"), Auth::Required)?;
        self.ack(request, Auth::Required).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn unlike_song(&self, song: SongId) -> ServiceResult<()> {
        let request = self.request(Method::DELETE, &format!("/songs/{song}/like"), Auth::Required)?;
        self.ack(request, Auth::Required).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_history(&self) -> ServiceResult<Vec<Discovery>> {
        let request = self.request(Method::GET, "/history", Auth::Required)?;
        // an empty history is sent as `null`
        let history: Option<Vec<Discovery>> = self.json(request, Auth::Required).await?;
        Ok(history.unwrap_or_default())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn submit_song(&self, request: SubmitSongRequest) -> ServiceResult<Song> {
        let request = self.request(Method::POST, "/songs", Auth::Optional)?.json(&request);
        self.json(request, Auth::Optional).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_chains(&self) -> ServiceResult<Vec<Chain>> {
        let request = self.request(Method::GET, "/chains", Auth::None)?;
        self.json(request, Auth::None).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_chain_songs(&self, chain: ChainId) -> ServiceResult<Vec<Song>> {
        let request = self.request(Method::GET, &format!("/chains/{chain}/songs"), Auth::None)?;
        self.json(request, Auth::None).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn create_chain(&self, name: String, description: Option<String>) -> ServiceResult<Chain> {
        let request = self
            .request(Method::POST, "/chains", Auth::Required)?
            .json(&CreateChainRequest { name, description });
        self.json(request, Auth::Required).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn add_song_to_chain(&self, chain: ChainId, song: SongId) -> ServiceResult<()> {
        let request = self
            .request(Method::POST, &format!("/chains/{chain}/songs"), Auth::Required)?
            .json(&AddChainSongRequest { song_id: song });
        self.ack(request, Auth::Required).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn remove_song_from_chain(&self, chain: ChainId, song: SongId) -> ServiceResult<()> {
        let request = self.request(
            Method::DELETE,
            &format!("/chains/{chain}/songs/{song}"),
            Auth::Required,
        )?;
        self.ack(request, Auth::Required).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::BAD_REQUEST, "URL is required", ServiceError::Validation("URL is required".into()))]
    #[case(StatusCode::CONFLICT, "Username already taken", ServiceError::Validation("Username already taken".into()))]
    #[case(StatusCode::UNAUTHORIZED, "Unauthorized", ServiceError::Auth("Unauthorized".into()))]
    #[case(StatusCode::FORBIDDEN, "nope", ServiceError::Forbidden("nope".into()))]
    #[case(StatusCode::NOT_FOUND, "No new songs to discover", ServiceError::NotFound("No new songs to discover".into()))]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch chains", ServiceError::Transient("500 Internal Server Error: Failed to fetch chains".into()))]
    #[case(StatusCode::BAD_GATEWAY, "", ServiceError::Transient("502 Bad Gateway".into()))]
    fn test_status_error(#[case] status: StatusCode, #[case] body: &str, #[case] expected: ServiceError) {
        assert_eq!(status_error(status, body.to_owned()), expected);
    }

    #[test]
    fn test_base_url_is_normalized() {
        let service = HttpService::new(
            "http://localhost:8080/",
            Duration::from_secs(1),
            Arc::new(crate::credentials::MemoryCredentials::default()),
        )
        .unwrap();
        assert_eq!(service.base_url(), "http://localhost:8080");
    }
}
