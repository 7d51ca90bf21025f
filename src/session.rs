use std::sync::{Arc, Mutex};

use http_client::HttpClient;

use crate::connection::Connection;
use crate::error::{AcmeError, AcmeResult};
use crate::wire::directory::{DirectoryMetadata, DirectoryResource};

/// Client-side networking/language knobs a [`Session`] applies to every
/// request it builds. Proxying, TLS trust store and connection timeouts are
/// the caller's [`HttpClient`]'s concern and pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub accept_language: Option<String>,
}

/// The resource kinds named in an ACME directory document.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-7.1.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    NewNonce,
    NewAccount,
    NewOrder,
    NewAuthz,
    RevokeCert,
    KeyChange,
}

/// Holds the directory URL, the lazily-fetched directory document, the
/// single-slot nonce cache, and networking configuration. Spans the
/// user-facing client's lifetime; one `Session` serves one account's worth
/// of strictly-ordered, non-pipelined signed requests (see the crate's
/// concurrency notes: concurrent use of one `Session` from multiple threads
/// is undefined behavior).
pub struct Session {
    http: Arc<dyn HttpClient>,
    directory_url: String,
    directory: Mutex<Option<DirectoryResource>>,
    nonce: Mutex<Option<String>>,
    config: SessionConfig,
}

impl Session {
    pub fn new(http: impl Into<Arc<dyn HttpClient>>, directory_url: impl Into<String>) -> Self {
        Self::with_config(http, directory_url, SessionConfig::default())
    }

    pub fn with_config(
        http: impl Into<Arc<dyn HttpClient>>,
        directory_url: impl Into<String>,
        config: SessionConfig,
    ) -> Self {
        Self {
            http: http.into(),
            directory_url: directory_url.into(),
            directory: Mutex::new(None),
            nonce: Mutex::new(None),
            config,
        }
    }

    pub fn http(&self) -> &Arc<dyn HttpClient> {
        &self.http
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn connection(&self) -> Connection<'_> {
        Connection::new(self)
    }

    /// Lazily GETs and caches the directory document. Refresh happens only
    /// on first use or on an explicit [`Session::refresh_directory`] call,
    /// never implicitly on a later failure.
    pub async fn directory(&self) -> AcmeResult<DirectoryResource> {
        {
            let cached = self.directory.lock().unwrap();
            if let Some(dir) = cached.as_ref() {
                return Ok(dir.clone());
            }
        }
        self.refresh_directory().await
    }

    /// Forces a re-fetch of the directory document.
    pub async fn refresh_directory(&self) -> AcmeResult<DirectoryResource> {
        tracing::debug!("fetching directory from {}", self.directory_url);
        let mut conn = self.connection();
        conn.send_request(&self.directory_url).await?;
        let directory: DirectoryResource = conn.read_json_response()?.into_typed()?;
        *self.directory.lock().unwrap() = Some(directory.clone());
        Ok(directory)
    }

    pub async fn meta(&self) -> AcmeResult<DirectoryMetadata> {
        Ok(self.directory().await?.meta)
    }

    pub async fn terms_of_service_url(&self) -> AcmeResult<Option<String>> {
        Ok(self.meta().await?.terms_of_service)
    }

    pub async fn website_url(&self) -> AcmeResult<Option<String>> {
        Ok(self.meta().await?.website)
    }

    pub async fn caa_identities(&self) -> AcmeResult<Vec<String>> {
        Ok(self.meta().await?.caa_identities)
    }

    pub async fn external_account_required(&self) -> AcmeResult<bool> {
        Ok(self.meta().await?.external_account_required.unwrap_or(false))
    }

    /// The URL for a known directory resource kind.
    pub async fn resource_url(&self, kind: ResourceKind) -> AcmeResult<String> {
        let dir = self.directory().await?;
        Ok(match kind {
            ResourceKind::NewNonce => dir.new_nonce,
            ResourceKind::NewAccount => dir.new_account,
            ResourceKind::NewOrder => dir.new_order,
            ResourceKind::NewAuthz => {
                dir.new_authz
                    .ok_or_else(|| AcmeError::Protocol("directory has no newAuthz URL".to_string()))?
            }
            ResourceKind::RevokeCert => dir.revoke_cert,
            ResourceKind::KeyChange => dir.key_change,
        })
    }

    /// Takes the cached nonce, if any, consuming it.
    pub(crate) fn take_nonce(&self) -> Option<String> {
        self.nonce.lock().unwrap().take()
    }

    /// Replaces the cached nonce. Called after every response that carried a
    /// `Replay-Nonce` header.
    pub(crate) fn set_nonce(&self, nonce: String) {
        *self.nonce.lock().unwrap() = Some(nonce);
    }

    /// The cached nonce if present; otherwise issues a `HEAD` to the
    /// directory's `newNonce` URL and takes its `Replay-Nonce` header. Either
    /// way the nonce is consumed — callers must feed the response's
    /// `Replay-Nonce` back via [`Session::set_nonce`].
    pub(crate) async fn next_nonce(&self) -> AcmeResult<String> {
        match self.take_nonce() {
            Some(nonce) => Ok(nonce),
            None => self.fetch_nonce().await,
        }
    }

    async fn fetch_nonce(&self) -> AcmeResult<String> {
        let new_nonce_url = self.resource_url(ResourceKind::NewNonce).await?;
        tracing::debug!("fetching a fresh nonce from {new_nonce_url}");
        let req = http_client::Request::head(new_nonce_url.as_str());
        let mut resp = self.http.send(req).await.map_err(AcmeError::from)?;
        let nonce = crate::connection::replay_nonce(&resp);
        let body = resp.body_bytes().await.map_err(AcmeError::from)?;
        crate::connection::check_status(&resp, &body)?;
        nonce.ok_or(AcmeError::MissingExpectedHeader("Replay-Nonce"))
    }
}
