use std::time::SystemTime;

use http_client::{Request, Response};
use serde::Serialize;

use crate::codec;
use crate::crypto::account_key::AccountKey;
use crate::crypto::jws::{jws_flattened, JwsHeader};
use crate::error::{AcmeError, AcmeResult};
use crate::json::JsonValue;
use crate::login::Login;
use crate::session::Session;
use crate::wire::problem::AcmeProblem;

/// The bounded number of retries a [`Connection`] performs, locally and
/// transparently, when a signed request fails with `badNonce`. Re-signs with
/// the fresh nonce carried on the failed response and resends the same body.
const BAD_NONCE_RETRIES: u32 = 3;

/// A scoped resource acquired from a [`Session`] to perform one or more
/// requests. Holds the most recent response so its headers and body can be
/// read through the accessor methods below; dropping a `Connection` releases
/// nothing at the `Session` level (the nonce cache, the directory).
pub struct Connection<'s> {
    session: &'s Session,
    last_response: Option<Response>,
    last_body: Vec<u8>,
}

impl<'s> Connection<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self {
            session,
            last_response: None,
            last_body: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        self.session
    }

    /// Unsigned GET. Used only for the directory document.
    pub async fn send_request(&mut self, url: &str) -> AcmeResult<()> {
        let req = Request::get(url);
        self.dispatch(req).await
    }

    /// Signed POST-as-GET (empty payload), authenticated by `kid`.
    pub async fn send_signed_post_as_get_request(
        &mut self,
        url: &str,
        login: &Login,
    ) -> AcmeResult<()> {
        self.send_signed_request_opt(url, None::<&()>, login).await
    }

    /// Signed POST, authenticated by `kid`, with `claims` as the payload.
    pub async fn send_signed_request(
        &mut self,
        url: &str,
        claims: &impl Serialize,
        login: &Login,
    ) -> AcmeResult<()> {
        self.send_signed_request_opt(url, Some(claims), login).await
    }

    async fn send_signed_request_opt(
        &mut self,
        url: &str,
        claims: Option<&impl Serialize>,
        login: &Login,
    ) -> AcmeResult<()> {
        let payload = encode_payload(claims)?;
        let mut attempt = 0;
        loop {
            let nonce = self.session.next_nonce().await?;
            let body = {
                let key = login.account_key();
                let header = JwsHeader {
                    alg: key.jws_alg(),
                    nonce: Some(&nonce),
                    url,
                    jwk: None::<()>,
                    kid: Some(login.account_url()),
                };
                jws_flattened(&*key, &header, &payload).map_err(AcmeError::Crypto)?
            };
            match self.dispatch_signed(url, &body).await {
                Err(AcmeError::Server(ref problem))
                    if problem.has_type(crate::wire::problem::AcmeProblemType::BadNonce)
                        && attempt < BAD_NONCE_RETRIES =>
                {
                    tracing::debug!("badNonce on {url}, retrying (attempt {})", attempt + 1);
                    attempt += 1;
                    continue;
                }
                other => return other,
            }
        }
    }

    /// Signed POST with an embedded `jwk` rather than `kid` — new-account,
    /// revoke-by-certificate-key, and the outer layer of a key-change.
    pub async fn send_signed_request_jwk(
        &mut self,
        url: &str,
        claims: &impl Serialize,
        session: &Session,
        key_pair: &impl AccountKey,
    ) -> AcmeResult<()> {
        let payload = encode_payload(Some(claims))?;
        let public_jwk = key_pair.public_jwk().map_err(AcmeError::Crypto)?;
        let public_jwk = serde_json::value::RawValue::from_string(public_jwk)
            .map_err(AcmeError::Json)?;
        let mut attempt = 0;
        loop {
            let nonce = session.next_nonce().await?;
            let header = JwsHeader {
                alg: key_pair.jws_alg(),
                nonce: Some(&nonce),
                url,
                jwk: Some(&public_jwk),
                kid: None,
            };
            let body = jws_flattened(key_pair, &header, &payload).map_err(AcmeError::Crypto)?;
            match self.dispatch_signed(url, &body).await {
                Err(AcmeError::Server(ref problem))
                    if problem.has_type(crate::wire::problem::AcmeProblemType::BadNonce)
                        && attempt < BAD_NONCE_RETRIES =>
                {
                    tracing::debug!("badNonce on {url}, retrying (attempt {})", attempt + 1);
                    attempt += 1;
                    continue;
                }
                other => return other,
            }
        }
    }

    /// POST-as-GET to a certificate download endpoint; the response body is
    /// a `application/pem-certificate-chain` document.
    pub async fn send_certificate_request(&mut self, url: &str, login: &Login) -> AcmeResult<()> {
        self.send_signed_post_as_get_request(url, login).await
    }

    async fn dispatch_signed(
        &mut self,
        url: &str,
        body: &crate::crypto::jws::Jws,
    ) -> AcmeResult<()> {
        let mut req = Request::post(url);
        if let Some(lang) = &self.session.config().accept_language {
            req.insert_header("Accept-Language", lang.as_str());
        }
        req.set_body(body);
        self.dispatch(req).await
    }

    async fn dispatch(&mut self, req: Request) -> AcmeResult<()> {
        let method = req.method();
        let url = req.url().clone();
        let mut resp = self.session.http().send(req).await.map_err(|err| {
            tracing::warn!("network error on {method} {url}: {err}");
            AcmeError::from(err)
        })?;
        if let Some(nonce) = replay_nonce(&resp) {
            self.session.set_nonce(nonce);
        }
        let body = resp.body_bytes().await.map_err(AcmeError::from)?;
        tracing::debug!("{method} {url} -> {}", resp.status());
        let result = check_status(&resp, &body);
        if let Err(ref err) = result {
            tracing::debug!("{method} {url} failed: {err}");
        }
        self.last_body = body;
        self.last_response = Some(resp);
        result
    }

    /// The parsed JSON body of the most recent response.
    pub fn read_json_response(&self) -> AcmeResult<JsonValue> {
        JsonValue::parse(&self.last_body)
    }

    /// The certificate chain from the most recent response, parsed from its
    /// `application/pem-certificate-chain` body, end-entity certificate
    /// first.
    #[cfg(feature = "x509")]
    pub fn read_certificates(&self) -> AcmeResult<Vec<openssl::x509::X509>> {
        openssl::x509::X509::stack_from_pem(&self.last_body)
            .map_err(|err| AcmeError::Protocol(format!("invalid certificate chain: {err}")))
    }

    /// The raw body text of the most recent response (e.g. a PEM chain or
    /// key-authorization challenge file).
    pub fn read_body_string(&self) -> AcmeResult<String> {
        String::from_utf8(self.last_body.clone())
            .map_err(|err| AcmeError::Protocol(format!("response body is not UTF-8: {err}")))
    }

    /// The `Location` header of the most recent response.
    pub fn get_location(&self) -> Option<String> {
        self.last_response.as_ref().and_then(header_value)
    }

    /// `Link` headers of the most recent response matching `relation`
    /// (`rel="relation"`).
    pub fn get_links(&self, relation: &str) -> Vec<String> {
        let Some(resp) = self.last_response.as_ref() else {
            return Vec::new();
        };
        let Some(values) = resp.header("Link") else {
            return Vec::new();
        };
        values
            .iter()
            .filter_map(|v| parse_link_header(v.as_str()))
            .filter(|(rel, _)| rel == relation)
            .map(|(_, url)| url)
            .collect()
    }

    /// The `Replay-Nonce` header of the most recent response.
    pub fn get_nonce(&self) -> Option<String> {
        self.last_response.as_ref().and_then(replay_nonce)
    }

    /// The `Retry-After` header of the most recent response, parsed relative
    /// to the current time.
    pub fn get_retry_after(&self) -> Option<SystemTime> {
        let resp = self.last_response.as_ref()?;
        let header = resp.header("Retry-After")?.last().as_str();
        codec::parse_retry_after(header, SystemTime::now()).ok()
    }
}

fn encode_payload(claims: Option<&impl Serialize>) -> AcmeResult<Vec<u8>> {
    match claims {
        Some(claims) => serde_json::to_vec(claims).map_err(AcmeError::Json),
        None => Ok(Vec::new()),
    }
}

fn header_value(resp: &Response) -> Option<String> {
    Some(resp.header("Location")?.last().as_str().to_owned())
}

pub(crate) fn replay_nonce(resp: &Response) -> Option<String> {
    Some(resp.header("Replay-Nonce")?.last().as_str().to_owned())
}

/// Parses one `Link` header value (`<url>; rel="relation"`) into
/// `(relation, url)`.
fn parse_link_header(value: &str) -> Option<(String, String)> {
    let mut parts = value.split(';');
    let url = parts.next()?.trim().trim_start_matches('<').trim_end_matches('>').to_string();
    for param in parts {
        let param = param.trim();
        if let Some(rel) = param.strip_prefix("rel=") {
            let rel = rel.trim_matches('"');
            return Some((rel.to_string(), url));
        }
    }
    None
}

/// Translates a non-2xx response into the appropriate [`AcmeError`]: a
/// [`AcmeProblem`] document when the body is `application/problem+json`, a
/// generic protocol error (status + body preview) otherwise. A 2xx/1xx
/// response is `Ok`.
pub(crate) fn check_status(resp: &Response, body: &[u8]) -> AcmeResult<()> {
    let status = resp.status();
    if status.is_success() || status.is_informational() {
        return Ok(());
    }

    let is_problem = resp
        .content_type()
        .map(|ct| ct.essence() == AcmeProblem::CONTENT_TYPE)
        .unwrap_or(false);

    if is_problem {
        if let Ok(problem) = JsonValue::parse(body).and_then(|v| v.as_problem()) {
            let retry_after = resp
                .header("Retry-After")
                .and_then(|values| codec::parse_retry_after(values.last().as_str(), SystemTime::now()).ok())
                .map(|instant| chrono::DateTime::<chrono::Utc>::from(instant));
            return Err(AcmeError::from_problem(problem, retry_after));
        }
    }

    let preview = String::from_utf8_lossy(&body[..body.len().min(512)]).into_owned();
    Err(AcmeError::Protocol(format!(
        "unexpected HTTP {status}: {preview}"
    )))
}
