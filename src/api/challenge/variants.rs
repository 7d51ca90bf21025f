use crate::codec;
use crate::error::{AcmeError, AcmeResult};
use crate::wire::challenge::{CHALLENGE_TYPE_DNS_01, CHALLENGE_TYPE_HTTP_01, CHALLENGE_TYPE_TLS_ALPN_01};

use super::Challenge;

/// The ACME TLS-ALPN protocol ID, negotiated during the TLS handshake a
/// `tls-alpn-01` validation request uses.
/// https://datatracker.ietf.org/doc/html/rfc8737#section-3
pub static TLS_ALPN_01_PROTOCOL: &str = "acme-tls/1";

/// The `id-pe-acmeIdentifier` X.509 extension OID carrying the validation
/// value for `tls-alpn-01`.
/// https://datatracker.ietf.org/doc/html/rfc8737#section-3
pub static TLS_ALPN_01_EXTENSION_OID: &str = "1.3.6.1.5.5.7.1.31";

fn expect_type(challenge: &Challenge, expected: &str) -> AcmeResult<()> {
    let actual = challenge.challenge_type()?;
    if actual != expected {
        return Err(AcmeError::Protocol(format!(
            "expected a {expected} challenge, got {actual}"
        )));
    }
    Ok(())
}

/// An `http-01` challenge: the caller serves `key_authorization()` as the
/// exact body of `http://<domain>/.well-known/acme-challenge/<token>`.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-8.3
pub struct Http01Challenge(Challenge);

impl Http01Challenge {
    pub fn wrap(challenge: Challenge) -> AcmeResult<Self> {
        expect_type(&challenge, CHALLENGE_TYPE_HTTP_01)?;
        Ok(Self(challenge))
    }

    pub fn inner(&self) -> &Challenge {
        &self.0
    }

    pub fn inner_mut(&mut self) -> &mut Challenge {
        &mut self.0
    }

    /// The path the server will request: `/.well-known/acme-challenge/<token>`.
    pub fn path(&self) -> AcmeResult<String> {
        Ok(format!("/.well-known/acme-challenge/{}", self.0.token()?))
    }

    /// The exact response body to serve at `path()`.
    pub fn response_body(&self) -> AcmeResult<String> {
        self.0.key_authorization()
    }
}

/// A `dns-01` challenge: the caller publishes `digest()` as the value of a
/// `TXT _acme-challenge.<domain>` record.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-8.4
pub struct Dns01Challenge(Challenge);

impl Dns01Challenge {
    pub fn wrap(challenge: Challenge) -> AcmeResult<Self> {
        expect_type(&challenge, CHALLENGE_TYPE_DNS_01)?;
        Ok(Self(challenge))
    }

    pub fn inner(&self) -> &Challenge {
        &self.0
    }

    pub fn inner_mut(&mut self) -> &mut Challenge {
        &mut self.0
    }

    pub fn record_name(&self, domain: impl AsRef<str>) -> String {
        format!("_acme-challenge.{}", domain.as_ref())
    }

    /// `base64url(sha256(key_authorization))`, the TXT record's value.
    pub fn digest(&self) -> AcmeResult<String> {
        let key_authz = self.0.key_authorization()?;
        Ok(crate::base64url::encode(codec::sha256(key_authz.as_bytes())))
    }
}

/// A `tls-alpn-01` challenge: the caller serves a self-signed certificate
/// for the domain under negotiation of the `acme-tls/1` ALPN protocol,
/// carrying `digest()` in the `id-pe-acmeIdentifier` extension.
/// https://datatracker.ietf.org/doc/html/rfc8737
pub struct TlsAlpn01Challenge(Challenge);

impl TlsAlpn01Challenge {
    pub fn wrap(challenge: Challenge) -> AcmeResult<Self> {
        expect_type(&challenge, CHALLENGE_TYPE_TLS_ALPN_01)?;
        Ok(Self(challenge))
    }

    pub fn inner(&self) -> &Challenge {
        &self.0
    }

    pub fn inner_mut(&mut self) -> &mut Challenge {
        &mut self.0
    }

    /// The raw 32-byte `sha256(key_authorization)` to embed, DER-encoded as
    /// an OCTET STRING, in the `id-pe-acmeIdentifier` extension.
    pub fn digest(&self) -> AcmeResult<[u8; 32]> {
        let key_authz = self.0.key_authorization()?;
        Ok(codec::sha256(key_authz.as_bytes()))
    }
}
