use std::io::Write;
use std::sync::Arc;

use crate::base64url;
use crate::crypto::account_key::AccountKey;
use crate::error::{AcmeError, AcmeResult};
use crate::login::Login;
use crate::session::{ResourceKind, Session};
use crate::wire::revoke::{RevocationReason, RevokeCertificateRequest};

/// The issued certificate resource: a `application/pem-certificate-chain`
/// document, end-entity certificate first.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-7.4.2
pub struct Certificate {
    login: Arc<Login>,
    url: String,
    pem: Option<String>,
    alternates: Vec<String>,
}

impl Certificate {
    pub(crate) fn new(login: Arc<Login>, url: impl Into<String>) -> Self {
        Self {
            login,
            url: url.into(),
            pem: None,
            alternates: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Downloads the certificate chain, caching its PEM text and any
    /// `Link: rel="alternate"` chain URLs the server offered alongside it.
    pub async fn download(&mut self) -> AcmeResult<()> {
        let mut conn = self.login.session().connection();
        conn.send_certificate_request(&self.url, &self.login).await?;
        self.alternates = conn.get_links("alternate");
        self.pem = Some(conn.read_body_string()?);
        Ok(())
    }

    fn loaded(&self) -> AcmeResult<&str> {
        self.pem.as_deref().ok_or_else(|| {
            AcmeError::Usage(format!("{} not downloaded; call download() first", self.url))
        })
    }

    /// The raw `application/pem-certificate-chain` text.
    pub fn pem_chain(&self) -> AcmeResult<&str> {
        self.loaded()
    }

    /// The chain parsed into individual certificates, end-entity first.
    #[cfg(feature = "x509")]
    pub fn certificate_chain(&self) -> AcmeResult<Vec<openssl::x509::X509>> {
        openssl::x509::X509::stack_from_pem(self.loaded()?.as_bytes())
            .map_err(|err| AcmeError::Protocol(format!("invalid certificate chain: {err}")))
    }

    pub fn write_certificate(&self, writer: &mut impl Write) -> AcmeResult<()> {
        writer
            .write_all(self.loaded()?.as_bytes())
            .map_err(|err| AcmeError::Protocol(format!("writing certificate chain: {err}")))
    }

    /// Alternate chain URLs offered by the last `download()`, unfetched.
    pub fn alternate_urls(&self) -> &[String] {
        &self.alternates
    }

    /// Downloads every alternate chain offered alongside this one.
    pub async fn get_alternates(&self) -> AcmeResult<Vec<Certificate>> {
        let mut out = Vec::new();
        for url in &self.alternates {
            let mut cert = Certificate::new(self.login.clone(), url.clone());
            cert.download().await?;
            out.push(cert);
        }
        Ok(out)
    }

    #[cfg(feature = "x509")]
    fn end_entity_der(&self) -> AcmeResult<Vec<u8>> {
        let chain = self.certificate_chain()?;
        let leaf = chain
            .first()
            .ok_or_else(|| AcmeError::Protocol("empty certificate chain".to_string()))?;
        leaf.to_der()
            .map_err(|err| AcmeError::Protocol(format!("DER encoding failed: {err}")))
    }

    /// Revokes this certificate, signed by the account that requested it.
    /// https://datatracker.ietf.org/doc/html/rfc8555#section-7.6
    #[cfg(feature = "x509")]
    pub async fn revoke(&self, reason: Option<RevocationReason>) -> AcmeResult<()> {
        let der = self.end_entity_der()?;
        let revoke_url = self.login.session().resource_url(ResourceKind::RevokeCert).await?;
        let request = RevokeCertificateRequest {
            certificate: base64url::encode(der),
            reason,
        };
        let mut conn = self.login.session().connection();
        conn.send_signed_request(&revoke_url, &request, &self.login).await?;
        Ok(())
    }

    /// Revokes a certificate by the private key corresponding to its public
    /// key, without an account — RFC 8555 permits this for the holder of a
    /// certificate's key even outside of any ACME account.
    pub async fn revoke_with_certificate_key(
        session: &Session,
        certificate_der: impl AsRef<[u8]>,
        key_pair: &impl AccountKey,
        reason: Option<RevocationReason>,
    ) -> AcmeResult<()> {
        let revoke_url = session.resource_url(ResourceKind::RevokeCert).await?;
        let request = RevokeCertificateRequest {
            certificate: base64url::encode(certificate_der),
            reason,
        };
        let mut conn = session.connection();
        conn.send_signed_request_jwk(&revoke_url, &request, session, key_pair).await?;
        Ok(())
    }
}
