use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, FixedOffset};

use crate::base64url;
use crate::error::{AcmeError, AcmeResult};
use crate::login::Login;
use crate::wire::common::ResourceStatus;
use crate::wire::identifier::AcmeIdentifier;
use crate::wire::order::{FinalizeOrder, NewOrderResource, OrderResource, OrderStatus};
use crate::wire::problem::AcmeProblem;

use super::authorization::Authorization;
use super::dns_identifier::DnsIdentifier;
use super::lazy::JsonBackedResource;

/// A plain configuration record for `newOrder`, kept as data rather than a
/// fluent builder chain.
#[derive(Debug, Default, Clone)]
pub struct OrderConfig {
    pub identifiers: Vec<AcmeIdentifier>,
    pub not_before: Option<DateTime<FixedOffset>>,
    pub not_after: Option<DateTime<FixedOffset>>,
}

impl OrderConfig {
    pub fn dns(name: impl Into<String>) -> Self {
        Self {
            identifiers: vec![AcmeIdentifier::dns(name)],
            ..Default::default()
        }
    }

    pub(crate) fn into_wire(self) -> NewOrderResource {
        NewOrderResource {
            identifiers: self.identifiers,
            not_before: self.not_before,
            not_after: self.not_after,
        }
    }
}

/// The `Order` resource.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-7.1.3
pub struct Order {
    login: Arc<Login>,
    state: JsonBackedResource<OrderResource>,
}

impl Order {
    pub(crate) fn new(
        login: Arc<Login>,
        url: String,
        resource: OrderResource,
        retry_after: Option<SystemTime>,
    ) -> Self {
        Self {
            login,
            state: JsonBackedResource::with_cached(url, resource, retry_after),
        }
    }

    pub(crate) fn unloaded(login: Arc<Login>, url: impl Into<String>) -> Self {
        Self {
            login,
            state: JsonBackedResource::new(url),
        }
    }

    pub fn url(&self) -> &str {
        self.state.url()
    }

    /// POST-as-GETs this order's URL and replaces the cached state.
    pub async fn fetch(&mut self) -> AcmeResult<()> {
        let mut conn = self.login.session().connection();
        conn.send_signed_post_as_get_request(self.url(), &self.login)
            .await?;
        let resource: OrderResource = conn.read_json_response()?.into_typed()?;
        self.state.set(resource, conn.get_retry_after());
        Ok(())
    }

    fn loaded(&self) -> AcmeResult<&OrderResource> {
        self.state.require()
    }

    pub fn status(&self) -> AcmeResult<OrderStatus> {
        Ok(self.loaded()?.status)
    }

    /// The order's status, failing with the attached problem if this order
    /// is `invalid` and carries one.
    pub fn status_result(&self) -> AcmeResult<OrderStatus> {
        let resource = self.loaded()?;
        if let Some(ref problem) = resource.error {
            return Err(AcmeError::from_problem(problem.clone(), None));
        }
        resource.status.as_result()
    }

    pub fn error(&self) -> AcmeResult<Option<&AcmeProblem>> {
        Ok(self.loaded()?.error.as_ref())
    }

    pub fn identifiers(&self) -> AcmeResult<&[AcmeIdentifier]> {
        Ok(&self.loaded()?.identifiers)
    }

    pub fn dns_name(&self) -> AcmeResult<Option<DnsIdentifier>> {
        Ok(DnsIdentifier::find_acme_identifier(self.identifiers()?, false))
    }

    pub fn expires(&self) -> AcmeResult<Option<DateTime<FixedOffset>>> {
        Ok(self.loaded()?.expires)
    }

    pub fn authorization_urls(&self) -> AcmeResult<&[String]> {
        Ok(&self.loaded()?.authorizations)
    }

    pub fn certificate_url(&self) -> AcmeResult<Option<&str>> {
        Ok(self.loaded()?.certificate.as_deref())
    }

    /// The issued certificate resource, once this order is `valid`.
    pub fn certificate(&self) -> AcmeResult<super::certificate::Certificate> {
        let url = self
            .certificate_url()?
            .ok_or(AcmeError::MissingExpectedField("certificate"))?;
        Ok(super::certificate::Certificate::new(self.login.clone(), url.to_string()))
    }

    pub fn is_pending(&self) -> AcmeResult<bool> {
        Ok(self.status()? == OrderStatus::Pending)
    }

    pub fn is_ready(&self) -> AcmeResult<bool> {
        Ok(self.status()? == OrderStatus::Ready)
    }

    pub fn is_processing(&self) -> AcmeResult<bool> {
        Ok(self.status()? == OrderStatus::Processing)
    }

    pub fn is_valid(&self) -> AcmeResult<bool> {
        Ok(self.status()? == OrderStatus::Valid)
    }

    pub fn is_invalid(&self) -> AcmeResult<bool> {
        Ok(self.status()? == OrderStatus::Invalid)
    }

    /// The authorizations this order needs satisfied, fetched one by one.
    pub async fn authorizations(&self) -> AcmeResult<Vec<Authorization>> {
        let mut out = Vec::new();
        for url in self.authorization_urls()? {
            let mut authz = Authorization::unloaded(self.login.clone(), url.clone());
            authz.fetch().await?;
            out.push(authz);
        }
        Ok(out)
    }

    /// The order's single authorization; fails if there is more than one.
    pub async fn only_authorization(&self) -> AcmeResult<Authorization> {
        let urls = self.authorization_urls()?;
        if urls.len() != 1 {
            return Err(AcmeError::Usage(format!(
                "expected exactly one authorization, found {}",
                urls.len()
            )));
        }
        let mut authz = Authorization::unloaded(self.login.clone(), urls[0].clone());
        authz.fetch().await?;
        Ok(authz)
    }

    /// POSTs `{csr: base64url(csr-der)}` to this order's finalize URL and
    /// replaces the cached state with the response.
    pub async fn finalize(&mut self, csr_der: impl AsRef<[u8]>) -> AcmeResult<OrderStatus> {
        let finalize_url = self
            .loaded()?
            .finalize
            .clone()
            .ok_or(AcmeError::MissingExpectedField("finalize"))?;
        let request = FinalizeOrder {
            csr: base64url::encode(csr_der),
        };
        let mut conn = self.login.session().connection();
        conn.send_signed_request(&finalize_url, &request, &self.login)
            .await?;
        let resource: OrderResource = conn.read_json_response()?.into_typed()?;
        self.state.set(resource, conn.get_retry_after());
        self.status()
    }

    /// Generates a fresh certificate key, builds a CSR from this order's
    /// identifiers, and finalizes the order. Requires the `x509` feature.
    /// Returns the PEM-encoded private key alongside the resulting status —
    /// callers need it to make use of the certificate once issued.
    #[cfg(feature = "x509")]
    pub async fn execute(&mut self) -> AcmeResult<(String, OrderStatus)> {
        let mut config = crate::csr::CsrConfig::default();
        for identifier in self.identifiers()? {
            if let Some(name) = identifier.dns_name() {
                config.domains.push(name.to_string());
            } else if let Some(addr) = identifier.ip_addr() {
                config.ips.push(addr);
            }
        }
        let (key_pem, csr_der) = crate::csr::generate_key_and_csr(&config)?;
        let status = self.finalize(csr_der).await?;
        Ok((key_pem, status))
    }

    #[cfg(not(feature = "x509"))]
    pub async fn execute(&mut self) -> AcmeResult<(String, OrderStatus)> {
        Err(AcmeError::Usage(
            "Order::execute requires the x509 feature for CSR assembly".to_string(),
        ))
    }

    /// Repeatedly `fetch()`es until the order reaches a terminal status
    /// (`valid` or `invalid`), honoring the server's `Retry-After` between
    /// attempts and falling back to `default_interval` when it's absent.
    pub async fn poll_until_final<Sleep, SleepFuture>(
        &mut self,
        default_interval: Duration,
        mut sleep: Sleep,
    ) -> AcmeResult<OrderStatus>
    where
        Sleep: FnMut(Duration) -> SleepFuture,
        SleepFuture: Future<Output = ()>,
    {
        loop {
            let status = self.status()?;
            if matches!(status, OrderStatus::Valid | OrderStatus::Invalid) {
                return Ok(status);
            }
            let delay = self
                .state
                .retry_after()
                .and_then(|deadline| deadline.duration_since(SystemTime::now()).ok())
                .unwrap_or(default_interval);
            sleep(delay).await;
            self.fetch().await?;
        }
    }
}
