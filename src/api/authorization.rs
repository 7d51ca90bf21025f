use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::error::{AcmeError, AcmeResult};
use crate::login::Login;
use crate::wire::authorization::{AuthorizationResource, AuthorizationStatus};
use crate::wire::common::ResourceStatus;
use crate::wire::identifier::AcmeIdentifier;

use super::challenge::Challenge;
use super::dns_identifier::DnsIdentifier;
use super::lazy::JsonBackedResource;

/// The `Authorization` resource.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-7.1.4
pub struct Authorization {
    login: Arc<Login>,
    state: JsonBackedResource<AuthorizationResource>,
}

impl Authorization {
    pub(crate) fn unloaded(login: Arc<Login>, url: impl Into<String>) -> Self {
        Self {
            login,
            state: JsonBackedResource::new(url),
        }
    }

    pub fn url(&self) -> &str {
        self.state.url()
    }

    /// POST-as-GETs this authorization's URL and replaces the cached state.
    pub async fn fetch(&mut self) -> AcmeResult<()> {
        let mut conn = self.login.session().connection();
        conn.send_signed_post_as_get_request(self.url(), &self.login)
            .await?;
        let resource: AuthorizationResource = conn.read_json_response()?.into_typed()?;
        self.state.set(resource, conn.get_retry_after());
        Ok(())
    }

    fn loaded(&self) -> AcmeResult<&AuthorizationResource> {
        self.state.require()
    }

    pub fn status(&self) -> AcmeResult<AuthorizationStatus> {
        Ok(self.loaded()?.status)
    }

    pub fn status_result(&self) -> AcmeResult<AuthorizationStatus> {
        self.status()?.as_result()
    }

    pub fn identifier(&self) -> AcmeResult<&AcmeIdentifier> {
        Ok(&self.loaded()?.identifier)
    }

    pub fn is_wildcard(&self) -> AcmeResult<bool> {
        Ok(self.loaded()?.wildcard)
    }

    pub fn dns_identifier(&self) -> AcmeResult<Option<DnsIdentifier>> {
        let resource = self.loaded()?;
        Ok(DnsIdentifier::from_acme_identifier(&resource.identifier, resource.wildcard))
    }

    pub fn expires(&self) -> AcmeResult<Option<DateTime<FixedOffset>>> {
        Ok(self.loaded()?.expires)
    }

    /// The challenges offered for this authorization.
    pub fn challenges(&self) -> AcmeResult<Vec<Challenge>> {
        Ok(self
            .loaded()?
            .challenges
            .iter()
            .map(|resource| Challenge::from_resource(self.login.clone(), resource.clone()))
            .collect())
    }

    /// The first offered challenge of `challenge_type`, failing if none
    /// matches.
    pub fn find_challenge(&self, challenge_type: &str) -> AcmeResult<Challenge> {
        self.loaded()?
            .challenges
            .iter()
            .find(|resource| resource.type_ == challenge_type)
            .map(|resource| Challenge::from_resource(self.login.clone(), resource.clone()))
            .ok_or_else(|| {
                AcmeError::Usage(format!(
                    "authorization {} offers no {challenge_type} challenge",
                    self.url()
                ))
            })
    }

    /// Deactivates this authorization (POSTs `{status: "deactivated"}`).
    /// https://datatracker.ietf.org/doc/html/rfc8555#section-7.5.2
    pub async fn deactivate(&mut self) -> AcmeResult<()> {
        #[derive(serde::Serialize)]
        struct Deactivate {
            status: &'static str,
        }
        let mut conn = self.login.session().connection();
        conn.send_signed_request(self.url(), &Deactivate { status: "deactivated" }, &self.login)
            .await?;
        let resource: AuthorizationResource = conn.read_json_response()?.into_typed()?;
        self.state.set(resource, conn.get_retry_after());
        Ok(())
    }
}
