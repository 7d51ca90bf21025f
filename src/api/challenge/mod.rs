use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::error::{AcmeError, AcmeResult};
use crate::login::Login;
use crate::wire::challenge::{ChallengeResource, ChallengeStatus};
use crate::wire::common::ResourceStatus;
use crate::wire::problem::AcmeProblem;

use super::lazy::JsonBackedResource;

pub mod variants;

/// The `Challenge` resource.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-8
pub struct Challenge {
    login: Arc<Login>,
    state: JsonBackedResource<ChallengeResource>,
}

impl Challenge {
    pub(crate) fn from_resource(login: Arc<Login>, resource: ChallengeResource) -> Self {
        let url = resource.url.clone();
        Self {
            login,
            state: JsonBackedResource::with_cached(url, resource, None),
        }
    }

    pub fn url(&self) -> &str {
        self.state.url()
    }

    fn loaded(&self) -> AcmeResult<&ChallengeResource> {
        self.state.require()
    }

    pub fn challenge_type(&self) -> AcmeResult<&str> {
        Ok(&self.loaded()?.type_)
    }

    pub fn status(&self) -> AcmeResult<ChallengeStatus> {
        Ok(self.loaded()?.status)
    }

    pub fn status_result(&self) -> AcmeResult<ChallengeStatus> {
        self.status()?.as_result()
    }

    pub fn token(&self) -> AcmeResult<&str> {
        self.loaded()?
            .token
            .as_deref()
            .ok_or(AcmeError::MissingExpectedField("token"))
    }

    pub fn validated(&self) -> AcmeResult<Option<DateTime<FixedOffset>>> {
        Ok(self.loaded()?.validated)
    }

    pub fn error(&self) -> AcmeResult<Option<&AcmeProblem>> {
        Ok(self.loaded()?.error.as_ref())
    }

    pub fn additional_field(&self, key: &str) -> AcmeResult<Option<&Value>> {
        Ok(self.loaded()?.additional_fields.get(key))
    }

    /// The key authorization this challenge's token authorizes:
    /// `token || "." || thumbprint(accountKey)`.
    /// https://datatracker.ietf.org/doc/html/rfc8555#section-8.1
    pub fn key_authorization(&self) -> AcmeResult<String> {
        let token = self.token()?;
        let thumbprint = self.login.account_key().thumbprint().map_err(AcmeError::Crypto)?;
        Ok(format!("{token}.{thumbprint}"))
    }

    /// Tells the server this challenge is ready to be validated by POSTing
    /// an empty JSON object to its URL, and replaces the cached state with
    /// the response.
    pub async fn trigger(&mut self) -> AcmeResult<ChallengeStatus> {
        let mut conn = self.login.session().connection();
        conn.send_signed_request(self.url(), &serde_json::json!({}), &self.login)
            .await?;
        let resource: ChallengeResource = conn.read_json_response()?.into_typed()?;
        self.state.set(resource, conn.get_retry_after());
        self.status()
    }

    /// POST-as-GETs this challenge's URL and replaces the cached state.
    pub async fn fetch(&mut self) -> AcmeResult<()> {
        let mut conn = self.login.session().connection();
        conn.send_signed_post_as_get_request(self.url(), &self.login)
            .await?;
        let resource: ChallengeResource = conn.read_json_response()?.into_typed()?;
        self.state.set(resource, conn.get_retry_after());
        Ok(())
    }
}
