use std::sync::{Arc, Mutex, MutexGuard};

use crate::crypto::account_key::AccountKey;
use crate::error::{AcmeError, AcmeResult};
use crate::json::JsonBuilder;
use crate::session::{ResourceKind, Session};

/// An immutable (account URL, account key-pair, [`Session`]) binding. Every
/// signed request that identifies an account flows through a `Login` — it is
/// the only authority a signing request trusts to name an account. Fixed
/// after construction except for [`Login::change_key`], the one operation
/// the spec allows to rebind the key reference in place.
pub struct Login {
    session: Arc<Session>,
    account_url: String,
    account_key: Mutex<Box<dyn AccountKey>>,
}

impl Login {
    pub(crate) fn new(session: Arc<Session>, account_url: String, account_key: Box<dyn AccountKey>) -> Self {
        Self {
            session,
            account_url,
            account_key: Mutex::new(account_key),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn account_url(&self) -> &str {
        &self.account_url
    }

    pub fn account_key(&self) -> MutexGuard<'_, Box<dyn AccountKey>> {
        self.account_key.lock().unwrap()
    }

    /// Rolls the account over to `new_key`: an inner JWS signed by `new_key`
    /// with payload `{account, oldKey}`, wrapped as the payload of an outer
    /// JWS signed by the *current* key and POSTed to the directory's
    /// `keyChange` URL. Updates this `Login`'s key reference on success.
    /// https://datatracker.ietf.org/doc/html/rfc8555#section-7.3.5
    pub async fn change_key(&self, new_key: impl AccountKey + 'static) -> AcmeResult<()> {
        let key_change_url = self.session.resource_url(ResourceKind::KeyChange).await?;

        let current_public_jwk = {
            let current = self.account_key();
            current.public_jwk().map_err(AcmeError::Crypto)?
        };

        let new_public_jwk = new_key.public_jwk().map_err(AcmeError::Crypto)?;
        let new_public_jwk = serde_json::value::RawValue::from_string(new_public_jwk).map_err(AcmeError::Json)?;

        let mut inner_payload = JsonBuilder::new();
        inner_payload.set("account", &self.account_url);
        inner_payload.set_jwk("oldKey", &current_public_jwk);
        let inner_payload_bytes = inner_payload.to_json_vec();

        let inner_header = crate::crypto::jws::JwsHeader {
            alg: new_key.jws_alg(),
            nonce: None,
            url: &key_change_url,
            jwk: Some(&new_public_jwk),
            kid: None,
        };
        let inner_jws = crate::crypto::jws::jws_flattened(&new_key, &inner_header, &inner_payload_bytes)
            .map_err(AcmeError::Crypto)?;

        let mut conn = self.session.connection();
        conn.send_signed_request(&key_change_url, &inner_jws, self).await?;

        *self.account_key.lock().unwrap() = Box::new(new_key);
        Ok(())
    }
}
