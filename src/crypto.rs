pub mod account_key;
pub mod es256;
pub mod es384;
pub mod es512;
pub mod jws;
pub mod rsa;

pub(crate) mod jwk;

use account_key::{AccountKey, GenerateAccountKey};
use es256::Es256AccountKey;

use crate::{AcmeError, AcmeResult};

/// The JWS signature algorithms this crate can generate or load an account
/// key for. `Es256` is the default: the smallest key and signature that
/// every ACME server in practice accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Es256,
    Es384,
    Es512,
    Rsa2048,
}

pub fn generate_account_key() -> impl AccountKey {
    Es256AccountKey::generate()
}

pub fn generate_account_key_with(alg: KeyAlgorithm) -> Box<dyn AccountKey> {
    match alg {
        KeyAlgorithm::Es256 => Box::new(Es256AccountKey::generate()),
        KeyAlgorithm::Es384 => Box::new(es384::Es384AccountKey::generate()),
        KeyAlgorithm::Es512 => Box::new(es512::Es512AccountKey::generate()),
        KeyAlgorithm::Rsa2048 => Box::new(rsa::RsaAccountKey::generate()),
    }
}

/// Decodes a private account key from its JWK JSON representation, trying
/// each supported algorithm in turn by `crv`/`kty` hint, then by brute
/// force if the hint doesn't narrow it down.
pub fn account_key_from_jwk(jwk: impl AsRef<str>) -> AcmeResult<Box<dyn AccountKey>> {
    let jwk = jwk.as_ref();
    let hint = serde_json::from_str::<serde_json::Value>(jwk)
        .ok()
        .and_then(|v| v.get("crv").and_then(|c| c.as_str()).map(str::to_string).or_else(|| {
            v.get("kty").and_then(|k| k.as_str()).map(str::to_string)
        }));

    let key: Option<Box<dyn AccountKey>> = match hint.as_deref() {
        Some("P-256") => es256::from_jwk(jwk).ok().map(|k| Box::new(k) as Box<dyn AccountKey>),
        Some("P-384") => es384::from_jwk(jwk).ok().map(|k| Box::new(k) as Box<dyn AccountKey>),
        Some("P-521") => es512::from_jwk(jwk).ok().map(|k| Box::new(k) as Box<dyn AccountKey>),
        Some("RSA") => rsa::from_jwk(jwk).ok().map(|k| Box::new(k) as Box<dyn AccountKey>),
        _ => None,
    };

    if let Some(key) = key {
        return Ok(key);
    }

    if let Ok(key) = es256::from_jwk(jwk) {
        Ok(Box::new(key))
    } else if let Ok(key) = es384::from_jwk(jwk) {
        Ok(Box::new(key))
    } else if let Ok(key) = es512::from_jwk(jwk) {
        Ok(Box::new(key))
    } else if let Ok(key) = rsa::from_jwk(jwk) {
        Ok(Box::new(key))
    } else {
        Err(AcmeError::Crypto(anyhow::anyhow!(
            "couldn't decode account key from JWK: unsupported or malformed key"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_key_from_jwk_es256() {
        let key = account_key_from_jwk(es256::tests::JWK).unwrap();
        assert_eq!(key.jws_alg(), "ES256");
    }

    #[test]
    fn account_key_from_jwk_round_trips_each_algorithm() {
        for alg in [
            KeyAlgorithm::Es256,
            KeyAlgorithm::Es384,
            KeyAlgorithm::Es512,
            KeyAlgorithm::Rsa2048,
        ] {
            let generated = generate_account_key_with(alg);
            let jwk = generated.private_jwk().unwrap();
            let reloaded = account_key_from_jwk(&*jwk).unwrap();
            assert_eq!(reloaded.jws_alg(), generated.jws_alg());
        }
    }

    #[test]
    fn account_key_from_jwk_invalid() {
        account_key_from_jwk("{}").unwrap_err();
    }
}
