use p384::{ecdsa::SigningKey, SecretKey};
use rand::{CryptoRng, RngCore};
use signature::Signer;
use zeroize::Zeroizing;

use super::{
    account_key::{AccountKey, GenerateAccountKey},
    jws::JwsSigner,
};

#[derive(Debug)]
pub struct Es384AccountKey(SecretKey);

pub fn from_jwk(jwk: impl AsRef<str>) -> anyhow::Result<Es384AccountKey> {
    Ok(SecretKey::from_jwk_str(jwk.as_ref())?.into())
}

impl GenerateAccountKey for Es384AccountKey {
    fn generate_rng(rng: impl CryptoRng + RngCore) -> Self {
        SecretKey::random(rng).into()
    }
}

impl JwsSigner for Es384AccountKey {
    fn jws_alg(&self) -> &str {
        "ES384"
    }

    fn jws_sign(&self, input: &[u8]) -> Vec<u8> {
        SigningKey::from(&self.0).sign(input).as_ref().to_vec()
    }
}

impl AccountKey for Es384AccountKey {
    fn private_jwk(&self) -> anyhow::Result<Zeroizing<String>> {
        Ok(self.0.to_jwk_string())
    }

    fn public_jwk(&self) -> anyhow::Result<String> {
        Ok(self.0.public_key().to_jwk_string())
    }
}

impl From<SecretKey> for Es384AccountKey {
    fn from(secret: SecretKey) -> Self {
        Self(secret)
    }
}

impl From<Es384AccountKey> for SecretKey {
    fn from(key: Es384AccountKey) -> Self {
        key.0
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn generate_smoke_test() {
        Es384AccountKey::generate();
    }

    #[test]
    fn round_trip_generated_private_jwk() {
        let key = Es384AccountKey::generate();
        let jwk = key.private_jwk().unwrap();
        let reparsed = from_jwk(&*jwk).unwrap();
        assert_eq!(*reparsed.private_jwk().unwrap(), *jwk);
    }

    #[test]
    fn sign_smoke_test() {
        let key = Es384AccountKey::generate();
        key.jws_sign(b"test");
    }

    #[test]
    fn jws_alg_is_es384() {
        let key = Es384AccountKey::generate();
        assert_eq!(key.jws_alg(), "ES384");
    }
}
