use p256::{ecdsa::SigningKey, SecretKey};
use rand::{CryptoRng, RngCore};
use signature::Signer;
use zeroize::Zeroizing;

use super::{
    account_key::{AccountKey, GenerateAccountKey},
    jws::JwsSigner,
};

#[derive(Debug)]
pub struct Es256AccountKey(SecretKey);

pub fn from_jwk(jwk: impl AsRef<str>) -> anyhow::Result<Es256AccountKey> {
    Ok(SecretKey::from_jwk_str(jwk.as_ref())?.into())
}

impl GenerateAccountKey for Es256AccountKey {
    fn generate_rng(rng: impl CryptoRng + RngCore) -> Self {
        SecretKey::random(rng).into()
    }
}

impl JwsSigner for Es256AccountKey {
    fn jws_alg(&self) -> &str {
        "ES256"
    }

    fn jws_sign(&self, input: &[u8]) -> Vec<u8> {
        SigningKey::from(&self.0).sign(input).as_ref().to_vec()
    }
}

impl AccountKey for Es256AccountKey {
    fn private_jwk(&self) -> anyhow::Result<Zeroizing<String>> {
        Ok(self.0.to_jwk_string())
    }

    fn public_jwk(&self) -> anyhow::Result<String> {
        Ok(self.0.public_key().to_jwk_string())
    }
}

impl From<SecretKey> for Es256AccountKey {
    fn from(secret: SecretKey) -> Self {
        Self(secret)
    }
}

impl From<Es256AccountKey> for SecretKey {
    fn from(key: Es256AccountKey) -> Self {
        key.0
    }
}
