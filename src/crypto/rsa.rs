use rand::{CryptoRng, RngCore};
use rsa::pkcs1v15::SigningKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey};
use sha2::Sha256;
use signature::Signer;
use zeroize::Zeroizing;

use super::jwk::Jwk;
use super::{
    account_key::{AccountKey, GenerateAccountKey},
    jws::JwsSigner,
};
use crate::base64url;

/// The minimum RSA modulus size this crate will generate or accept, per
/// common CA policy (Let's Encrypt and most public ACME servers reject
/// smaller keys outright).
pub const MIN_KEY_BITS: usize = 2048;

#[derive(Debug)]
pub struct RsaAccountKey(RsaPrivateKey);

pub fn from_jwk(jwk: impl AsRef<str>) -> anyhow::Result<RsaAccountKey> {
    let value: serde_json::Value = serde_json::from_str(jwk.as_ref())?;
    let member = |key: &str| -> anyhow::Result<BigUint> {
        let raw = value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("RSA JWK missing required member {key:?}"))?;
        Ok(BigUint::from_bytes_be(&base64url::decode(raw)?))
    };
    let n = member("n")?;
    let e = member("e")?;
    let d = member("d")?;
    let key = RsaPrivateKey::from_components(n, e, d, Vec::new())?;
    Ok(RsaAccountKey(key))
}

impl GenerateAccountKey for RsaAccountKey {
    fn generate_rng(mut rng: impl CryptoRng + RngCore) -> Self {
        let key = RsaPrivateKey::new(&mut rng, MIN_KEY_BITS)
            .expect("RSA key generation at a fixed, supported bit size cannot fail");
        RsaAccountKey(key)
    }
}

impl JwsSigner for RsaAccountKey {
    fn jws_alg(&self) -> &str {
        "RS256"
    }

    fn jws_sign(&self, input: &[u8]) -> Vec<u8> {
        let signing_key = SigningKey::<Sha256>::new(self.0.clone());
        signing_key.sign(input).as_ref().to_vec()
    }
}

impl AccountKey for RsaAccountKey {
    fn private_jwk(&self) -> anyhow::Result<Zeroizing<String>> {
        let e = base64url::encode(self.0.e().to_bytes_be());
        let n = base64url::encode(self.0.n().to_bytes_be());
        let d = base64url::encode(self.0.d().to_bytes_be());
        Ok(Zeroizing::new(format!(
            r#"{{"kty":"RSA","e":"{e}","n":"{n}","d":"{d}"}}"#
        )))
    }

    fn public_jwk(&self) -> anyhow::Result<String> {
        let jwk = Jwk::rsa(self.0.e().to_bytes_be(), self.0.n().to_bytes_be());
        Ok(serde_json::to_string(&jwk)?)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn generate_smoke_test() {
        RsaAccountKey::generate();
    }

    #[test]
    fn round_trip_generated_private_jwk() {
        let key = RsaAccountKey::generate();
        let jwk = key.private_jwk().unwrap();
        let reparsed = from_jwk(&*jwk).unwrap();
        assert_eq!(*reparsed.private_jwk().unwrap(), *jwk);
    }

    #[test]
    fn sign_smoke_test() {
        let key = RsaAccountKey::generate();
        key.jws_sign(b"test");
    }

    #[test]
    fn jws_alg_is_rs256() {
        let key = RsaAccountKey::generate();
        assert_eq!(key.jws_alg(), "RS256");
    }

    #[test]
    fn public_jwk_omits_private_exponent() {
        let key = RsaAccountKey::generate();
        assert!(!key.public_jwk().unwrap().contains("\"d\""));
    }

    #[test]
    fn thumbprint_is_stable_across_calls() {
        let key = RsaAccountKey::generate();
        assert_eq!(key.thumbprint().unwrap(), key.thumbprint().unwrap());
    }
}
