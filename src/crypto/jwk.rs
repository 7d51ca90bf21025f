use std::collections::BTreeMap;

use serde::Serialize;

use crate::codec;

/// A public-key JWK, in either of the two shapes this crate signs with.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Jwk {
    Rsa {
        kty: &'static str,
        e: String,
        n: String,
    },
    Ec {
        kty: &'static str,
        crv: &'static str,
        x: String,
        y: String,
    },
}

impl Jwk {
    pub fn rsa(e: impl AsRef<[u8]>, n: impl AsRef<[u8]>) -> Self {
        Jwk::Rsa {
            kty: "RSA",
            e: crate::base64url::encode(strip_leading_zero(e.as_ref())),
            n: crate::base64url::encode(strip_leading_zero(n.as_ref())),
        }
    }

    pub fn ec(crv: &'static str, x: impl AsRef<[u8]>, y: impl AsRef<[u8]>) -> Self {
        Jwk::Ec {
            kty: "EC",
            crv,
            x: crate::base64url::encode(x),
            y: crate::base64url::encode(y),
        }
    }

    /// The RFC 7638 thumbprint: SHA-256 over the canonical (lexicographically
    /// sorted, whitespace-free) JWK JSON, base64url-encoded.
    pub fn thumbprint(&self) -> String {
        let canonical = self.canonical_json();
        crate::base64url::encode(codec::sha256(canonical.as_bytes()))
    }

    fn canonical_json(&self) -> String {
        let sorted: BTreeMap<&str, &str> = match self {
            Jwk::Rsa { kty, e, n } => {
                BTreeMap::from([("e", e.as_str()), ("kty", *kty), ("n", n.as_str())])
            }
            Jwk::Ec { kty, crv, x, y } => BTreeMap::from([
                ("crv", *crv),
                ("kty", *kty),
                ("x", x.as_str()),
                ("y", y.as_str()),
            ]),
        };
        serde_json::to_string(&sorted).expect("a map of strings always serializes")
    }
}

/// Big-endian unsigned integers from RSA key material sometimes carry a
/// leading zero octet to keep the two's-complement encoding non-negative;
/// JWK wants the minimal unsigned form.
fn strip_leading_zero(bytes: &[u8]) -> &[u8] {
    match bytes {
        [0, rest @ ..] if !rest.is_empty() => rest,
        _ => bytes,
    }
}

/// The RFC 7638 thumbprint of a JWK given as raw JSON text, as produced by
/// the underlying curve crates' own `to_jwk_string()` (rather than built
/// through [`Jwk`] directly). Selects the required member set by `kty`.
pub fn thumbprint_from_jwk_json(jwk_json: &str) -> anyhow::Result<String> {
    let value: serde_json::Value = serde_json::from_str(jwk_json)?;
    let object = value
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("JWK is not a JSON object"))?;
    let member = |key: &str| -> anyhow::Result<&str> {
        object
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("JWK missing required member {key:?}"))
    };
    let kty = member("kty")?;
    let sorted: BTreeMap<&str, &str> = match kty {
        "EC" => BTreeMap::from([
            ("crv", member("crv")?),
            ("kty", kty),
            ("x", member("x")?),
            ("y", member("y")?),
        ]),
        "RSA" => BTreeMap::from([("e", member("e")?), ("kty", kty), ("n", member("n")?)]),
        other => return Err(anyhow::anyhow!("unsupported JWK kty {other:?}")),
    };
    let canonical = serde_json::to_string(&sorted)?;
    Ok(crate::base64url::encode(codec::sha256(canonical.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ec_canonical_json_is_sorted_and_compact() {
        let jwk = Jwk::ec("P-256", [1u8], [2u8]);
        assert_eq!(
            jwk.canonical_json(),
            r#"{"crv":"P-256","kty":"EC","x":"AQ","y":"Ag"}"#
        );
    }

    #[test]
    fn rsa_canonical_json_is_sorted_and_compact() {
        let jwk = Jwk::rsa([1u8], [2u8]);
        assert_eq!(jwk.canonical_json(), r#"{"e":"AQ","kty":"RSA","n":"Ag"}"#);
    }

    #[test]
    fn thumbprint_is_deterministic() {
        let jwk = Jwk::ec("P-256", [1u8, 2], [3u8, 4]);
        assert_eq!(jwk.thumbprint(), jwk.thumbprint());
    }

    #[test]
    fn strip_leading_zero_keeps_nonzero_bytes() {
        assert_eq!(strip_leading_zero(&[0, 1, 2]), &[1, 2]);
        assert_eq!(strip_leading_zero(&[1, 2]), &[1, 2]);
        assert_eq!(strip_leading_zero(&[0]), &[0]);
    }

    #[test]
    fn thumbprint_from_jwk_json_matches_jwk_thumbprint() {
        let jwk = Jwk::ec("P-256", [1u8, 2], [3u8, 4]);
        let raw = serde_json::to_string(&jwk).unwrap();
        assert_eq!(thumbprint_from_jwk_json(&raw).unwrap(), jwk.thumbprint());
    }

    #[test]
    fn thumbprint_from_jwk_json_ignores_private_members() {
        let with_d = r#"{"kty":"EC","crv":"P-256","x":"AQ","y":"Ag","d":"Aw"}"#;
        let without_d = r#"{"kty":"EC","crv":"P-256","x":"AQ","y":"Ag"}"#;
        assert_eq!(
            thumbprint_from_jwk_json(with_d).unwrap(),
            thumbprint_from_jwk_json(without_d).unwrap()
        );
    }

    #[test]
    fn thumbprint_from_jwk_json_rejects_unknown_kty() {
        thumbprint_from_jwk_json(r#"{"kty":"oct","k":"AQ"}"#).unwrap_err();
    }
}
