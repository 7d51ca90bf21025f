use std::net::IpAddr;

use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::extension::SubjectAlternativeName;
use openssl::x509::{X509NameBuilder, X509ReqBuilder};

use crate::codec;
use crate::error::{AcmeError, AcmeResult};

/// A plain configuration record for CSR assembly — not a builder chain, per
/// this crate's preference for data over fluent call chains.
#[derive(Debug, Default, Clone)]
pub struct CsrConfig {
    pub domains: Vec<String>,
    pub ips: Vec<IpAddr>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl CsrConfig {
    pub fn dns(domain: impl Into<String>) -> Self {
        Self {
            domains: vec![domain.into()],
            ..Default::default()
        }
    }
}

impl From<openssl::error::ErrorStack> for AcmeError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        AcmeError::Crypto(err.into())
    }
}

/// Generates a fresh P-256 key and a CSR for `config`'s identifiers, signed
/// by that key. Returns `(PEM-encoded PKCS#8 private key, DER-encoded CSR)`.
pub fn generate_key_and_csr(config: &CsrConfig) -> AcmeResult<(String, Vec<u8>)> {
    let ec_group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?;
    let key = PKey::from_ec_key(EcKey::generate(ec_group.as_ref())?)?;
    let key_pem = String::from_utf8(key.private_key_to_pem_pkcs8()?)
        .map_err(|err| AcmeError::Protocol(format!("generated key PEM is not UTF-8: {err}")))?;
    let csr_der = build_csr(config, &key)?;
    Ok((key_pem, csr_der))
}

/// Builds a CSR for `config`'s identifiers against an already-loaded
/// `openssl` keypair.
pub fn build_csr(config: &CsrConfig, key: &PKey<Private>) -> AcmeResult<Vec<u8>> {
    if config.domains.is_empty() && config.ips.is_empty() {
        return Err(AcmeError::Usage(
            "CsrConfig needs at least one domain or IP identifier".to_string(),
        ));
    }

    let mut name_builder = X509NameBuilder::new()?;
    if let Some(ref org) = config.organization {
        name_builder.append_entry_by_text("O", org)?;
    }
    if let Some(ref ou) = config.organizational_unit {
        name_builder.append_entry_by_text("OU", ou)?;
    }
    if let Some(ref locality) = config.locality {
        name_builder.append_entry_by_text("L", locality)?;
    }
    if let Some(ref state) = config.state {
        name_builder.append_entry_by_text("ST", state)?;
    }
    if let Some(ref country) = config.country {
        name_builder.append_entry_by_text("C", country)?;
    }
    if let Some(first_domain) = config.domains.first() {
        name_builder.append_entry_by_text("CN", &codec::to_ace(first_domain)?)?;
    }
    let name = name_builder.build();

    let mut csr = X509ReqBuilder::new()?;
    csr.set_subject_name(&name)?;
    csr.set_pubkey(key)?;

    let mut san = SubjectAlternativeName::new();
    for domain in &config.domains {
        san.dns(&codec::to_ace(domain)?);
    }
    for ip in &config.ips {
        san.ip(&ip.to_string());
    }
    let mut extensions = Stack::new()?;
    extensions.push(san.build(&csr.x509v3_context(None))?)?;
    csr.add_extensions(&extensions)?;

    csr.sign(key, MessageDigest::sha256())?;
    Ok(csr.build().to_der()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_p256_key_and_csr() {
        let (key_pem, csr_der) = generate_key_and_csr(&CsrConfig::dns("example.com")).unwrap();
        assert!(key_pem.contains("PRIVATE KEY"));
        assert!(!csr_der.is_empty());
    }

    #[test]
    fn rejects_empty_config() {
        build_csr(
            &CsrConfig::default(),
            &PKey::from_ec_key(
                EcKey::generate(EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap().as_ref()).unwrap(),
            )
            .unwrap(),
        )
        .unwrap_err();
    }

    #[test]
    fn multi_domain_csr_includes_all_sans() {
        let config = CsrConfig {
            domains: vec!["a.com".to_string(), "b.com".to_string()],
            ..Default::default()
        };
        let (_, csr_der) = generate_key_and_csr(&config).unwrap();
        let req = openssl::x509::X509Req::from_der(&csr_der).unwrap();

        let cn = req
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .unwrap()
            .data()
            .as_utf8()
            .unwrap();
        assert_eq!(cn.to_string(), "a.com");

        // openssl's X509Req doesn't expose a structured SAN accessor, so
        // fall back to a raw search of the encoded extension bytes.
        assert!(contains_ascii(&csr_der, "a.com"));
        assert!(contains_ascii(&csr_der, "b.com"));
    }

    #[test]
    fn idn_domain_cn_is_ace_encoded() {
        let config = CsrConfig::dns("bücher.de");
        let (_, csr_der) = generate_key_and_csr(&config).unwrap();
        let req = openssl::x509::X509Req::from_der(&csr_der).unwrap();

        let cn = req
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .unwrap()
            .data()
            .as_utf8()
            .unwrap();
        assert_eq!(cn.to_string(), "xn--bcher-kva.de");
    }

    fn contains_ascii(haystack: &[u8], needle: &str) -> bool {
        haystack.windows(needle.len()).any(|window| window == needle.as_bytes())
    }
}
