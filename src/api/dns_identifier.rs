use crate::wire::identifier::AcmeIdentifier;

#[derive(Debug)]
pub struct DnsIdentifier(String);

impl DnsIdentifier {
    pub fn from_acme_identifier(acme_ident: &AcmeIdentifier, add_wildcard: bool) -> Option<Self> {
        acme_ident.dns_name().map(|name| {
            if add_wildcard {
                Self("*.".to_string() + name)
            } else {
                Self(name.to_string())
            }
        })
    }

    pub fn find_acme_identifier<'a>(
        iter: impl IntoIterator<Item = &'a AcmeIdentifier>,
        add_wildcard: bool,
    ) -> Option<Self> {
        iter.into_iter()
            .find(|acme_ident| acme_ident.is_dns())
            .and_then(|acme_ident| DnsIdentifier::from_acme_identifier(acme_ident, add_wildcard))
    }

    pub fn is_wildcard(&self) -> bool {
        self.0.starts_with("*.")
    }

    pub fn without_wildcard(&self) -> &str {
        if self.is_wildcard() {
            &self.0[2..]
        } else {
            &self.0
        }
    }
}

impl AsRef<str> for DnsIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<DnsIdentifier> for String {
    fn from(ident: DnsIdentifier) -> Self {
        ident.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_acme_identifier_ignores_ip() {
        assert!(DnsIdentifier::from_acme_identifier(&AcmeIdentifier::ip("127.0.0.1".parse().unwrap()), false).is_none());
    }

    #[test]
    fn from_acme_identifier_adds_wildcard_prefix() {
        let ident = DnsIdentifier::from_acme_identifier(&AcmeIdentifier::dns("example.com"), true).unwrap();
        assert_eq!(ident.as_ref(), "*.example.com");
        assert!(ident.is_wildcard());
        assert_eq!(ident.without_wildcard(), "example.com");
    }

    #[test]
    fn without_wildcard_is_identity_when_not_wildcard() {
        let ident = DnsIdentifier::from_acme_identifier(&AcmeIdentifier::dns("example.com"), false).unwrap();
        assert!(!ident.is_wildcard());
        assert_eq!(ident.without_wildcard(), "example.com");
    }

    #[test]
    fn find_acme_identifier_skips_ip_and_finds_first_dns() {
        let identifiers = vec![
            AcmeIdentifier::ip("127.0.0.1".parse().unwrap()),
            AcmeIdentifier::dns("example.com"),
            AcmeIdentifier::dns("www.example.com"),
        ];
        let found = DnsIdentifier::find_acme_identifier(&identifiers, false).unwrap();
        assert_eq!(found.as_ref(), "example.com");
    }

    #[test]
    fn find_acme_identifier_empty_list_is_none() {
        assert!(DnsIdentifier::find_acme_identifier(&[], false).is_none());
    }
}
