use std::net::IpAddr;

use serde::{Deserialize, Serialize};

pub static IDENTIFIER_TYPE_DNS: &str = "dns";
pub static IDENTIFIER_TYPE_IP: &str = "ip";

/// https://datatracker.ietf.org/doc/html/rfc8555#section-9.7.7
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AcmeIdentifier {
    /// The type of identifier.
    #[serde(rename = "type")]
    pub type_: String,

    /// The identifier itself.
    pub value: String,
}

impl AcmeIdentifier {
    pub fn dns(name: impl Into<String>) -> Self {
        Self {
            type_: IDENTIFIER_TYPE_DNS.to_string(),
            value: name.into(),
        }
    }

    pub fn ip(addr: IpAddr) -> Self {
        Self {
            type_: IDENTIFIER_TYPE_IP.to_string(),
            value: addr.to_string(),
        }
    }

    pub fn is_dns(&self) -> bool {
        self.type_ == IDENTIFIER_TYPE_DNS
    }

    pub fn is_ip(&self) -> bool {
        self.type_ == IDENTIFIER_TYPE_IP
    }

    pub fn dns_name(&self) -> Option<&str> {
        if self.is_dns() {
            Some(&self.value)
        } else {
            None
        }
    }

    pub fn ip_addr(&self) -> Option<IpAddr> {
        if self.is_ip() {
            self.value.parse().ok()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dns_identifier_round_trips() {
        let id = AcmeIdentifier::dns("example.org");
        assert!(id.is_dns());
        assert!(!id.is_ip());
        assert_eq!(id.dns_name(), Some("example.org"));
        assert_eq!(id.ip_addr(), None);
    }

    #[test]
    fn ip_identifier_round_trips() {
        let addr: IpAddr = "203.0.113.1".parse().unwrap();
        let id = AcmeIdentifier::ip(addr);
        assert!(id.is_ip());
        assert!(!id.is_dns());
        assert_eq!(id.ip_addr(), Some(addr));
        assert_eq!(id.value, "203.0.113.1");
    }

    #[test]
    fn ip_identifier_serializes_with_type_ip() {
        let id = AcmeIdentifier::ip("2001:db8::1".parse().unwrap());
        let value = serde_json::to_value(&id).unwrap();
        assert_eq!(value["type"], "ip");
        assert_eq!(value["value"], "2001:db8::1");
    }
}
