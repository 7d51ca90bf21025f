use std::fmt;

use serde::{Deserialize, Serialize};

use super::identifier::AcmeIdentifier;

/// An RFC 7807 problem document, as ACME servers return for every non-2xx
/// response and embed in `Order.error`/`Authorization.challenges[].error`.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-6.7
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AcmeProblem {
    /// A URN identifying the problem type, from the ACME error-type registry
    /// (`urn:ietf:params:acme:error:*`) or some other URN for non-ACME
    /// problems. Absent on the wire, defaults to "about:blank" per RFC 7807.
    #[serde(rename = "type", default = "default_problem_type")]
    pub type_: String,

    /// A short, human-readable summary of the problem type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// The HTTP status code echoed into the body, per RFC 7807.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// A human-readable explanation specific to this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// The identifier this problem is about, when the server can attribute
    /// it to one (e.g. a DNS problem for one of an order's identifiers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<AcmeIdentifier>,

    /// Component problems, for compound failures such as an order that
    /// failed several of its identifiers' authorizations independently.
    /// https://datatracker.ietf.org/doc/html/rfc8555#section-6.7.1
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subproblems: Vec<AcmeProblem>,
}

fn default_problem_type() -> String {
    "about:blank".to_string()
}

impl AcmeProblem {
    pub const CONTENT_TYPE: &'static str = "application/problem+json";

    /// This problem's typed error kind. Problems outside the ACME registry,
    /// or a malformed/absent `type`, classify as `Other`.
    pub fn problem_type(&self) -> AcmeProblemType {
        AcmeProblemType::from_urn(&self.type_)
    }

    pub fn has_type(&self, type_: AcmeProblemType) -> bool {
        self.problem_type() == type_
    }

    /// The first subproblem concerning `identifier`, if any.
    pub fn find_subproblem(&self, identifier: &AcmeIdentifier) -> Option<&AcmeProblem> {
        self.subproblems
            .iter()
            .find(|sub| sub.identifier.as_ref() == Some(identifier))
    }
}

impl fmt::Display for AcmeProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.title, &self.detail) {
            (Some(title), Some(detail)) => write!(f, "{title}: {detail} ({})", self.type_),
            (Some(title), None) => write!(f, "{title} ({})", self.type_),
            (None, Some(detail)) => write!(f, "{detail} ({})", self.type_),
            (None, None) => write!(f, "{}", self.type_),
        }
    }
}

/// The ACME error-type registry.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-6.7
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcmeProblemType {
    AccountDoesNotExist,
    AlreadyRevoked,
    BadCsr,
    BadNonce,
    BadPublicKey,
    BadRevocationReason,
    BadSignatureAlgorithm,
    Caa,
    Compound,
    Connection,
    Dns,
    ExternalAccountRequired,
    IncorrectResponse,
    InvalidContact,
    Malformed,
    OrderNotReady,
    RateLimited,
    RejectedIdentifier,
    ServerInternal,
    Tls,
    Unauthorized,
    UnsupportedContact,
    UnsupportedIdentifier,
    UserActionRequired,
    /// A problem `type` this crate doesn't recognize: a non-ACME URN, a
    /// registry addition, or a malformed/absent value.
    Other,
}

impl AcmeProblemType {
    fn from_urn(urn: &str) -> Self {
        match urn.strip_prefix("urn:ietf:params:acme:error:") {
            Some("accountDoesNotExist") => Self::AccountDoesNotExist,
            Some("alreadyRevoked") => Self::AlreadyRevoked,
            Some("badCSR") => Self::BadCsr,
            Some("badNonce") => Self::BadNonce,
            Some("badPublicKey") => Self::BadPublicKey,
            Some("badRevocationReason") => Self::BadRevocationReason,
            Some("badSignatureAlgorithm") => Self::BadSignatureAlgorithm,
            Some("caa") => Self::Caa,
            Some("compound") => Self::Compound,
            Some("connection") => Self::Connection,
            Some("dns") => Self::Dns,
            Some("externalAccountRequired") => Self::ExternalAccountRequired,
            Some("incorrectResponse") => Self::IncorrectResponse,
            Some("invalidContact") => Self::InvalidContact,
            Some("malformed") => Self::Malformed,
            Some("orderNotReady") => Self::OrderNotReady,
            Some("rateLimited") => Self::RateLimited,
            Some("rejectedIdentifier") => Self::RejectedIdentifier,
            Some("serverInternal") => Self::ServerInternal,
            Some("tls") => Self::Tls,
            Some("unauthorized") => Self::Unauthorized,
            Some("unsupportedContact") => Self::UnsupportedContact,
            Some("unsupportedIdentifier") => Self::UnsupportedIdentifier,
            Some("userActionRequired") => Self::UserActionRequired,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rfc8555_problem_example() {
        let problem = AcmeProblem::deserialize(json!({
            "type": "urn:ietf:params:acme:error:malformed",
            "detail": "Some of the identifiers requested were rejected",
            "subproblems": [
                {
                    "type": "urn:ietf:params:acme:error:malformed",
                    "detail": "Invalid underscore in DNS name \"_example.org\"",
                    "identifier": {
                        "type": "dns",
                        "value": "_example.org"
                    }
                },
                {
                    "type": "urn:ietf:params:acme:error:rejectedIdentifier",
                    "detail": "This CA will not issue for \"example.net\"",
                    "identifier": {
                        "type": "dns",
                        "value": "example.net"
                    }
                }
            ]
        }))
        .unwrap();

        assert_eq!(problem.problem_type(), AcmeProblemType::Malformed);
        assert_eq!(problem.subproblems.len(), 2);
        assert_eq!(
            problem.subproblems[1].problem_type(),
            AcmeProblemType::RejectedIdentifier
        );
    }

    #[test]
    fn missing_type_defaults_to_about_blank() {
        let problem = AcmeProblem::deserialize(json!({"detail": "oops"})).unwrap();
        assert_eq!(problem.type_, "about:blank");
        assert_eq!(problem.problem_type(), AcmeProblemType::Other);
    }

    #[test]
    fn unknown_urn_is_other() {
        let problem = AcmeProblem::deserialize(json!({"type": "urn:ietf:params:acme:error:newThing"})).unwrap();
        assert_eq!(problem.problem_type(), AcmeProblemType::Other);
    }

    #[test]
    fn rate_limited_is_recognized() {
        let problem = AcmeProblem::deserialize(json!({"type": "urn:ietf:params:acme:error:rateLimited"})).unwrap();
        assert!(problem.has_type(AcmeProblemType::RateLimited));
    }

    #[test]
    fn find_subproblem_matches_by_identifier() {
        let problem = AcmeProblem::deserialize(json!({
            "type": "urn:ietf:params:acme:error:compound",
            "subproblems": [
                {"type": "urn:ietf:params:acme:error:dns", "identifier": {"type": "dns", "value": "a.example.org"}},
                {"type": "urn:ietf:params:acme:error:caa", "identifier": {"type": "dns", "value": "b.example.org"}}
            ]
        }))
        .unwrap();

        let found = problem.find_subproblem(&AcmeIdentifier::dns("b.example.org")).unwrap();
        assert_eq!(found.problem_type(), AcmeProblemType::Caa);
    }

    #[test]
    fn display_includes_type_urn() {
        let problem = AcmeProblem::deserialize(json!({
            "type": "urn:ietf:params:acme:error:malformed",
            "title": "Malformed request",
            "detail": "missing field"
        }))
        .unwrap();
        let text = problem.to_string();
        assert!(text.contains("Malformed request"));
        assert!(text.contains("missing field"));
        assert!(text.contains("urn:ietf:params:acme:error:malformed"));
    }
}
