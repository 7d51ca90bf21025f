use serde::{Deserialize, Serialize};

/// Revoke certificate request
/// https://datatracker.ietf.org/doc/html/rfc8555#section-7.6
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RevokeCertificateRequest {
    /// The certificate to be revoked, in the base64url-encoded version of
    /// the DER format.
    pub certificate: String,

    /// One of the CRL reason codes defined in RFC 5280 Section 5.3.1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RevocationReason>,
}

/// CRL reason codes this crate knows how to name.
/// https://datatracker.ietf.org/doc/html/rfc5280#section-5.3.1
///
/// Serialized as its bare numeric code, per RFC 8555's `reason` field.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(into = "u8", try_from = "u8")]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

impl From<RevocationReason> for u8 {
    fn from(reason: RevocationReason) -> Self {
        match reason {
            RevocationReason::Unspecified => 0,
            RevocationReason::KeyCompromise => 1,
            RevocationReason::CaCompromise => 2,
            RevocationReason::AffiliationChanged => 3,
            RevocationReason::Superseded => 4,
            RevocationReason::CessationOfOperation => 5,
            RevocationReason::CertificateHold => 6,
            RevocationReason::RemoveFromCrl => 8,
            RevocationReason::PrivilegeWithdrawn => 9,
            RevocationReason::AaCompromise => 10,
        }
    }
}

impl TryFrom<u8> for RevocationReason {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Unspecified),
            1 => Ok(Self::KeyCompromise),
            2 => Ok(Self::CaCompromise),
            3 => Ok(Self::AffiliationChanged),
            4 => Ok(Self::Superseded),
            5 => Ok(Self::CessationOfOperation),
            6 => Ok(Self::CertificateHold),
            8 => Ok(Self::RemoveFromCrl),
            9 => Ok(Self::PrivilegeWithdrawn),
            10 => Ok(Self::AaCompromise),
            other => Err(format!("unrecognized CRL reason code {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_numeric_reason() {
        let request = RevokeCertificateRequest {
            certificate: "MIIEizCCA3OgAwIBAgISAxBjli".to_string(),
            reason: Some(RevocationReason::KeyCompromise),
        };
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({"certificate": "MIIEizCCA3OgAwIBAgISAxBjli", "reason": 1})
        );
    }

    #[test]
    fn rejects_unrecognized_reason_code() {
        let err = serde_json::from_value::<RevocationReason>(json!(7)).unwrap_err();
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn omits_reason_when_absent() {
        let request = RevokeCertificateRequest {
            certificate: "abc".to_string(),
            reason: None,
        };
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({"certificate": "abc"})
        );
    }
}
