use std::fmt::Write as _;
use std::io;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::{AcmeError, AcmeResult};

/// SHA-256 of `input`.
pub fn sha256(input: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input.as_ref());
    hasher.finalize().into()
}

/// Converts a domain name to its ASCII Compatible Encoding (IDNA 2008 /
/// UTS #46 punycode), lower-cased. Rejects empty labels.
pub fn to_ace(domain: impl AsRef<str>) -> AcmeResult<String> {
    let domain = domain.as_ref();
    if domain.split('.').any(str::is_empty) {
        return Err(AcmeError::Usage(format!(
            "domain name has an empty label: {domain:?}"
        )));
    }
    idna::domain_to_ascii(domain)
        .map_err(|err| AcmeError::Usage(format!("invalid domain name {domain:?}: {err}")))
}

/// Parses a `Retry-After` header value, accepting both an HTTP-date and a
/// delta-seconds integer, relative to `now`.
pub fn parse_retry_after(header: impl AsRef<str>, now: SystemTime) -> AcmeResult<SystemTime> {
    let header = header.as_ref().trim();
    if let Ok(seconds) = header.parse::<u64>() {
        return Ok(now + Duration::from_secs(seconds));
    }
    let date = DateTime::parse_from_rfc2822(header)
        .map_err(|err| AcmeError::Protocol(format!("invalid Retry-After header {header:?}: {err}")))?;
    let date: DateTime<Utc> = date.into();
    let unix = date.timestamp();
    if unix < 0 {
        return Err(AcmeError::Protocol(format!(
            "Retry-After date is before the epoch: {header:?}"
        )));
    }
    Ok(SystemTime::UNIX_EPOCH + Duration::from_secs(unix as u64))
}

/// Writes `bytes` as PEM, 64-column base64 between `-----BEGIN <label>-----`
/// and `-----END <label>-----` lines, `\n`-separated.
pub fn write_pem(bytes: &[u8], label: &str, writer: &mut impl io::Write) -> io::Result<()> {
    let encoded = base64::encode(bytes);
    writeln!(writer, "-----BEGIN {label}-----")?;
    for chunk in encoded.as_bytes().chunks(64) {
        writer.write_all(chunk)?;
        writer.write_all(b"\n")?;
    }
    writeln!(writer, "-----END {label}-----")?;
    Ok(())
}

/// As `write_pem`, but returning a `String`.
pub fn pem_string(bytes: &[u8], label: &str) -> String {
    let mut out = String::new();
    let _ = write!(&mut out, "-----BEGIN {label}-----\n");
    let encoded = base64::encode(bytes);
    for chunk in encoded.as_bytes().chunks(64) {
        out.push_str(std::str::from_utf8(chunk).expect("base64 alphabet is ASCII"));
        out.push('\n');
    }
    let _ = write!(&mut out, "-----END {label}-----\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        let digest = sha256(b"abc");
        assert_eq!(
            to_hex(&digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    fn to_hex(bytes: &[u8]) -> String {
        let mut out = String::new();
        for b in bytes {
            let _ = write!(&mut out, "{b:02x}");
        }
        out
    }

    #[test]
    fn to_ace_ascii_passthrough() {
        assert_eq!(to_ace("example.com").unwrap(), "example.com");
    }

    #[test]
    fn to_ace_punycode() {
        assert_eq!(to_ace("bücher.de").unwrap(), "xn--bcher-kva.de");
    }

    #[test]
    fn to_ace_rejects_empty_label() {
        to_ace("foo..com").unwrap_err();
    }

    #[test]
    fn to_ace_lowercases() {
        assert_eq!(to_ace("EXAMPLE.com").unwrap(), "example.com");
    }

    #[test]
    fn parse_retry_after_delta_seconds() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let result = parse_retry_after("120", now).unwrap();
        assert_eq!(result, now + Duration::from_secs(120));
    }

    #[test]
    fn parse_retry_after_http_date() {
        let now = SystemTime::UNIX_EPOCH;
        let result = parse_retry_after("Fri, 31 Dec 1999 23:59:59 GMT", now).unwrap();
        let expected = DateTime::parse_from_rfc3339("1999-12-31T23:59:59Z").unwrap();
        assert_eq!(
            result,
            SystemTime::UNIX_EPOCH + Duration::from_secs(expected.timestamp() as u64)
        );
    }

    #[test]
    fn write_pem_wraps_at_64_columns() {
        let mut out = Vec::new();
        write_pem(&[0u8; 100], "TEST", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "-----BEGIN TEST-----");
        let body_lines: Vec<&str> = lines.clone().take_while(|l| !l.starts_with("-----END")).collect();
        for line in &body_lines[..body_lines.len().saturating_sub(1)] {
            assert_eq!(line.len(), 64);
        }
        assert!(text.trim_end().ends_with("-----END TEST-----"));
    }
}
