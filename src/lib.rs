pub mod api;
pub mod connection;
pub mod crypto;
pub mod error;
pub mod login;
pub mod session;
pub mod wire;

#[cfg(feature = "x509")]
pub mod csr;

pub(crate) mod base64url;
pub(crate) mod codec;
pub(crate) mod json;

pub use api::account::{Account, AccountUpdate, Contact, RegisterAccountConfig};
pub use api::authorization::Authorization;
pub use api::certificate::Certificate;
pub use api::challenge::{variants, Challenge};
pub use api::dns_identifier::DnsIdentifier;
pub use api::order::{Order, OrderConfig};
pub use error::{AcmeError, AcmeResult};
pub use login::Login;
pub use session::{ResourceKind, Session, SessionConfig};

/// The production Let's Encrypt directory.
/// https://letsencrypt.org/docs/acme-protocol-updates/
pub static LETS_ENCRYPT_DIRECTORY_URL: &str = "https://acme-v02.api.letsencrypt.org/directory";

/// The Let's Encrypt staging directory, for testing against unrestricted
/// rate limits and a distrusted root.
pub static LETS_ENCRYPT_STAGING_DIRECTORY_URL: &str =
    "https://acme-staging-v02.api.letsencrypt.org/directory";

/// A [`Session`] pointed at the production Let's Encrypt directory.
pub fn lets_encrypt_session(http: impl Into<std::sync::Arc<dyn http_client::HttpClient>>) -> Session {
    Session::new(http, LETS_ENCRYPT_DIRECTORY_URL)
}

/// A [`Session`] pointed at the Let's Encrypt staging directory.
pub fn lets_encrypt_staging_session(
    http: impl Into<std::sync::Arc<dyn http_client::HttpClient>>,
) -> Session {
    Session::new(http, LETS_ENCRYPT_STAGING_DIRECTORY_URL)
}
