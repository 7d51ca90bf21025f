use std::sync::Arc;

use serde_json::Value;

use crate::crypto::account_key::AccountKey;
use crate::error::{AcmeError, AcmeResult};
use crate::json::JsonBuilder;
use crate::login::Login;
use crate::session::{ResourceKind, Session};
use crate::wire::account::{AccountResource, AccountStatus, NewAccountResource};
use crate::wire::common::ResourceStatus;
use crate::wire::order::OrderStatus;

use super::lazy::JsonBackedResource;
use super::order::{Order, OrderConfig};

/// A contact URI for an account, with the common `mailto:` shorthand.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-7.1.2
pub enum Contact {
    Email(String),
    Uri(String),
}

impl Contact {
    fn into_uri(self) -> String {
        match self {
            Self::Email(email) if !email.starts_with("mailto:") => format!("mailto:{email}"),
            Self::Email(email) => email,
            Self::Uri(uri) => uri,
        }
    }
}

/// A plain configuration record for `newAccount`.
#[derive(Default)]
pub struct RegisterAccountConfig {
    /// The key to register with. A fresh ES256 key is generated if absent.
    pub account_key: Option<Box<dyn AccountKey>>,
    pub contacts: Vec<Contact>,
    pub terms_of_service_agreed: bool,
    pub external_account_binding: Option<Value>,
}

/// The `Account` resource.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-7.1.2
pub struct Account {
    login: Arc<Login>,
    state: JsonBackedResource<AccountResource>,
}

impl Account {
    fn new(login: Arc<Login>, resource: AccountResource) -> Self {
        let url = login.account_url().to_string();
        Self {
            login,
            state: JsonBackedResource::with_cached(url, resource, None),
        }
    }

    /// Registers a new account, generating a key if `config.account_key` is
    /// absent. https://datatracker.ietf.org/doc/html/rfc8555#section-7.3
    pub async fn register(session: Arc<Session>, config: RegisterAccountConfig) -> AcmeResult<Self> {
        let account_key = config
            .account_key
            .unwrap_or_else(|| Box::new(crate::crypto::generate_account_key()));
        let request = NewAccountResource {
            contact: config.contacts.into_iter().map(Contact::into_uri).collect(),
            terms_of_service_agreed: config.terms_of_service_agreed,
            only_return_existing: false,
            external_account_binding: config.external_account_binding,
        };
        Self::new_account_request(session, account_key, &request).await
    }

    /// Looks up an existing account by key, without creating one.
    /// https://datatracker.ietf.org/doc/html/rfc8555#section-7.3.1
    pub async fn find(session: Arc<Session>, account_key: impl AccountKey + 'static) -> AcmeResult<Self> {
        let account_key: Box<dyn AccountKey> = Box::new(account_key);
        let request = NewAccountResource {
            only_return_existing: true,
            ..Default::default()
        };
        Self::new_account_request(session, account_key, &request).await
    }

    async fn new_account_request(
        session: Arc<Session>,
        account_key: Box<dyn AccountKey>,
        request: &NewAccountResource,
    ) -> AcmeResult<Self> {
        let new_account_url = session.resource_url(ResourceKind::NewAccount).await?;
        let mut conn = session.connection();
        conn.send_signed_request_jwk(&new_account_url, request, &session, &account_key)
            .await?;
        let account_url = conn
            .get_location()
            .ok_or(AcmeError::MissingExpectedHeader("Location"))?;
        let resource: AccountResource = conn.read_json_response()?.into_typed()?;
        let login = Arc::new(Login::new(session, account_url, account_key));
        Ok(Self::new(login, resource))
    }

    /// Reconstructs an `Account` handle from an already-established
    /// `Login`, fetching its current state.
    pub async fn from_login(login: Arc<Login>) -> AcmeResult<Self> {
        let url = login.account_url().to_string();
        let mut account = Self {
            login,
            state: JsonBackedResource::new(url),
        };
        account.fetch().await?;
        Ok(account)
    }

    pub fn login(&self) -> &Arc<Login> {
        &self.login
    }

    pub fn url(&self) -> &str {
        self.login.account_url()
    }

    /// POST-as-GETs this account's URL and replaces the cached state.
    pub async fn fetch(&mut self) -> AcmeResult<()> {
        let mut conn = self.login.session().connection();
        conn.send_signed_post_as_get_request(self.url(), &self.login)
            .await?;
        let resource: AccountResource = conn.read_json_response()?.into_typed()?;
        self.state.set(resource, conn.get_retry_after());
        Ok(())
    }

    fn loaded(&self) -> AcmeResult<&AccountResource> {
        self.state.require()
    }

    pub fn status(&self) -> AcmeResult<AccountStatus> {
        Ok(self.loaded()?.status)
    }

    pub fn status_result(&self) -> AcmeResult<AccountStatus> {
        self.status()?.as_result()
    }

    pub fn contacts(&self) -> AcmeResult<&[String]> {
        Ok(&self.loaded()?.contact)
    }

    pub fn terms_of_service_agreed(&self) -> AcmeResult<Option<bool>> {
        Ok(self.loaded()?.terms_of_service_agreed)
    }

    pub fn orders_url(&self) -> AcmeResult<Option<&str>> {
        Ok(self.loaded()?.orders.as_deref())
    }

    /// Starts an accumulating update to this account's contacts/terms
    /// agreement; nothing is sent until [`AccountUpdate::send`] is called.
    pub fn modify(&mut self) -> AccountUpdate<'_> {
        AccountUpdate::new(self)
    }

    async fn apply_update(&mut self, request: &serde_json::Value) -> AcmeResult<()> {
        let mut conn = self.login.session().connection();
        conn.send_signed_request(self.url(), request, &self.login).await?;
        let resource: AccountResource = conn.read_json_response()?.into_typed()?;
        self.state.set(resource, conn.get_retry_after());
        Ok(())
    }

    /// Deactivates this account. https://datatracker.ietf.org/doc/html/rfc8555#section-7.3.6
    pub async fn deactivate(&mut self) -> AcmeResult<()> {
        let mut request = JsonBuilder::new();
        request.set("status", "deactivated");
        self.apply_update(&request.build()).await
    }

    /// Rolls this account over to `new_key`.
    /// https://datatracker.ietf.org/doc/html/rfc8555#section-7.3.5
    pub async fn change_key(&self, new_key: impl AccountKey + 'static) -> AcmeResult<()> {
        self.login.change_key(new_key).await
    }

    /// Places a new order. https://datatracker.ietf.org/doc/html/rfc8555#section-7.4
    pub async fn new_order(&self, config: OrderConfig) -> AcmeResult<Order> {
        let new_order_url = self.login.session().resource_url(ResourceKind::NewOrder).await?;
        let request = config.into_wire();
        let mut conn = self.login.session().connection();
        conn.send_signed_request(&new_order_url, &request, &self.login).await?;
        let location = conn
            .get_location()
            .ok_or(AcmeError::MissingExpectedHeader("Location"))?;
        let resource = conn.read_json_response()?.into_typed()?;
        Ok(Order::new(self.login.clone(), location, resource, conn.get_retry_after()))
    }

    /// Convenience for the common single-DNS-identifier order.
    pub async fn new_dns_order(&self, name: impl Into<String>) -> AcmeResult<Order> {
        self.new_order(OrderConfig::dns(name)).await
    }

    /// Fetches a previously-placed order by its URL.
    pub async fn get_order(&self, order_url: impl Into<String>) -> AcmeResult<Order> {
        let mut order = Order::unloaded(self.login.clone(), order_url);
        order.fetch().await?;
        Ok(order)
    }

    /// Places a new order and finalizes it in one call: generates a fresh
    /// certificate key, builds a CSR from `config`'s identifiers, and
    /// submits it as soon as the order's authorizations are already
    /// satisfied. Requires the `x509` feature. Returns the placed `Order`
    /// alongside the PEM-encoded certificate key and the resulting status —
    /// most orders still need their authorizations validated first, so a
    /// caller should check the returned status before assuming the order is
    /// `valid`.
    #[cfg(feature = "x509")]
    pub async fn order_certificate(&self, config: OrderConfig) -> AcmeResult<(Order, String, OrderStatus)> {
        let mut order = self.new_order(config).await?;
        let (key_pem, status) = order.execute().await?;
        Ok((order, key_pem, status))
    }

    #[cfg(not(feature = "x509"))]
    pub async fn order_certificate(&self, _config: OrderConfig) -> AcmeResult<(Order, String, OrderStatus)> {
        Err(AcmeError::Usage(
            "Account::order_certificate requires the x509 feature for CSR assembly".to_string(),
        ))
    }
}

/// Accumulates changes to an account's contacts/terms-of-service agreement
/// before POSTing them in one request.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-7.3.2
pub struct AccountUpdate<'a> {
    account: &'a mut Account,
    contact: Option<Vec<String>>,
    terms_of_service_agreed: Option<bool>,
}

impl<'a> AccountUpdate<'a> {
    fn new(account: &'a mut Account) -> Self {
        Self {
            account,
            contact: None,
            terms_of_service_agreed: None,
        }
    }

    pub fn set_contacts(mut self, contacts: Vec<Contact>) -> Self {
        self.contact = Some(contacts.into_iter().map(Contact::into_uri).collect());
        self
    }

    pub fn agree_to_terms_of_service(mut self) -> Self {
        self.terms_of_service_agreed = Some(true);
        self
    }

    pub async fn send(self) -> AcmeResult<()> {
        let mut request = JsonBuilder::new();
        if let Some(contact) = self.contact {
            request.set("contact", contact);
        }
        if let Some(agreed) = self.terms_of_service_agreed {
            request.set("termsOfServiceAgreed", agreed);
        }
        self.account.apply_update(&request.build()).await
    }
}
