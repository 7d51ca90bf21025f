use std::time::SystemTime;

use serde::de::DeserializeOwned;

use crate::error::{AcmeError, AcmeResult};

/// Composition helper shared by every resource that follows the lazy-fetch
/// contract (Account, Order, Authorization, Challenge, Certificate): a known
/// URL, an optionally-cached typed body, and the `Retry-After` deadline from
/// whichever response last populated it. Modeled as composition rather than
/// a deep inheritance hierarchy, per this crate's design notes.
pub(crate) struct JsonBackedResource<T> {
    url: String,
    cached: Option<T>,
    retry_after: Option<SystemTime>,
}

impl<T: DeserializeOwned> JsonBackedResource<T> {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cached: None,
            retry_after: None,
        }
    }

    pub fn with_cached(url: impl Into<String>, value: T, retry_after: Option<SystemTime>) -> Self {
        Self {
            url: url.into(),
            cached: Some(value),
            retry_after,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn retry_after(&self) -> Option<SystemTime> {
        self.retry_after
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.is_some()
    }

    pub fn set(&mut self, value: T, retry_after: Option<SystemTime>) {
        self.cached = Some(value);
        self.retry_after = retry_after;
    }

    /// The cached body, if this resource has been loaded.
    pub fn peek(&self) -> Option<&T> {
        self.cached.as_ref()
    }

    /// The cached body, failing with a usage error naming this resource's
    /// URL if `update()`/`fetch()` hasn't been called yet.
    pub fn require(&self) -> AcmeResult<&T> {
        self.cached.as_ref().ok_or_else(|| {
            AcmeError::Usage(format!(
                "{} not loaded; call fetch()/update() first",
                self.url
            ))
        })
    }

    pub fn require_mut(&mut self) -> AcmeResult<&mut T> {
        if self.cached.is_none() {
            return Err(AcmeError::Usage(format!(
                "{} not loaded; call fetch()/update() first",
                self.url
            )));
        }
        Ok(self.cached.as_mut().expect("checked above"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unloaded_resource_requires_fetch() {
        let resource = JsonBackedResource::<String>::new("https://example.com/thing");
        assert!(!resource.is_loaded());
        assert!(resource.peek().is_none());
        let err = resource.require().unwrap_err();
        match err {
            AcmeError::Usage(message) => {
                assert!(message.contains("https://example.com/thing"));
                assert!(message.contains("fetch()"));
            }
            other => panic!("expected Usage error, got {other:?}"),
        }
    }

    #[test]
    fn set_populates_cache_and_retry_after() {
        let mut resource = JsonBackedResource::<String>::new("https://example.com/thing");
        let deadline = SystemTime::now();
        resource.set("loaded".to_string(), Some(deadline));
        assert!(resource.is_loaded());
        assert_eq!(resource.require().unwrap(), "loaded");
        assert_eq!(resource.retry_after(), Some(deadline));
    }

    #[test]
    fn with_cached_starts_loaded() {
        let resource = JsonBackedResource::with_cached("https://example.com/thing", 42i32, None);
        assert!(resource.is_loaded());
        assert_eq!(*resource.require().unwrap(), 42);
    }

    #[test]
    fn require_mut_fails_until_loaded() {
        let mut resource = JsonBackedResource::<String>::new("https://example.com/thing");
        resource.require_mut().unwrap_err();
        resource.set("loaded".to_string(), None);
        *resource.require_mut().unwrap() = "changed".to_string();
        assert_eq!(resource.require().unwrap(), "changed");
    }
}
