//! Credential values and the sources that produce them.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("credential source failed to refresh: {0}")]
    Refresh(String),
    #[error("credential for access key `{access_key_id}` has expired")]
    Expired { access_key_id: String },
}

impl CredentialError {
    pub fn refresh(err: impl fmt::Display) -> Self {
        Self::Refresh(err.to_string())
    }
}

/// An access key pair, optionally scoped by a session token.
///
/// Equality covers the key material and expiry; `refreshed_at` only records
/// when the value was obtained.
#[derive(Clone)]
pub struct Credential {
    access_key_id: String,
    access_key_secret: String,
    security_token: Option<String>,
    refreshed_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            security_token: None,
            refreshed_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_security_token(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        security_token: impl Into<String>,
    ) -> Self {
        Self {
            security_token: Some(security_token.into()),
            ..Self::new(access_key_id, access_key_secret)
        }
    }

    /// Marks the credential as valid for `ttl` from its refresh time.
    pub fn expiring_after(mut self, ttl: Duration) -> Self {
        self.expires_at = Some(self.refreshed_at + ttl);
        self
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn access_key_secret(&self) -> &str {
        &self.access_key_secret
    }

    pub fn security_token(&self) -> Option<&str> {
        self.security_token.as_deref()
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.access_key_id == other.access_key_id
            && self.access_key_secret == other.access_key_secret
            && self.security_token == other.security_token
            && self.expires_at == other.expires_at
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field(
                "security_token",
                &self.security_token.as_ref().map(|_| "<redacted>"),
            )
            .field("refreshed_at", &self.refreshed_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Produces a fresh credential on demand. Implementations may hold a fixed
/// value or call out to a remote token service.
///
/// A profile calls `refresh` while materializing its credential. The source
/// may inspect that profile's state or provider, but must not call
/// `credential()` on it, which would wait on its own fetch.
pub trait CredentialSource: Send + Sync {
    fn refresh(&self) -> Result<Credential, CredentialError>;
}

/// Hands out clones of one fixed credential.
#[derive(Debug, Clone)]
pub struct StaticCredentialSource {
    credential: Credential,
}

impl StaticCredentialSource {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

impl CredentialSource for StaticCredentialSource {
    fn refresh(&self) -> Result<Credential, CredentialError> {
        Ok(self.credential.clone())
    }
}

/// The two ways a profile can hold credentials: an already materialized value
/// or a source that is asked on demand.
#[derive(Clone)]
pub enum CredentialProvider {
    Static(Credential),
    Refreshable(Arc<dyn CredentialSource>),
}

impl CredentialProvider {
    pub fn fetch(&self) -> Result<Credential, CredentialError> {
        let result = match self {
            Self::Static(credential) if credential.is_expired() => Err(CredentialError::Expired {
                access_key_id: credential.access_key_id().to_string(),
            }),
            Self::Static(credential) => Ok(credential.clone()),
            Self::Refreshable(source) => source.refresh(),
        };
        let outcome = if result.is_ok() { "ok" } else { "error" };
        counter!("credential_refresh_total", "result" => outcome).increment(1);
        result
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }
}

impl CredentialSource for CredentialProvider {
    fn refresh(&self) -> Result<Credential, CredentialError> {
        self.fetch()
    }
}

impl From<Credential> for CredentialProvider {
    fn from(credential: Credential) -> Self {
        Self::Static(credential)
    }
}

impl fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(credential) => f.debug_tuple("Static").field(credential).finish(),
            Self::Refreshable(_) => f.write_str("Refreshable(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    impl CredentialSource for FailingSource {
        fn refresh(&self) -> Result<Credential, CredentialError> {
            Err(CredentialError::refresh("sts unavailable"))
        }
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let credential = Credential::with_security_token("AKID", "top-secret", "session");
        let rendered = format!("{credential:?}");
        assert!(rendered.contains("AKID"));
        assert!(!rendered.contains("top-secret"));
        assert!(!rendered.contains("session"));
    }

    #[test]
    fn expiry_is_tracked_from_refresh_time() {
        let fresh = Credential::new("AKID", "secret").expiring_after(Duration::hours(1));
        assert!(!fresh.is_expired());
        assert_eq!(fresh.expires_at(), Some(fresh.refreshed_at() + Duration::hours(1)));

        let stale = Credential::new("AKID", "secret").expiring_after(Duration::seconds(-1));
        assert!(stale.is_expired());
        assert!(!Credential::new("AKID", "secret").is_expired());
    }

    #[test]
    fn equality_ignores_refresh_time() {
        let first = Credential::with_security_token("AKID", "secret", "token");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = Credential::with_security_token("AKID", "secret", "token");
        assert_ne!(first.refreshed_at(), second.refreshed_at());
        assert_eq!(first, second);

        assert_ne!(first, Credential::new("AKID", "secret"));
        assert_ne!(
            Credential::new("AKID", "secret"),
            Credential::new("AKID", "secret").expiring_after(Duration::hours(1))
        );
    }

    #[test]
    fn static_provider_refuses_expired_credentials() {
        let stale = Credential::new("AKID", "secret").expiring_after(Duration::seconds(-5));
        let err = CredentialProvider::from(stale).fetch().unwrap_err();
        assert_eq!(
            err,
            CredentialError::Expired {
                access_key_id: "AKID".into()
            }
        );
    }

    #[test]
    fn refreshable_provider_delegates_to_source() {
        let credential = Credential::new("AKID", "secret");
        let provider = CredentialProvider::Refreshable(Arc::new(StaticCredentialSource::new(
            credential.clone(),
        )));
        assert_eq!(provider.fetch().unwrap(), credential);
        assert!(!provider.is_static());

        let failing = CredentialProvider::Refreshable(Arc::new(FailingSource));
        assert!(matches!(failing.refresh(), Err(CredentialError::Refresh(_))));
    }
}
