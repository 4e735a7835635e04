use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::{debug, Dispatch};

use crate::{
    credentials::{Credential, CredentialError, CredentialProvider, CredentialSource},
    http::{FormatType, HttpClientConfig},
};

pub const DEFAULT_LOG_FORMAT: &str = "{method} {uri} HTTP/{version} {code} {cost} {hostname} {pid}";

/// Where a profile stands on the credential dimension. `Materialized` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    NoCredential,
    SourceAttached,
    Materialized,
}

// Provider waiting to be asked for the first credential.
enum Pending {
    Empty,
    Injected(CredentialProvider),
    Attached(CredentialProvider),
}

impl Pending {
    fn provider(&self) -> Option<&CredentialProvider> {
        match self {
            Self::Empty => None,
            Self::Injected(provider) | Self::Attached(provider) => Some(provider),
        }
    }
}

struct Settings {
    accept_format: Option<FormatType>,
    http_client_config: HttpClientConfig,
    logger: Option<Dispatch>,
    log_format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accept_format: None,
            http_client_config: HttpClientConfig::default(),
            logger: None,
            log_format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

/// One configured identity for issuing API calls.
///
/// The credential is resolved lazily: a credential supplied up front is used
/// as is, otherwise the attached provider is asked once, on first access, and
/// its answer is kept for the life of the profile. Region and credential
/// values are not validated here; malformed values surface wherever they are
/// first used.
pub struct ClientProfile {
    region_id: Option<String>,
    credential: OnceCell<Credential>,
    pending: RwLock<Pending>,
    settings: RwLock<Settings>,
    internal_location_service: AtomicBool,
    vpc_endpoint: AtomicBool,
}

impl ClientProfile {
    fn build(region_id: Option<String>, credential: OnceCell<Credential>, pending: Pending) -> Self {
        Self {
            region_id,
            credential,
            pending: RwLock::new(pending),
            settings: RwLock::new(Settings::default()),
            internal_location_service: AtomicBool::new(false),
            vpc_endpoint: AtomicBool::new(false),
        }
    }

    /// No region and no credential.
    pub fn empty() -> Self {
        Self::build(None, OnceCell::new(), Pending::Empty)
    }

    pub fn with_region(region_id: impl Into<String>) -> Self {
        Self::build(Some(region_id.into()), OnceCell::new(), Pending::Empty)
    }

    pub fn with_credential(region_id: impl Into<String>, credential: Credential) -> Self {
        Self::build(
            Some(region_id.into()),
            OnceCell::with_value(credential),
            Pending::Empty,
        )
    }

    pub fn with_access_key(
        region_id: impl Into<String>,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        Self::with_credential(region_id, Credential::new(access_key_id, access_key_secret))
    }

    pub fn with_session_token(
        region_id: impl Into<String>,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        security_token: impl Into<String>,
    ) -> Self {
        Self::with_credential(
            region_id,
            Credential::with_security_token(access_key_id, access_key_secret, security_token),
        )
    }

    /// Region and credential as loaded from configuration, either of which
    /// may be absent.
    pub fn from_parts(region_id: Option<String>, credential: Option<Credential>) -> Self {
        let credential = match credential {
            Some(credential) => OnceCell::with_value(credential),
            None => OnceCell::new(),
        };
        Self::build(region_id, credential, Pending::Empty)
    }

    pub fn with_source(region_id: impl Into<String>, source: Arc<dyn CredentialSource>) -> Self {
        Self::build(
            Some(region_id.into()),
            OnceCell::new(),
            Pending::Injected(CredentialProvider::Refreshable(source)),
        )
    }

    pub fn region_id(&self) -> Option<&str> {
        self.region_id.as_deref()
    }

    /// Returns the materialized credential, materializing it from the pending
    /// provider on first use. `Ok(None)` means the profile is unauthenticated.
    ///
    /// Concurrent first callers wait for a single fetch. A failed fetch is
    /// returned to the caller and leaves the profile unmaterialized.
    pub fn credential(&self) -> Result<Option<Credential>, CredentialError> {
        if let Some(credential) = self.credential.get() {
            return Ok(Some(credential.clone()));
        }

        // Held across the fetch so an attach cannot slip in mid-materialization.
        // Recursive so a source that reads this profile is not starved by a
        // queued attach.
        let pending = self.pending.read_recursive();
        let Some(provider) = pending.provider() else {
            return Ok(None);
        };
        let credential = self.credential.get_or_try_init(|| {
            debug!(region_id = ?self.region_id, "materializing profile credential");
            provider.fetch()
        })?;
        Ok(Some(credential.clone()))
    }

    /// Attaches a credential source. Ignored once a credential has
    /// materialized or another source was already attached; a source given at
    /// construction is superseded. Returns whether the source was taken.
    pub fn attach_credential_source(&self, source: Arc<dyn CredentialSource>) -> bool {
        let mut pending = self.pending.write();
        if self.credential.get().is_some() {
            debug!(region_id = ?self.region_id, "credential already materialized, ignoring source");
            return false;
        }
        if matches!(*pending, Pending::Attached(_)) {
            debug!(region_id = ?self.region_id, "credential source already attached, ignoring");
            return false;
        }
        *pending = Pending::Attached(CredentialProvider::Refreshable(source));
        true
    }

    /// Provider view of the profile's credentials: the materialized value as a
    /// static provider, otherwise whatever source is pending.
    pub fn credentials_provider(&self) -> Option<CredentialProvider> {
        if let Some(credential) = self.credential.get() {
            return Some(CredentialProvider::Static(credential.clone()));
        }
        self.pending.read_recursive().provider().cloned()
    }

    pub fn credential_state(&self) -> CredentialState {
        if self.credential.get().is_some() {
            return CredentialState::Materialized;
        }
        match self.pending.read_recursive().provider() {
            Some(_) => CredentialState::SourceAttached,
            None => CredentialState::NoCredential,
        }
    }

    pub fn format(&self) -> Option<FormatType> {
        self.settings.read().accept_format
    }

    pub fn set_format(&self, format: FormatType) {
        self.settings.write().accept_format = Some(format);
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        self.settings.read().http_client_config.clone()
    }

    pub fn set_http_client_config(&self, config: HttpClientConfig) {
        self.settings.write().http_client_config = config;
    }

    #[deprecated(note = "use `HttpClientConfig::cert_path` instead")]
    pub fn cert_path(&self) -> Option<String> {
        self.settings
            .read()
            .http_client_config
            .cert_path()
            .map(str::to_string)
    }

    #[deprecated(note = "use `HttpClientConfig::set_cert_path` instead")]
    pub fn set_cert_path(&self, path: impl Into<String>) {
        self.settings
            .write()
            .http_client_config
            .set_cert_path(Some(path.into()));
    }

    pub fn enable_internal_location_service(&self) {
        self.internal_location_service.store(true, Ordering::Release);
    }

    #[deprecated(note = "use `enable_internal_location_service` instead")]
    pub fn set_using_internal_location_service(&self) {
        self.enable_internal_location_service();
    }

    pub fn is_using_internal_location_service(&self) -> bool {
        self.internal_location_service.load(Ordering::Acquire)
    }

    pub fn enable_vpc_endpoint(&self) {
        self.vpc_endpoint.store(true, Ordering::Release);
    }

    pub fn is_using_vpc_endpoint(&self) -> bool {
        self.vpc_endpoint.load(Ordering::Acquire)
    }

    pub fn logger(&self) -> Option<Dispatch> {
        self.settings.read().logger.clone()
    }

    pub fn set_logger(&self, logger: Dispatch) {
        self.settings.write().logger = Some(logger);
    }

    pub fn log_format(&self) -> String {
        self.settings.read().log_format.clone()
    }

    pub fn set_log_format(&self, format: impl Into<String>) {
        self.settings.write().log_format = format.into();
    }
}

impl fmt::Debug for ClientProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientProfile")
            .field("region_id", &self.region_id)
            .field("credential_state", &self.credential_state())
            .field("format", &self.format())
            .field(
                "internal_location_service",
                &self.is_using_internal_location_service(),
            )
            .field("vpc_endpoint", &self.is_using_vpc_endpoint())
            .finish_non_exhaustive()
    }
}
