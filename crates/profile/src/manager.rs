use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::{
    config::ProfileConfig,
    credentials::CredentialSource,
    endpoint::EndpointOverrideRegistry,
    profile::ClientProfile,
};

/// Owns the "current" client profile and the endpoint overrides an
/// application registers at startup.
///
/// Every install replaces the current profile wholesale: the new profile is
/// fully built before it is swapped in under the lock, so readers see either
/// the old or the new instance. Endpoint registration shares the same lock.
#[derive(Debug, Default)]
pub struct ProfileManager {
    current: Mutex<Option<Arc<ClientProfile>>>,
    endpoints: Arc<EndpointOverrideRegistry>,
}

impl ProfileManager {
    pub fn new(endpoints: Arc<EndpointOverrideRegistry>) -> Self {
        Self {
            current: Mutex::new(None),
            endpoints,
        }
    }

    /// The current profile, creating an empty one on first access.
    pub fn current(&self) -> Arc<ClientProfile> {
        let mut current = self.current.lock();
        Arc::clone(current.get_or_insert_with(|| Arc::new(ClientProfile::empty())))
    }

    pub fn install_region(&self, region_id: impl Into<String>) -> Arc<ClientProfile> {
        self.install(ClientProfile::with_region(region_id))
    }

    pub fn install_access_key(
        &self,
        region_id: impl Into<String>,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Arc<ClientProfile> {
        self.install(ClientProfile::with_access_key(
            region_id,
            access_key_id,
            access_key_secret,
        ))
    }

    pub fn install_session_token(
        &self,
        region_id: impl Into<String>,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        security_token: impl Into<String>,
    ) -> Arc<ClientProfile> {
        self.install(ClientProfile::with_session_token(
            region_id,
            access_key_id,
            access_key_secret,
            security_token,
        ))
    }

    pub fn install_source(
        &self,
        region_id: impl Into<String>,
        source: Arc<dyn CredentialSource>,
    ) -> Arc<ClientProfile> {
        self.install(ClientProfile::with_source(region_id, source))
    }

    /// Builds and installs a profile from loaded configuration.
    pub fn install_from_config(&self, config: &ProfileConfig) -> Arc<ClientProfile> {
        let profile = ClientProfile::from_parts(
            config.region_id().map(str::to_string),
            config.credential().cloned(),
        );
        if let Some(format) = config.accept_format() {
            profile.set_format(format);
        }
        profile.set_http_client_config(config.http_client().clone());
        if config.vpc_endpoint() {
            profile.enable_vpc_endpoint();
        }
        if config.internal_location_service() {
            profile.enable_internal_location_service();
        }
        self.install(profile)
    }

    fn install(&self, profile: ClientProfile) -> Arc<ClientProfile> {
        let profile = Arc::new(profile);
        let mut current = self.current.lock();
        info!(
            region_id = ?profile.region_id(),
            credential_state = ?profile.credential_state(),
            "installing client profile"
        );
        *current = Some(Arc::clone(&profile));
        profile
    }

    /// Redirects `(region_id, product)` to `domain`. The last registration
    /// for a pair wins.
    pub fn register_endpoint_override(
        &self,
        region_id: impl Into<String>,
        product: impl AsRef<str>,
        domain: impl Into<String>,
    ) {
        let _current = self.current.lock();
        self.endpoints.register(region_id, product, domain);
    }

    #[deprecated(note = "use `register_endpoint_override`; the endpoint name is ignored")]
    pub fn register_named_endpoint_override(
        &self,
        _endpoint_name: &str,
        region_id: impl Into<String>,
        product: impl AsRef<str>,
        domain: impl Into<String>,
    ) {
        self.register_endpoint_override(region_id, product, domain);
    }

    #[deprecated(
        note = "use `register_endpoint_override`; the endpoint name and expiry flag are ignored"
    )]
    pub fn register_endpoint_override_with_expiry(
        &self,
        _endpoint_name: &str,
        region_id: impl Into<String>,
        product: impl AsRef<str>,
        domain: impl Into<String>,
        _never_expire: bool,
    ) {
        self.register_endpoint_override(region_id, product, domain);
    }

    pub fn endpoints(&self) -> &Arc<EndpointOverrideRegistry> {
        &self.endpoints
    }
}
