use std::time::Duration;

use watt_core::config::{
    get_optional_bool, get_optional_parsed, get_optional_u64, get_optional_var, hydrate_env_file,
    ConfigError,
};

use crate::{credentials::Credential, http::FormatType, http::HttpClientConfig};

/// Profile settings read from `WATT_*` variables (and `.env`, if present).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileConfig {
    region_id: Option<String>,
    credential: Option<Credential>,
    accept_format: Option<FormatType>,
    http_client: HttpClientConfig,
    vpc_endpoint: bool,
    internal_location_service: bool,
}

impl ProfileConfig {
    /// Loads the profile contract from the environment. An access key id
    /// without its secret (or the reverse) is rejected rather than silently
    /// producing an unauthenticated profile.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let credential = match (
            get_optional_var("WATT_ACCESS_KEY_ID"),
            get_optional_var("WATT_ACCESS_KEY_SECRET"),
        ) {
            (Some(id), Some(secret)) => Some(match get_optional_var("WATT_SECURITY_TOKEN") {
                Some(token) => Credential::with_security_token(id, secret, token),
                None => Credential::new(id, secret),
            }),
            (Some(_), None) => {
                return Err(ConfigError::MissingCompanion {
                    key: "WATT_ACCESS_KEY_ID",
                    companion: "WATT_ACCESS_KEY_SECRET",
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingCompanion {
                    key: "WATT_ACCESS_KEY_SECRET",
                    companion: "WATT_ACCESS_KEY_ID",
                })
            }
            (None, None) => None,
        };

        let mut http_client = HttpClientConfig::default();
        if let Some(ms) = get_optional_u64("WATT_CONNECT_TIMEOUT_MS")? {
            http_client.set_connection_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = get_optional_u64("WATT_READ_TIMEOUT_MS")? {
            http_client.set_read_timeout(Duration::from_millis(ms));
        }

        Ok(Self {
            region_id: get_optional_var("WATT_REGION_ID"),
            credential,
            accept_format: get_optional_parsed("WATT_ACCEPT_FORMAT")?,
            http_client,
            vpc_endpoint: get_optional_bool("WATT_VPC_ENDPOINT")?.unwrap_or(false),
            internal_location_service: get_optional_bool("WATT_INTERNAL_LOCATION_SERVICE")?
                .unwrap_or(false),
        })
    }

    pub fn region_id(&self) -> Option<&str> {
        self.region_id.as_deref()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn accept_format(&self) -> Option<FormatType> {
        self.accept_format
    }

    pub fn http_client(&self) -> &HttpClientConfig {
        &self.http_client
    }

    pub fn vpc_endpoint(&self) -> bool {
        self.vpc_endpoint
    }

    pub fn internal_location_service(&self) -> bool {
        self.internal_location_service
    }
}
