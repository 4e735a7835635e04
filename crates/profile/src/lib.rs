//! Client profiles: who the caller is (credentials), where it talks to
//! (region and endpoint overrides) and how (transport settings).
//!
//! The [`ProfileManager`] is an explicitly owned context. Applications create
//! one at startup and hand it to whatever builds requests; tests create fresh
//! instances instead of resetting shared state.

pub mod config;
pub mod credentials;
pub mod endpoint;
pub mod http;
pub mod manager;
pub mod profile;


pub use config::ProfileConfig;
pub use credentials::{
    Credential, CredentialError, CredentialProvider, CredentialSource, StaticCredentialSource,
};
pub use endpoint::{EndpointKey, EndpointOverrideRegistry};
pub use http::{FormatType, HttpClientConfig};
pub use manager::ProfileManager;
pub use profile::{ClientProfile, CredentialState, DEFAULT_LOG_FORMAT};
