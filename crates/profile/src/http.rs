//! Transport-facing values owned by a profile. The transport layer reads
//! them; nothing here opens a connection.

use std::time::Duration;

use strum_macros::{AsRefStr, Display, EnumString};

/// Response body format requested from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum FormatType {
    Xml,
    Json,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    connection_timeout: Duration,
    read_timeout: Duration,
    max_idle_connections_per_host: usize,
    ignore_ssl_certs: bool,
    cert_path: Option<String>,
    http_proxy: Option<String>,
    https_proxy: Option<String>,
    no_proxy: Vec<String>,
}

impl HttpClientConfig {
    pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_IDLE_CONNECTIONS: usize = 5;

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    pub fn set_connection_timeout(&mut self, timeout: Duration) {
        self.connection_timeout = timeout;
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    pub fn max_idle_connections_per_host(&self) -> usize {
        self.max_idle_connections_per_host
    }

    pub fn set_max_idle_connections_per_host(&mut self, max: usize) {
        self.max_idle_connections_per_host = max.max(1);
    }

    pub fn ignore_ssl_certs(&self) -> bool {
        self.ignore_ssl_certs
    }

    pub fn set_ignore_ssl_certs(&mut self, ignore: bool) {
        self.ignore_ssl_certs = ignore;
    }

    pub fn cert_path(&self) -> Option<&str> {
        self.cert_path.as_deref()
    }

    pub fn set_cert_path(&mut self, path: Option<String>) {
        self.cert_path = path;
    }

    pub fn http_proxy(&self) -> Option<&str> {
        self.http_proxy.as_deref()
    }

    pub fn set_http_proxy(&mut self, proxy: Option<String>) {
        self.http_proxy = proxy;
    }

    pub fn https_proxy(&self) -> Option<&str> {
        self.https_proxy.as_deref()
    }

    pub fn set_https_proxy(&mut self, proxy: Option<String>) {
        self.https_proxy = proxy;
    }

    pub fn no_proxy(&self) -> &[String] {
        &self.no_proxy
    }

    /// Accepts a comma separated host list; blanks are dropped.
    pub fn set_no_proxy(&mut self, hosts: &str) {
        self.no_proxy = hosts
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .collect();
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Self::DEFAULT_CONNECTION_TIMEOUT,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            max_idle_connections_per_host: Self::DEFAULT_MAX_IDLE_CONNECTIONS,
            ignore_ssl_certs: false,
            cert_path: None,
            http_proxy: None,
            https_proxy: None,
            no_proxy: Vec::new(),
        }
    }
}
