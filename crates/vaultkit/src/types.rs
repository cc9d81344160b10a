//! Wire types for the Vault HTTP API.
//!
//! Field names follow Vault's JSON exactly so that declared files can be
//! written in the same shape the API documentation shows.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Default address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "https://127.0.0.1:8200";

/// Default timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// An auth method as reported by `GET /v1/sys/auth`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMount {
    /// Auth method type (e.g. "ldap", "token", "approle").
    #[serde(rename = "type")]
    pub mount_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub accessor: String,
    #[serde(default)]
    pub config: AuthConfigOutput,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub seal_wrap: bool,
    #[serde(default)]
    pub options: Option<BTreeMap<String, String>>,
}

/// Mount tuning as Vault reports it: TTLs are integer seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfigOutput {
    #[serde(default)]
    pub default_lease_ttl: u64,
    #[serde(default)]
    pub max_lease_ttl: u64,
    #[serde(default)]
    pub plugin_name: Option<String>,
    #[serde(default)]
    pub audit_non_hmac_request_keys: Option<Vec<String>>,
    #[serde(default)]
    pub audit_non_hmac_response_keys: Option<Vec<String>>,
    #[serde(default)]
    pub listing_visibility: Option<String>,
    #[serde(default)]
    pub passthrough_request_headers: Option<Vec<String>>,
}

/// Body of `POST /v1/sys/auth/:path`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnableAuthOptions {
    #[serde(rename = "type", default)]
    pub mount_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub config: AuthConfigInput,
    #[serde(default)]
    pub local: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plugin_name: String,
    #[serde(default)]
    pub seal_wrap: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
}

/// Mount tuning as it is written: TTLs may be duration strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfigInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_lease_ttl: Option<TtlValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lease_ttl: Option<TtlValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_non_hmac_request_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_non_hmac_response_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passthrough_request_headers: Option<Vec<String>>,
}

/// A TTL as accepted by Vault: integer seconds or a duration string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TtlValue {
    Seconds(u64),
    Text(String),
}

impl fmt::Display for TtlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(secs) => write!(f, "{secs}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

/// Generic response envelope returned by logical reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub lease_id: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

/// Connection settings for [`crate::HttpBackend`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address, e.g. `https://vault.example.com:8200`.
    pub address: String,
    /// Token sent as `X-Vault-Token`.
    pub token: String,
    /// Enterprise namespace, sent as `X-Vault-Namespace`.
    pub namespace: Option<String>,
    /// Skip TLS certificate verification.
    pub skip_verify: bool,
    /// Global per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a config for an address and token with default settings.
    #[must_use]
    pub fn new(address: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: token.into(),
            namespace: None,
            skip_verify: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.is_empty());
        self
    }

    /// Set whether TLS verification is skipped.
    #[must_use]
    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS, "")
    }
}
