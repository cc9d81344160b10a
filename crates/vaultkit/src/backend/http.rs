//! HTTP backend.
//!
//! This module provides the [`HttpBackend`] implementation that talks to a
//! Vault server over its REST API using a blocking `ureq` agent.
//!
//! Status codes are inspected by hand rather than turned into transport
//! errors, so that the `errors` array Vault puts in failure bodies can be
//! reported to the operator.

use crate::backend::{VaultBackend, parse_auth_mounts, parse_policy_list, parse_policy_rules};
use crate::error::{Error, Result, error_messages};
use crate::types::{AuthMount, ClientConfig, EnableAuthOptions, Secret};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Message Vault returns when enabling an auth method on a taken path.
const PATH_IN_USE: &str = "path is already in use";

/// Vault HTTP backend.
///
/// # Example
///
/// ```no_run
/// use vaultkit::{ClientConfig, HttpBackend, VaultBackend};
///
/// let backend = HttpBackend::new(&ClientConfig::new("http://127.0.0.1:8200", "root")).unwrap();
/// let policies = backend.list_policies().unwrap();
/// println!("Found {} policies", policies.len());
/// ```
pub struct HttpBackend {
    agent: ureq::Agent,
    address: String,
    token: String,
    namespace: Option<String>,
}

impl HttpBackend {
    /// Create a backend from connection settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the address or token is empty.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.address.trim().is_empty() {
            return Err(Error::Config("no Vault address configured".into()));
        }
        if config.token.trim().is_empty() {
            return Err(Error::Config("no Vault token configured".into()));
        }

        let mut builder = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout));
        if config.skip_verify {
            log::warn!("TLS certificate verification is disabled");
            builder = builder.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }

        Ok(Self {
            agent: ureq::Agent::new_with_config(builder.build()),
            address: config.address.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            namespace: config.namespace.clone(),
        })
    }

    /// Get the server address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Check that the configured token is accepted by the server.
    pub fn verify_token(&self) -> Result<()> {
        let body = self.send("GET", "auth/token/lookup-self", None)?;
        let name = body
            .as_ref()
            .and_then(|b| b.pointer("/data/display_name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        log::debug!("Authenticated to {} as {}", self.address, name);
        Ok(())
    }

    /// Build the full URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let request = request.header("X-Vault-Token", self.token.as_str());
        match &self.namespace {
            Some(ns) => request.header("X-Vault-Namespace", ns.as_str()),
            None => request,
        }
    }

    /// Send a request and decode the JSON body, if any.
    ///
    /// A 404 becomes `Error::NotFound`; any other non-2xx becomes
    /// `Error::Http` with the messages from the response body.
    fn send(&self, method: &'static str, path: &str, body: Option<&Value>) -> Result<Option<Value>> {
        let url = self.url(path);
        log::trace!("{method} {url}");

        let empty = Value::Object(Map::new());
        let result = match method {
            "GET" => self.authorize(self.agent.get(&url)).call(),
            "DELETE" => self.authorize(self.agent.delete(&url)).call(),
            "POST" => self
                .authorize(self.agent.post(&url))
                .send_json(body.unwrap_or(&empty)),
            "PUT" => self
                .authorize(self.agent.put(&url))
                .send_json(body.unwrap_or(&empty)),
            other => return Err(Error::Config(format!("unsupported method {other}"))),
        };

        let mut response = result.map_err(|e| Error::transport(path, e))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::transport(path, e))?;

        if status == 404 {
            return Err(Error::NotFound(path.to_string()));
        }
        if !(200..300).contains(&status) {
            return Err(Error::http(method, path, status, error_messages(&text)));
        }
        if text.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| Error::invalid_response(path, e.to_string()))
    }

    fn send_secret(&self, method: &'static str, path: &str, body: Option<&Value>) -> Result<Option<Secret>> {
        match self.send(method, path, body) {
            Ok(Some(value)) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| Error::invalid_response(path, e.to_string())),
            Ok(None) => Ok(None),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Retune an existing auth mount with the config from `options`.
    fn tune_auth(&self, path: &str, options: &EnableAuthOptions) -> Result<()> {
        let mut body = serde_json::to_value(&options.config)
            .map_err(|e| Error::invalid_response(path, e.to_string()))?;
        if !options.description.is_empty()
            && let Some(object) = body.as_object_mut()
        {
            object.insert("description".into(), Value::String(options.description.clone()));
        }

        let tune_path = format!("sys/auth/{}/tune", path.trim_end_matches('/'));
        self.send("POST", &tune_path, Some(&body))?;
        Ok(())
    }
}

impl VaultBackend for HttpBackend {
    fn list_auth(&self) -> Result<BTreeMap<String, AuthMount>> {
        let body = self
            .send("GET", "sys/auth", None)?
            .ok_or_else(|| Error::invalid_response("sys/auth", "empty body"))?;
        parse_auth_mounts(&body)
    }

    fn enable_auth(&self, path: &str, options: &EnableAuthOptions) -> Result<()> {
        let body = serde_json::to_value(options)
            .map_err(|e| Error::invalid_response(path, e.to_string()))?;
        let enable_path = format!("sys/auth/{path}");

        match self.send("POST", &enable_path, Some(&body)) {
            Ok(_) => Ok(()),
            Err(Error::Http {
                status: 400,
                messages,
                ..
            }) if messages.iter().any(|m| m.contains(PATH_IN_USE)) => {
                log::debug!("Auth mount {path} already enabled, tuning instead");
                self.tune_auth(path, options)
            }
            Err(e) => Err(e),
        }
    }

    fn disable_auth(&self, path: &str) -> Result<()> {
        self.send("DELETE", &format!("sys/auth/{path}"), None)?;
        Ok(())
    }

    fn list_policies(&self) -> Result<Vec<String>> {
        let body = self
            .send("GET", "sys/policy", None)?
            .ok_or_else(|| Error::invalid_response("sys/policy", "empty body"))?;
        parse_policy_list(&body)
    }

    fn get_policy(&self, name: &str) -> Result<String> {
        let path = format!("sys/policy/{name}");
        let body = self
            .send("GET", &path, None)?
            .ok_or_else(|| Error::invalid_response(&path, "empty body"))?;
        parse_policy_rules(name, &body)
    }

    fn put_policy(&self, name: &str, rules: &str) -> Result<()> {
        let body = serde_json::json!({ "rules": rules });
        self.send("PUT", &format!("sys/policy/{name}"), Some(&body))?;
        Ok(())
    }

    fn delete_policy(&self, name: &str) -> Result<()> {
        self.send("DELETE", &format!("sys/policy/{name}"), None)?;
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Option<Secret>> {
        self.send_secret("GET", path, None)
    }

    fn write(&self, path: &str, data: &Map<String, Value>) -> Result<Option<Secret>> {
        let body = Value::Object(data.clone());
        self.send_secret("PUT", path, Some(&body))
    }

    fn list(&self, path: &str) -> Result<Option<Secret>> {
        let list_path = format!("{}?list=true", path.trim_end_matches('/'));
        self.send_secret("GET", &list_path, None)
    }
}
