//! Template parameters for generic documents.
//!
//! Generic documents may contain `{{ name }}` placeholders. Values come from
//! `key=value` pairs given on the command line and from a JSON template file;
//! the file wins when both define a key.

use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Error, Result};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.-]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// A template rendering failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown template parameter {0:?}")]
    UnknownParameter(String),

    #[error("invalid template parameter {0:?}, expected key=value")]
    InvalidPair(String),
}

/// Ordered mapping of parameter name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateParams(BTreeMap<String, String>);

impl TemplateParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` pairs. Each pair may itself hold several
    /// comma-separated assignments (`service=foo,account=bar`).
    pub fn from_pairs<I, S>(pairs: I) -> std::result::Result<Self, TemplateError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for pair in pairs {
            for item in pair.as_ref().split(',').filter(|s| !s.trim().is_empty()) {
                let (key, value) = item
                    .split_once('=')
                    .filter(|(k, _)| !k.trim().is_empty())
                    .ok_or_else(|| TemplateError::InvalidPair(item.to_string()))?;
                params.insert(key.trim(), value.trim());
            }
        }
        Ok(params)
    }

    /// Load parameters from a JSON object of scalar values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let value: Value =
            serde_json::from_str(&content).map_err(|e| Error::parse(path, e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| Error::parse(path, "template file must contain a JSON object"))?;

        let mut params = Self::new();
        for (key, value) in object {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                _ => {
                    return Err(Error::parse(
                        path,
                        format!("template parameter {key:?} must be a string, number or boolean"),
                    ));
                }
            };
            params.insert(key.clone(), text);
        }
        log::debug!("Loaded {} template parameter(s) from {}", params.len(), path.display());
        Ok(params)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Parameter names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    #[must_use]
    pub fn merged_with(mut self, other: TemplateParams) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Substitute every placeholder in `text`.
    pub fn render(&self, text: &str) -> std::result::Result<String, TemplateError> {
        let mut missing = None;
        let rendered = PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            match self.get(name) {
                Some(value) => value.to_string(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });
        match missing {
            Some(name) => Err(TemplateError::UnknownParameter(name)),
            None => Ok(rendered.into_owned()),
        }
    }
}

impl fmt::Display for TemplateParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", pairs.join(","))
    }
}
