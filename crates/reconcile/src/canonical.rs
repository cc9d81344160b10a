//! Canonical form of auth mount configuration.
//!
//! Declared files spell TTLs as duration strings (`"1h"`), while Vault
//! reports integer seconds and omits empty lists. Both sides are turned into
//! a [`CanonicalAuthConfig`] and compared field by field.

use std::time::Duration;
use vaultkit::{AuthConfigInput, AuthConfigOutput, AuthMount, EnableAuthOptions, TtlValue};

/// Errors produced while canonicalizing declared configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanonicalError {
    /// A TTL field is not a valid duration expression.
    #[error("could not parse {field} value {value:?} as a duration: {reason}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// The declared mount type differs from the live mount at the same path.
    #[error("mount at {path} is of type {live}, declared type is {declared}")]
    MountTypeChanged {
        path: String,
        live: String,
        declared: String,
    },
}

/// Auth mount tuning in the shape used for equality checks.
///
/// Absent strings and lists are empty, TTLs are whole seconds, and list
/// fields are sorted because Vault treats them as sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalAuthConfig {
    pub default_lease_ttl: u64,
    pub max_lease_ttl: u64,
    pub plugin_name: String,
    pub audit_non_hmac_request_keys: Vec<String>,
    pub audit_non_hmac_response_keys: Vec<String>,
    pub listing_visibility: String,
    pub passthrough_request_headers: Vec<String>,
}

impl CanonicalAuthConfig {
    /// Canonicalize declared configuration.
    pub fn from_input(input: &AuthConfigInput) -> Result<Self, CanonicalError> {
        Ok(Self {
            default_lease_ttl: ttl_seconds("default_lease_ttl", input.default_lease_ttl.as_ref())?,
            max_lease_ttl: ttl_seconds("max_lease_ttl", input.max_lease_ttl.as_ref())?,
            plugin_name: input.plugin_name.clone().unwrap_or_default(),
            audit_non_hmac_request_keys: sorted(input.audit_non_hmac_request_keys.as_deref()),
            audit_non_hmac_response_keys: sorted(input.audit_non_hmac_response_keys.as_deref()),
            listing_visibility: input.listing_visibility.clone().unwrap_or_default(),
            passthrough_request_headers: sorted(input.passthrough_request_headers.as_deref()),
        })
    }

    /// Canonicalize configuration as reported by Vault.
    pub fn from_output(output: &AuthConfigOutput) -> Self {
        Self {
            default_lease_ttl: output.default_lease_ttl,
            max_lease_ttl: output.max_lease_ttl,
            plugin_name: output.plugin_name.clone().unwrap_or_default(),
            audit_non_hmac_request_keys: sorted(output.audit_non_hmac_request_keys.as_deref()),
            audit_non_hmac_response_keys: sorted(output.audit_non_hmac_response_keys.as_deref()),
            listing_visibility: output.listing_visibility.clone().unwrap_or_default(),
            passthrough_request_headers: sorted(output.passthrough_request_headers.as_deref()),
        }
    }

    /// Render in the shape Vault reports.
    pub fn to_output(&self) -> AuthConfigOutput {
        AuthConfigOutput {
            default_lease_ttl: self.default_lease_ttl,
            max_lease_ttl: self.max_lease_ttl,
            plugin_name: non_empty(&self.plugin_name),
            audit_non_hmac_request_keys: non_empty_list(&self.audit_non_hmac_request_keys),
            audit_non_hmac_response_keys: non_empty_list(&self.audit_non_hmac_response_keys),
            listing_visibility: non_empty(&self.listing_visibility),
            passthrough_request_headers: non_empty_list(&self.passthrough_request_headers),
        }
    }
}

/// Canonicalize declared auth mount configuration.
pub fn canonicalize(input: &AuthConfigInput) -> Result<CanonicalAuthConfig, CanonicalError> {
    CanonicalAuthConfig::from_input(input)
}

/// A mount's type plus its canonical configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMount {
    pub mount_type: String,
    pub config: CanonicalAuthConfig,
}

impl CanonicalMount {
    pub fn from_declared(options: &EnableAuthOptions) -> Result<Self, CanonicalError> {
        Ok(Self {
            mount_type: options.mount_type.clone(),
            config: canonicalize(&options.config)?,
        })
    }

    pub fn from_live(mount: &AuthMount) -> Self {
        Self {
            mount_type: mount.mount_type.clone(),
            config: CanonicalAuthConfig::from_output(&mount.config),
        }
    }
}

/// Convert an optional TTL into whole seconds. Absent or empty is zero.
pub fn ttl_seconds(field: &'static str, value: Option<&TtlValue>) -> Result<u64, CanonicalError> {
    match value {
        None => Ok(0),
        Some(TtlValue::Seconds(secs)) => Ok(*secs),
        Some(TtlValue::Text(text)) if text.is_empty() => Ok(0),
        // Vault itself reads a bare integer string as seconds.
        Some(TtlValue::Text(text)) if text.bytes().all(|b| b.is_ascii_digit()) => {
            text.parse().map_err(|_| CanonicalError::InvalidDuration {
                field,
                value: text.clone(),
                reason: "value out of range".into(),
            })
        }
        Some(TtlValue::Text(text)) => parse_duration(text)
            .map(|d| d.as_secs())
            .map_err(|reason| CanonicalError::InvalidDuration {
                field,
                value: text.clone(),
                reason,
            }),
    }
}

/// Parse a duration expression such as `"1h30m"`, `"1.5h"` or `"300ms"`.
///
/// Grammar: an optional sign, then one or more decimal numbers each
/// followed by a unit (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`). The bare
/// string `"0"` is accepted. Negative durations are rejected.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let (negative, mut rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err("empty duration".into());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let int_part = &rest[..int_end];
        rest = &rest[int_end..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_end = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            frac_part = &after_dot[..frac_end];
            rest = &after_dot[frac_end..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err("expected a number".into());
        }

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            "" => return Err("missing unit".into()),
            other => return Err(format!("unknown unit {other:?}")),
        };

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| "value out of range".to_string())?
        };
        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| "value out of range".to_string())?;

        if !frac_part.is_empty() {
            // Digits beyond nanosecond precision cannot change the result.
            let digits = &frac_part[..frac_part.len().min(18)];
            let frac: u128 = digits.parse().map_err(|_| "value out of range".to_string())?;
            nanos += frac * scale / 10u128.pow(digits.len() as u32);
        }

        total = total
            .checked_add(nanos)
            .ok_or_else(|| "value out of range".to_string())?;
    }

    if negative && total > 0 {
        return Err("negative durations are not allowed".into());
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| "value out of range".to_string())
}

fn sorted(list: Option<&[String]>) -> Vec<String> {
    let mut list = list.map(<[String]>::to_vec).unwrap_or_default();
    list.sort();
    list.dedup();
    list
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn non_empty_list(list: &[String]) -> Option<Vec<String>> {
    (!list.is_empty()).then(|| list.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Option<TtlValue> {
        Some(TtlValue::Text(s.into()))
    }

    #[test]
    fn test_canonicalize_empty_config() {
        let out = canonicalize(&AuthConfigInput::default()).unwrap();
        assert_eq!(out, CanonicalAuthConfig::default());
    }

    #[test]
    fn test_canonicalize_converts_default_lease_ttl() {
        let input = AuthConfigInput {
            default_lease_ttl: text("1m10s"),
            ..Default::default()
        };
        assert_eq!(canonicalize(&input).unwrap().default_lease_ttl, 70);
    }

    #[test]
    fn test_canonicalize_converts_max_lease_ttl() {
        let input = AuthConfigInput {
            max_lease_ttl: text("1m10s"),
            ..Default::default()
        };
        assert_eq!(canonicalize(&input).unwrap().max_lease_ttl, 70);
    }

    #[test]
    fn test_canonicalize_empty_ttl_is_zero() {
        let input = AuthConfigInput {
            default_lease_ttl: text(""),
            ..Default::default()
        };
        assert_eq!(canonicalize(&input).unwrap().default_lease_ttl, 0);
    }

    #[test]
    fn test_canonicalize_integer_ttls() {
        let input = AuthConfigInput {
            default_lease_ttl: Some(TtlValue::Seconds(60)),
            max_lease_ttl: text("3600"),
            ..Default::default()
        };
        let out = canonicalize(&input).unwrap();
        assert_eq!(out.default_lease_ttl, 60);
        assert_eq!(out.max_lease_ttl, 3600);
    }

    #[test]
    fn test_canonicalize_invalid_ttl() {
        let input = AuthConfigInput {
            max_lease_ttl: text("ten minutes"),
            ..Default::default()
        };
        let err = canonicalize(&input).unwrap_err();
        match err {
            CanonicalError::InvalidDuration { field, value, .. } => {
                assert_eq!(field, "max_lease_ttl");
                assert_eq!(value, "ten minutes");
            }
            other => panic!("Expected InvalidDuration, got {other:?}"),
        }
    }

    #[test]
    fn test_absent_and_empty_lists_are_equal() {
        let declared = AuthConfigInput {
            passthrough_request_headers: Some(vec![]),
            listing_visibility: Some(String::new()),
            ..Default::default()
        };
        let live = AuthConfigOutput::default();
        assert_eq!(
            canonicalize(&declared).unwrap(),
            CanonicalAuthConfig::from_output(&live)
        );
    }

    #[test]
    fn test_list_order_is_ignored() {
        let declared = AuthConfigInput {
            audit_non_hmac_request_keys: Some(vec!["b".into(), "a".into()]),
            ..Default::default()
        };
        let live = AuthConfigOutput {
            audit_non_hmac_request_keys: Some(vec!["a".into(), "b".into()]),
            ..Default::default()
        };
        assert_eq!(
            canonicalize(&declared).unwrap(),
            CanonicalAuthConfig::from_output(&live)
        );
    }

    #[test]
    fn test_declared_matches_live_representation() {
        let declared = AuthConfigInput {
            default_lease_ttl: text("1h"),
            max_lease_ttl: text("24h"),
            listing_visibility: Some("unauth".into()),
            passthrough_request_headers: Some(vec!["X-Request-Id".into()]),
            ..Default::default()
        };
        let live = AuthConfigOutput {
            default_lease_ttl: 3600,
            max_lease_ttl: 86400,
            listing_visibility: Some("unauth".into()),
            passthrough_request_headers: Some(vec!["X-Request-Id".into()]),
            ..Default::default()
        };
        assert_eq!(
            canonicalize(&declared).unwrap(),
            CanonicalAuthConfig::from_output(&live)
        );
    }

    #[test]
    fn test_to_output_round_trips_through_from_output() {
        let canonical = CanonicalAuthConfig {
            default_lease_ttl: 70,
            plugin_name: "ldap".into(),
            ..Default::default()
        };
        let output = canonical.to_output();
        assert_eq!(output.plugin_name.as_deref(), Some("ldap"));
        assert!(output.audit_non_hmac_request_keys.is_none());
        assert_eq!(CanonicalAuthConfig::from_output(&output), canonical);
    }

    #[test]
    fn test_mount_type_participates_in_equality() {
        let declared = CanonicalMount::from_declared(&EnableAuthOptions {
            mount_type: "ldap".into(),
            ..Default::default()
        })
        .unwrap();
        let live = CanonicalMount::from_live(&AuthMount {
            mount_type: "userpass".into(),
            ..Default::default()
        });
        assert_ne!(declared, live);
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("1h").unwrap().as_secs(), 3600);
        assert_eq!(parse_duration("1h30m").unwrap().as_secs(), 5400);
        assert_eq!(parse_duration("1.5h").unwrap().as_secs(), 5400);
        assert_eq!(parse_duration("90s").unwrap().as_secs(), 90);
        assert_eq!(parse_duration("1500ms").unwrap().as_millis(), 1500);
        assert_eq!(parse_duration("2us").unwrap().as_nanos(), 2000);
        assert_eq!(parse_duration("2µs").unwrap().as_nanos(), 2000);
        assert_eq!(parse_duration(".5s").unwrap().as_millis(), 500);
        assert_eq!(parse_duration("+5m").unwrap().as_secs(), 300);
    }

    #[test]
    fn test_parse_duration_truncates_to_seconds() {
        assert_eq!(parse_duration("1999ms").unwrap().as_secs(), 1);
    }

    #[test]
    fn test_parse_duration_rejects_malformed() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("1d").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("-1h").is_err());
        assert!(parse_duration("1h ").is_err());
        assert!(parse_duration("1h 30m").is_err());
        assert!(parse_duration("1w").is_err());
        assert!(parse_duration("2hours").is_err());
        assert!(parse_duration("99999999999999999999h").is_err());
    }

    #[test]
    fn test_parse_duration_negative_zero() {
        assert_eq!(parse_duration("-0").unwrap(), Duration::ZERO);
    }
}
