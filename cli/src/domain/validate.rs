//! Argument schemas and pure field validators — no I/O, no async.
//!
//! A schema is a typed struct: decoding the raw JSON object gives the typed
//! value, then [`ArgSchema::check`] runs per-field rules. All offending
//! fields are reported together.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::domain::error::FieldError;

/// VM names become file names and resource keys, so no path separators.
pub static VM_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern — cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]{0,62})$").expect("valid regex")
});

/// RFC 1123 host name.
pub static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("valid regex")
});

/// `http(s)://host[:port][/path]` with no whitespace or quotes.
pub static HTTP_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"^https?://[A-Za-z0-9.\-\[\]:]+(:[0-9]{1,5})?(/[^\s'"`]*)?$"#).expect("valid regex")
});

/// JSON shape a field value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bool,
    Integer,
}

impl FieldType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "boolean",
            Self::Integer => "integer",
        }
    }

    fn accepts(self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Integer => value.is_i64() || value.is_u64(),
        }
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Description of one argument field, used for listing and for detecting
/// missing, mistyped and unknown keys before decoding.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub description: &'static str,
}

/// A typed argument set with its runtime checks.
pub trait ArgSchema: DeserializeOwned {
    const FIELDS: &'static [FieldSpec];

    /// Field-level rules beyond shape. Empty means valid.
    fn check(&self) -> Vec<FieldError>;
}

/// Decode and check a raw JSON argument object against `T`.
///
/// # Errors
///
/// Returns every offending field: non-object input, missing required
/// fields, type mismatches, unknown fields, and failed field rules.
pub fn decode<T: ArgSchema>(raw: &serde_json::Value) -> Result<T, Vec<FieldError>> {
    let empty = serde_json::Map::new();
    let obj = match raw {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => &empty,
        other => {
            return Err(vec![FieldError::new(
                "<arguments>",
                format!("expected an object, got {other}"),
            )]);
        }
    };

    let mut errors = Vec::new();
    for spec in T::FIELDS {
        match obj.get(spec.name) {
            None | Some(serde_json::Value::Null) => {
                if spec.required {
                    errors.push(FieldError::new(spec.name, "is required"));
                }
            }
            Some(value) if !spec.ty.accepts(value) => errors.push(FieldError::new(
                spec.name,
                format!("expected {}, got {}", spec.ty.as_str(), json_type(value)),
            )),
            Some(_) => {}
        }
    }
    for key in obj.keys() {
        if !T::FIELDS.iter().any(|f| f.name == key) {
            errors.push(FieldError::new(key.as_str(), "unknown field"));
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let value = serde_json::Value::Object(obj.clone());
    let typed = T::deserialize(&value).map_err(|e| vec![FieldError::new("<arguments>", e.to_string())])?;
    let errors = typed.check();
    if errors.is_empty() { Ok(typed) } else { Err(errors) }
}

// ── Field rules ──────────────────────────────────────────────────────────────

/// Validate a VM name used as a resource key and file name.
pub fn vm_name(field: &str, value: &str) -> Option<FieldError> {
    if value.is_empty() {
        return Some(FieldError::new(field, "must not be empty"));
    }
    if !VM_NAME_RE.is_match(value) {
        return Some(FieldError::new(
            field,
            format!("'{value}' must be 1-63 characters of letters, digits, '.', '_' or '-'"),
        ));
    }
    None
}

/// Validate a host identifier: IP address or DNS name.
pub fn host(field: &str, value: &str) -> Option<FieldError> {
    if value.trim().is_empty() {
        return Some(FieldError::new(field, "must not be empty"));
    }
    if value.parse::<core::net::IpAddr>().is_ok() || (value.len() <= 253 && HOSTNAME_RE.is_match(value)) {
        return None;
    }
    Some(FieldError::new(field, format!("'{value}' is not an IP address or host name")))
}

/// Validate a literal IP address.
pub fn ip_address(field: &str, value: &str) -> Option<FieldError> {
    if value.parse::<core::net::IpAddr>().is_ok() {
        None
    } else {
        Some(FieldError::new(field, format!("'{value}' is not an IP address")))
    }
}

/// Validate an http(s) URL that will be written into a remote config file.
pub fn http_url(field: &str, value: &str) -> Option<FieldError> {
    if HTTP_URL_RE.is_match(value) {
        None
    } else {
        Some(FieldError::new(field, format!("'{value}' is not an http(s) URL")))
    }
}

/// Validate an absolute remote path with no `..` segments.
pub fn absolute_path(field: &str, value: &str) -> Option<FieldError> {
    if !value.starts_with('/') {
        return Some(FieldError::new(field, format!("'{value}' must be an absolute path")));
    }
    if value.split('/').any(|seg| seg == "..") || value.contains('\0') {
        return Some(FieldError::new(field, format!("'{value}' must not contain '..'")));
    }
    None
}

/// SSH login name.
pub fn user(field: &str, value: &str) -> Option<FieldError> {
    let ok = !value.is_empty()
        && value.len() <= 32
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        None
    } else {
        Some(FieldError::new(field, format!("'{value}' is not a valid user name")))
    }
}
