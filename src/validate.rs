//! Format validators
//!
//! Pure, deterministic checks applied to attribute values at plan time,
//! before any network call is made. Each validator returns zero or more
//! diagnostics attributed to the offending value's position in the
//! configuration tree.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;

use crate::diag::{AttributePath, Diagnostic, Diagnostics};

/// Signature shared by all attribute validators.
pub type ValidateFn = fn(&Value, &AttributePath) -> Diagnostics;

/// Resource identifiers are `gid:` followed by unpadded URL-safe base64.
pub const GID_PREFIX: &str = "gid:";

const GID_MIN_LEN: usize = 22;
const GID_MAX_LEN: usize = 254;

fn expect_string<'a>(
    value: &'a Value,
    path: &AttributePath,
    caller: &str,
) -> Result<&'a str, Diagnostics> {
    match value.as_str() {
        Some(s) => Ok(s),
        None => Err(Diagnostic::plugin_error(format!(
            "{caller} failed, expected string, got {}",
            type_name(value)
        ))
        .with_path(path.clone())
        .into()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Verify the value is a valid resource identifier.
///
/// The rules are checked in order and exactly one diagnostic names the first
/// violated rule: `gid:` prefix, total length between 22 and 254, and the
/// remainder being valid unpadded URL-safe base64.
pub fn validate_gid(value: &Value, path: &AttributePath) -> Diagnostics {
    let summary;
    match value.as_str() {
        None => summary = "expected type to be string".to_string(),
        Some(v) if !v.starts_with(GID_PREFIX) => {
            summary = format!("expected to have '{GID_PREFIX}' prefix");
        }
        Some(v) if v.len() < GID_MIN_LEN || v.len() > GID_MAX_LEN => {
            summary = format!("expected to have len between {GID_MIN_LEN} and {GID_MAX_LEN} characters");
        }
        Some(v) => match URL_SAFE_NO_PAD.decode(&v[GID_PREFIX.len()..]) {
            Ok(_) => return Diagnostics::new(),
            Err(err) => {
                summary = format!(
                    "expected to be a valid Raw URL Base64 string with '{GID_PREFIX}' prefix, got {err}"
                );
            }
        },
    }

    Diagnostic::error_detail("Invalid ID value", summary)
        .with_path(path.clone())
        .into()
}

/// Verify the value is a valid client-assigned resource name.
///
/// Length and charset are independent rules; both may fire at once.
pub fn validate_name(value: &Value, path: &AttributePath) -> Diagnostics {
    let mut ret = Diagnostics::new();
    let v = match expect_string(value, path, "validate_name") {
        Ok(v) => v,
        Err(d) => return d,
    };

    let len = v.chars().count();
    if !(2..=254).contains(&len) {
        ret.push(
            Diagnostic::error(format!(
                "expected string value between 2 and 254 characters but received {len}"
            ))
            .with_path(path.clone()),
        );
    }
    if !name_charset_ok(v) {
        ret.push(
            Diagnostic::error_detail(
                "Invalid name",
                "Value can have lowercase letters, digits, or hyphens. \
                 It must start with a lowercase letter and end with a letter or number.",
            )
            .with_path(path.clone()),
        );
    }
    ret
}

fn name_charset_ok(v: &str) -> bool {
    let mut chars = v.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() {
        return false;
    }
    let Some(last) = v.chars().last() else {
        return false;
    };
    if !(last.is_ascii_lowercase() || last.is_ascii_digit()) {
        return false;
    }
    v.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Verify the value parses as YAML.
pub fn validate_yaml(value: &Value, path: &AttributePath) -> Diagnostics {
    let v = match expect_string(value, path, "validate_yaml") {
        Ok(v) => v,
        Err(d) => return d,
    };
    match serde_yaml::from_str::<serde_yaml::Value>(v) {
        Ok(_) => Diagnostics::new(),
        Err(err) => Diagnostic::error(err.to_string()).with_path(path.clone()).into(),
    }
}

/// Verify the value parses as JSON.
pub fn validate_json(value: &Value, path: &AttributePath) -> Diagnostics {
    let v = match expect_string(value, path, "validate_json") {
        Ok(v) => v,
        Err(d) => return d,
    };
    match serde_json::from_str::<Value>(v) {
        Ok(_) => Diagnostics::new(),
        Err(err) => Diagnostic::error(err.to_string()).with_path(path.clone()).into(),
    }
}

/// Verify the value parses as an RFC3339 timestamp.
pub fn validate_rfc3339(value: &Value, path: &AttributePath) -> Diagnostics {
    let v = match expect_string(value, path, "validate_rfc3339") {
        Ok(v) => v,
        Err(d) => return d,
    };
    match chrono::DateTime::parse_from_rfc3339(v) {
        Ok(_) => Diagnostics::new(),
        Err(err) => Diagnostic::error_detail("Invalid RFC3339 timestamp", err.to_string())
            .with_path(path.clone())
            .into(),
    }
}

/// Verify the value parses as a duration literal such as `30m` or `2h45m`.
pub fn validate_duration(value: &Value, path: &AttributePath) -> Diagnostics {
    let v = match expect_string(value, path, "validate_duration") {
        Ok(v) => v,
        Err(d) => return d,
    };
    match humantime::parse_duration(v) {
        Ok(_) => Diagnostics::new(),
        Err(err) => Diagnostic::error_detail("Invalid duration", err.to_string())
            .with_path(path.clone())
            .into(),
    }
}

/// Verify the value is a PEM public-key block.
pub fn validate_public_key_pem(value: &Value, path: &AttributePath) -> Diagnostics {
    let v = match expect_string(value, path, "validate_public_key_pem") {
        Ok(v) => v,
        Err(d) => return d,
    };
    let trimmed = v.trim_end();
    if trimmed.starts_with("-----BEGIN PUBLIC KEY-----")
        && trimmed.ends_with("-----END PUBLIC KEY-----")
    {
        return Diagnostics::new();
    }
    Diagnostic::error_detail(
        "Invalid public key",
        "Value must be a PEM encoded public key block",
    )
    .with_path(path.clone())
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path() -> AttributePath {
        AttributePath::attr("test")
    }

    #[test]
    fn test_gid_accepts_raw_url_base64() {
        let d = validate_gid(&json!("gid:SGVsbG_CsFN0cmF0b3Mh"), &path());
        assert!(d.is_empty());
    }

    #[test]
    fn test_gid_rejects_non_string() {
        let d = validate_gid(&json!(22), &path());
        assert_eq!(d.len(), 1);
        let diag = d.iter().next().unwrap();
        assert_eq!(diag.summary, "Invalid ID value");
        assert_eq!(diag.detail, "expected type to be string");
    }

    #[test]
    fn test_gid_rejects_missing_prefix() {
        let d = validate_gid(&json!("abc"), &path());
        assert_eq!(d.iter().next().unwrap().detail, "expected to have 'gid:' prefix");
    }

    #[test]
    fn test_gid_rejects_short_value() {
        let d = validate_gid(&json!("gid:"), &path());
        assert!(d
            .iter()
            .next()
            .unwrap()
            .detail
            .contains("len between 22 and 254"));
    }

    #[test]
    fn test_gid_rejects_padded_base64() {
        // Standard (padded) alphabet must not pass.
        let d = validate_gid(&json!("gid:SGVsbG8gU3RyYXRvcyE="), &path());
        assert!(d
            .iter()
            .next()
            .unwrap()
            .detail
            .starts_with("expected to be a valid Raw URL Base64 string"));
    }

    #[test]
    fn test_name_accepts_valid() {
        assert!(validate_name(&json!("my-resource-01"), &path()).is_empty());
        assert!(validate_name(&json!("ab"), &path()).is_empty());
    }

    #[test]
    fn test_name_length_and_charset_fire_independently() {
        // One valid char: only the length rule fires.
        let d = validate_name(&json!("a"), &path());
        assert_eq!(d.len(), 1);
        // One invalid char: length and charset both fire.
        let d = validate_name(&json!("X"), &path());
        assert_eq!(d.len(), 2);
        let d = validate_name(&json!("9abc"), &path());
        assert_eq!(d.len(), 1);
        assert_eq!(d.iter().next().unwrap().summary, "Invalid name");
        let d = validate_name(&json!("abc-"), &path());
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_name_rejects_uppercase() {
        let d = validate_name(&json!("Abc"), &path());
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_yaml_validator() {
        assert!(validate_yaml(&json!("a: 1\nb:\n  - x\n"), &path()).is_empty());
        assert!(!validate_yaml(&json!("a: [unclosed"), &path()).is_empty());
    }

    #[test]
    fn test_json_validator() {
        assert!(validate_json(&json!(r#"{"a": 1}"#), &path()).is_empty());
        assert!(!validate_json(&json!(r#"{"a": "#), &path()).is_empty());
    }

    #[test]
    fn test_rfc3339_validator() {
        assert!(validate_rfc3339(&json!("2014-10-02T15:01:23.045123456Z"), &path()).is_empty());
        assert!(!validate_rfc3339(&json!("yesterday"), &path()).is_empty());
    }

    #[test]
    fn test_duration_validator() {
        assert!(validate_duration(&json!("1h30m"), &path()).is_empty());
        assert!(!validate_duration(&json!("soon"), &path()).is_empty());
    }

    #[test]
    fn test_pem_validator() {
        let pem = "-----BEGIN PUBLIC KEY-----\nMFkw...\n-----END PUBLIC KEY-----\n";
        assert!(validate_public_key_pem(&json!(pem), &path()).is_empty());
        assert!(!validate_public_key_pem(&json!("not a key"), &path()).is_empty());
    }
}
