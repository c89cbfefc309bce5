//! Diff suppression
//!
//! Predicates that decide whether a detected attribute difference is a real
//! change or a server-side artifact of defaulting and formatting. A parse
//! failure inside a predicate always resolves to "do not suppress", so the
//! operator is never left with a silently stale plan.

use serde_json::{Map, Value};

use crate::schema::common::{KID_KEY, NAME_KEY};

/// Signature shared by all suppression predicates.
pub type SuppressFn = fn(&DiffContext<'_>) -> bool;

/// Minimal context handed to a suppression predicate: the two values under
/// comparison plus read access to sibling attributes of the same resource.
pub struct DiffContext<'a> {
    pub key: &'a str,
    pub old: &'a str,
    pub new: &'a str,
    config: &'a Map<String, Value>,
    prior: &'a Map<String, Value>,
}

impl<'a> DiffContext<'a> {
    pub fn new(
        key: &'a str,
        old: &'a str,
        new: &'a str,
        config: &'a Map<String, Value>,
        prior: &'a Map<String, Value>,
    ) -> Self {
        Self {
            key,
            old,
            new,
            config,
            prior,
        }
    }

    /// Current value of a sibling attribute, falling back to the last applied
    /// state for attributes the configuration does not carry.
    pub fn sibling(&self, key: &str) -> &str {
        self.config
            .get(key)
            .or_else(|| self.prior.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// Suppress the change the server reports when it defaults a display name to
/// the resource name and the operator specified nothing.
pub fn suppress_display_name(ctx: &DiffContext<'_>) -> bool {
    ctx.key == crate::schema::common::DISPLAY_NAME_KEY
        && ctx.old == ctx.sibling(NAME_KEY)
        && ctx.new.is_empty()
}

/// Credential variant: the server assigns a display name equal to the key ID
/// when none was given.
pub fn suppress_credential_display_name(ctx: &DiffContext<'_>) -> bool {
    ctx.key == crate::schema::common::DISPLAY_NAME_KEY
        && ctx.old == ctx.sibling(KID_KEY)
        && ctx.new.is_empty()
}

/// Suppress when both sides are YAML documents with the same structure,
/// regardless of key order, whitespace, or formatting.
pub fn suppress_equivalent_yaml(ctx: &DiffContext<'_>) -> bool {
    let Ok(old) = serde_yaml::from_str::<Value>(ctx.old) else {
        return false;
    };
    let Ok(new) = serde_yaml::from_str::<Value>(ctx.new) else {
        return false;
    };
    old == new
}

/// Suppress when both sides are JSON documents with the same structure.
pub fn suppress_equivalent_json(ctx: &DiffContext<'_>) -> bool {
    let Ok(old) = serde_json::from_str::<Value>(ctx.old) else {
        return false;
    };
    let Ok(new) = serde_json::from_str::<Value>(ctx.new) else {
        return false;
    };
    old == new
}

/// Suppress when both sides are duration literals denoting the same duration,
/// e.g. `1h` and `60m`.
pub fn suppress_equivalent_duration(ctx: &DiffContext<'_>) -> bool {
    let Ok(old) = humantime::parse_duration(ctx.old) else {
        return false;
    };
    let Ok(new) = humantime::parse_duration(ctx.new) else {
        return false;
    };
    old == new
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn ctx_with<'a>(
        key: &'a str,
        old: &'a str,
        new: &'a str,
        config: &'a Map<String, Value>,
        prior: &'a Map<String, Value>,
    ) -> DiffContext<'a> {
        DiffContext::new(key, old, new, config, prior)
    }

    #[test]
    fn test_display_name_suppression_truth_table() {
        let config = obj(json!({"name": "abc"}));
        let prior = Map::new();

        // Server defaulted display name to name, operator left it unset.
        assert!(suppress_display_name(&ctx_with(
            "display_name", "abc", "", &config, &prior
        )));
        // Operator wants a different display name.
        assert!(!suppress_display_name(&ctx_with(
            "display_name", "abc", "something-else", &config, &prior
        )));
        // Server value does not match the name: a real remote change.
        assert!(!suppress_display_name(&ctx_with(
            "display_name", "jkl", "", &config, &prior
        )));
        // Different attribute entirely.
        assert!(!suppress_display_name(&ctx_with(
            "description", "abc", "", &config, &prior
        )));
    }

    #[test]
    fn test_credential_display_name_compares_kid() {
        let config = obj(json!({"kid": "key-123"}));
        let prior = Map::new();
        assert!(suppress_credential_display_name(&ctx_with(
            "display_name", "key-123", "", &config, &prior
        )));
        assert!(!suppress_credential_display_name(&ctx_with(
            "display_name", "other", "", &config, &prior
        )));
    }

    #[test]
    fn test_sibling_falls_back_to_prior_state() {
        let config = Map::new();
        let prior = obj(json!({"name": "abc"}));
        assert!(suppress_display_name(&ctx_with(
            "display_name", "abc", "", &config, &prior
        )));
    }

    #[test]
    fn test_yaml_suppression_ignores_formatting() {
        let config = Map::new();
        let prior = Map::new();
        let old = "a: 1\nb:\n  c: x\n";
        let new = "b: {c: x}\na: 1";
        assert!(suppress_equivalent_yaml(&ctx_with("cfg", old, new, &config, &prior)));

        let changed = "a: 2\nb:\n  c: x\n";
        assert!(!suppress_equivalent_yaml(&ctx_with(
            "cfg", old, changed, &config, &prior
        )));
    }

    #[test]
    fn test_yaml_suppression_fails_safe_on_parse_error() {
        let config = Map::new();
        let prior = Map::new();
        assert!(!suppress_equivalent_yaml(&ctx_with(
            "cfg", "a: [broken", "a: 1", &config, &prior
        )));
    }

    #[test]
    fn test_json_suppression() {
        let config = Map::new();
        let prior = Map::new();
        assert!(suppress_equivalent_json(&ctx_with(
            "policy",
            r#"{"a":1,"b":2}"#,
            r#"{ "b": 2, "a": 1 }"#,
            &config,
            &prior
        )));
        assert!(!suppress_equivalent_json(&ctx_with(
            "policy",
            r#"{"a":1}"#,
            r#"{"a":2}"#,
            &config,
            &prior
        )));
        assert!(!suppress_equivalent_json(&ctx_with(
            "policy",
            r#"{"a":1}"#,
            "not-json",
            &config,
            &prior
        )));
    }

    #[test]
    fn test_duration_suppression() {
        let config = Map::new();
        let prior = Map::new();
        assert!(suppress_equivalent_duration(&ctx_with(
            "rerun_interval", "1h", "60m", &config, &prior
        )));
        assert!(!suppress_equivalent_duration(&ctx_with(
            "rerun_interval", "1h", "61m", &config, &prior
        )));
        assert!(!suppress_equivalent_duration(&ctx_with(
            "rerun_interval", "1h", "garbage", &config, &prior
        )));
    }
}
