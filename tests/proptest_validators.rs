//! Property-based tests using proptest
//!
//! These verify the validators, diff suppressors, and optional-field
//! adapters against randomized inputs: every value matching the documented
//! grammar is accepted, every single-rule mutation is rejected, and
//! structural equivalence is insensitive to formatting.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use stratoform::convert::{optional_string, update_optional_string};
use stratoform::diag::AttributePath;
use stratoform::diff::{
    suppress_equivalent_duration, suppress_equivalent_json, suppress_equivalent_yaml, DiffContext,
};
use stratoform::schema::{Attribute, Schema};
use stratoform::state::ResourceData;
use stratoform::validate::{validate_gid, validate_name};

fn path() -> AttributePath {
    AttributePath::attr("value")
}

/// Names: lowercase start, letters/digits/hyphens, letter-or-digit end.
fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,60}[a-z0-9]"
}

/// GID bodies in whole base64 quanta, so every sample decodes cleanly.
fn arb_gid_body() -> impl Strategy<Value = String> {
    "(?:[A-Za-z0-9_-]{4}){5,20}"
}

fn empty_ctx_maps() -> (Map<String, Value>, Map<String, Value>) {
    (Map::new(), Map::new())
}

proptest! {
    #[test]
    fn prop_valid_names_are_accepted(name in arb_name()) {
        let diags = validate_name(&json!(name), &path());
        prop_assert!(diags.is_empty(), "rejected {name:?}: {diags:?}");
    }

    #[test]
    fn prop_uppercase_prefix_is_rejected(name in arb_name()) {
        let bad = format!("X{name}");
        prop_assert!(!validate_name(&json!(bad), &path()).is_empty());
    }

    #[test]
    fn prop_trailing_hyphen_is_rejected(name in arb_name()) {
        let bad = format!("{name}-");
        prop_assert!(!validate_name(&json!(bad), &path()).is_empty());
    }

    #[test]
    fn prop_valid_gids_are_accepted(body in arb_gid_body()) {
        let gid = format!("gid:{body}");
        let diags = validate_gid(&json!(gid), &path());
        prop_assert!(diags.is_empty(), "rejected {gid:?}: {diags:?}");
    }

    #[test]
    fn prop_gid_without_prefix_is_rejected(body in arb_gid_body()) {
        let diags = validate_gid(&json!(body), &path());
        prop_assert_eq!(diags.len(), 1);
        prop_assert!(diags.iter().next().unwrap().detail.contains("prefix"));
    }

    #[test]
    fn prop_gid_with_standard_alphabet_is_rejected(body in arb_gid_body()) {
        // '+' belongs to the standard alphabet, not the URL-safe one.
        let corrupted = format!("gid:+{}", &body[1..]);
        let diags = validate_gid(&json!(corrupted), &path());
        prop_assert_eq!(diags.len(), 1);
        prop_assert!(diags.iter().next().unwrap().detail.contains("Base64"));
    }

    #[test]
    fn prop_short_gid_is_rejected(body in "[A-Za-z0-9_-]{1,17}") {
        let gid = format!("gid:{body}");
        let diags = validate_gid(&json!(gid), &path());
        prop_assert_eq!(diags.len(), 1);
        prop_assert!(diags.iter().next().unwrap().detail.contains("len between"));
    }

    #[test]
    fn prop_yaml_suppression_ignores_key_order(
        entries in prop::collection::btree_map("[a-z]{1,8}", 0i64..1000, 1..6)
    ) {
        let forward = to_yaml(&entries, false);
        let reversed = to_yaml(&entries, true);
        let (config, prior) = empty_ctx_maps();
        let ctx = DiffContext::new("cfg", &forward, &reversed, &config, &prior);
        prop_assert!(suppress_equivalent_yaml(&ctx));

        // The JSON spelling of the same document is also equivalent YAML.
        let as_json = serde_json::to_string(&entries).unwrap();
        let ctx = DiffContext::new("cfg", &forward, &as_json, &config, &prior);
        prop_assert!(suppress_equivalent_yaml(&ctx));
    }

    #[test]
    fn prop_yaml_suppression_detects_value_changes(
        entries in prop::collection::btree_map("[a-z]{1,8}", 0i64..1000, 1..6)
    ) {
        let forward = to_yaml(&entries, false);
        let mut changed = entries.clone();
        let first_key = changed.keys().next().cloned();
        if let Some(key) = first_key {
            let bumped = changed[&key] + 1;
            changed.insert(key, bumped);
        }
        let (config, prior) = empty_ctx_maps();
        let ctx_text = to_yaml(&changed, false);
        let ctx = DiffContext::new("cfg", &forward, &ctx_text, &config, &prior);
        prop_assert!(!suppress_equivalent_yaml(&ctx));
    }

    #[test]
    fn prop_json_suppression_ignores_whitespace(
        entries in prop::collection::btree_map("[a-z]{1,8}", 0i64..1000, 1..6)
    ) {
        let compact = serde_json::to_string(&entries).unwrap();
        let pretty = serde_json::to_string_pretty(&entries).unwrap();
        let (config, prior) = empty_ctx_maps();
        let ctx = DiffContext::new("policy", &compact, &pretty, &config, &prior);
        prop_assert!(suppress_equivalent_json(&ctx));
    }

    #[test]
    fn prop_equal_durations_suppress(hours in 1u64..100) {
        let (config, prior) = empty_ctx_maps();
        let old = format!("{hours}h");
        let new = format!("{}m", hours * 60);
        let ctx = DiffContext::new("rerun_interval", &old, &new, &config, &prior);
        prop_assert!(suppress_equivalent_duration(&ctx));

        let off_by_one = format!("{}m", hours * 60 + 1);
        let ctx = DiffContext::new("rerun_interval", &old, &off_by_one, &config, &prior);
        prop_assert!(!suppress_equivalent_duration(&ctx));
    }

    #[test]
    fn prop_update_adapter_signals_only_real_changes(
        old in arb_name(),
        new in arb_name(),
    ) {
        let data = data_with("display_name", &new, &old);
        let signal = update_optional_string(&data, "display_name");
        if old == new {
            prop_assert_eq!(signal, None);
        } else {
            prop_assert_eq!(signal, Some(new));
        }
    }

    #[test]
    fn prop_create_adapter_drops_zero_values(value in prop::option::of(arb_name())) {
        let current = value.clone().unwrap_or_default();
        let data = data_with("display_name", &current, "");
        prop_assert_eq!(optional_string(&data, "display_name"), value.filter(|v| !v.is_empty()));
    }
}

#[test]
fn test_explicit_clear_sends_empty_signal() {
    let data = data_with("display_name", "", "previous");
    assert_eq!(
        update_optional_string(&data, "display_name").as_deref(),
        Some("")
    );
}

fn to_yaml(entries: &BTreeMap<String, i64>, reversed: bool) -> String {
    let mut out = String::new();
    let pairs: Vec<_> = if reversed {
        entries.iter().rev().collect()
    } else {
        entries.iter().collect()
    };
    for (key, value) in pairs {
        out.push_str(&format!("{key}: {value}\n"));
    }
    out
}

fn data_with(key: &'static str, current: &str, prior: &str) -> ResourceData {
    let schema = Arc::new(Schema::new(vec![Attribute::string(key)]));
    let mut config = Map::new();
    let mut prior_map = Map::new();
    if !current.is_empty() {
        config.insert(key.to_string(), json!(current));
    }
    if !prior.is_empty() {
        prior_map.insert(key.to_string(), json!(prior));
    }
    ResourceData::from_parts(schema, config, prior_map)
}
