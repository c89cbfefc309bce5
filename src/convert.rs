//! Attribute <-> wire conversion helpers
//!
//! The nullable-field adapters that decide what a create or update request
//! carries, and the flatten helpers that turn API responses back into
//! attribute values. Update requests are sparse: a field the operator did
//! not touch is omitted entirely, while an explicit clear is sent as an
//! empty value.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::diag::{Diagnostic, Diagnostics};
use crate::state::ResourceData;

/// Optional field for a create request: `None` when the value is the zero
/// value. On creation "unset" and "empty" are indistinguishable from the
/// configuration alone.
pub fn optional_string(data: &ResourceData, key: &str) -> Option<String> {
    let v = data.get_string(key);
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// Optional field for an update request: `None` when the attribute did not
/// change since the last apply (no update signal), otherwise the new value -
/// including `Some("")` when the operator explicitly cleared the field.
pub fn update_optional_string(data: &ResourceData, key: &str) -> Option<String> {
    if !data.has_change(key) {
        return None;
    }
    Some(data.get_string(key))
}

/// Changed-list adapter for update requests: `None` when untouched.
pub fn update_optional_list(data: &ResourceData, key: &str) -> Option<Vec<String>> {
    if !data.has_change(key) {
        return None;
    }
    Some(data.get_string_list(key))
}

/// Response field into attribute state, collapsing empty to unset.
pub fn flatten_optional_string(value: Option<String>) -> Value {
    match value {
        Some(s) if !s.is_empty() => Value::String(s),
        _ => Value::Null,
    }
}

pub fn flatten_optional_list(values: Vec<String>) -> Value {
    if values.is_empty() {
        Value::Null
    } else {
        Value::Array(values.into_iter().map(Value::String).collect())
    }
}

/// Server timestamp into the RFC3339 state representation. Missing
/// timestamps flatten to unset rather than the epoch.
pub fn flatten_time(value: Option<DateTime<Utc>>) -> Value {
    match value {
        Some(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        None => Value::Null,
    }
}

/// Map a list of human-facing enum values into their wire form. Unknown
/// values were already rejected by schema validation, so hitting one here is
/// a provider defect.
pub fn enum_list_to_wire<E, F>(
    diags: &mut Diagnostics,
    values: &[String],
    from_config: F,
) -> Vec<String>
where
    E: Copy + WireEnum,
    F: Fn(&str) -> Option<E>,
{
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        match from_config(v) {
            Some(e) => out.push(e.as_wire().to_string()),
            None => diags.push(Diagnostic::plugin_error(format!(
                "unsupported enum value {v:?}"
            ))),
        }
    }
    out
}

/// Map wire enum values round-tripped from the server back into their
/// human-facing form. An unknown wire value is a provider defect: the server
/// speaks a newer dialect than this build understands.
pub fn enum_list_from_wire<E, F>(
    diags: &mut Diagnostics,
    values: &[String],
    from_wire: F,
) -> Vec<String>
where
    E: Copy + WireEnum,
    F: Fn(&str) -> Option<E>,
{
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        match from_wire(v) {
            Some(e) => out.push(e.as_config().to_string()),
            None => diags.push(Diagnostic::plugin_error(format!(
                "unsupported enum value {v:?} received from server"
            ))),
        }
    }
    out
}

/// A wire-level enumeration with a single definition of both serialization
/// directions, so the human-facing form and the wire form cannot drift.
pub trait WireEnum: Sized {
    /// Human-facing value used in configuration files.
    fn as_config(&self) -> &'static str;
    /// Wire value used by the Config API.
    fn as_wire(&self) -> &'static str;
    fn from_config(s: &str) -> Option<Self>;
    fn from_wire(s: &str) -> Option<Self>;
}

/// Define a [`WireEnum`] with paired config and wire spellings.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => ($config:literal, $wire:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $($variant,)+
        }

        impl $name {
            /// All human-facing values, for schema `OneOf` validators.
            pub const ALL: &'static [&'static str] = &[$($config,)+];
        }

        impl $crate::convert::WireEnum for $name {
            fn as_config(&self) -> &'static str {
                match self {
                    $(Self::$variant => $config,)+
                }
            }

            fn as_wire(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }

            fn from_config(s: &str) -> Option<Self> {
                match s {
                    $($config => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn from_wire(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

pub(crate) use wire_enum;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::{json, Map};
    use std::sync::Arc;

    fn data(config: Value, prior: Value) -> ResourceData {
        let to_map = |v: Value| match v {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        let schema = Arc::new(Schema::new(vec![
            Attribute::string("name"),
            Attribute::string("display_name"),
            Attribute::string_list("scopes"),
        ]));
        ResourceData::from_parts(schema, to_map(config), to_map(prior))
    }

    #[test]
    fn test_optional_string_on_create() {
        let d = data(json!({"name": "acme", "display_name": ""}), json!({}));
        assert_eq!(optional_string(&d, "name").as_deref(), Some("acme"));
        assert_eq!(optional_string(&d, "display_name"), None);
    }

    #[test]
    fn test_update_optional_string_unchanged_sends_nothing() {
        let d = data(
            json!({"display_name": "same"}),
            json!({"display_name": "same"}),
        );
        assert_eq!(update_optional_string(&d, "display_name"), None);
    }

    #[test]
    fn test_update_optional_string_change_sends_value() {
        let d = data(
            json!({"display_name": "new"}),
            json!({"display_name": "old"}),
        );
        assert_eq!(update_optional_string(&d, "display_name").as_deref(), Some("new"));
    }

    #[test]
    fn test_update_optional_string_clear_sends_explicit_empty() {
        let d = data(json!({}), json!({"display_name": "old"}));
        assert_eq!(update_optional_string(&d, "display_name").as_deref(), Some(""));
    }

    #[test]
    fn test_flatten_helpers_collapse_empty() {
        assert_eq!(flatten_optional_string(Some(String::new())), Value::Null);
        assert_eq!(
            flatten_optional_string(Some("x".into())),
            Value::String("x".into())
        );
        assert_eq!(flatten_optional_list(vec![]), Value::Null);
        assert_eq!(flatten_time(None), Value::Null);
    }

    wire_enum! {
        enum Fruit {
            Apple => ("apple", "FRUIT_APPLE"),
            Pear => ("pear", "FRUIT_PEAR"),
        }
    }

    #[test]
    fn test_wire_enum_round_trip() {
        assert_eq!(Fruit::from_config("apple"), Some(Fruit::Apple));
        assert_eq!(Fruit::Apple.as_wire(), "FRUIT_APPLE");
        assert_eq!(Fruit::from_wire("FRUIT_PEAR"), Some(Fruit::Pear));
        assert_eq!(Fruit::Pear.as_config(), "pear");
        assert_eq!(Fruit::ALL, ["apple", "pear"]);
    }

    #[test]
    fn test_enum_list_mapping_flags_unknown_values() {
        let mut diags = Diagnostics::new();
        let wire = enum_list_to_wire(&mut diags, &["apple".into()], Fruit::from_config);
        assert_eq!(wire, ["FRUIT_APPLE"]);
        assert!(diags.is_empty());

        let back = enum_list_from_wire(
            &mut diags,
            &["FRUIT_APPLE".into(), "FRUIT_MANGO".into()],
            Fruit::from_wire,
        );
        assert_eq!(back, ["apple"]);
        assert!(diags.has_error());
    }
}
