//! Resource data
//!
//! The per-invocation attribute store handed to CRUD handlers by the hosting
//! framework: planned configuration values, the last applied state for change
//! tracking, the server-assigned identifier, and the operation deadline.
//!
//! Accessors are total functions: a missing or mistyped value yields the
//! type's zero value. A mismatch between the schema and the code writing
//! state is a programmer error surfaced through `set` diagnostics, never a
//! runtime failure path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::diag::{AttributePath, Diagnostic, Diagnostics};
use crate::schema::Schema;

/// Default per-operation deadline forwarded to every network call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4 * 60);

#[derive(Clone)]
pub struct ResourceData {
    id: String,
    schema: Arc<Schema>,
    state: Map<String, Value>,
    prior: Map<String, Value>,
    timeout: Duration,
}

impl ResourceData {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            id: String::new(),
            schema,
            state: Map::new(),
            prior: Map::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build from the planned configuration and the last applied state.
    pub fn from_parts(
        schema: Arc<Schema>,
        config: Map<String, Value>,
        prior: Map<String, Value>,
    ) -> Self {
        Self {
            id: String::new(),
            schema,
            state: config,
            prior,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Opaque server-assigned identifier, or the `name?location=gid:...`
    /// lookup form while an import is being resolved.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// True once the id has been cleared, signalling the host to drop the
    /// resource from local state.
    pub fn is_gone(&self) -> bool {
        self.id.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Raw value of an attribute, falling back to the schema default.
    pub fn get(&self, key: &str) -> Value {
        if let Some(v) = self.state.get(key) {
            if !v.is_null() {
                return v.clone();
            }
        }
        self.schema
            .get(key)
            .and_then(|a| a.default().cloned())
            .unwrap_or(Value::Null)
    }

    pub fn get_string(&self, key: &str) -> String {
        match self.get(key) {
            Value::String(s) => s,
            _ => String::new(),
        }
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).as_bool().unwrap_or(false)
    }

    pub fn get_f64(&self, key: &str) -> f64 {
        self.get(key).as_f64().unwrap_or(0.0)
    }

    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn get_string_map(&self, key: &str) -> HashMap<String, String> {
        match self.get(key) {
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(k, v)| match v {
                    Value::String(s) => Some((k, s)),
                    _ => None,
                })
                .collect(),
            _ => HashMap::new(),
        }
    }

    pub fn get_object_list(&self, key: &str) -> Vec<Map<String, Value>> {
        match self.get(key) {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(obj) => Some(obj),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True when the attribute value differs from the last applied state.
    pub fn has_change(&self, key: &str) -> bool {
        let old = self.prior.get(key).cloned().unwrap_or(Value::Null);
        let new = self.get(key);
        old != new
    }

    /// True when any attribute other than `except` changed.
    pub fn has_change_except(&self, except: &str) -> bool {
        self.schema
            .attributes()
            .iter()
            .filter(|a| !a.is_computed() && a.key() != except)
            .any(|a| self.has_change(a.key()))
    }

    /// Write an attribute into state. Unknown attributes and type mismatches
    /// are provider defects and accumulate plugin-error diagnostics.
    pub fn set(&mut self, diags: &mut Diagnostics, key: &str, value: impl Into<Value>) {
        let value = value.into();

        let Some(attr) = self.schema.get(key) else {
            diags.push(
                Diagnostic::plugin_error(format!("Cannot add attribute: unknown key {key:?}"))
                    .with_path(AttributePath::attr(key)),
            );
            return;
        };

        if value.is_null() {
            self.state.insert(key.to_string(), Value::Null);
            return;
        }

        if !type_compatible(attr.attr_type(), &value) {
            diags.push(
                Diagnostic::plugin_error(format!(
                    "Cannot add attribute: value of {key:?} has unexpected type"
                ))
                .with_path(AttributePath::attr(key)),
            );
            return;
        }

        self.state.insert(key.to_string(), value);
    }

    /// Snapshot of the current attribute values.
    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    /// Last applied state, as recorded by the host after the previous apply.
    pub fn prior(&self) -> &Map<String, Value> {
        &self.prior
    }

    /// Promote the current values to "last applied", as the host does after a
    /// successful apply. Schema defaults are materialized the way the host
    /// records effective values, so an untouched defaulted attribute does not
    /// read as a change on the next plan. Primarily useful for tests and
    /// in-process drivers.
    pub fn commit(&mut self) {
        let schema = Arc::clone(&self.schema);
        let mut snapshot = self.state.clone();
        for attr in schema.attributes() {
            if snapshot.get(attr.key()).filter(|v| !v.is_null()).is_none() {
                if let Some(default) = attr.default() {
                    snapshot.insert(attr.key().to_string(), default.clone());
                }
            }
        }
        self.prior = snapshot;
    }
}

fn type_compatible(typ: &crate::schema::AttributeType, value: &Value) -> bool {
    use crate::schema::AttributeType;
    match typ {
        AttributeType::String => value.is_string(),
        AttributeType::Bool => value.is_boolean(),
        AttributeType::Float => value.is_number(),
        AttributeType::StringList => value.is_array(),
        AttributeType::StringMap => value.is_object(),
        AttributeType::ObjectList(_) => value.is_array(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Attribute::string("name").required(),
            Attribute::string("display_name"),
            Attribute::bool("deletion_protection").default_value(json!(true)),
            Attribute::string("create_time").computed(),
        ]))
    }

    fn data_with(config: Value, prior: Value) -> ResourceData {
        let to_map = |v: Value| match v {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        ResourceData::from_parts(schema(), to_map(config), to_map(prior))
    }

    #[test]
    fn test_get_falls_back_to_default() {
        let data = data_with(json!({"name": "acme"}), json!({}));
        assert!(data.get_bool("deletion_protection"));
        assert_eq!(data.get_string("display_name"), "");
    }

    #[test]
    fn test_has_change() {
        let data = data_with(
            json!({"name": "acme", "display_name": "new"}),
            json!({"name": "acme", "display_name": "old"}),
        );
        assert!(data.has_change("display_name"));
        assert!(!data.has_change("name"));
    }

    #[test]
    fn test_has_change_except_ignores_named_key() {
        let data = data_with(
            json!({"name": "acme", "deletion_protection": false}),
            json!({"name": "acme", "deletion_protection": true}),
        );
        assert!(data.has_change("deletion_protection"));
        assert!(!data.has_change_except("deletion_protection"));
    }

    #[test]
    fn test_set_rejects_unknown_attribute() {
        let mut data = data_with(json!({}), json!({}));
        let mut diags = Diagnostics::new();
        data.set(&mut diags, "nope", json!("x"));
        assert!(diags.has_error());
    }

    #[test]
    fn test_set_rejects_mistyped_value() {
        let mut data = data_with(json!({}), json!({}));
        let mut diags = Diagnostics::new();
        data.set(&mut diags, "display_name", json!(13));
        assert!(diags.has_error());
        data.set(&mut diags, "display_name", json!("fine"));
        assert_eq!(diags.len(), 1);
        assert_eq!(data.get_string("display_name"), "fine");
    }

    #[test]
    fn test_commit_materializes_defaults() {
        let mut data = data_with(json!({"name": "acme"}), json!({}));
        data.commit();
        assert_eq!(
            data.prior().get("deletion_protection"),
            Some(&Value::Bool(true))
        );
        // Committed defaults no longer read as changes.
        assert!(!data.has_change("deletion_protection"));
    }

    #[test]
    fn test_clearing_id_marks_resource_gone() {
        let mut data = data_with(json!({}), json!({})).with_id("gid:AAAAAAAAAAAAAAAAAAAAAA");
        assert!(!data.is_gone());
        data.set_id("");
        assert!(data.is_gone());
    }
}
