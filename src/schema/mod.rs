//! Declarative attribute schemas
//!
//! Per-resource-type descriptions of attributes: types, flags, validation
//! functions, and diff-suppression predicates. Schemas are composed from the
//! shared fragments in [`common`] plus resource-specific attributes, and are
//! consulted both at validation time (`validate`) and at plan time (`plan`).

pub mod common;

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::diag::{AttributePath, Diagnostic, Diagnostics};
use crate::diff::{DiffContext, SuppressFn};
use crate::validate::ValidateFn;

/// Wire type of an attribute value.
#[derive(Debug, Clone)]
pub enum AttributeType {
    String,
    Bool,
    Float,
    StringList,
    StringMap,
    /// List of nested objects described by their own schema.
    ObjectList(Schema),
}

/// A single validation rule attached to an attribute.
#[derive(Debug, Clone)]
pub enum Validator {
    /// Free-form validation function, e.g. [`crate::validate::validate_gid`].
    Func(ValidateFn),
    /// Value must be one of the listed strings.
    OneOf(&'static [&'static str]),
    /// String length must fall within the inclusive range.
    LenBetween(usize, usize),
    /// Numeric value must fall within the inclusive range.
    FloatBetween(f64, f64),
    /// String must not be empty.
    NotEmpty,
}

impl Validator {
    fn check(&self, value: &Value, path: &AttributePath) -> Diagnostics {
        match self {
            Validator::Func(f) => f(value, path),
            Validator::OneOf(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Diagnostics::new(),
                Some(s) => Diagnostic::error(format!(
                    "expected value to be one of [{}], got {s}",
                    allowed.join(", ")
                ))
                .with_path(path.clone())
                .into(),
                None => Diagnostic::error("expected type to be string")
                    .with_path(path.clone())
                    .into(),
            },
            Validator::LenBetween(min, max) => match value.as_str() {
                Some(s) => {
                    let len = s.chars().count();
                    if (*min..=*max).contains(&len) {
                        Diagnostics::new()
                    } else {
                        Diagnostic::error(format!(
                            "expected string length between {min} and {max}, got {len}"
                        ))
                        .with_path(path.clone())
                        .into()
                    }
                }
                None => Diagnostic::error("expected type to be string")
                    .with_path(path.clone())
                    .into(),
            },
            Validator::FloatBetween(min, max) => match value.as_f64() {
                Some(f) if f >= *min && f <= *max => Diagnostics::new(),
                Some(f) => Diagnostic::error(format!(
                    "expected value between {min} and {max}, got {f}"
                ))
                .with_path(path.clone())
                .into(),
                None => Diagnostic::error("expected type to be number")
                    .with_path(path.clone())
                    .into(),
            },
            Validator::NotEmpty => match value.as_str() {
                Some(s) if !s.is_empty() => Diagnostics::new(),
                Some(_) => Diagnostic::error("expected string to not be empty")
                    .with_path(path.clone())
                    .into(),
                None => Diagnostic::error("expected type to be string")
                    .with_path(path.clone())
                    .into(),
            },
        }
    }
}

/// Declarative description of one attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    key: &'static str,
    typ: AttributeType,
    required: bool,
    computed: bool,
    sensitive: bool,
    force_new: bool,
    default: Option<Value>,
    description: &'static str,
    validators: Vec<Validator>,
    elem_validators: Vec<Validator>,
    suppress: Option<SuppressFn>,
    exactly_one_of: &'static [&'static str],
    required_with: &'static [&'static str],
    min_items: usize,
    max_items: Option<usize>,
}

impl Attribute {
    fn new(key: &'static str, typ: AttributeType) -> Self {
        Self {
            key,
            typ,
            required: false,
            computed: false,
            sensitive: false,
            force_new: false,
            default: None,
            description: "",
            validators: Vec::new(),
            elem_validators: Vec::new(),
            suppress: None,
            exactly_one_of: &[],
            required_with: &[],
            min_items: 0,
            max_items: None,
        }
    }

    pub fn string(key: &'static str) -> Self {
        Self::new(key, AttributeType::String)
    }

    pub fn bool(key: &'static str) -> Self {
        Self::new(key, AttributeType::Bool)
    }

    pub fn float(key: &'static str) -> Self {
        Self::new(key, AttributeType::Float)
    }

    pub fn string_list(key: &'static str) -> Self {
        Self::new(key, AttributeType::StringList)
    }

    pub fn string_map(key: &'static str) -> Self {
        Self::new(key, AttributeType::StringMap)
    }

    pub fn object_list(key: &'static str, elem: Schema) -> Self {
        Self::new(key, AttributeType::ObjectList(elem))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn validate_each(mut self, validator: Validator) -> Self {
        self.elem_validators.push(validator);
        self
    }

    pub fn suppress(mut self, f: SuppressFn) -> Self {
        self.suppress = Some(f);
        self
    }

    pub fn exactly_one_of(mut self, keys: &'static [&'static str]) -> Self {
        self.exactly_one_of = keys;
        self
    }

    pub fn required_with(mut self, keys: &'static [&'static str]) -> Self {
        self.required_with = keys;
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = n;
        self
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = Some(n);
        self
    }

    /// Reuse a configurable fragment in a read-only position: server-assigned,
    /// no user input, so validation and suppression no longer apply.
    pub fn into_computed(mut self) -> Self {
        self.required = false;
        self.computed = true;
        self.force_new = false;
        self.default = None;
        self.validators.clear();
        self.elem_validators.clear();
        self.suppress = None;
        self.exactly_one_of = &[];
        self.required_with = &[];
        self.min_items = 0;
        self
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn attr_type(&self) -> &AttributeType {
        &self.typ
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_computed(&self) -> bool {
        self.computed
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn forces_new(&self) -> bool {
        self.force_new
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn type_matches(&self, value: &Value) -> bool {
        match &self.typ {
            AttributeType::String => value.is_string(),
            AttributeType::Bool => value.is_boolean(),
            AttributeType::Float => value.is_number(),
            AttributeType::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            AttributeType::StringMap => value
                .as_object()
                .is_some_and(|map| map.values().all(Value::is_string)),
            AttributeType::ObjectList(_) => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_object)),
        }
    }

    fn type_description(&self) -> &'static str {
        match &self.typ {
            AttributeType::String => "string",
            AttributeType::Bool => "bool",
            AttributeType::Float => "number",
            AttributeType::StringList => "list of strings",
            AttributeType::StringMap => "map of strings",
            AttributeType::ObjectList(_) => "list of objects",
        }
    }
}

/// Result of comparing the last applied state against the planned
/// configuration: the meaningfully-changed attributes, with server-side
/// defaulting artifacts suppressed.
#[derive(Debug, Default)]
pub struct Plan {
    changes: Vec<String>,
    replacements: Vec<String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changes(&self) -> &[String] {
        &self.changes
    }

    /// Changed attributes that cannot be updated in place.
    pub fn requires_replacement(&self) -> &[String] {
        &self.replacements
    }

    pub fn has_change(&self, key: &str) -> bool {
        self.changes.iter().any(|k| k == key)
    }
}

/// Ordered collection of attributes describing one resource type.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.key == key)
    }

    /// Validate a configuration against this schema. Pure and side-effect
    /// free; every violation is reported, not just the first.
    pub fn validate(&self, config: &Map<String, Value>) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for attr in &self.attributes {
            if attr.computed {
                continue;
            }
            let path = AttributePath::attr(attr.key);
            let value = config.get(attr.key).filter(|v| !v.is_null());

            let Some(value) = value else {
                if attr.required {
                    diags.push(
                        Diagnostic::error(format!("Missing required attribute {:?}", attr.key))
                            .with_path(path),
                    );
                }
                continue;
            };

            if !attr.type_matches(value) {
                diags.push(
                    Diagnostic::error(format!(
                        "expected {:?} to be a {}",
                        attr.key,
                        attr.type_description()
                    ))
                    .with_path(path),
                );
                continue;
            }

            for validator in &attr.validators {
                diags.extend(validator.check(value, &path));
            }

            match (&attr.typ, value) {
                (AttributeType::StringList, Value::Array(items)) => {
                    self.check_item_bounds(attr, items.len(), &path, &mut diags);
                    for (i, item) in items.iter().enumerate() {
                        let elem_path = path.clone().with_index(i);
                        for validator in &attr.elem_validators {
                            diags.extend(validator.check(item, &elem_path));
                        }
                    }
                }
                (AttributeType::ObjectList(elem_schema), Value::Array(items)) => {
                    self.check_item_bounds(attr, items.len(), &path, &mut diags);
                    for (i, item) in items.iter().enumerate() {
                        if let Value::Object(obj) = item {
                            for mut nested in elem_schema.validate(obj) {
                                let mut rebased = path.clone().with_index(i);
                                if !nested.attribute_path.is_empty() {
                                    rebased = rebased.with_attr(nested.attribute_path.to_string());
                                }
                                nested.attribute_path = rebased;
                                diags.push(nested);
                            }
                        }
                    }
                }
                _ => {}
            }

            for required in attr.required_with {
                if config.get(*required).filter(|v| !v.is_null()).is_none() {
                    diags.push(
                        Diagnostic::error(format!(
                            "{:?} requires {:?} to be set",
                            attr.key, required
                        ))
                        .with_path(path.clone()),
                    );
                }
            }
        }

        self.check_exactly_one_of(config, &mut diags);
        diags
    }

    fn check_item_bounds(
        &self,
        attr: &Attribute,
        len: usize,
        path: &AttributePath,
        diags: &mut Diagnostics,
    ) {
        if len < attr.min_items {
            diags.push(
                Diagnostic::error(format!(
                    "expected at least {} item(s) in {:?}, got {len}",
                    attr.min_items, attr.key
                ))
                .with_path(path.clone()),
            );
        }
        if let Some(max) = attr.max_items {
            if len > max {
                diags.push(
                    Diagnostic::error(format!(
                        "expected at most {max} item(s) in {:?}, got {len}",
                        attr.key
                    ))
                    .with_path(path.clone()),
                );
            }
        }
    }

    fn check_exactly_one_of(&self, config: &Map<String, Value>, diags: &mut Diagnostics) {
        let mut seen_groups: Vec<&'static [&'static str]> = Vec::new();
        for attr in &self.attributes {
            let group = attr.exactly_one_of;
            if group.is_empty() || seen_groups.contains(&group) {
                continue;
            }
            seen_groups.push(group);

            let present = group
                .iter()
                .filter(|k| config.get(**k).filter(|v| !v.is_null()).is_some())
                .count();
            if present != 1 {
                diags.push(
                    Diagnostic::error(format!(
                        "exactly one of [{}] must be set, found {present}",
                        group.join(", ")
                    ))
                    .with_path(AttributePath::attr(group[0])),
                );
            }
        }
    }

    /// Compute the set of meaningful changes between the last applied state
    /// and the planned configuration. Attribute-level suppression predicates
    /// run here, so a difference the server manufactured by defaulting never
    /// registers as a pending change.
    pub fn plan(&self, prior: &Map<String, Value>, config: &Map<String, Value>) -> Plan {
        let mut plan = Plan::default();

        for attr in &self.attributes {
            if attr.computed {
                continue;
            }
            let old = normalized(prior.get(attr.key));
            let new = config
                .get(attr.key)
                .filter(|v| !v.is_null())
                .or(attr.default.as_ref())
                .cloned()
                .unwrap_or(Value::Null);

            if old == new {
                continue;
            }

            if let Some(suppress) = attr.suppress {
                let old_s = stringify(&old);
                let new_s = stringify(&new);
                let ctx = DiffContext::new(attr.key, &old_s, &new_s, config, prior);
                if suppress(&ctx) {
                    continue;
                }
            }

            plan.changes.push(attr.key.to_string());
            if attr.force_new {
                plan.replacements.push(attr.key.to_string());
            }
        }

        plan
    }
}

fn normalized(value: Option<&Value>) -> Value {
    value.cloned().unwrap_or(Value::Null)
}

fn stringify(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::suppress_display_name;
    use crate::validate::validate_name;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn sample_schema() -> Schema {
        Schema::new(vec![
            Attribute::string("name")
                .required()
                .validate(Validator::Func(validate_name)),
            Attribute::string("display_name").suppress(suppress_display_name),
            Attribute::string("description").validate(Validator::LenBetween(0, 64)),
            Attribute::string("region")
                .force_new()
                .validate(Validator::OneOf(&["europe-west1", "us-east1"])),
            Attribute::bool("deletion_protection").default_value(json!(true)),
            Attribute::string("create_time").computed(),
        ])
    }

    #[test]
    fn test_validate_reports_all_problems_in_one_pass() {
        let schema = sample_schema();
        let config = obj(json!({
            "region": "mars-north1",
        }));
        let diags = schema.validate(&config);
        // Missing name + invalid region.
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_validate_accepts_good_config() {
        let schema = sample_schema();
        let config = obj(json!({
            "name": "my-space",
            "region": "europe-west1",
        }));
        assert!(schema.validate(&config).is_empty());
    }

    #[test]
    fn test_exactly_one_of() {
        let schema = Schema::new(vec![
            Attribute::string("public_key_jwk").exactly_one_of(&["public_key_jwk", "public_key_pem"]),
            Attribute::string("public_key_pem").exactly_one_of(&["public_key_jwk", "public_key_pem"]),
        ]);
        assert_eq!(schema.validate(&obj(json!({}))).len(), 1);
        assert!(schema
            .validate(&obj(json!({"public_key_jwk": "{}"})))
            .is_empty());
        assert_eq!(
            schema
                .validate(&obj(json!({"public_key_jwk": "{}", "public_key_pem": "x"})))
                .len(),
            1
        );
    }

    #[test]
    fn test_plan_suppresses_server_defaulted_display_name() {
        let schema = sample_schema();
        // Server round-tripped display_name equal to name; operator set nothing.
        let prior = obj(json!({
            "name": "acme",
            "display_name": "acme",
            "region": "europe-west1",
            "deletion_protection": true,
        }));
        let config = obj(json!({
            "name": "acme",
            "region": "europe-west1",
        }));
        let plan = schema.plan(&prior, &config);
        assert!(plan.is_empty(), "unexpected changes: {:?}", plan.changes());
    }

    #[test]
    fn test_plan_reports_real_display_name_change() {
        let schema = sample_schema();
        let prior = obj(json!({"name": "acme", "display_name": "acme"}));
        let config = obj(json!({"name": "acme", "display_name": "ACME Corp."}));
        let plan = schema.plan(&prior, &config);
        assert!(plan.has_change("display_name"));
    }

    #[test]
    fn test_plan_flags_force_new_attributes() {
        let schema = sample_schema();
        let prior = obj(json!({"name": "acme", "region": "europe-west1"}));
        let config = obj(json!({"name": "acme", "region": "us-east1"}));
        let plan = schema.plan(&prior, &config);
        assert_eq!(plan.requires_replacement(), ["region"]);
    }

    #[test]
    fn test_plan_applies_defaults() {
        let schema = sample_schema();
        let prior = obj(json!({"name": "acme", "deletion_protection": true}));
        let config = obj(json!({"name": "acme"}));
        assert!(schema.plan(&prior, &config).is_empty());
    }

    #[test]
    fn test_object_list_validation_attributes_nested_paths() {
        let elem = Schema::new(vec![
            Attribute::string("name").required(),
            Attribute::float("weight").validate(Validator::FloatBetween(0.0, 1.0)),
        ]);
        let schema = Schema::new(vec![Attribute::object_list("dimension", elem).min_items(1)]);
        let config = obj(json!({"dimension": [{"name": "origin", "weight": 2.5}]}));
        let diags = schema.validate(&config);
        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert!(diag.attribute_path.to_string().starts_with("dimension.0"));
    }
}
