//! Shared schema fragments
//!
//! Attribute keys and reusable attribute definitions composed into every
//! resource schema: identifiers, naming, timestamps, deletion protection,
//! and the application-space sizing fields.

use serde_json::json;

use crate::diff::suppress_display_name;
use crate::schema::{Attribute, Validator};
use crate::validate::{validate_gid, validate_name, validate_rfc3339};

pub const NAME_KEY: &str = "name";
pub const DISPLAY_NAME_KEY: &str = "display_name";
pub const DESCRIPTION_KEY: &str = "description";
pub const LOCATION_KEY: &str = "location";
pub const CUSTOMER_ID_KEY: &str = "customer_id";
pub const APP_SPACE_ID_KEY: &str = "app_space_id";
pub const APPLICATION_ID_KEY: &str = "application_id";
pub const APP_AGENT_ID_KEY: &str = "app_agent_id";
pub const TENANT_ID_KEY: &str = "tenant_id";
pub const SERVICE_ACCOUNT_ID_KEY: &str = "service_account_id";
pub const CREATE_TIME_KEY: &str = "create_time";
pub const UPDATE_TIME_KEY: &str = "update_time";
pub const DELETION_PROTECTION_KEY: &str = "deletion_protection";
pub const FILTER_KEY: &str = "filter";
pub const REGION_KEY: &str = "region";
pub const IKG_SIZE_KEY: &str = "ikg_size";
pub const REPLICA_REGION_KEY: &str = "replica_region";
pub const API_PERMISSIONS_KEY: &str = "api_permissions";
pub const KID_KEY: &str = "kid";
pub const EXPIRE_TIME_KEY: &str = "expire_time";

const LOCATION_DESCRIPTION: &str = "Identifier of Location, where to create resource";
const CUSTOMER_ID_DESCRIPTION: &str = "Identifier of Customer";
const APP_SPACE_ID_DESCRIPTION: &str = "Identifier of Application Space";
const APPLICATION_ID_DESCRIPTION: &str = "Identifier of Application";
const APP_AGENT_ID_DESCRIPTION: &str = "Identifier of Application Agent";
const SERVICE_ACCOUNT_ID_DESCRIPTION: &str = "Identifier of Service Account";

pub fn name() -> Attribute {
    Attribute::string(NAME_KEY)
        .required()
        .force_new()
        .validate(Validator::Func(validate_name))
        .describe(
            "Unique client assigned immutable identifier. \
             Can not be updated without creating a new resource.",
        )
}

pub fn display_name() -> Attribute {
    Attribute::string(DISPLAY_NAME_KEY)
        .suppress(suppress_display_name)
        .describe("The display name for the instance. Can be updated without creating a new resource.")
}

pub fn description() -> Attribute {
    Attribute::string(DESCRIPTION_KEY)
        .validate(Validator::LenBetween(0, 65000))
        .describe("Your own description of the resource. Must be less than or equal to 65000 UTF-8 bytes.")
}

fn base_id(key: &'static str, description: &'static str) -> Attribute {
    Attribute::string(key)
        .required()
        .validate(Validator::Func(validate_gid))
        .describe(description)
}

pub fn location() -> Attribute {
    base_id(LOCATION_KEY, LOCATION_DESCRIPTION).force_new()
}

pub fn customer_id() -> Attribute {
    base_id(CUSTOMER_ID_KEY, CUSTOMER_ID_DESCRIPTION)
}

pub fn app_space_id() -> Attribute {
    base_id(APP_SPACE_ID_KEY, APP_SPACE_ID_DESCRIPTION)
}

pub fn application_id() -> Attribute {
    base_id(APPLICATION_ID_KEY, APPLICATION_ID_DESCRIPTION)
}

pub fn app_agent_id() -> Attribute {
    base_id(APP_AGENT_ID_KEY, APP_AGENT_ID_DESCRIPTION)
}

pub fn service_account_id() -> Attribute {
    base_id(SERVICE_ACCOUNT_ID_KEY, SERVICE_ACCOUNT_ID_DESCRIPTION)
}

pub fn create_time() -> Attribute {
    Attribute::string(CREATE_TIME_KEY).computed().describe(
        "Timestamp when the Resource was created. Assigned by the server. \
         A timestamp in RFC3339 UTC \"Zulu\" format, accurate to nanoseconds. \
         Example: \"2014-10-02T15:01:23.045123456Z\".",
    )
}

pub fn update_time() -> Attribute {
    Attribute::string(UPDATE_TIME_KEY).computed().describe(
        "Timestamp when the Resource was last updated. Assigned by the server. \
         A timestamp in RFC3339 UTC \"Zulu\" format, accurate to nanoseconds. \
         Example: \"2014-10-02T15:01:23.045123456Z\".",
    )
}

pub fn deletion_protection() -> Attribute {
    Attribute::bool(DELETION_PROTECTION_KEY)
        .default_value(json!(true))
        .describe(
            "Whether or not to allow the host to destroy the instance. \
             Unless this field is set to false in state, a destroy or an apply \
             that would delete the instance will fail.",
        )
}

pub fn expire_time() -> Attribute {
    Attribute::string(EXPIRE_TIME_KEY)
        .force_new()
        .validate(Validator::Func(validate_rfc3339))
        .describe("Optional RFC3339 timestamp after which the credential is no longer valid.")
}

pub fn exact_name_filter() -> Attribute {
    Attribute::string_list(FILTER_KEY)
        .required()
        .min_items(1)
        .validate_each(Validator::Func(validate_name))
        .describe("Filter resources based on given names, using exact name match strategy.")
}

pub const REGIONS: &[&str] = &["europe-west1", "us-east1"];
pub const REPLICA_REGIONS: &[&str] = &["europe-west1", "us-east1", "us-west1"];
pub const IKG_SIZES: &[&str] = &[
    "2GB", "4GB", "8GB", "16GB", "32GB", "64GB", "128GB", "192GB", "256GB", "384GB", "512GB",
];

pub fn region() -> Attribute {
    Attribute::string(REGION_KEY)
        .required()
        .force_new()
        .validate(Validator::OneOf(REGIONS))
        .describe("Region where the application space is located. Valid values are: europe-west1, us-east1.")
}

pub fn ikg_size() -> Attribute {
    Attribute::string(IKG_SIZE_KEY)
        .force_new()
        .default_value(json!("2GB"))
        .validate(Validator::OneOf(IKG_SIZES))
        .describe(
            "Knowledge-graph size that will be allocated, which corresponds also to the number \
             of CPU nodes (default 2GB).",
        )
}

pub fn replica_region() -> Attribute {
    Attribute::string(REPLICA_REGION_KEY)
        .force_new()
        .validate(Validator::OneOf(REPLICA_REGIONS))
        .describe(
            "Replica region specifies where the replica knowledge graph is created. \
             Replica must be a different region than the master, but on the same continent.",
        )
}

pub const API_PERMISSIONS: &[&str] = &[
    "Authorization",
    "Capture",
    "EntityMatching",
    "GraphRead",
    "TrustedDataAccess",
];

pub fn api_permissions() -> Attribute {
    Attribute::string_list(API_PERMISSIONS_KEY)
        .required()
        .validate_each(Validator::OneOf(API_PERMISSIONS))
        .describe(
            "List of API permissions for the agent: Authorization, Capture, EntityMatching, \
             GraphRead and TrustedDataAccess.",
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    #[test]
    fn test_into_computed_strips_user_input_rules() {
        let attr = customer_id().into_computed();
        assert!(attr.is_computed());
        assert!(!attr.is_required());

        // A schema with only computed fields accepts an empty config.
        let schema = crate::schema::Schema::new(vec![attr, create_time()]);
        let diags = schema.validate(&Map::<String, Value>::new());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_deletion_protection_defaults_on() {
        let attr = deletion_protection();
        assert_eq!(attr.default(), Some(&Value::Bool(true)));
    }
}
