//! Authorization policy resource
//!
//! The policy document is a JSON blob compared structurally, so reordered
//! keys or reformatted whitespace never show up as a pending change.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::api::models::{
    AuthorizationPolicyResponse, CreateAuthorizationPolicyRequest,
    UpdateAuthorizationPolicyRequest,
};
use crate::api::ConfigClient;
use crate::convert::{
    enum_list_from_wire, flatten_optional_list, flatten_optional_string, flatten_time,
    optional_string, update_optional_list, update_optional_string, wire_enum, WireEnum,
};
use crate::diag::{Diagnostic, Diagnostics};
use crate::diff::suppress_equivalent_json;
use crate::resources::{
    api_result, build_read_path, read_result, set_location_from, ManagedResource,
};
use crate::schema::common::{
    self, APP_SPACE_ID_KEY, CREATE_TIME_KEY, CUSTOMER_ID_KEY, DESCRIPTION_KEY, DISPLAY_NAME_KEY,
    NAME_KEY, UPDATE_TIME_KEY,
};
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;
use crate::validate::validate_json;

const RESOURCE_PATH: &str = "/authorization-policies";

pub const POLICY_KEY: &str = "policy";
pub const STATUS_KEY: &str = "status";
pub const TAGS_KEY: &str = "tags";

wire_enum! {
    /// Lifecycle status of a policy.
    pub enum PolicyStatus {
        Active => ("active", "STATUS_ACTIVE"),
        Inactive => ("inactive", "STATUS_INACTIVE"),
        Draft => ("draft", "STATUS_DRAFT"),
    }
}

pub struct AuthorizationPolicyResource;

fn resource_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                common::location(),
                common::customer_id().into_computed(),
                common::app_space_id().into_computed(),
                common::name(),
                common::display_name(),
                common::description(),
                Attribute::string(POLICY_KEY)
                    .required()
                    .validate(Validator::Func(validate_json))
                    .suppress(suppress_equivalent_json)
                    .describe("Policy document as JSON. Compared structurally, not textually."),
                Attribute::string(STATUS_KEY)
                    .required()
                    .validate(Validator::OneOf(PolicyStatus::ALL))
                    .describe("Status of the policy: active, inactive or draft."),
                Attribute::string_list(TAGS_KEY)
                    .describe("Free-form tags used to group policies."),
                common::create_time(),
                common::update_time(),
            ]))
        })
        .clone()
}

fn status_to_wire(diags: &mut Diagnostics, value: &str) -> String {
    match PolicyStatus::from_config(value) {
        Some(status) => status.as_wire().to_string(),
        None => {
            diags.push(Diagnostic::plugin_error(format!(
                "unsupported policy status {value:?}"
            )));
            String::new()
        }
    }
}

fn flatten(diags: &mut Diagnostics, data: &mut ResourceData, resp: AuthorizationPolicyResponse) {
    data.set_id(resp.id);
    data.set(
        diags,
        CUSTOMER_ID_KEY,
        flatten_optional_string(resp.customer_id.clone()),
    );
    data.set(
        diags,
        APP_SPACE_ID_KEY,
        flatten_optional_string(resp.app_space_id.clone()),
    );
    set_location_from(
        diags,
        data,
        resp.customer_id.as_deref(),
        resp.app_space_id.as_deref(),
    );
    data.set(diags, NAME_KEY, resp.name);
    data.set(
        diags,
        DISPLAY_NAME_KEY,
        flatten_optional_string(resp.display_name),
    );
    data.set(
        diags,
        DESCRIPTION_KEY,
        flatten_optional_string(resp.description),
    );
    data.set(diags, POLICY_KEY, flatten_optional_string(resp.policy));
    if let Some(status) = resp.status {
        let statuses = enum_list_from_wire(diags, &[status], PolicyStatus::from_wire);
        if let Some(status) = statuses.into_iter().next() {
            data.set(diags, STATUS_KEY, status);
        }
    }
    data.set(diags, TAGS_KEY, flatten_optional_list(resp.tags));
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    data.set(diags, UPDATE_TIME_KEY, flatten_time(resp.update_time));
}

#[async_trait]
impl ManagedResource for AuthorizationPolicyResource {
    fn type_name(&self) -> &'static str {
        "stratos_authorization_policy"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = CreateAuthorizationPolicyRequest {
            location: data.get_string(common::LOCATION_KEY),
            name: data.get_string(NAME_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            description: optional_string(data, DESCRIPTION_KEY),
            policy: data.get_string(POLICY_KEY),
            status: status_to_wire(&mut d, &data.get_string(STATUS_KEY)),
            tags: data.get_string_list(TAGS_KEY),
        };
        if d.has_error() {
            return d;
        }

        let result = client
            .post::<_, AuthorizationPolicyResponse>(RESOURCE_PATH, &req, data.timeout())
            .await;
        let Some(resp) = api_result(&mut d, result) else {
            return d;
        };
        data.set_id(&resp.id);
        client.record_bookmark(resp.bookmark.as_deref());

        d.extend(self.read(client, data).await);
        d
    }

    async fn read(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let path = build_read_path(RESOURCE_PATH, data);
        let result = client
            .get::<AuthorizationPolicyResponse>(&path, data.timeout())
            .await;
        let Some(resp) = read_result(&mut d, data, result) else {
            return d;
        };
        flatten(&mut d, data, resp);
        d
    }

    async fn update(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let status = update_optional_string(data, STATUS_KEY)
            .map(|s| status_to_wire(&mut d, &s));
        if d.has_error() {
            return d;
        }

        let req = UpdateAuthorizationPolicyRequest {
            display_name: update_optional_string(data, DISPLAY_NAME_KEY),
            description: update_optional_string(data, DESCRIPTION_KEY),
            policy: update_optional_string(data, POLICY_KEY),
            status,
            tags: update_optional_list(data, TAGS_KEY),
        };
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        let result = client
            .put::<_, AuthorizationPolicyResponse>(&path, &req, data.timeout())
            .await;
        let Some(resp) = api_result(&mut d, result) else {
            return d;
        };
        client.record_bookmark(resp.bookmark.as_deref());

        d.extend(self.read(client, data).await);
        d
    }

    async fn delete(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        api_result(&mut d, client.delete(&path, data.timeout()).await);
        d
    }
}
