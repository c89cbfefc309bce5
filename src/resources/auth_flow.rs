//! Authentication flow resource
//!
//! The flow document can be written in YAML or JSON, exactly one of the two.
//! Either way the comparison is structural, so formatting round-trips from
//! the server never produce a pending change.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::api::models::{AuthFlowResponse, CreateAuthFlowRequest, UpdateAuthFlowRequest};
use crate::api::ConfigClient;
use crate::convert::{flatten_optional_string, flatten_time, optional_string};
use crate::diag::Diagnostics;
use crate::resources::{
    api_result, build_read_path, read_result, set_location_from, ManagedResource,
};
use crate::schema::common::{
    self, APP_SPACE_ID_KEY, CREATE_TIME_KEY, CUSTOMER_ID_KEY, DESCRIPTION_KEY, DISPLAY_NAME_KEY,
    NAME_KEY, UPDATE_TIME_KEY,
};
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;
use crate::validate::{validate_json, validate_yaml};

const RESOURCE_PATH: &str = "/auth-flows";

pub const FLOW_YAML_KEY: &str = "flow_yaml";
pub const FLOW_JSON_KEY: &str = "flow_json";

const FORMAT_YAML: &str = "yaml";
const FORMAT_JSON: &str = "json";

const FLOW_ONE_OF: &[&str] = &[FLOW_YAML_KEY, FLOW_JSON_KEY];

pub struct AuthFlowResource;

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
                Attribute::string(FLOW_YAML_KEY)
                    .validate(Validator::Func(validate_yaml))
                    .suppress(crate::diff::suppress_equivalent_yaml)
                    .exactly_one_of(FLOW_ONE_OF)
                    .describe("Flow definition as YAML. Compared structurally, not textually."),
                Attribute::string(FLOW_JSON_KEY)
                    .validate(Validator::Func(validate_json))
                    .suppress(crate::diff::suppress_equivalent_json)
                    .exactly_one_of(FLOW_ONE_OF)
                    .describe("Flow definition as JSON. Compared structurally, not textually."),
                common::create_time(),
                common::update_time(),
            ]))
        })
        .clone()
}

fn flow_from_config(data: &ResourceData) -> (String, &'static str) {
    let yaml = data.get_string(FLOW_YAML_KEY);
    if !yaml.is_empty() {
        return (yaml, FORMAT_YAML);
    }
    (data.get_string(FLOW_JSON_KEY), FORMAT_JSON)
}

fn flatten(diags: &mut Diagnostics, data: &mut ResourceData, resp: AuthFlowResponse) {
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
    // Mirror the document into the attribute matching the stored format.
    let flow = flatten_optional_string(resp.flow);
    match resp.format.as_deref() {
        Some(FORMAT_JSON) => {
            data.set(diags, FLOW_JSON_KEY, flow);
            data.set(diags, FLOW_YAML_KEY, serde_json::Value::Null);
        }
        _ => {
            data.set(diags, FLOW_YAML_KEY, flow);
            data.set(diags, FLOW_JSON_KEY, serde_json::Value::Null);
        }
    }
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    data.set(diags, UPDATE_TIME_KEY, flatten_time(resp.update_time));
}

#[async_trait]
impl ManagedResource for AuthFlowResource {
    fn type_name(&self) -> &'static str {
        "stratos_auth_flow"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let (flow, format) = flow_from_config(data);
        let req = CreateAuthFlowRequest {
            location: data.get_string(common::LOCATION_KEY),
            name: data.get_string(NAME_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            description: optional_string(data, DESCRIPTION_KEY),
            flow,
            format: format.to_string(),
        };

        let result = client
            .post::<_, AuthFlowResponse>(RESOURCE_PATH, &req, data.timeout())
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
        let result = client.get::<AuthFlowResponse>(&path, data.timeout()).await;
        let Some(resp) = read_result(&mut d, data, result) else {
            return d;
        };
        flatten(&mut d, data, resp);
        d
    }

    async fn update(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let mut req = UpdateAuthFlowRequest {
            display_name: crate::convert::update_optional_string(data, DISPLAY_NAME_KEY),
            description: crate::convert::update_optional_string(data, DESCRIPTION_KEY),
            flow: None,
            format: None,
        };
        if data.has_change(FLOW_YAML_KEY) || data.has_change(FLOW_JSON_KEY) {
            let (flow, format) = flow_from_config(data);
            req.flow = Some(flow);
            req.format = Some(format.to_string());
        }

        let path = format!("{RESOURCE_PATH}/{}", data.id());
        let result = client
            .put::<_, AuthFlowResponse>(&path, &req, data.timeout())
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
