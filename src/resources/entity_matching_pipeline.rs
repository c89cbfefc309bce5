//! Entity matching pipeline resource
//!
//! The rerun interval is a duration literal; `1h` and `60m` denote the same
//! schedule and must not register as a change.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde_json::json;

use crate::api::models::{
    CreateEntityMatchingPipelineRequest, EntityMatchingNodeFilter,
    EntityMatchingPipelineResponse, UpdateEntityMatchingPipelineRequest,
};
use crate::api::ConfigClient;
use crate::convert::{
    flatten_optional_list, flatten_optional_string, flatten_time, optional_string,
    update_optional_string,
};
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
use crate::validate::validate_duration;

const RESOURCE_PATH: &str = "/entity-matching-pipelines";

pub const SOURCE_NODE_TYPES_KEY: &str = "source_node_types";
pub const TARGET_NODE_TYPES_KEY: &str = "target_node_types";
pub const SIMILARITY_SCORE_CUTOFF_KEY: &str = "similarity_score_cutoff";
pub const RERUN_INTERVAL_KEY: &str = "rerun_interval";

pub struct EntityMatchingPipelineResource;

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
                Attribute::string_list(SOURCE_NODE_TYPES_KEY)
                    .required()
                    .min_items(1)
                    .validate_each(Validator::NotEmpty)
                    .describe("Node types the pipeline matches from."),
                Attribute::string_list(TARGET_NODE_TYPES_KEY)
                    .required()
                    .min_items(1)
                    .validate_each(Validator::NotEmpty)
                    .describe("Node types the pipeline matches against."),
                Attribute::float(SIMILARITY_SCORE_CUTOFF_KEY)
                    .required()
                    .validate(Validator::FloatBetween(0.0, 1.0))
                    .describe("Similarity score below which candidate matches are discarded."),
                Attribute::string(RERUN_INTERVAL_KEY)
                    .validate(Validator::Func(validate_duration))
                    .suppress(crate::diff::suppress_equivalent_duration)
                    .describe("Time between re-runs, as a duration literal such as 12h or 7d."),
                common::create_time(),
                common::update_time(),
            ]))
        })
        .clone()
}

fn flatten(
    diags: &mut Diagnostics,
    data: &mut ResourceData,
    resp: EntityMatchingPipelineResponse,
) {
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
    if let Some(filter) = resp.node_filter {
        data.set(
            diags,
            SOURCE_NODE_TYPES_KEY,
            flatten_optional_list(filter.source_node_types),
        );
        data.set(
            diags,
            TARGET_NODE_TYPES_KEY,
            flatten_optional_list(filter.target_node_types),
        );
    }
    // Round to four decimal places: the API stores single-precision weights.
    let cutoff = (resp.similarity_score_cutoff * 10_000.0).round() / 10_000.0;
    data.set(diags, SIMILARITY_SCORE_CUTOFF_KEY, json!(cutoff));
    data.set(
        diags,
        RERUN_INTERVAL_KEY,
        flatten_optional_string(resp.rerun_interval),
    );
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    data.set(diags, UPDATE_TIME_KEY, flatten_time(resp.update_time));
}

#[async_trait]
impl ManagedResource for EntityMatchingPipelineResource {
    fn type_name(&self) -> &'static str {
        "stratos_entity_matching_pipeline"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = CreateEntityMatchingPipelineRequest {
            location: data.get_string(common::LOCATION_KEY),
            name: data.get_string(NAME_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            description: optional_string(data, DESCRIPTION_KEY),
            node_filter: EntityMatchingNodeFilter {
                source_node_types: data.get_string_list(SOURCE_NODE_TYPES_KEY),
                target_node_types: data.get_string_list(TARGET_NODE_TYPES_KEY),
            },
            similarity_score_cutoff: data.get_f64(SIMILARITY_SCORE_CUTOFF_KEY),
            rerun_interval: optional_string(data, RERUN_INTERVAL_KEY),
        };

        let result = client
            .post::<_, EntityMatchingPipelineResponse>(RESOURCE_PATH, &req, data.timeout())
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
            .get::<EntityMatchingPipelineResponse>(&path, data.timeout())
            .await;
        let Some(resp) = read_result(&mut d, data, result) else {
            return d;
        };
        flatten(&mut d, data, resp);
        d
    }

    async fn update(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = UpdateEntityMatchingPipelineRequest {
            display_name: update_optional_string(data, DISPLAY_NAME_KEY),
            description: update_optional_string(data, DESCRIPTION_KEY),
            similarity_score_cutoff: data
                .has_change(SIMILARITY_SCORE_CUTOFF_KEY)
                .then(|| data.get_f64(SIMILARITY_SCORE_CUTOFF_KEY)),
            rerun_interval: update_optional_string(data, RERUN_INTERVAL_KEY),
        };

        let path = format!("{RESOURCE_PATH}/{}", data.id());
        let result = client
            .put::<_, EntityMatchingPipelineResponse>(&path, &req, data.timeout())
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
