//! Ingest pipeline resource

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::api::models::{
    CreateIngestPipelineRequest, IngestPipelineResponse, UpdateIngestPipelineRequest,
};
use crate::api::ConfigClient;
use crate::convert::{
    flatten_optional_list, flatten_optional_string, flatten_time, optional_string,
    update_optional_list, update_optional_string,
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

const RESOURCE_PATH: &str = "/ingest-pipelines";

pub const APP_AGENT_TOKEN_KEY: &str = "app_agent_token";
pub const SOURCES_KEY: &str = "sources";

pub struct IngestPipelineResource;

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
                Attribute::string(APP_AGENT_TOKEN_KEY)
                    .required()
                    .sensitive()
                    .validate(Validator::NotEmpty)
                    .describe("Agent token the pipeline ingests with. Never returned by the API."),
                Attribute::string_list(SOURCES_KEY)
                    .required()
                    .min_items(1)
                    .validate_each(Validator::NotEmpty)
                    .describe("Source identifiers the pipeline consumes from."),
                common::create_time(),
                common::update_time(),
            ]))
        })
        .clone()
}

fn flatten(diags: &mut Diagnostics, data: &mut ResourceData, resp: IngestPipelineResponse) {
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
    data.set(diags, SOURCES_KEY, flatten_optional_list(resp.sources));
    // The agent token is write-only; the stored value stays as configured.
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    data.set(diags, UPDATE_TIME_KEY, flatten_time(resp.update_time));
}

#[async_trait]
impl ManagedResource for IngestPipelineResource {
    fn type_name(&self) -> &'static str {
        "stratos_ingest_pipeline"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = CreateIngestPipelineRequest {
            location: data.get_string(common::LOCATION_KEY),
            name: data.get_string(NAME_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            description: optional_string(data, DESCRIPTION_KEY),
            app_agent_token: data.get_string(APP_AGENT_TOKEN_KEY),
            sources: data.get_string_list(SOURCES_KEY),
        };

        let result = client
            .post::<_, IngestPipelineResponse>(RESOURCE_PATH, &req, data.timeout())
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
            .get::<IngestPipelineResponse>(&path, data.timeout())
            .await;
        let Some(resp) = read_result(&mut d, data, result) else {
            return d;
        };
        flatten(&mut d, data, resp);
        d
    }

    async fn update(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = UpdateIngestPipelineRequest {
            display_name: update_optional_string(data, DISPLAY_NAME_KEY),
            description: update_optional_string(data, DESCRIPTION_KEY),
            app_agent_token: update_optional_string(data, APP_AGENT_TOKEN_KEY),
            sources: update_optional_list(data, SOURCES_KEY),
        };

        let path = format!("{RESOURCE_PATH}/{}", data.id());
        let result = client
            .put::<_, IngestPipelineResponse>(&path, &req, data.timeout())
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
