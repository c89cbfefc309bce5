//! Application space resource and data sources
//!
//! Application spaces are the project-level container. Region, knowledge
//! graph size, and replica region are fixed at creation time.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::models::{
    ApplicationSpaceResponse, CreateApplicationSpaceRequest, ListApplicationSpacesResponse,
    UpdateApplicationSpaceRequest,
};
use crate::api::ConfigClient;
use crate::convert::{
    flatten_optional_string, flatten_time, optional_string, update_optional_string,
};
use crate::diag::Diagnostics;
use crate::resources::{
    api_result, build_read_path, delete_protected, lookup_by_name_path, lookup_result,
    read_result, DataSource, ManagedResource,
};
use crate::schema::common::{
    self, APP_SPACE_ID_KEY, CREATE_TIME_KEY, CUSTOMER_ID_KEY, DELETION_PROTECTION_KEY,
    DESCRIPTION_KEY, DISPLAY_NAME_KEY, IKG_SIZE_KEY, NAME_KEY, REGION_KEY, REPLICA_REGION_KEY,
    UPDATE_TIME_KEY,
};
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;
use crate::validate::{validate_gid, validate_name};

const RESOURCE_PATH: &str = "/projects";

pub const IKG_STATUS_KEY: &str = "ikg_status";
pub const APP_SPACES_KEY: &str = "app_spaces";

pub struct ApplicationSpaceResource;

fn resource_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                common::customer_id().force_new(),
                common::name(),
                common::display_name(),
                common::description(),
                common::region(),
                common::ikg_size(),
                common::replica_region(),
                Attribute::string(IKG_STATUS_KEY)
                    .computed()
                    .describe("Status of the knowledge graph backing this space"),
                common::create_time(),
                common::update_time(),
                common::deletion_protection(),
            ]))
        })
        .clone()
}

fn flatten(diags: &mut Diagnostics, data: &mut ResourceData, resp: ApplicationSpaceResponse) {
    data.set_id(resp.id);
    data.set(
        diags,
        CUSTOMER_ID_KEY,
        flatten_optional_string(resp.customer_id),
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
    data.set(diags, REGION_KEY, flatten_optional_string(resp.region));
    data.set(diags, IKG_SIZE_KEY, flatten_optional_string(resp.ikg_size));
    data.set(
        diags,
        REPLICA_REGION_KEY,
        flatten_optional_string(resp.replica_region),
    );
    data.set(
        diags,
        IKG_STATUS_KEY,
        flatten_optional_string(resp.ikg_status),
    );
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    data.set(diags, UPDATE_TIME_KEY, flatten_time(resp.update_time));
}

#[async_trait]
impl ManagedResource for ApplicationSpaceResource {
    fn type_name(&self) -> &'static str {
        "stratos_application_space"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = CreateApplicationSpaceRequest {
            organization_id: data.get_string(CUSTOMER_ID_KEY),
            name: data.get_string(NAME_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            description: optional_string(data, DESCRIPTION_KEY),
            region: data.get_string(REGION_KEY),
            ikg_size: optional_string(data, IKG_SIZE_KEY),
            replica_region: optional_string(data, REPLICA_REGION_KEY),
        };

        let result = client
            .post::<_, ApplicationSpaceResponse>(RESOURCE_PATH, &req, data.timeout())
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
            .get::<ApplicationSpaceResponse>(&path, data.timeout())
            .await;
        let Some(resp) = read_result(&mut d, data, result) else {
            return d;
        };
        flatten(&mut d, data, resp);
        d
    }

    async fn update(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        if !data.has_change_except(DELETION_PROTECTION_KEY) {
            return d;
        }

        let req = UpdateApplicationSpaceRequest {
            display_name: update_optional_string(data, DISPLAY_NAME_KEY),
            description: update_optional_string(data, DESCRIPTION_KEY),
        };
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        let result = client
            .put::<_, ApplicationSpaceResponse>(&path, &req, data.timeout())
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
        if delete_protected(&mut d, data) {
            return d;
        }
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        api_result(&mut d, client.delete(&path, data.timeout()).await);
        d
    }
}

pub struct ApplicationSpaceDataSource;

fn data_source_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                Attribute::string(APP_SPACE_ID_KEY)
                    .validate(Validator::Func(validate_gid))
                    .exactly_one_of(&[APP_SPACE_ID_KEY, NAME_KEY])
                    .describe("Identifier of Application Space"),
                Attribute::string(NAME_KEY)
                    .validate(Validator::Func(validate_name))
                    .exactly_one_of(&[APP_SPACE_ID_KEY, NAME_KEY])
                    .required_with(&[CUSTOMER_ID_KEY]),
                Attribute::string(CUSTOMER_ID_KEY)
                    .validate(Validator::Func(validate_gid))
                    .describe("Identifier of Customer to look the name up in"),
                common::display_name().into_computed(),
                common::description().into_computed(),
                Attribute::string(REGION_KEY).computed(),
                Attribute::string(IKG_SIZE_KEY).computed(),
                Attribute::string(REPLICA_REGION_KEY).computed(),
                Attribute::string(IKG_STATUS_KEY).computed(),
                common::create_time(),
                common::update_time(),
            ]))
        })
        .clone()
}

#[async_trait]
impl DataSource for ApplicationSpaceDataSource {
    fn type_name(&self) -> &'static str {
        "stratos_application_space"
    }

    fn schema(&self) -> Arc<Schema> {
        data_source_schema()
    }

    async fn read(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let id = data.get_string(APP_SPACE_ID_KEY);
        let path = if id.is_empty() {
            lookup_by_name_path(
                RESOURCE_PATH,
                &data.get_string(NAME_KEY),
                &data.get_string(CUSTOMER_ID_KEY),
            )
        } else {
            format!("{RESOURCE_PATH}/{id}")
        };

        let result = client
            .get::<ApplicationSpaceResponse>(&path, data.timeout())
            .await;
        let Some(resp) = lookup_result(&mut d, result, "Application Space") else {
            return d;
        };
        data.set(&mut d, APP_SPACE_ID_KEY, resp.id.clone());
        flatten(&mut d, data, resp);
        d
    }
}

pub struct ApplicationSpaceListDataSource;

fn list_data_source_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            let elem = Schema::new(vec![
                Attribute::string("id").computed(),
                Attribute::string(NAME_KEY).computed(),
                Attribute::string(DISPLAY_NAME_KEY).computed(),
                Attribute::string(DESCRIPTION_KEY).computed(),
                Attribute::string(REGION_KEY).computed(),
            ]);
            Arc::new(Schema::new(vec![
                common::customer_id(),
                common::exact_name_filter(),
                Attribute::object_list(APP_SPACES_KEY, elem)
                    .computed()
                    .describe("Application spaces matching the filter, in API order"),
            ]))
        })
        .clone()
}

#[async_trait]
impl DataSource for ApplicationSpaceListDataSource {
    fn type_name(&self) -> &'static str {
        "stratos_application_spaces"
    }

    fn schema(&self) -> Arc<Schema> {
        list_data_source_schema()
    }

    async fn read(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let customer_id = data.get_string(CUSTOMER_ID_KEY);
        let path = format!(
            "{RESOURCE_PATH}?organization_id={}",
            urlencoding::encode(&customer_id)
        );

        let result = client
            .get::<ListApplicationSpacesResponse>(&path, data.timeout())
            .await;
        let Some(resp) = api_result(&mut d, result) else {
            return d;
        };

        let filter = data.get_string_list(common::FILTER_KEY);
        let spaces: Vec<Value> = resp
            .app_spaces
            .into_iter()
            .filter(|space| filter.iter().any(|name| name == &space.name))
            .map(|space| {
                json!({
                    "id": space.id,
                    NAME_KEY: space.name,
                    DISPLAY_NAME_KEY: space.display_name,
                    DESCRIPTION_KEY: space.description,
                    REGION_KEY: space.region,
                })
            })
            .collect();

        data.set_id(&customer_id);
        data.set(&mut d, APP_SPACES_KEY, Value::Array(spaces));
        d
    }
}
