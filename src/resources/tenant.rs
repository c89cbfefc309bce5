//! Tenant resource and data source

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::api::models::{CreateTenantRequest, TenantResponse, UpdateTenantRequest};
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
    DESCRIPTION_KEY, DISPLAY_NAME_KEY, NAME_KEY, TENANT_ID_KEY, UPDATE_TIME_KEY,
};
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;
use crate::validate::{validate_gid, validate_name};

const RESOURCE_PATH: &str = "/tenants";

pub struct TenantResource;

fn resource_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                common::customer_id().into_computed(),
                common::app_space_id(),
                common::name(),
                common::display_name(),
                common::description(),
                common::create_time(),
                common::update_time(),
                common::deletion_protection(),
            ]))
        })
        .clone()
}

fn flatten(diags: &mut Diagnostics, data: &mut ResourceData, resp: TenantResponse) {
    data.set_id(resp.id);
    data.set(
        diags,
        CUSTOMER_ID_KEY,
        flatten_optional_string(resp.customer_id),
    );
    data.set(
        diags,
        APP_SPACE_ID_KEY,
        flatten_optional_string(resp.app_space_id),
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
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    data.set(diags, UPDATE_TIME_KEY, flatten_time(resp.update_time));
}

#[async_trait]
impl ManagedResource for TenantResource {
    fn type_name(&self) -> &'static str {
        "stratos_tenant"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = CreateTenantRequest {
            project_id: data.get_string(APP_SPACE_ID_KEY),
            name: data.get_string(NAME_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            description: optional_string(data, DESCRIPTION_KEY),
        };

        let result = client
            .post::<_, TenantResponse>(RESOURCE_PATH, &req, data.timeout())
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
        let result = client.get::<TenantResponse>(&path, data.timeout()).await;
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

        let req = UpdateTenantRequest {
            display_name: update_optional_string(data, DISPLAY_NAME_KEY),
            description: update_optional_string(data, DESCRIPTION_KEY),
        };
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        let result = client
            .put::<_, TenantResponse>(&path, &req, data.timeout())
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

pub struct TenantDataSource;

fn data_source_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                Attribute::string(TENANT_ID_KEY)
                    .validate(Validator::Func(validate_gid))
                    .exactly_one_of(&[TENANT_ID_KEY, NAME_KEY])
                    .describe("Identifier of Tenant"),
                Attribute::string(NAME_KEY)
                    .validate(Validator::Func(validate_name))
                    .exactly_one_of(&[TENANT_ID_KEY, NAME_KEY])
                    .required_with(&[APP_SPACE_ID_KEY]),
                Attribute::string(APP_SPACE_ID_KEY)
                    .validate(Validator::Func(validate_gid))
                    .describe("Identifier of Application Space to look the name up in"),
                common::customer_id().into_computed(),
                common::display_name().into_computed(),
                common::description().into_computed(),
                common::create_time(),
                common::update_time(),
            ]))
        })
        .clone()
}

#[async_trait]
impl DataSource for TenantDataSource {
    fn type_name(&self) -> &'static str {
        "stratos_tenant"
    }

    fn schema(&self) -> Arc<Schema> {
        data_source_schema()
    }

    async fn read(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let id = data.get_string(TENANT_ID_KEY);
        let path = if id.is_empty() {
            lookup_by_name_path(
                RESOURCE_PATH,
                &data.get_string(NAME_KEY),
                &data.get_string(APP_SPACE_ID_KEY),
            )
        } else {
            format!("{RESOURCE_PATH}/{id}")
        };

        let result = client.get::<TenantResponse>(&path, data.timeout()).await;
        let Some(resp) = lookup_result(&mut d, result, "Tenant") else {
            return d;
        };
        data.set(&mut d, TENANT_ID_KEY, resp.id.clone());
        flatten(&mut d, data, resp);
        d
    }
}
