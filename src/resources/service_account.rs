//! Service account resource
//!
//! Service accounts are customer-level principals used by automation,
//! including this provider itself.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::api::models::{
    CreateServiceAccountRequest, ServiceAccountResponse, UpdateServiceAccountRequest,
};
use crate::api::ConfigClient;
use crate::convert::{
    flatten_optional_string, flatten_time, optional_string, update_optional_string,
};
use crate::diag::Diagnostics;
use crate::resources::{
    api_result, build_read_path, delete_protected, read_result, ManagedResource,
};
use crate::schema::common::{
    self, CREATE_TIME_KEY, CUSTOMER_ID_KEY, DELETION_PROTECTION_KEY, DESCRIPTION_KEY,
    DISPLAY_NAME_KEY, NAME_KEY, UPDATE_TIME_KEY,
};
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;

const RESOURCE_PATH: &str = "/service-accounts";

pub const ROLE_KEY: &str = "role";

/// Roles a service account can hold within its customer.
pub const SERVICE_ACCOUNT_ROLES: &[&str] = &["all_editor", "all_viewer"];

pub struct ServiceAccountResource;

fn resource_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                common::customer_id().force_new(),
                common::name(),
                common::display_name(),
                common::description(),
                Attribute::string(ROLE_KEY)
                    .required()
                    .force_new()
                    .validate(Validator::OneOf(SERVICE_ACCOUNT_ROLES))
                    .describe("Role of the service account: all_editor or all_viewer."),
                common::create_time(),
                common::update_time(),
                common::deletion_protection(),
            ]))
        })
        .clone()
}

fn flatten(diags: &mut Diagnostics, data: &mut ResourceData, resp: ServiceAccountResponse) {
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
    data.set(diags, ROLE_KEY, flatten_optional_string(resp.role));
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    data.set(diags, UPDATE_TIME_KEY, flatten_time(resp.update_time));
}

#[async_trait]
impl ManagedResource for ServiceAccountResource {
    fn type_name(&self) -> &'static str {
        "stratos_service_account"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = CreateServiceAccountRequest {
            organization_id: data.get_string(CUSTOMER_ID_KEY),
            name: data.get_string(NAME_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            description: optional_string(data, DESCRIPTION_KEY),
            role: data.get_string(ROLE_KEY),
        };

        let result = client
            .post::<_, ServiceAccountResponse>(RESOURCE_PATH, &req, data.timeout())
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
            .get::<ServiceAccountResponse>(&path, data.timeout())
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

        let req = UpdateServiceAccountRequest {
            display_name: update_optional_string(data, DISPLAY_NAME_KEY),
            description: update_optional_string(data, DESCRIPTION_KEY),
        };
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        let result = client
            .put::<_, ServiceAccountResponse>(&path, &req, data.timeout())
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
