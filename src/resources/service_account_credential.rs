//! Service account credential resource
//!
//! Same immutable key shape as agent credentials, attached to a service
//! account instead of an application agent.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::api::models::{
    CreateServiceAccountCredentialRequest, ServiceAccountCredentialResponse,
};
use crate::api::ConfigClient;
use crate::convert::{flatten_optional_string, flatten_time, optional_string};
use crate::diag::{Diagnostic, Diagnostics};
use crate::resources::application_agent_credential::{PUBLIC_KEY_JWK_KEY, PUBLIC_KEY_PEM_KEY};
use crate::resources::{api_result, build_read_path, read_result, ManagedResource};
use crate::schema::common::{
    self, CREATE_TIME_KEY, CUSTOMER_ID_KEY, DISPLAY_NAME_KEY, EXPIRE_TIME_KEY, KID_KEY,
    SERVICE_ACCOUNT_ID_KEY,
};
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;
use crate::validate::{validate_json, validate_public_key_pem};

const RESOURCE_PATH: &str = "/service-account-credentials";

pub const SERVICE_ACCOUNT_CONFIG_KEY: &str = "service_account_config";

const PUBLIC_KEY_ONE_OF: &[&str] = &[PUBLIC_KEY_JWK_KEY, PUBLIC_KEY_PEM_KEY];

pub struct ServiceAccountCredentialResource;

fn resource_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                common::customer_id().into_computed(),
                common::service_account_id().force_new(),
                Attribute::string(DISPLAY_NAME_KEY)
                    .force_new()
                    .suppress(crate::diff::suppress_credential_display_name)
                    .describe("The display name for the credential. Defaults to the key ID."),
                Attribute::string(KID_KEY)
                    .computed()
                    .describe("Key ID assigned by the server"),
                common::expire_time(),
                Attribute::string(PUBLIC_KEY_JWK_KEY)
                    .force_new()
                    .validate(Validator::Func(validate_json))
                    .exactly_one_of(PUBLIC_KEY_ONE_OF)
                    .describe("Public key to register, as a JWK document"),
                Attribute::string(PUBLIC_KEY_PEM_KEY)
                    .force_new()
                    .validate(Validator::Func(validate_public_key_pem))
                    .exactly_one_of(PUBLIC_KEY_ONE_OF)
                    .describe("Public key to register, as a PEM block"),
                Attribute::string(SERVICE_ACCOUNT_CONFIG_KEY)
                    .computed()
                    .sensitive()
                    .describe("Bootstrap credentials JSON, returned only on creation"),
                common::create_time(),
            ]))
        })
        .clone()
}

fn flatten(
    diags: &mut Diagnostics,
    data: &mut ResourceData,
    resp: ServiceAccountCredentialResponse,
) {
    data.set_id(resp.id);
    data.set(
        diags,
        CUSTOMER_ID_KEY,
        flatten_optional_string(resp.customer_id),
    );
    data.set(
        diags,
        SERVICE_ACCOUNT_ID_KEY,
        flatten_optional_string(resp.service_account_id),
    );
    data.set(diags, KID_KEY, flatten_optional_string(resp.kid));
    data.set(
        diags,
        DISPLAY_NAME_KEY,
        flatten_optional_string(resp.display_name),
    );
    data.set(diags, EXPIRE_TIME_KEY, flatten_time(resp.expire_time));
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    if let Some(config) = resp.service_account_config {
        data.set(diags, SERVICE_ACCOUNT_CONFIG_KEY, config);
    }
}

#[async_trait]
impl ManagedResource for ServiceAccountCredentialResource {
    fn type_name(&self) -> &'static str {
        "stratos_service_account_credential"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = CreateServiceAccountCredentialRequest {
            service_account_id: data.get_string(SERVICE_ACCOUNT_ID_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            expire_time: optional_string(data, EXPIRE_TIME_KEY),
            public_key_jwk: optional_string(data, PUBLIC_KEY_JWK_KEY),
            public_key_pem: optional_string(data, PUBLIC_KEY_PEM_KEY),
        };

        let result = client
            .post::<_, ServiceAccountCredentialResponse>(RESOURCE_PATH, &req, data.timeout())
            .await;
        let Some(resp) = api_result(&mut d, result) else {
            return d;
        };
        client.record_bookmark(resp.bookmark.as_deref());
        flatten(&mut d, data, resp);
        d
    }

    async fn read(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let path = build_read_path(RESOURCE_PATH, data);
        let result = client
            .get::<ServiceAccountCredentialResponse>(&path, data.timeout())
            .await;
        let Some(resp) = read_result(&mut d, data, result) else {
            return d;
        };
        flatten(&mut d, data, resp);
        d
    }

    async fn update(&self, _client: &ConfigClient, _data: &mut ResourceData) -> Diagnostics {
        Diagnostic::plugin_error("service account credentials cannot be updated in place").into()
    }

    async fn delete(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        api_result(&mut d, client.delete(&path, data.timeout()).await);
        d
    }
}
