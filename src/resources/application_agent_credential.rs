//! Application agent credential resource
//!
//! Credentials are immutable: every attribute forces recreation and there is
//! no update call. The operator supplies a public key (JWK or PEM, exactly
//! one) or lets the server generate the key pair; the bootstrap agent config
//! is only returned by the create call and preserved in state afterwards.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::api::models::{
    ApplicationAgentCredentialResponse, CreateApplicationAgentCredentialRequest,
};
use crate::api::ConfigClient;
use crate::convert::{flatten_optional_string, flatten_time, optional_string};
use crate::diag::{Diagnostic, Diagnostics};
use crate::resources::{api_result, build_read_path, read_result, ManagedResource};
use crate::schema::common::{
    self, APPLICATION_ID_KEY, APP_AGENT_ID_KEY, APP_SPACE_ID_KEY, CREATE_TIME_KEY,
    CUSTOMER_ID_KEY, DISPLAY_NAME_KEY, EXPIRE_TIME_KEY, KID_KEY,
};
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;
use crate::validate::{validate_json, validate_public_key_pem};

const RESOURCE_PATH: &str = "/application-agent-credentials";

pub const PUBLIC_KEY_JWK_KEY: &str = "public_key_jwk";
pub const PUBLIC_KEY_PEM_KEY: &str = "public_key_pem";
pub const AGENT_CONFIG_KEY: &str = "agent_config";

const PUBLIC_KEY_ONE_OF: &[&str] = &[PUBLIC_KEY_JWK_KEY, PUBLIC_KEY_PEM_KEY];

pub struct ApplicationAgentCredentialResource;

fn resource_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                common::customer_id().into_computed(),
                common::app_space_id().into_computed(),
                Attribute::string(APPLICATION_ID_KEY).computed(),
                common::app_agent_id().force_new(),
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
                Attribute::string(AGENT_CONFIG_KEY)
                    .computed()
                    .sensitive()
                    .describe("Bootstrap configuration for the agent, returned only on creation"),
                common::create_time(),
            ]))
        })
        .clone()
}

fn flatten(
    diags: &mut Diagnostics,
    data: &mut ResourceData,
    resp: ApplicationAgentCredentialResponse,
) {
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
    data.set(
        diags,
        APPLICATION_ID_KEY,
        flatten_optional_string(resp.application_id),
    );
    data.set(
        diags,
        APP_AGENT_ID_KEY,
        flatten_optional_string(resp.application_agent_id),
    );
    data.set(diags, KID_KEY, flatten_optional_string(resp.kid));
    data.set(
        diags,
        DISPLAY_NAME_KEY,
        flatten_optional_string(resp.display_name),
    );
    data.set(diags, EXPIRE_TIME_KEY, flatten_time(resp.expire_time));
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    // The bootstrap config is only present in the create response; keep the
    // stored value on subsequent reads.
    if let Some(agent_config) = resp.agent_config {
        data.set(diags, AGENT_CONFIG_KEY, agent_config);
    }
}

#[async_trait]
impl ManagedResource for ApplicationAgentCredentialResource {
    fn type_name(&self) -> &'static str {
        "stratos_application_agent_credential"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = CreateApplicationAgentCredentialRequest {
            application_agent_id: data.get_string(APP_AGENT_ID_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            expire_time: optional_string(data, EXPIRE_TIME_KEY),
            public_key_jwk: optional_string(data, PUBLIC_KEY_JWK_KEY),
            public_key_pem: optional_string(data, PUBLIC_KEY_PEM_KEY),
        };

        let result = client
            .post::<_, ApplicationAgentCredentialResponse>(RESOURCE_PATH, &req, data.timeout())
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
            .get::<ApplicationAgentCredentialResponse>(&path, data.timeout())
            .await;
        let Some(resp) = read_result(&mut d, data, result) else {
            return d;
        };
        flatten(&mut d, data, resp);
        d
    }

    async fn update(&self, _client: &ConfigClient, _data: &mut ResourceData) -> Diagnostics {
        // Every attribute forces recreation; reaching this is a host defect.
        Diagnostic::plugin_error("application agent credentials cannot be updated in place").into()
    }

    async fn delete(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        api_result(&mut d, client.delete(&path, data.timeout()).await);
        d
    }
}
