//! OAuth2 provider resource
//!
//! Grant types, response types and token-endpoint auth methods are wire
//! enums: the configuration uses the lowercase OAuth2 spelling, the API the
//! screaming wire form, and both directions come from one definition.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::api::models::{
    CreateOAuth2ProviderRequest, OAuth2ProviderResponse, UpdateOAuth2ProviderRequest,
};
use crate::api::ConfigClient;
use crate::convert::{
    enum_list_from_wire, enum_list_to_wire, flatten_optional_list, flatten_optional_string,
    flatten_time, optional_string, update_optional_list, update_optional_string, wire_enum,
    WireEnum,
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

const RESOURCE_PATH: &str = "/oauth2-providers";

pub const GRANT_TYPES_KEY: &str = "grant_types";
pub const RESPONSE_TYPES_KEY: &str = "response_types";
pub const SCOPES_KEY: &str = "scopes";
pub const TOKEN_ENDPOINT_AUTH_METHODS_KEY: &str = "token_endpoint_auth_methods";
pub const REQUEST_URIS_KEY: &str = "request_uris";
pub const REQUEST_OBJECT_SIGNING_ALG_KEY: &str = "request_object_signing_alg";
pub const FRONT_CHANNEL_LOGIN_URI_KEY: &str = "front_channel_login_uri";
pub const FRONT_CHANNEL_CONSENT_URI_KEY: &str = "front_channel_consent_uri";

/// Signing algorithms accepted for request objects.
pub const SIGNING_ALGS: &[&str] = &[
    "RS256", "RS384", "RS512", "PS256", "PS384", "PS512", "ES256", "ES384", "ES512", "EdDSA",
];

wire_enum! {
    pub enum GrantType {
        AuthorizationCode => ("authorization_code", "GRANT_TYPE_AUTHORIZATION_CODE"),
        Implicit => ("implicit", "GRANT_TYPE_IMPLICIT"),
        Password => ("password", "GRANT_TYPE_PASSWORD"),
        ClientCredentials => ("client_credentials", "GRANT_TYPE_CLIENT_CREDENTIALS"),
        RefreshToken => ("refresh_token", "GRANT_TYPE_REFRESH_TOKEN"),
    }
}

wire_enum! {
    pub enum ResponseType {
        Token => ("token", "RESPONSE_TYPE_TOKEN"),
        Code => ("code", "RESPONSE_TYPE_CODE"),
        IdToken => ("id_token", "RESPONSE_TYPE_ID_TOKEN"),
    }
}

wire_enum! {
    pub enum TokenEndpointAuthMethod {
        ClientSecretBasic => ("client_secret_basic", "TOKEN_ENDPOINT_AUTH_METHOD_CLIENT_SECRET_BASIC"),
        ClientSecretPost => ("client_secret_post", "TOKEN_ENDPOINT_AUTH_METHOD_CLIENT_SECRET_POST"),
        PrivateKeyJwt => ("private_key_jwt", "TOKEN_ENDPOINT_AUTH_METHOD_PRIVATE_KEY_JWT"),
        None => ("none", "TOKEN_ENDPOINT_AUTH_METHOD_NONE"),
    }
}

pub struct OAuth2ProviderResource;

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
                Attribute::string_list(GRANT_TYPES_KEY)
                    .required()
                    .min_items(1)
                    .validate_each(Validator::OneOf(GrantType::ALL))
                    .describe("OAuth2 grant types the provider issues tokens for."),
                Attribute::string_list(RESPONSE_TYPES_KEY)
                    .required()
                    .min_items(1)
                    .validate_each(Validator::OneOf(ResponseType::ALL))
                    .describe("OAuth2 response types the provider supports."),
                Attribute::string_list(SCOPES_KEY)
                    .required()
                    .min_items(1)
                    .validate_each(Validator::NotEmpty)
                    .describe("Scopes the provider can grant, e.g. openid, profile, email."),
                Attribute::string_list(TOKEN_ENDPOINT_AUTH_METHODS_KEY)
                    .required()
                    .min_items(1)
                    .validate_each(Validator::OneOf(TokenEndpointAuthMethod::ALL))
                    .describe("Client authentication methods accepted at the token endpoint."),
                Attribute::string_list(REQUEST_URIS_KEY)
                    .describe("Pre-registered request URIs."),
                Attribute::string(REQUEST_OBJECT_SIGNING_ALG_KEY)
                    .validate(Validator::OneOf(SIGNING_ALGS))
                    .describe("Signing algorithm required for request objects."),
                Attribute::string(FRONT_CHANNEL_LOGIN_URI_KEY)
                    .describe("Login page the provider redirects browsers to."),
                Attribute::string(FRONT_CHANNEL_CONSENT_URI_KEY)
                    .describe("Consent page the provider redirects browsers to."),
                common::create_time(),
                common::update_time(),
            ]))
        })
        .clone()
}

fn flatten(diags: &mut Diagnostics, data: &mut ResourceData, resp: OAuth2ProviderResponse) {
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
    let grant_types = flatten_optional_list(enum_list_from_wire(
        diags,
        &resp.grant_types,
        GrantType::from_wire,
    ));
    data.set(diags, GRANT_TYPES_KEY, grant_types);
    let response_types = flatten_optional_list(enum_list_from_wire(
        diags,
        &resp.response_types,
        ResponseType::from_wire,
    ));
    data.set(diags, RESPONSE_TYPES_KEY, response_types);
    data.set(diags, SCOPES_KEY, flatten_optional_list(resp.scopes));
    let token_endpoint_auth_methods = flatten_optional_list(enum_list_from_wire(
        diags,
        &resp.token_endpoint_auth_methods,
        TokenEndpointAuthMethod::from_wire,
    ));
    data.set(
        diags,
        TOKEN_ENDPOINT_AUTH_METHODS_KEY,
        token_endpoint_auth_methods,
    );
    data.set(
        diags,
        REQUEST_URIS_KEY,
        flatten_optional_list(resp.request_uris),
    );
    data.set(
        diags,
        REQUEST_OBJECT_SIGNING_ALG_KEY,
        flatten_optional_string(resp.request_object_signing_alg),
    );
    data.set(
        diags,
        FRONT_CHANNEL_LOGIN_URI_KEY,
        flatten_optional_string(resp.front_channel_login_uri),
    );
    data.set(
        diags,
        FRONT_CHANNEL_CONSENT_URI_KEY,
        flatten_optional_string(resp.front_channel_consent_uri),
    );
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    data.set(diags, UPDATE_TIME_KEY, flatten_time(resp.update_time));
}

#[async_trait]
impl ManagedResource for OAuth2ProviderResource {
    fn type_name(&self) -> &'static str {
        "stratos_oauth2_provider"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = CreateOAuth2ProviderRequest {
            location: data.get_string(common::LOCATION_KEY),
            name: data.get_string(NAME_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            description: optional_string(data, DESCRIPTION_KEY),
            grant_types: enum_list_to_wire(
                &mut d,
                &data.get_string_list(GRANT_TYPES_KEY),
                GrantType::from_config,
            ),
            response_types: enum_list_to_wire(
                &mut d,
                &data.get_string_list(RESPONSE_TYPES_KEY),
                ResponseType::from_config,
            ),
            scopes: data.get_string_list(SCOPES_KEY),
            token_endpoint_auth_methods: enum_list_to_wire(
                &mut d,
                &data.get_string_list(TOKEN_ENDPOINT_AUTH_METHODS_KEY),
                TokenEndpointAuthMethod::from_config,
            ),
            request_uris: data.get_string_list(REQUEST_URIS_KEY),
            request_object_signing_alg: optional_string(data, REQUEST_OBJECT_SIGNING_ALG_KEY),
            front_channel_login_uri: optional_string(data, FRONT_CHANNEL_LOGIN_URI_KEY),
            front_channel_consent_uri: optional_string(data, FRONT_CHANNEL_CONSENT_URI_KEY),
        };
        if d.has_error() {
            return d;
        }

        let result = client
            .post::<_, OAuth2ProviderResponse>(RESOURCE_PATH, &req, data.timeout())
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
            .get::<OAuth2ProviderResponse>(&path, data.timeout())
            .await;
        let Some(resp) = read_result(&mut d, data, result) else {
            return d;
        };
        flatten(&mut d, data, resp);
        d
    }

    async fn update(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let grant_types = update_optional_list(data, GRANT_TYPES_KEY)
            .map(|v| enum_list_to_wire(&mut d, &v, GrantType::from_config));
        let response_types = update_optional_list(data, RESPONSE_TYPES_KEY)
            .map(|v| enum_list_to_wire(&mut d, &v, ResponseType::from_config));
        let token_endpoint_auth_methods = update_optional_list(data, TOKEN_ENDPOINT_AUTH_METHODS_KEY)
            .map(|v| enum_list_to_wire(&mut d, &v, TokenEndpointAuthMethod::from_config));
        if d.has_error() {
            return d;
        }

        let req = UpdateOAuth2ProviderRequest {
            display_name: update_optional_string(data, DISPLAY_NAME_KEY),
            description: update_optional_string(data, DESCRIPTION_KEY),
            grant_types,
            response_types,
            scopes: update_optional_list(data, SCOPES_KEY),
            token_endpoint_auth_methods,
            request_uris: update_optional_list(data, REQUEST_URIS_KEY),
            request_object_signing_alg: update_optional_string(
                data,
                REQUEST_OBJECT_SIGNING_ALG_KEY,
            ),
            front_channel_login_uri: update_optional_string(data, FRONT_CHANNEL_LOGIN_URI_KEY),
            front_channel_consent_uri: update_optional_string(data, FRONT_CHANNEL_CONSENT_URI_KEY),
        };
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        let result = client
            .put::<_, OAuth2ProviderResponse>(&path, &req, data.timeout())
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
