//! OAuth2 client resource
//!
//! Connects a login flow to an upstream identity provider. The client secret
//! is write-only; reads never overwrite the configured value.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::api::models::{
    CreateOAuth2ClientRequest, OAuth2ClientResponse, UpdateOAuth2ClientRequest,
};
use crate::api::ConfigClient;
use crate::convert::{
    flatten_optional_list, flatten_optional_string, flatten_time, optional_string,
    update_optional_list, update_optional_string, wire_enum, WireEnum,
};
use crate::diag::{Diagnostic, Diagnostics};
use crate::resources::{
    api_result, build_read_path, read_result, set_location_from, ManagedResource,
};
use crate::schema::common::{
    self, APP_SPACE_ID_KEY, CREATE_TIME_KEY, CUSTOMER_ID_KEY, DESCRIPTION_KEY, DISPLAY_NAME_KEY,
    NAME_KEY, UPDATE_TIME_KEY,
};
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;

const RESOURCE_PATH: &str = "/oauth2-clients";

pub const PROVIDER_TYPE_KEY: &str = "provider_type";
pub const CLIENT_ID_KEY: &str = "client_id";
pub const CLIENT_SECRET_KEY: &str = "client_secret";
pub const REDIRECT_URIS_KEY: &str = "redirect_uris";
pub const DEFAULT_SCOPES_KEY: &str = "default_scopes";
pub const ALLOWED_SCOPES_KEY: &str = "allowed_scopes";
pub const ALLOW_SIGNUP_KEY: &str = "allow_signup";
pub const ISSUER_KEY: &str = "issuer";
pub const AUTHORIZATION_ENDPOINT_KEY: &str = "authorization_endpoint";
pub const TOKEN_ENDPOINT_KEY: &str = "token_endpoint";
pub const DISCOVERY_URL_KEY: &str = "discovery_url";
pub const AUTH_STYLE_KEY: &str = "auth_style";

wire_enum! {
    /// Upstream identity providers with built-in endpoint knowledge.
    pub enum ProviderType {
        AppleCom => ("apple.com", "PROVIDER_TYPE_APPLE_COM"),
        FacebookCom => ("facebook.com", "PROVIDER_TYPE_FACEBOOK_COM"),
        GithubCom => ("github.com", "PROVIDER_TYPE_GITHUB_COM"),
        GitlabCom => ("gitlab.com", "PROVIDER_TYPE_GITLAB_COM"),
        GoogleCom => ("google.com", "PROVIDER_TYPE_GOOGLE_COM"),
        LinkedinCom => ("linkedin.com", "PROVIDER_TYPE_LINKEDIN_COM"),
        MicrosoftCom => ("microsoft.com", "PROVIDER_TYPE_MICROSOFT_COM"),
        SlackCom => ("slack.com", "PROVIDER_TYPE_SLACK_COM"),
        SpotifyCom => ("spotify.com", "PROVIDER_TYPE_SPOTIFY_COM"),
        TwitchTv => ("twitch.tv", "PROVIDER_TYPE_TWITCH_TV"),
        YahooCom => ("yahoo.com", "PROVIDER_TYPE_YAHOO_COM"),
        Custom => ("custom", "PROVIDER_TYPE_CUSTOM"),
    }
}

wire_enum! {
    /// Where client credentials are placed on token requests.
    pub enum AuthStyle {
        AutoDetect => ("auto_detect", "AUTH_STYLE_AUTO_DETECT"),
        InParams => ("in_params", "AUTH_STYLE_IN_PARAMS"),
        InHeader => ("in_header", "AUTH_STYLE_IN_HEADER"),
    }
}

pub struct OAuth2ClientResource;

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
                Attribute::string(PROVIDER_TYPE_KEY)
                    .required()
                    .force_new()
                    .validate(Validator::OneOf(ProviderType::ALL))
                    .describe("Upstream identity provider this client connects to."),
                Attribute::string(CLIENT_ID_KEY)
                    .required()
                    .validate(Validator::NotEmpty)
                    .describe("Client ID registered with the upstream provider."),
                Attribute::string(CLIENT_SECRET_KEY)
                    .required()
                    .sensitive()
                    .validate(Validator::NotEmpty)
                    .describe("Client secret registered with the upstream provider. Never returned by the API."),
                Attribute::string_list(REDIRECT_URIS_KEY)
                    .required()
                    .min_items(1)
                    .validate_each(Validator::NotEmpty)
                    .describe("Allowed redirect URIs."),
                Attribute::string_list(DEFAULT_SCOPES_KEY)
                    .describe("Scopes requested when the configuration names none."),
                Attribute::string_list(ALLOWED_SCOPES_KEY)
                    .describe("Scopes a login flow may request at most."),
                Attribute::bool(ALLOW_SIGNUP_KEY)
                    .default_value(serde_json::json!(false))
                    .describe("Whether logins may create new accounts on the fly."),
                Attribute::string(ISSUER_KEY)
                    .describe("OpenID Connect issuer, for custom providers."),
                Attribute::string(AUTHORIZATION_ENDPOINT_KEY)
                    .describe("Authorization endpoint, for custom providers."),
                Attribute::string(TOKEN_ENDPOINT_KEY)
                    .describe("Token endpoint, for custom providers."),
                Attribute::string(DISCOVERY_URL_KEY)
                    .describe("OpenID Connect discovery document, for custom providers."),
                Attribute::string(AUTH_STYLE_KEY)
                    .required()
                    .validate(Validator::OneOf(AuthStyle::ALL))
                    .describe("How client credentials are sent to the token endpoint."),
                common::create_time(),
                common::update_time(),
            ]))
        })
        .clone()
}

fn provider_type_to_wire(diags: &mut Diagnostics, value: &str) -> String {
    match ProviderType::from_config(value) {
        Some(provider) => provider.as_wire().to_string(),
        None => {
            diags.push(Diagnostic::plugin_error(format!(
                "unsupported provider type {value:?}"
            )));
            String::new()
        }
    }
}

fn auth_style_to_wire(diags: &mut Diagnostics, value: &str) -> String {
    match AuthStyle::from_config(value) {
        Some(style) => style.as_wire().to_string(),
        None => {
            diags.push(Diagnostic::plugin_error(format!(
                "unsupported auth style {value:?}"
            )));
            String::new()
        }
    }
}

fn flatten(diags: &mut Diagnostics, data: &mut ResourceData, resp: OAuth2ClientResponse) {
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
    if let Some(provider_type) = resp.provider_type {
        let value = ProviderType::from_wire(&provider_type)
            .map(|p| p.as_config().to_string())
            .unwrap_or(provider_type);
        data.set(diags, PROVIDER_TYPE_KEY, value);
    }
    data.set(
        diags,
        CLIENT_ID_KEY,
        flatten_optional_string(resp.client_id),
    );
    data.set(
        diags,
        REDIRECT_URIS_KEY,
        flatten_optional_list(resp.redirect_uris),
    );
    data.set(
        diags,
        DEFAULT_SCOPES_KEY,
        flatten_optional_list(resp.default_scopes),
    );
    data.set(
        diags,
        ALLOWED_SCOPES_KEY,
        flatten_optional_list(resp.allowed_scopes),
    );
    data.set(diags, ALLOW_SIGNUP_KEY, resp.allow_signup);
    data.set(diags, ISSUER_KEY, flatten_optional_string(resp.issuer));
    data.set(
        diags,
        AUTHORIZATION_ENDPOINT_KEY,
        flatten_optional_string(resp.authorization_endpoint),
    );
    data.set(
        diags,
        TOKEN_ENDPOINT_KEY,
        flatten_optional_string(resp.token_endpoint),
    );
    data.set(
        diags,
        DISCOVERY_URL_KEY,
        flatten_optional_string(resp.discovery_url),
    );
    if let Some(auth_style) = resp.auth_style {
        let value = AuthStyle::from_wire(&auth_style)
            .map(|s| s.as_config().to_string())
            .unwrap_or(auth_style);
        data.set(diags, AUTH_STYLE_KEY, value);
    }
    // The client secret is never round-tripped; the configured value stands.
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    data.set(diags, UPDATE_TIME_KEY, flatten_time(resp.update_time));
}

#[async_trait]
impl ManagedResource for OAuth2ClientResource {
    fn type_name(&self) -> &'static str {
        "stratos_oauth2_client"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = CreateOAuth2ClientRequest {
            location: data.get_string(common::LOCATION_KEY),
            name: data.get_string(NAME_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            description: optional_string(data, DESCRIPTION_KEY),
            provider_type: provider_type_to_wire(&mut d, &data.get_string(PROVIDER_TYPE_KEY)),
            client_id: data.get_string(CLIENT_ID_KEY),
            client_secret: data.get_string(CLIENT_SECRET_KEY),
            redirect_uris: data.get_string_list(REDIRECT_URIS_KEY),
            default_scopes: data.get_string_list(DEFAULT_SCOPES_KEY),
            allowed_scopes: data.get_string_list(ALLOWED_SCOPES_KEY),
            allow_signup: data.get_bool(ALLOW_SIGNUP_KEY),
            issuer: optional_string(data, ISSUER_KEY),
            authorization_endpoint: optional_string(data, AUTHORIZATION_ENDPOINT_KEY),
            token_endpoint: optional_string(data, TOKEN_ENDPOINT_KEY),
            discovery_url: optional_string(data, DISCOVERY_URL_KEY),
            auth_style: auth_style_to_wire(&mut d, &data.get_string(AUTH_STYLE_KEY)),
        };
        if d.has_error() {
            return d;
        }

        let result = client
            .post::<_, OAuth2ClientResponse>(RESOURCE_PATH, &req, data.timeout())
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
            .get::<OAuth2ClientResponse>(&path, data.timeout())
            .await;
        let Some(resp) = read_result(&mut d, data, result) else {
            return d;
        };
        flatten(&mut d, data, resp);
        d
    }

    async fn update(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let auth_style = update_optional_string(data, AUTH_STYLE_KEY)
            .map(|s| auth_style_to_wire(&mut d, &s));
        if d.has_error() {
            return d;
        }

        let req = UpdateOAuth2ClientRequest {
            display_name: update_optional_string(data, DISPLAY_NAME_KEY),
            description: update_optional_string(data, DESCRIPTION_KEY),
            client_id: update_optional_string(data, CLIENT_ID_KEY),
            client_secret: update_optional_string(data, CLIENT_SECRET_KEY),
            redirect_uris: update_optional_list(data, REDIRECT_URIS_KEY),
            default_scopes: update_optional_list(data, DEFAULT_SCOPES_KEY),
            allowed_scopes: update_optional_list(data, ALLOWED_SCOPES_KEY),
            allow_signup: data
                .has_change(ALLOW_SIGNUP_KEY)
                .then(|| data.get_bool(ALLOW_SIGNUP_KEY)),
            issuer: update_optional_string(data, ISSUER_KEY),
            authorization_endpoint: update_optional_string(data, AUTHORIZATION_ENDPOINT_KEY),
            token_endpoint: update_optional_string(data, TOKEN_ENDPOINT_KEY),
            discovery_url: update_optional_string(data, DISCOVERY_URL_KEY),
            auth_style,
        };
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        let result = client
            .put::<_, OAuth2ClientResponse>(&path, &req, data.timeout())
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
