//! Managed resources
//!
//! One module per resource type, each following the same shape: a schema
//! composed from the shared fragments, a request builder using the
//! optional-field adapters, a response flattener writing attribute state, and
//! the deletion-protection gate where the resource supports it.

pub mod application;
pub mod application_agent;
pub mod application_agent_credential;
pub mod application_space;
pub mod auth_flow;
pub mod authorization_policy;
pub mod customer;
pub mod entity_matching_pipeline;
pub mod ingest_pipeline;
pub mod oauth2_client;
pub mod oauth2_provider;
pub mod service_account;
pub mod service_account_credential;
pub mod tenant;
pub mod trust_score_profile;

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;

use crate::api::{ApiError, ConfigClient};
use crate::diag::{Diagnostic, Diagnostics};
use crate::schema::common::DELETION_PROTECTION_KEY;
use crate::schema::Schema;
use crate::state::ResourceData;
use crate::validate::GID_PREFIX;

/// A declared resource type with full CRUD semantics. The configured client
/// is injected explicitly on every call; handlers hold no ambient state.
#[async_trait]
pub trait ManagedResource: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> Arc<Schema>;

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics;
    async fn read(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics;
    async fn update(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics;
    async fn delete(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics;
}

/// A read-only lookup exposed to configurations.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> Arc<Schema>;

    async fn read(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics;
}

/// Fold an API result into diagnostics. Service errors (5xx) surface as
/// "try again later"; anything else is flagged as a provider defect carrying
/// the literal upstream message.
pub(crate) fn api_result<T>(diags: &mut Diagnostics, result: Result<T, ApiError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            if err.is_service_error() {
                diags.push(Diagnostic::error_detail(
                    "Communication with Stratos failed, please try again later",
                    err.to_string(),
                ));
            } else {
                diags.push(Diagnostic::plugin_error(err.to_string()));
            }
            None
        }
    }
}

/// Read variant of [`api_result`]: a not-found answer is soft. The local id
/// is cleared so the host drops the resource from state instead of failing.
pub(crate) fn read_result<T>(
    diags: &mut Diagnostics,
    data: &mut ResourceData,
    result: Result<T, ApiError>,
) -> Option<T> {
    match result {
        Err(err) if err.is_not_found() => {
            tracing::debug!("resource {} no longer exists, removing from state", data.id());
            data.set_id("");
            None
        }
        other => api_result(diags, other),
    }
}

/// Data-source variant: not-found is a user-facing lookup failure, not a
/// state reconciliation signal.
pub(crate) fn lookup_result<T>(
    diags: &mut Diagnostics,
    result: Result<T, ApiError>,
    what: &str,
) -> Option<T> {
    match result {
        Err(err) if err.is_not_found() => {
            diags.push(Diagnostic::error_detail(
                format!("{what} not found"),
                err.to_string(),
            ));
            None
        }
        other => api_result(diags, other),
    }
}

/// Locally enforced refusal to delete. Returns true (and records the error)
/// when the deletion-protection flag is still set.
pub(crate) fn delete_protected(diags: &mut Diagnostics, data: &ResourceData) -> bool {
    if data.get_bool(DELETION_PROTECTION_KEY) {
        diags.push(Diagnostic::error_detail(
            "Delete Protection is enabled",
            "Cannot destroy instance without setting deletion_protection=false and applying first",
        ));
        return true;
    }
    false
}

/// Accept either a direct identifier or the `name?location=gid:...`
/// lookup-by-name form used when importing pre-existing resources.
pub fn parse_import_id(import_id: &str) -> anyhow::Result<()> {
    if is_gid(import_id) || import_id.contains("?location=") {
        return Ok(());
    }
    bail!(
        "Unsupported id format: {import_id}. \
         Expected either 'gid:xxx' or 'resource-name?location=gid:xxx'"
    )
}

fn is_gid(id: &str) -> bool {
    id.strip_prefix(GID_PREFIX).is_some_and(|rest| {
        rest.len() >= 18
            && rest
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Build the read path for a resource, supporting both addressing forms:
///
/// - direct id: `gid:xxx` -> `/applications/gid:xxx`
/// - name with location: `my-name?location=gid:xxx` ->
///   `/applications/my-name?<param>=gid:xxx`, where `<param>` is the API
///   parameter of the resource family's parent.
pub(crate) fn build_read_path(resource_path: &str, data: &ResourceData) -> String {
    let id = data.id();

    if id.contains("?location=") {
        let param = parent_param(resource_path);
        let translated = id.replacen("?location=", &format!("?{param}="), 1);
        return format!("{resource_path}/{translated}");
    }

    format!("{resource_path}/{id}")
}

/// Lookup-by-name path used by data sources.
pub(crate) fn lookup_by_name_path(resource_path: &str, name: &str, location: &str) -> String {
    let param = parent_param(resource_path);
    format!(
        "{resource_path}/{}?{param}={}",
        urlencoding::encode(name),
        urlencoding::encode(location)
    )
}

/// Application spaces and service accounts hang off an organization; every
/// other resource is addressed within a project.
fn parent_param(resource_path: &str) -> &'static str {
    if resource_path.contains("/projects") || resource_path.contains("/service-accounts") {
        "organization_id"
    } else {
        "project_id"
    }
}

/// Flatten the parent linkage of a read response: `location` mirrors the
/// narrowest container the server reports.
pub(crate) fn set_location_from(
    diags: &mut Diagnostics,
    data: &mut ResourceData,
    customer_id: Option<&str>,
    app_space_id: Option<&str>,
) {
    use crate::schema::common::LOCATION_KEY;

    match (app_space_id, customer_id) {
        (Some(app_space), _) if !app_space.is_empty() => {
            data.set(diags, LOCATION_KEY, app_space);
        }
        (_, Some(customer)) if !customer.is_empty() => {
            data.set(diags, LOCATION_KEY, customer);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::json;

    fn data_with_id(id: &str) -> ResourceData {
        let schema = Arc::new(Schema::new(vec![Attribute::string("name")]));
        ResourceData::new(schema).with_id(id)
    }

    #[test]
    fn test_parse_import_id_accepts_both_forms() {
        assert!(parse_import_id("gid:SGVsbG_CsFN0cmF0b3Mh").is_ok());
        assert!(parse_import_id("my-app?location=gid:SGVsbG_CsFN0cmF0b3Mh").is_ok());
        assert!(parse_import_id("my-app").is_err());
    }

    #[test]
    fn test_build_read_path_direct_id() {
        let data = data_with_id("gid:SGVsbG_CsFN0cmF0b3Mh");
        assert_eq!(
            build_read_path("/applications", &data),
            "/applications/gid:SGVsbG_CsFN0cmF0b3Mh"
        );
    }

    #[test]
    fn test_build_read_path_translates_location_param() {
        let data = data_with_id("my-app?location=gid:SGVsbG_CsFN0cmF0b3Mh");
        assert_eq!(
            build_read_path("/applications", &data),
            "/applications/my-app?project_id=gid:SGVsbG_CsFN0cmF0b3Mh"
        );

        let data = data_with_id("my-space?location=gid:SGVsbG_CsFN0cmF0b3Mh");
        assert_eq!(
            build_read_path("/projects", &data),
            "/projects/my-space?organization_id=gid:SGVsbG_CsFN0cmF0b3Mh"
        );
    }

    #[test]
    fn test_read_result_clears_id_on_not_found() {
        let mut diags = Diagnostics::new();
        let mut data = data_with_id("gid:SGVsbG_CsFN0cmF0b3Mh");
        let result: Result<(), ApiError> = Err(ApiError::Status {
            status: 404,
            message: "gone".into(),
        });
        assert!(read_result(&mut diags, &mut data, result).is_none());
        assert!(data.is_gone());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_api_result_classifies_service_errors() {
        let mut diags = Diagnostics::new();
        let result: Result<(), ApiError> = Err(ApiError::Status {
            status: 503,
            message: "overloaded".into(),
        });
        assert!(api_result(&mut diags, result).is_none());
        let diag = diags.iter().next().unwrap();
        assert!(diag.summary.contains("try again later"));

        let mut diags = Diagnostics::new();
        let result: Result<(), ApiError> = Err(ApiError::Status {
            status: 409,
            message: "conflict".into(),
        });
        api_result(&mut diags, result);
        let diag = diags.iter().next().unwrap();
        assert!(diag.detail.contains("report this issue"));
    }

    #[test]
    fn test_delete_protection_blocks_locally() {
        let schema = Arc::new(Schema::new(vec![
            crate::schema::common::deletion_protection(),
        ]));
        let mut config = serde_json::Map::new();
        config.insert(DELETION_PROTECTION_KEY.into(), json!(true));
        let data = ResourceData::from_parts(schema.clone(), config, Default::default());

        let mut diags = Diagnostics::new();
        assert!(delete_protected(&mut diags, &data));
        assert!(diags.has_error());

        // Default also protects when the operator never set the flag.
        let data = ResourceData::new(schema);
        let mut diags = Diagnostics::new();
        assert!(delete_protected(&mut diags, &data));
    }
}
