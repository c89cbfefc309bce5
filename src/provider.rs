//! Provider registry
//!
//! Wires resource type names to their CRUD handlers and data sources, and
//! owns the single configured client handle. The client is injected
//! explicitly into every handler call; there is no ambient per-call context
//! to recover it from.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context as _;

use crate::api::{ConfigClient, Credentials};
use crate::resources::{
    application::{ApplicationDataSource, ApplicationResource},
    application_agent::{ApplicationAgentDataSource, ApplicationAgentResource},
    application_agent_credential::ApplicationAgentCredentialResource,
    application_space::{
        ApplicationSpaceDataSource, ApplicationSpaceListDataSource, ApplicationSpaceResource,
    },
    auth_flow::AuthFlowResource,
    authorization_policy::AuthorizationPolicyResource,
    customer::CustomerDataSource,
    entity_matching_pipeline::EntityMatchingPipelineResource,
    ingest_pipeline::IngestPipelineResource,
    oauth2_client::OAuth2ClientResource,
    oauth2_provider::OAuth2ProviderResource,
    service_account::ServiceAccountResource,
    service_account_credential::ServiceAccountCredentialResource,
    tenant::{TenantDataSource, TenantResource},
    trust_score_profile::TrustScoreProfileResource,
};
use crate::resources::{parse_import_id, DataSource, ManagedResource};
use crate::state::ResourceData;

pub struct Provider {
    client: Arc<ConfigClient>,
    resources: HashMap<&'static str, Arc<dyn ManagedResource>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSource>>,
}

impl Provider {
    /// Configure the provider from the environment: load credentials once
    /// per process lifetime and build the shared client.
    pub fn configure() -> anyhow::Result<Self> {
        let credentials = Credentials::load().context("Unable to configure Stratos provider")?;
        let client = ConfigClient::new(&credentials)?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Provider over an explicitly supplied client. This is the seam tests
    /// and embedding hosts use.
    pub fn with_client(client: Arc<ConfigClient>) -> Self {
        let mut provider = Self {
            client,
            resources: HashMap::new(),
            data_sources: HashMap::new(),
        };

        provider.register(Arc::new(ApplicationSpaceResource));
        provider.register(Arc::new(ApplicationResource));
        provider.register(Arc::new(TenantResource));
        provider.register(Arc::new(ApplicationAgentResource));
        provider.register(Arc::new(ApplicationAgentCredentialResource));
        provider.register(Arc::new(ServiceAccountResource));
        provider.register(Arc::new(ServiceAccountCredentialResource));
        provider.register(Arc::new(OAuth2ProviderResource));
        provider.register(Arc::new(OAuth2ClientResource));
        provider.register(Arc::new(AuthorizationPolicyResource));
        provider.register(Arc::new(AuthFlowResource));
        provider.register(Arc::new(IngestPipelineResource));
        provider.register(Arc::new(EntityMatchingPipelineResource));
        provider.register(Arc::new(TrustScoreProfileResource));

        provider.register_data_source(Arc::new(CustomerDataSource));
        provider.register_data_source(Arc::new(ApplicationSpaceDataSource));
        provider.register_data_source(Arc::new(ApplicationSpaceListDataSource));
        provider.register_data_source(Arc::new(ApplicationDataSource));
        provider.register_data_source(Arc::new(TenantDataSource));
        provider.register_data_source(Arc::new(ApplicationAgentDataSource));

        provider
    }

    fn register(&mut self, resource: Arc<dyn ManagedResource>) {
        self.resources.insert(resource.type_name(), resource);
    }

    fn register_data_source(&mut self, data_source: Arc<dyn DataSource>) {
        self.data_sources
            .insert(data_source.type_name(), data_source);
    }

    pub fn client(&self) -> &Arc<ConfigClient> {
        &self.client
    }

    pub fn resource(&self, type_name: &str) -> Option<Arc<dyn ManagedResource>> {
        self.resources.get(type_name).cloned()
    }

    pub fn data_source(&self, type_name: &str) -> Option<Arc<dyn DataSource>> {
        self.data_sources.get(type_name).cloned()
    }

    pub fn resource_type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.resources.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn data_source_type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.data_sources.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Seed resource data for an import: validates the import identifier and
    /// hands back a store the read handler can resolve it from.
    pub fn prepare_import(
        &self,
        type_name: &str,
        import_id: &str,
    ) -> anyhow::Result<ResourceData> {
        let resource = self
            .resource(type_name)
            .with_context(|| format!("unknown resource type {type_name:?}"))?;
        parse_import_id(import_id)?;
        Ok(ResourceData::new(resource.schema()).with_id(import_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Provider {
        let client = ConfigClient::with_base_url("http://localhost:1", "t").unwrap();
        Provider::with_client(Arc::new(client))
    }

    #[test]
    fn test_all_resource_types_registered() {
        let p = provider();
        let names = p.resource_type_names();
        for expected in [
            "stratos_application",
            "stratos_application_agent",
            "stratos_application_agent_credential",
            "stratos_application_space",
            "stratos_auth_flow",
            "stratos_authorization_policy",
            "stratos_entity_matching_pipeline",
            "stratos_ingest_pipeline",
            "stratos_oauth2_client",
            "stratos_oauth2_provider",
            "stratos_service_account",
            "stratos_service_account_credential",
            "stratos_tenant",
            "stratos_trust_score_profile",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_data_sources_registered() {
        let p = provider();
        let names = p.data_source_type_names();
        assert!(names.contains(&"stratos_customer"));
        assert!(names.contains(&"stratos_application_spaces"));
    }

    #[test]
    fn test_prepare_import_validates_id_format() {
        let p = provider();
        assert!(p
            .prepare_import("stratos_application", "gid:SGVsbG_CsFN0cmF0b3Mh")
            .is_ok());
        assert!(p.prepare_import("stratos_application", "bogus").is_err());
        assert!(p.prepare_import("stratos_nonexistent", "gid:SGVsbG_CsFN0cmF0b3Mh").is_err());
    }
}
