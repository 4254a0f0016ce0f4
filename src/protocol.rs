//! The engine-facing operation surface.
//!
//! [`ProviderService`] is what the plugin transport calls into. It works in
//! plain JSON values and crate types so a transport only has to translate
//! its wire messages. [`crate::DataRobotProvider`] is the implementation.
//!
//! State values are JSON objects keyed by attribute name. A `null` state
//! means "no resource": a null proposal in [`ProviderService::plan`] is a
//! destroy, and a null result from [`ProviderService::read`] means the
//! remote entity is gone and should be dropped from state.

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};

/// Operations the engine drives during validate, plan and apply.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider block and resource schemas.
    fn schema(&self) -> ProviderSchema;

    /// Resource type names, derived from the schema by default.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        let mut resources: Vec<String> = schema.resources.keys().cloned().collect();
        resources.sort();
        ProviderMetadata {
            resources,
            data_sources: Vec::new(),
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider block before configuring.
    async fn validate_provider_config(
        &self,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure credentials and settings. Error diagnostics leave the
    /// provider unconfigured.
    async fn configure(&self, config: serde_json::Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Upgrade resource state from an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Plan changes for a resource. `proposed_state` is null on destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<serde_json::Value>,
        proposed_state: serde_json::Value,
        config: serde_json::Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource from its planned state.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Refresh a resource; returns null when it no longer exists.
    async fn read(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Update an existing resource in place.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: serde_json::Value,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Delete a resource.
    async fn delete(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<(), ProviderError>;

    /// Import an existing entity by id.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let _ = id;
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }
}
