//! The DataRobot provider: configuration plus dispatch to [`Resource`]s.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::client::Service;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::plan::{plan_resource, FILES};
use crate::protocol::ProviderService;
use crate::resource::{Resource, ResourceContext};
use crate::resources;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate_files_attribute;

/// A [`ProviderService`] serving every resource in [`resources::all`].
///
/// The API [`Service`] is injected at construction. Resource operations fail
/// with [`ProviderError::Configuration`] until [`ProviderService::configure`]
/// has succeeded.
pub struct DataRobotProvider {
    service: Arc<dyn Service>,
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
    config: RwLock<Option<ProviderConfig>>,
}

impl DataRobotProvider {
    pub fn new(service: Arc<dyn Service>) -> Self {
        Self::with_resources(service, resources::all())
    }

    /// Serve a custom set of resources.
    pub fn with_resources(service: Arc<dyn Service>, resources: Vec<Arc<dyn Resource>>) -> Self {
        Self {
            service,
            resources: resources
                .into_iter()
                .map(|resource| (resource.type_name(), resource))
                .collect(),
            config: RwLock::new(None),
        }
    }

    /// The active configuration, if the provider has been configured.
    pub async fn config(&self) -> Option<ProviderConfig> {
        self.config.read().await.clone()
    }

    fn resource(&self, resource_type: &str) -> Result<Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(resource_type)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    async fn context(&self) -> Result<ResourceContext, ProviderError> {
        let config = self.config.read().await;
        let config = config.as_ref().ok_or_else(|| {
            ProviderError::Configuration("provider has not been configured".to_string())
        })?;
        Ok(ResourceContext::new(self.service.clone(), config.walk_options()))
    }
}

impl std::fmt::Debug for DataRobotProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRobotProvider")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ProviderService for DataRobotProvider {
    fn schema(&self) -> ProviderSchema {
        self.resources.iter().fold(
            ProviderSchema::new().with_provider_config(ProviderConfig::schema()),
            |schema, (name, resource)| schema.with_resource(*name, resource.schema()),
        )
    }

    #[instrument(skip(self, config), name = "provider.validate_provider_config")]
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = crate::validation::validate(&ProviderConfig::schema(), &config);
        if !diagnostics.is_empty() {
            warn!(diagnostics = diagnostics.len(), "Provider configuration has problems");
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        debug!("Configure called");
        match ProviderConfig::from_env(&config) {
            Ok(resolved) => {
                info!(
                    endpoint = %resolved.endpoint,
                    follow_symlinks = resolved.follow_symlinks,
                    "Configure completed successfully"
                );
                *self.config.write().await = Some(resolved);
                Ok(vec![])
            },
            Err(diagnostics) => {
                warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
                Ok(diagnostics)
            },
        }
    }

    #[instrument(skip(self), name = "provider.stop")]
    async fn stop(&self) -> Result<(), ProviderError> {
        info!("Stop called");
        *self.config.write().await = None;
        Ok(())
    }

    #[instrument(skip(self, config), name = "provider.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut diagnostics = resource.validate(&config);
        if resource.schema().attribute(FILES).is_some() {
            diagnostics.extend(validate_files_attribute(&config, FILES));
        }
        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!(resource_type, diagnostics = diagnostics.len(), "Resource configuration is invalid");
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let options = self.context().await?.walk_options;
        debug!(
            resource_type,
            is_create = prior_state.as_ref().map_or(true, serde_json::Value::is_null),
            "Plan called"
        );

        let result = tokio::task::spawn_blocking(move || {
            plan_resource(resource.as_ref(), prior_state.as_ref(), proposed_state, &options)
        })
        .await
        .map_err(|err| ProviderError::InvalidRequest(format!("plan task failed: {err}")))?;

        match &result {
            Ok(plan) => info!(
                resource_type,
                changes = plan.changes.len(),
                requires_replace = plan.requires_replace,
                "Plan completed"
            ),
            Err(err) => error!(resource_type, error = %err, "Plan failed"),
        }
        result
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        info!(resource_type, "Create called");

        resource.create(&ctx, planned_state).await.inspect_err(|err| {
            error!(resource_type, error = %err, "Create failed");
        })
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        debug!(resource_type, "Read called");

        match resource.read(&ctx, current_state).await {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Ok(Value::Null),
            Err(err) => {
                error!(resource_type, error = %err, "Read failed");
                Err(err)
            },
        }
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        info!(resource_type, "Update called");

        resource
            .update(&ctx, prior_state, planned_state)
            .await
            .inspect_err(|err| {
                error!(resource_type, error = %err, "Update failed");
            })
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        info!(resource_type, "Delete called");

        resource.delete(&ctx, current_state).await.inspect_err(|err| {
            error!(resource_type, error = %err, "Delete failed");
        })
    }

    #[instrument(skip(self), name = "provider.import_resource")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let ctx = self.context().await?;
        info!(resource_type, id, "Import called");

        match resource.import(&ctx, id).await? {
            Some(state) => Ok(vec![ImportedResource::new(resource_type, state)]),
            None => Err(ProviderError::NotFound(format!("{resource_type} {id}"))),
        }
    }
}
