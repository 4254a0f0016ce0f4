//! The capability set every resource type implements.
//!
//! A [`Resource`] is one Terraform entity type. The provider owns a registry
//! of them and routes each engine call to the matching implementation.
//! Resources receive a [`ResourceContext`] with the API [`Service`] and the
//! folder walk settings, so none of them hold global state.

use std::sync::Arc;

use serde_json::Value;

use crate::client::Service;
use crate::error::ProviderError;
use crate::files::WalkOptions;
use crate::schema::{Diagnostic, Schema};
use crate::validation::validate;

/// Dependencies handed to resource operations.
#[derive(Clone)]
pub struct ResourceContext {
    /// The DataRobot API.
    pub service: Arc<dyn Service>,
    /// How `folder_path` trees are walked.
    pub walk_options: WalkOptions,
}

impl ResourceContext {
    pub fn new(service: Arc<dyn Service>, walk_options: WalkOptions) -> Self {
        Self {
            service,
            walk_options,
        }
    }
}

impl std::fmt::Debug for ResourceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceContext")
            .field("walk_options", &self.walk_options)
            .finish_non_exhaustive()
    }
}

/// One Terraform resource type.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// The Terraform type name, e.g. `datarobot_custom_model`.
    fn type_name(&self) -> &'static str;

    /// The resource schema.
    fn schema(&self) -> Schema;

    /// Check a configuration before planning.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate(&self.schema(), config)
    }

    /// Adjust the planned state before it is diffed against `prior`.
    ///
    /// Runs on every create and update plan, never on destroy. `planned` is
    /// always a JSON object here.
    fn modify_plan(
        &self,
        prior: Option<&Value>,
        planned: &mut Value,
        options: &WalkOptions,
    ) -> Result<(), ProviderError> {
        let _ = (prior, planned, options);
        Ok(())
    }

    /// Create the remote entity and return the new state.
    async fn create(&self, ctx: &ResourceContext, planned: Value) -> Result<Value, ProviderError>;

    /// Refresh state from the API. `None` means the entity is gone.
    async fn read(&self, ctx: &ResourceContext, state: Value)
        -> Result<Option<Value>, ProviderError>;

    /// Apply an in-place update and return the new state.
    async fn update(
        &self,
        ctx: &ResourceContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the remote entity.
    async fn delete(&self, ctx: &ResourceContext, state: Value) -> Result<(), ProviderError>;

    /// Import by id. The default passes the id through and reads the entity.
    async fn import(&self, ctx: &ResourceContext, id: &str) -> Result<Option<Value>, ProviderError> {
        self.read(ctx, serde_json::json!({ "id": id })).await
    }
}
