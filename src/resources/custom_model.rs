//! `datarobot_custom_model`: a custom inference model built from local files.
//!
//! Custom model versions are immutable. When the sources change, the update
//! cuts a new version: it drops every locally uploaded item of the latest
//! version and uploads the freshly prepared files.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{deleted, found, from_state, non_empty, require_id, to_state, LocalSources};
use crate::client::{
    CreateCustomModelRequest, CreateCustomModelVersionFromFilesRequest,
    CreateCustomModelVersionFromLatestRequest, CustomModel, UpdateCustomModelRequest,
};
use crate::error::ProviderError;
use crate::files::WalkOptions;
use crate::plan::apply_source_hashes;
use crate::resource::{Resource, ResourceContext};
use crate::schema::{Attribute, Schema};

pub const TYPE_NAME: &str = "datarobot_custom_model";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct CustomModelState {
    id: Option<String>,
    version_id: Option<String>,
    name: String,
    description: Option<String>,
    target_type: Option<String>,
    target_name: Option<String>,
    language: Option<String>,
    base_environment_id: Option<String>,
    #[serde(flatten)]
    sources: LocalSources,
}

impl CustomModelState {
    fn refresh(&mut self, model: CustomModel) {
        self.id = Some(model.id);
        self.name = model.name;
        self.description = non_empty(model.description).or(self.description.take());
        self.target_type = non_empty(model.target_type);
        self.target_name = non_empty(model.target_name).or(self.target_name.take());
        self.language = non_empty(model.language).or(self.language.take());
        self.version_id = non_empty(model.latest_version.id);
        self.base_environment_id =
            non_empty(model.latest_version.base_environment_id).or(self.base_environment_id.take());
    }
}

/// The `datarobot_custom_model` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomModelResource;

impl CustomModelResource {
    async fn cut_version(
        &self,
        ctx: &ResourceContext,
        id: &str,
        plan: &CustomModelState,
    ) -> Result<String, ProviderError> {
        let model = ctx.service.get_custom_model(id).await?;
        let base_environment_id = plan
            .base_environment_id
            .clone()
            .unwrap_or_else(|| model.latest_version.base_environment_id.clone());

        let files_to_delete: Vec<String> = model
            .latest_version
            .items
            .iter()
            .filter(|item| item.is_local())
            .map(|item| item.id.clone())
            .collect();
        let uploads = plan.sources.read_uploads(&ctx.walk_options)?;

        let mut version_id = model.latest_version.id;
        if !files_to_delete.is_empty() || uploads.is_empty() {
            debug!(custom_model_id = id, deleted = files_to_delete.len(), "Creating version from latest");
            let version = ctx
                .service
                .create_custom_model_version_from_latest(
                    id,
                    &CreateCustomModelVersionFromLatestRequest {
                        is_major_update: false,
                        base_environment_id: base_environment_id.clone(),
                        files_to_delete,
                    },
                )
                .await?;
            version_id = version.id;
        }

        if !uploads.is_empty() {
            debug!(custom_model_id = id, files = uploads.len(), "Creating version from files");
            let version = ctx
                .service
                .create_custom_model_version_from_files(
                    id,
                    &CreateCustomModelVersionFromFilesRequest {
                        base_environment_id,
                        files: uploads,
                    },
                )
                .await?;
            version_id = version.id;
        }

        Ok(version_id)
    }
}

#[async_trait::async_trait]
impl Resource for CustomModelResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("Custom Model")
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_use_state_for_unknown()
                    .with_description("The ID of the Custom Model."),
            )
            .with_attribute(
                "version_id",
                Attribute::computed_string().with_description("The ID of the latest Custom Model version."),
            )
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the Custom Model."),
            )
            .with_attribute(
                "description",
                Attribute::optional_string().with_description("The description of the Custom Model."),
            )
            .with_attribute(
                "target_type",
                Attribute::optional_string()
                    .with_default(json!("Binary"))
                    .with_force_new()
                    .with_description("The target type of the Custom Model."),
            )
            .with_attribute(
                "target_name",
                Attribute::optional_string()
                    .with_force_new()
                    .with_description("The target name of the Custom Model."),
            )
            .with_attribute(
                "language",
                Attribute::optional_string().with_description("The programming language of the Custom Model."),
            )
            .with_attribute(
                "base_environment_id",
                Attribute::optional_string()
                    .with_description("The ID of the base environment for the Custom Model version."),
            );
        LocalSources::with_schema(schema, "Custom Model")
    }

    fn modify_plan(
        &self,
        _prior: Option<&Value>,
        planned: &mut Value,
        options: &WalkOptions,
    ) -> Result<(), ProviderError> {
        apply_source_hashes(planned, options)
    }

    async fn create(&self, ctx: &ResourceContext, planned: Value) -> Result<Value, ProviderError> {
        let mut plan: CustomModelState = from_state(planned)?;

        let model = ctx
            .service
            .create_custom_model(&CreateCustomModelRequest {
                name: plan.name.clone(),
                target_type: plan.target_type.clone().unwrap_or_else(|| "Binary".to_string()),
                target_name: plan.target_name.clone().unwrap_or_default(),
                custom_model_type: "inference".to_string(),
                description: plan.description.clone(),
                language: plan.language.clone(),
            })
            .await?;
        info!(custom_model_id = %model.id, "Created Custom Model");

        plan.id = Some(model.id.clone());
        plan.version_id = non_empty(model.latest_version.id.clone());

        if !plan.sources.is_empty() || plan.base_environment_id.is_some() {
            let uploads = plan.sources.read_uploads(&ctx.walk_options)?;
            let version = ctx
                .service
                .create_custom_model_version_from_files(
                    &model.id,
                    &CreateCustomModelVersionFromFilesRequest {
                        base_environment_id: plan.base_environment_id.clone().unwrap_or_default(),
                        files: uploads,
                    },
                )
                .await?;
            plan.version_id = Some(version.id);
        }

        to_state(&plan)
    }

    async fn read(&self, ctx: &ResourceContext, state: Value) -> Result<Option<Value>, ProviderError> {
        let mut current: CustomModelState = from_state(state)?;
        let id = require_id(&current.id, TYPE_NAME)?.to_string();

        let Some(model) = found(ctx.service.get_custom_model(&id).await, TYPE_NAME, &id)? else {
            return Ok(None);
        };
        current.refresh(model);
        to_state(&current).map(Some)
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let state: CustomModelState = from_state(prior)?;
        let mut plan: CustomModelState = from_state(planned)?;
        let id = require_id(&state.id, TYPE_NAME)?.to_string();

        if plan.name != state.name || plan.description != state.description {
            ctx.service
                .update_custom_model(
                    &id,
                    &UpdateCustomModelRequest {
                        name: plan.name.clone(),
                        description: plan.description.clone().unwrap_or_default(),
                    },
                )
                .await?;
        }

        let environment_changed = plan.base_environment_id.is_some()
            && plan.base_environment_id != state.base_environment_id;
        if plan.sources.changed_from(&state.sources) || environment_changed {
            info!(custom_model_id = %id, "Local sources changed, creating new Custom Model version");
            plan.version_id = Some(self.cut_version(ctx, &id, &plan).await?);
        } else {
            plan.version_id = state.version_id.clone();
        }

        plan.id = Some(id);
        to_state(&plan)
    }

    async fn delete(&self, ctx: &ResourceContext, state: Value) -> Result<(), ProviderError> {
        let state: CustomModelState = from_state(state)?;
        let id = require_id(&state.id, TYPE_NAME)?;
        deleted(ctx.service.delete_custom_model(id).await)
    }
}
