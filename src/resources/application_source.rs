//! `datarobot_application_source`: the code and runtime settings an
//! application is built from.
//!
//! Every change to the uploaded sources, the `resources` block, the base
//! environment or the runtime parameters produces a new source version. The
//! new version starts as a copy of the latest one; its local items are then
//! removed and the prepared files uploaded.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{
    deleted, encode_runtime_parameters, found, from_state, non_empty, require_id, to_state,
    LocalSources, RuntimeParameterValue,
};
use crate::client::{
    ApplicationResources, ApplicationSource, CreateApplicationSourceVersionRequest,
    UpdateApplicationSourceRequest, UpdateApplicationSourceVersionRequest,
};
use crate::error::ProviderError;
use crate::files::WalkOptions;
use crate::plan::apply_source_hashes;
use crate::resource::{Resource, ResourceContext};
use crate::schema::{Attribute, Block, NestedBlock, Schema};

pub const TYPE_NAME: &str = "datarobot_application_source";

/// The `resources` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct ResourcesState {
    #[serde(skip_serializing_if = "Option::is_none")]
    replicas: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_affinity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_web_requests_on_root_path: Option<bool>,
}

impl From<&ResourcesState> for ApplicationResources {
    fn from(state: &ResourcesState) -> Self {
        Self {
            replicas: state.replicas,
            resource_label: state.resource_label.clone(),
            session_affinity: state.session_affinity,
            service_web_requests_on_root_path: state.service_web_requests_on_root_path,
        }
    }
}

impl From<ApplicationResources> for ResourcesState {
    fn from(resources: ApplicationResources) -> Self {
        Self {
            replicas: resources.replicas,
            resource_label: resources.resource_label,
            session_affinity: resources.session_affinity,
            service_web_requests_on_root_path: resources.service_web_requests_on_root_path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct ApplicationSourceState {
    id: Option<String>,
    version_id: Option<String>,
    name: Option<String>,
    base_environment_id: Option<String>,
    resources: Option<ResourcesState>,
    runtime_parameter_values: Option<Vec<RuntimeParameterValue>>,
    #[serde(flatten)]
    sources: LocalSources,
}

impl ApplicationSourceState {
    fn refresh(&mut self, source: ApplicationSource) {
        let version = source.latest_version;
        self.id = Some(source.id);
        self.name = non_empty(source.name).or(self.name.take());
        self.version_id = non_empty(version.id);
        self.base_environment_id =
            non_empty(version.base_environment_id).or(self.base_environment_id.take());
        if self.resources.is_some() || version.resources != ApplicationResources::default() {
            self.resources = Some(version.resources.into());
        }
    }

    /// Whether anything that lives on the version differs from `prior`.
    fn version_changed(&self, prior: &ApplicationSourceState) -> bool {
        self.sources.changed_from(&prior.sources)
            || self.resources != prior.resources
            || self.runtime_parameter_values != prior.runtime_parameter_values
            || (self.base_environment_id.is_some()
                && self.base_environment_id != prior.base_environment_id)
    }

    fn version_request(
        &self,
        label: String,
        base_version: Option<String>,
    ) -> Result<CreateApplicationSourceVersionRequest, ProviderError> {
        Ok(CreateApplicationSourceVersionRequest {
            label,
            base_version,
            base_environment_id: self.base_environment_id.clone(),
            resources: self.resources.as_ref().map(ApplicationResources::from),
            runtime_parameter_values: encode_runtime_parameters(
                self.runtime_parameter_values.as_deref(),
            )?,
        })
    }
}

/// Label for the version after `label`: `v1`, `v2`, ...
fn next_label(label: &str) -> String {
    let current = label
        .strip_prefix('v')
        .and_then(|number| number.parse::<u64>().ok())
        .unwrap_or(0);
    format!("v{}", current + 1)
}

/// The `datarobot_application_source` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationSourceResource;

#[async_trait::async_trait]
impl Resource for ApplicationSourceResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let resources = Block::new()
            .with_attribute(
                "replicas",
                Attribute::optional_int64().with_description("The replicas for the Application Source."),
            )
            .with_attribute(
                "resource_label",
                Attribute::optional_string()
                    .with_description("The resource label for the Application Source."),
            )
            .with_attribute(
                "session_affinity",
                Attribute::optional_bool()
                    .with_description("The session affinity for the Application Source."),
            )
            .with_attribute(
                "service_web_requests_on_root_path",
                Attribute::optional_bool()
                    .with_description("Whether to service web requests on the root path."),
            );

        let schema = Schema::v0()
            .with_description("Application Source")
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_use_state_for_unknown()
                    .with_description("The ID of the Application Source."),
            )
            .with_attribute(
                "version_id",
                Attribute::computed_string().with_description("The version ID of the Application Source."),
            )
            .with_attribute(
                "name",
                Attribute::optional_computed_string()
                    .with_use_state_for_unknown()
                    .with_description("The name of the Application Source."),
            )
            .with_attribute(
                "base_environment_id",
                Attribute::optional_string()
                    .with_description("The base environment ID of the Application Source version."),
            )
            .with_block("resources", NestedBlock::single(resources).with_max_items(1))
            .with_block("runtime_parameter_values", RuntimeParameterValue::block());
        LocalSources::with_schema(schema, "Application Source")
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
        let mut plan: ApplicationSourceState = from_state(planned)?;
        let uploads = plan.sources.read_uploads(&ctx.walk_options)?;

        let mut source = ctx.service.create_application_source().await?;
        info!(application_source_id = %source.id, "Created Application Source");

        if let Some(name) = plan.name.clone() {
            source = ctx
                .service
                .update_application_source(&source.id, &UpdateApplicationSourceRequest { name })
                .await?;
        }

        let version = ctx
            .service
            .create_application_source_version(&source.id, &plan.version_request(next_label(""), None)?)
            .await?;

        if !uploads.is_empty() {
            debug!(application_source_id = %source.id, files = uploads.len(), "Uploading Application Source files");
            ctx.service
                .update_application_source_version_files(&source.id, &version.id, &uploads)
                .await?;
        }

        plan.id = Some(source.id);
        plan.name = Some(source.name);
        plan.version_id = Some(version.id);
        to_state(&plan)
    }

    async fn read(&self, ctx: &ResourceContext, state: Value) -> Result<Option<Value>, ProviderError> {
        let mut current: ApplicationSourceState = from_state(state)?;
        let id = require_id(&current.id, TYPE_NAME)?.to_string();

        let Some(source) = found(ctx.service.get_application_source(&id).await, TYPE_NAME, &id)?
        else {
            return Ok(None);
        };
        current.refresh(source);
        to_state(&current).map(Some)
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let state: ApplicationSourceState = from_state(prior)?;
        let mut plan: ApplicationSourceState = from_state(planned)?;
        let id = require_id(&state.id, TYPE_NAME)?.to_string();

        if let Some(name) = plan.name.clone().filter(|name| Some(name) != state.name.as_ref()) {
            ctx.service
                .update_application_source(&id, &UpdateApplicationSourceRequest { name })
                .await?;
        }

        plan.version_id = state.version_id.clone();
        if plan.version_changed(&state) {
            let current = ctx.service.get_application_source(&id).await?;
            let latest = current.latest_version;
            let files_to_delete: Vec<String> = latest
                .items
                .iter()
                .filter(|item| item.is_local())
                .map(|item| item.id.clone())
                .collect();
            let uploads = plan.sources.read_uploads(&ctx.walk_options)?;

            let version = ctx
                .service
                .create_application_source_version(
                    &id,
                    &plan.version_request(next_label(&latest.label), non_empty(latest.id))?,
                )
                .await?;
            info!(application_source_id = %id, version_id = %version.id, "Created Application Source version");

            if !files_to_delete.is_empty() {
                ctx.service
                    .update_application_source_version(
                        &id,
                        &version.id,
                        &UpdateApplicationSourceVersionRequest { files_to_delete },
                    )
                    .await?;
            }
            if !uploads.is_empty() {
                ctx.service
                    .update_application_source_version_files(&id, &version.id, &uploads)
                    .await?;
            }
            plan.version_id = Some(version.id);
        }

        plan.id = Some(id);
        to_state(&plan)
    }

    async fn delete(&self, ctx: &ResourceContext, state: Value) -> Result<(), ProviderError> {
        let state: ApplicationSourceState = from_state(state)?;
        let id = require_id(&state.id, TYPE_NAME)?;
        deleted(ctx.service.delete_application_source(id).await)
    }
}
