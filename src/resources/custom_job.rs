//! `datarobot_custom_job`: a job that runs uploaded files in an execution
//! environment. Files are attached to the job itself, so a source change
//! re-uploads in place instead of replacing the job.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{
    deleted, encode_runtime_parameters, found, from_state, non_empty, require_id, to_state,
    LocalSources, RuntimeParameterValue,
};
use crate::client::{CreateCustomJobRequest, CustomJob, UpdateCustomJobRequest};
use crate::error::ProviderError;
use crate::files::WalkOptions;
use crate::plan::apply_source_hashes;
use crate::resource::{Resource, ResourceContext};
use crate::schema::{Attribute, Schema};

pub const TYPE_NAME: &str = "datarobot_custom_job";

const ENVIRONMENT_ID: &str = "environment_id";
const ENVIRONMENT_VERSION_ID: &str = "environment_version_id";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct CustomJobState {
    id: Option<String>,
    name: String,
    description: Option<String>,
    job_type: Option<String>,
    environment_id: Option<String>,
    environment_version_id: Option<String>,
    runtime_parameter_values: Option<Vec<RuntimeParameterValue>>,
    #[serde(flatten)]
    sources: LocalSources,
}

impl CustomJobState {
    fn refresh(&mut self, job: CustomJob) {
        self.id = Some(job.id);
        self.name = job.name;
        self.description = non_empty(job.description).or(self.description.take());
        self.job_type = non_empty(job.job_type).or(self.job_type.take());
        self.environment_id = non_empty(job.environment_id);
        self.environment_version_id = non_empty(job.environment_version_id);
    }
}

/// The `datarobot_custom_job` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomJobResource;

/// Keep one environment attribute from `prior` when the config leaves it
/// unset and its sibling is unset or unchanged.
fn carry_environment(planned: &mut Value, prior: &Value, name: &str, sibling: &str) {
    let unset = |state: &Value, key: &str| state.get(key).map_or(true, Value::is_null);
    if !unset(planned, name) {
        return;
    }
    if !unset(planned, sibling) && planned.get(sibling) != prior.get(sibling) {
        return;
    }
    if let (Some(value), Value::Object(map)) = (prior.get(name).cloned(), planned) {
        map.insert(name.to_string(), value);
    }
}

#[async_trait::async_trait]
impl Resource for CustomJobResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("Custom Job")
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_use_state_for_unknown()
                    .with_description("The ID of the Custom Job."),
            )
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the Custom Job."),
            )
            .with_attribute(
                "job_type",
                Attribute::optional_string()
                    .with_default(json!("default"))
                    .with_force_new()
                    .with_description("The type of the Custom Job."),
            )
            .with_attribute(
                "description",
                Attribute::optional_string().with_description("The description of the Custom Job."),
            )
            .with_attribute(
                ENVIRONMENT_ID,
                Attribute::optional_computed_string()
                    .with_description("The ID of the environment to use with the Job."),
            )
            .with_attribute(
                ENVIRONMENT_VERSION_ID,
                Attribute::optional_computed_string()
                    .with_description("The ID of the environment version to use with the Job."),
            )
            .with_block("runtime_parameter_values", RuntimeParameterValue::block());
        LocalSources::with_schema(schema, "Custom Job")
    }

    fn modify_plan(
        &self,
        prior: Option<&Value>,
        planned: &mut Value,
        options: &WalkOptions,
    ) -> Result<(), ProviderError> {
        apply_source_hashes(planned, options)?;
        if let Some(prior) = prior {
            carry_environment(planned, prior, ENVIRONMENT_ID, ENVIRONMENT_VERSION_ID);
            carry_environment(planned, prior, ENVIRONMENT_VERSION_ID, ENVIRONMENT_ID);
        }
        Ok(())
    }

    async fn create(&self, ctx: &ResourceContext, planned: Value) -> Result<Value, ProviderError> {
        let mut plan: CustomJobState = from_state(planned)?;
        let uploads = plan.sources.read_uploads(&ctx.walk_options)?;

        let mut job = ctx
            .service
            .create_custom_job(&CreateCustomJobRequest {
                name: plan.name.clone(),
                description: plan.description.clone(),
                job_type: plan.job_type.clone().unwrap_or_else(|| "default".to_string()),
                environment_id: plan.environment_id.clone(),
                environment_version_id: plan.environment_version_id.clone(),
                runtime_parameter_values: encode_runtime_parameters(
                    plan.runtime_parameter_values.as_deref(),
                )?,
            })
            .await?;
        info!(custom_job_id = %job.id, "Created Custom Job");

        if !uploads.is_empty() {
            job = ctx.service.update_custom_job_files(&job.id, &uploads).await?;
        }

        plan.id = Some(job.id);
        plan.environment_id = non_empty(job.environment_id).or(plan.environment_id);
        plan.environment_version_id =
            non_empty(job.environment_version_id).or(plan.environment_version_id);
        to_state(&plan)
    }

    async fn read(&self, ctx: &ResourceContext, state: Value) -> Result<Option<Value>, ProviderError> {
        let mut current: CustomJobState = from_state(state)?;
        let id = require_id(&current.id, TYPE_NAME)?.to_string();

        let Some(job) = found(ctx.service.get_custom_job(&id).await, TYPE_NAME, &id)? else {
            return Ok(None);
        };
        current.refresh(job);
        to_state(&current).map(Some)
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let state: CustomJobState = from_state(prior)?;
        let mut plan: CustomJobState = from_state(planned)?;
        let id = require_id(&state.id, TYPE_NAME)?.to_string();

        if plan.sources.changed_from(&state.sources) {
            let uploads = plan.sources.read_uploads(&ctx.walk_options)?;
            info!(custom_job_id = %id, files = uploads.len(), "Local sources changed, uploading Custom Job files");
            ctx.service.update_custom_job_files(&id, &uploads).await?;
        }

        let job = ctx
            .service
            .update_custom_job(
                &id,
                &UpdateCustomJobRequest {
                    name: plan.name.clone(),
                    description: plan.description.clone(),
                    environment_id: plan.environment_id.clone(),
                    environment_version_id: plan.environment_version_id.clone(),
                    runtime_parameter_values: encode_runtime_parameters(
                        plan.runtime_parameter_values.as_deref(),
                    )?,
                },
            )
            .await?;

        plan.id = Some(id);
        plan.environment_id = non_empty(job.environment_id).or(plan.environment_id);
        plan.environment_version_id =
            non_empty(job.environment_version_id).or(plan.environment_version_id);
        to_state(&plan)
    }

    async fn delete(&self, ctx: &ResourceContext, state: Value) -> Result<(), ProviderError> {
        let state: CustomJobState = from_state(state)?;
        let id = require_id(&state.id, TYPE_NAME)?;
        deleted(ctx.service.delete_custom_job(id).await)
    }
}
