//! `datarobot_dataset_from_file`: a catalog dataset uploaded from one local
//! file. Datasets cannot be re-uploaded in place, so any change to the file
//! path or its content replaces the dataset.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{deleted, found, from_state, require_id, to_state};
use crate::client::UpdateDatasetRequest;
use crate::error::{FileError, ProviderError};
use crate::files::{read_file, WalkOptions};
use crate::plan::{apply_file_hash, FILE_HASH, FILE_PATH};
use crate::resource::{Resource, ResourceContext};
use crate::schema::{Attribute, Schema};

pub const TYPE_NAME: &str = "datarobot_dataset_from_file";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct DatasetState {
    id: Option<String>,
    file_path: String,
    file_hash: Option<String>,
    name: Option<String>,
}

/// The `datarobot_dataset_from_file` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetFromFileResource;

#[async_trait::async_trait]
impl Resource for DatasetFromFileResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Dataset from file")
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_use_state_for_unknown()
                    .with_description("The ID of the Dataset."),
            )
            .with_attribute(
                FILE_PATH,
                Attribute::required_string()
                    .with_force_new()
                    .with_description("The path to the file to upload."),
            )
            .with_attribute(
                FILE_HASH,
                Attribute::computed_string()
                    .with_force_new()
                    .with_description("The SHA-256 hash of the file contents."),
            )
            .with_attribute(
                "name",
                Attribute::optional_computed_string()
                    .with_use_state_for_unknown()
                    .with_description("The name of the Dataset. Defaults to the file name."),
            )
    }

    fn modify_plan(
        &self,
        _prior: Option<&Value>,
        planned: &mut Value,
        _options: &WalkOptions,
    ) -> Result<(), ProviderError> {
        apply_file_hash(planned)
    }

    async fn create(&self, ctx: &ResourceContext, planned: Value) -> Result<Value, ProviderError> {
        let mut plan: DatasetState = from_state(planned)?;
        let path = Path::new(&plan.file_path);
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ProviderError::local_file(FILE_PATH, FileError::NotAFile { path: path.to_path_buf() })
            })?
            .to_string();
        let content = read_file(path).map_err(|err| ProviderError::local_file(FILE_PATH, err))?;

        let created = ctx.service.create_dataset_from_file(&file_name, &content).await?;
        info!(dataset_id = %created.id, bytes = content.len(), "Uploaded Dataset");

        let name = match plan.name.take() {
            Some(name) if name != file_name => {
                ctx.service
                    .update_dataset(&created.id, &UpdateDatasetRequest { name })
                    .await?
                    .name
            },
            _ => file_name,
        };

        plan.id = Some(created.id);
        plan.name = Some(name);
        to_state(&plan)
    }

    async fn read(&self, ctx: &ResourceContext, state: Value) -> Result<Option<Value>, ProviderError> {
        let mut current: DatasetState = from_state(state)?;
        let id = require_id(&current.id, TYPE_NAME)?.to_string();

        let Some(dataset) = found(ctx.service.get_dataset(&id).await, TYPE_NAME, &id)? else {
            return Ok(None);
        };
        if !dataset.name.is_empty() {
            current.name = Some(dataset.name);
        }
        to_state(&current).map(Some)
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let state: DatasetState = from_state(prior)?;
        let mut plan: DatasetState = from_state(planned)?;
        let id = require_id(&state.id, TYPE_NAME)?.to_string();

        if let Some(name) = plan.name.clone().filter(|name| Some(name) != state.name.as_ref()) {
            let dataset = ctx
                .service
                .update_dataset(&id, &UpdateDatasetRequest { name })
                .await?;
            plan.name = Some(dataset.name);
        }

        plan.id = Some(id);
        to_state(&plan)
    }

    async fn delete(&self, ctx: &ResourceContext, state: Value) -> Result<(), ProviderError> {
        let state: DatasetState = from_state(state)?;
        let id = require_id(&state.id, TYPE_NAME)?;
        deleted(ctx.service.delete_dataset(id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Service;
    use crate::plan::plan_resource;
    use crate::testing::{
        assert_plan_changes_attribute, assert_plan_no_changes, assert_plan_replaces,
        assert_plan_updates_in_place, MemoryService,
    };
    use serde_json::json;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(service: &Arc<MemoryService>) -> ResourceContext {
        ResourceContext::new(service.clone(), WalkOptions::default())
    }

    #[tokio::test]
    async fn test_create_defaults_name_to_file_name() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("train.csv");
        fs::write(&csv, "a,b\n1,2\n").unwrap();
        let service = Arc::new(MemoryService::new());

        let plan = plan_resource(
            &DatasetFromFileResource,
            None,
            json!({"file_path": csv.to_str().unwrap()}),
            &WalkOptions::default(),
        )
        .unwrap();
        let state = DatasetFromFileResource
            .create(&context(&service), plan.planned_state)
            .await
            .unwrap();

        let id = state["id"].as_str().unwrap();
        assert_eq!(state["name"], "train.csv");
        assert_eq!(service.files(id)[""], b"a,b\n1,2\n");
        assert_eq!(service.calls(), vec![format!("create_dataset_from_file {id}")]);
    }

    #[tokio::test]
    async fn test_content_change_replaces_rename_updates() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("train.csv");
        fs::write(&csv, "a,b\n1,2\n").unwrap();
        let config = json!({"file_path": csv.to_str().unwrap(), "name": "training"});
        let service = Arc::new(MemoryService::new());

        let plan =
            plan_resource(&DatasetFromFileResource, None, config.clone(), &WalkOptions::default())
                .unwrap();
        let state = DatasetFromFileResource
            .create(&context(&service), plan.planned_state)
            .await
            .unwrap();
        assert_eq!(service.dataset(state["id"].as_str().unwrap()).unwrap().name, "training");

        let plan = plan_resource(&DatasetFromFileResource, Some(&state), config.clone(), &WalkOptions::default())
            .unwrap();
        assert_plan_no_changes(&plan);

        let mut renamed = config.clone();
        renamed["name"] = json!("training-v2");
        let plan = plan_resource(&DatasetFromFileResource, Some(&state), renamed, &WalkOptions::default())
            .unwrap();
        assert_plan_updates_in_place(&plan);
        let updated = DatasetFromFileResource
            .update(&context(&service), state.clone(), plan.planned_state)
            .await
            .unwrap();
        assert_eq!(updated["name"], "training-v2");

        fs::write(&csv, "a,b\n3,4\n").unwrap();
        let plan = plan_resource(&DatasetFromFileResource, Some(&updated), config, &WalkOptions::default())
            .unwrap();
        assert_plan_changes_attribute(&plan, FILE_HASH);
        assert_plan_replaces(&plan);
    }

    #[tokio::test]
    async fn test_missing_file_fails_plan() {
        let dir = TempDir::new().unwrap();
        let err = plan_resource(
            &DatasetFromFileResource,
            None,
            json!({"file_path": dir.path().join("gone.csv").to_str().unwrap()}),
            &WalkOptions::default(),
        )
        .unwrap_err();

        let diagnostic = err.to_diagnostic();
        assert_eq!(diagnostic.attribute.as_deref(), Some(FILE_PATH));
    }

    #[tokio::test]
    async fn test_read_drops_deleted_dataset() {
        let service = Arc::new(MemoryService::new());
        let created = service.create_dataset_from_file("x.csv", b"1").await.unwrap();
        let ctx = context(&service);
        let state = json!({"id": created.id.clone(), "file_path": "x.csv"});

        let refreshed = DatasetFromFileResource.read(&ctx, state.clone()).await.unwrap().unwrap();
        assert_eq!(refreshed["name"], "x.csv");

        service.remove(&created.id);
        assert!(DatasetFromFileResource.read(&ctx, state.clone()).await.unwrap().is_none());
        assert!(DatasetFromFileResource.import(&ctx, "missing").await.unwrap().is_none());
    }
}
