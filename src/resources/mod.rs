//! Resource types backed by local files.
//!
//! Each submodule is one Terraform resource. They share the `files` /
//! `folder_path` source handling defined here, so upload and change
//! detection behave the same everywhere.

pub mod application_source;
pub mod custom_job;
pub mod custom_model;
pub mod dataset_from_file;

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::client::{ClientError, FileUpload};
use crate::error::{FileError, ProviderError};
use crate::files::{parse_files, prepare_local_files, read_file, LocalFile, WalkOptions};
use crate::plan::{FILES, FILES_HASHES, FOLDER_PATH, FOLDER_PATH_HASH};
use crate::resource::Resource;
use crate::schema::{Attribute, Block, NestedBlock, Schema};

pub use application_source::ApplicationSourceResource;
pub use custom_job::CustomJobResource;
pub use custom_model::CustomModelResource;
pub use dataset_from_file::DatasetFromFileResource;

/// Every resource type the provider serves.
pub fn all() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(ApplicationSourceResource),
        Arc::new(CustomJobResource),
        Arc::new(CustomModelResource),
        Arc::new(DatasetFromFileResource),
    ]
}

/// The `files` / `folder_path` attributes and their computed hashes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSources {
    pub files: Value,
    pub folder_path: Option<String>,
    pub files_hashes: Option<Vec<String>>,
    pub folder_path_hash: Option<String>,
}

impl LocalSources {
    /// Add the source attributes to a resource schema.
    pub fn with_schema(schema: Schema, target: &str) -> Schema {
        schema
            .with_attribute(
                FILES,
                Attribute::optional_dynamic().with_description(format!(
                    "Files to upload to the {target}. Each element is a source path or a \
                     [source, destination] pair; the destination defaults to the file name."
                )),
            )
            .with_attribute(
                FOLDER_PATH,
                Attribute::optional_string().with_description(format!(
                    "Folder uploaded to the {target}, each file under its path relative to the folder."
                )),
            )
            .with_attribute(
                FILES_HASHES,
                Attribute::computed_string_list()
                    .with_description("SHA-256 of each file in files."),
            )
            .with_attribute(
                FOLDER_PATH_HASH,
                Attribute::computed_string()
                    .with_description("SHA-256 over every file under folder_path."),
            )
    }

    /// Whether the configured sources, or their content, differ from `prior`.
    pub fn changed_from(&self, prior: &LocalSources) -> bool {
        self != prior
    }

    /// Whether nothing is configured for upload.
    pub fn is_empty(&self) -> bool {
        let no_files = match &self.files {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            _ => false,
        };
        no_files && self.folder_path.is_none()
    }

    /// Prepare the deduplicated upload list.
    pub fn prepare(&self, options: &WalkOptions) -> Result<Vec<LocalFile>, ProviderError> {
        let files = parse_files(&self.files).map_err(|err| ProviderError::local_file(FILES, err))?;
        let folder = self.folder_path.as_deref().map(Path::new);
        prepare_local_files(folder, &files, options).map_err(|err| self.attribute_error(err))
    }

    /// Prepare the upload list and read every file.
    pub fn read_uploads(&self, options: &WalkOptions) -> Result<Vec<FileUpload>, ProviderError> {
        self.prepare(options)?
            .into_iter()
            .map(|file| {
                let content = read_file(&file.source).map_err(|err| self.attribute_error(err))?;
                Ok(FileUpload {
                    path: file.destination,
                    content,
                })
            })
            .collect()
    }

    fn attribute_error(&self, err: FileError) -> ProviderError {
        let in_folder = match (&self.folder_path, err.path()) {
            (Some(folder), Some(path)) => std::path::absolute(folder)
                .map(|folder| path.starts_with(folder))
                .unwrap_or(false),
            _ => false,
        };
        ProviderError::local_file(if in_folder { FOLDER_PATH } else { FILES }, err)
    }
}

/// A `runtime_parameter_values` block entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeParameterValue {
    pub key: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub value: String,
}

impl RuntimeParameterValue {
    /// Schema of the block.
    pub fn block() -> NestedBlock {
        NestedBlock::list(
            Block::new()
                .with_attribute(
                    "key",
                    Attribute::required_string().with_description("The name of the runtime parameter."),
                )
                .with_attribute(
                    "type",
                    Attribute::required_string().with_description("The type of the runtime parameter."),
                )
                .with_attribute(
                    "value",
                    Attribute::required_string().with_description("The value of the runtime parameter."),
                ),
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeParameterRequest<'a> {
    field_name: &'a str,
    #[serde(rename = "type")]
    param_type: &'a str,
    value: &'a str,
}

/// Encode runtime parameters the way the API expects them: a JSON string.
pub fn encode_runtime_parameters(
    values: Option<&[RuntimeParameterValue]>,
) -> Result<Option<String>, ProviderError> {
    let Some(values) = values.filter(|values| !values.is_empty()) else {
        return Ok(None);
    };
    let request: Vec<_> = values
        .iter()
        .map(|value| RuntimeParameterRequest {
            field_name: &value.key,
            param_type: &value.param_type,
            value: &value.value,
        })
        .collect();
    Ok(Some(serde_json::to_string(&request)?))
}

pub(crate) fn from_state<T: DeserializeOwned>(state: Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(state)?)
}

pub(crate) fn to_state<T: Serialize>(model: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(model)?)
}

pub(crate) fn require_id<'a>(id: &'a Option<String>, type_name: &str) -> Result<&'a str, ProviderError> {
    id.as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::InvalidRequest(format!("{type_name} state has no id")))
}

/// Map a NotFound lookup to `None` so the entity drops out of state.
pub(crate) fn found<T>(
    result: Result<T, ClientError>,
    type_name: &str,
    id: &str,
) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ClientError::NotFound { .. }) => {
            warn!(resource_type = type_name, id, "Remote entity not found, removing from state");
            Ok(None)
        },
        Err(err) => Err(err.into()),
    }
}

/// Treat deleting an entity that is already gone as success.
pub(crate) fn deleted(result: Result<(), ClientError>) -> Result<(), ProviderError> {
    match result {
        Ok(()) | Err(ClientError::NotFound { .. }) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
