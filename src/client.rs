//! The DataRobot API collaborator.
//!
//! Resources never talk HTTP themselves. They call a [`Service`], which is
//! injected into the provider at construction time. The REST implementation
//! lives outside this crate; tests use [`crate::testing::MemoryService`].
//!
//! Request and response models mirror the JSON bodies of the public API
//! (`camelCase` field names).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by a [`Service`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The entity does not exist (HTTP 404).
    #[error("{resource} not found")]
    NotFound {
        /// Human readable name of the entity, e.g. `Custom Model 65f0...`.
        resource: String,
    },

    /// The token is not allowed to access the entity (HTTP 401/403).
    #[error("access denied to {resource}")]
    Unauthorized {
        /// Human readable name of the entity.
        resource: String,
    },

    /// Any other unsuccessful response.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the response body.
        message: String,
    },
}

impl ClientError {
    /// Shorthand for [`ClientError::NotFound`].
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Shorthand for [`ClientError::Unauthorized`].
    pub fn unauthorized(resource: impl Into<String>) -> Self {
        Self::Unauthorized {
            resource: resource.into(),
        }
    }
}

/// One file sent in a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
    /// Destination path inside the artifact.
    pub path: String,
    /// File bytes.
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// A file stored in a remote version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileItem {
    pub id: String,
    pub file_name: String,
    pub file_path: String,
    /// `local` for uploaded files, otherwise the remote repository kind.
    pub file_source: String,
}

impl FileItem {
    /// Whether the item was uploaded from the local filesystem.
    pub fn is_local(&self) -> bool {
        self.file_source == "local"
    }
}

// Custom models

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomModel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub target_type: String,
    pub target_name: String,
    pub custom_model_type: String,
    pub language: String,
    pub latest_version: CustomModelVersion,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomModelVersion {
    pub id: String,
    pub custom_model_id: String,
    pub base_environment_id: String,
    pub items: Vec<FileItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomModelRequest {
    pub name: String,
    pub target_type: String,
    pub target_name: String,
    pub custom_model_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomModelRequest {
    pub name: String,
    pub description: String,
}

/// Copy the latest version, optionally dropping items.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomModelVersionFromLatestRequest {
    pub is_major_update: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_environment_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files_to_delete: Vec<String>,
}

/// Copy the latest version and add (or overwrite) the given files.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomModelVersionFromFilesRequest {
    pub base_environment_id: String,
    pub files: Vec<FileUpload>,
}

// Custom jobs

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomJob {
    pub id: String,
    pub name: String,
    pub description: String,
    pub job_type: String,
    pub environment_id: String,
    pub environment_version_id: String,
    pub items: Vec<FileItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomJobRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub job_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_version_id: Option<String>,
    /// JSON-encoded list of runtime parameter values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_parameter_values: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomJobRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_version_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_parameter_values: Option<String>,
}

// Application sources

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationSource {
    pub id: String,
    pub name: String,
    pub latest_version: ApplicationSourceVersion,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationSourceVersion {
    pub id: String,
    pub label: String,
    pub base_environment_id: String,
    pub items: Vec<FileItem>,
    pub resources: ApplicationResources,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_affinity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_web_requests_on_root_path: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationSourceRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationSourceVersionRequest {
    pub label: String,
    /// Version to copy items from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_environment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ApplicationResources>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_parameter_values: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationSourceVersionRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files_to_delete: Vec<String>,
}

// Datasets

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dataset {
    #[serde(rename = "datasetId")]
    pub id: String,
    pub name: String,
    pub version_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateDatasetVersionResponse {
    #[serde(rename = "catalogId")]
    pub id: String,
    #[serde(rename = "catalogVersionId")]
    pub version_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDatasetRequest {
    pub name: String,
}

/// DataRobot API capabilities used by the file-backed resources.
#[async_trait::async_trait]
pub trait Service: Send + Sync {
    async fn create_custom_model(
        &self,
        req: &CreateCustomModelRequest,
    ) -> Result<CustomModel, ClientError>;
    async fn get_custom_model(&self, id: &str) -> Result<CustomModel, ClientError>;
    async fn update_custom_model(
        &self,
        id: &str,
        req: &UpdateCustomModelRequest,
    ) -> Result<CustomModel, ClientError>;
    async fn delete_custom_model(&self, id: &str) -> Result<(), ClientError>;
    async fn create_custom_model_version_from_latest(
        &self,
        id: &str,
        req: &CreateCustomModelVersionFromLatestRequest,
    ) -> Result<CustomModelVersion, ClientError>;
    async fn create_custom_model_version_from_files(
        &self,
        id: &str,
        req: &CreateCustomModelVersionFromFilesRequest,
    ) -> Result<CustomModelVersion, ClientError>;

    async fn create_custom_job(&self, req: &CreateCustomJobRequest)
        -> Result<CustomJob, ClientError>;
    async fn get_custom_job(&self, id: &str) -> Result<CustomJob, ClientError>;
    async fn update_custom_job(
        &self,
        id: &str,
        req: &UpdateCustomJobRequest,
    ) -> Result<CustomJob, ClientError>;
    async fn update_custom_job_files(
        &self,
        id: &str,
        files: &[FileUpload],
    ) -> Result<CustomJob, ClientError>;
    async fn delete_custom_job(&self, id: &str) -> Result<(), ClientError>;

    async fn create_application_source(&self) -> Result<ApplicationSource, ClientError>;
    async fn get_application_source(&self, id: &str) -> Result<ApplicationSource, ClientError>;
    async fn update_application_source(
        &self,
        id: &str,
        req: &UpdateApplicationSourceRequest,
    ) -> Result<ApplicationSource, ClientError>;
    async fn create_application_source_version(
        &self,
        id: &str,
        req: &CreateApplicationSourceVersionRequest,
    ) -> Result<ApplicationSourceVersion, ClientError>;
    async fn update_application_source_version(
        &self,
        id: &str,
        version_id: &str,
        req: &UpdateApplicationSourceVersionRequest,
    ) -> Result<ApplicationSourceVersion, ClientError>;
    async fn update_application_source_version_files(
        &self,
        id: &str,
        version_id: &str,
        files: &[FileUpload],
    ) -> Result<ApplicationSourceVersion, ClientError>;
    async fn delete_application_source(&self, id: &str) -> Result<(), ClientError>;

    async fn create_dataset_from_file(
        &self,
        file_name: &str,
        content: &[u8],
    ) -> Result<CreateDatasetVersionResponse, ClientError>;
    async fn get_dataset(&self, id: &str) -> Result<Dataset, ClientError>;
    async fn update_dataset(
        &self,
        id: &str,
        req: &UpdateDatasetRequest,
    ) -> Result<Dataset, ClientError>;
    async fn delete_dataset(&self, id: &str) -> Result<(), ClientError>;
}
