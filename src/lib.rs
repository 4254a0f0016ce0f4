//! DataRobot Provider
//!
//! The core of a Terraform provider for DataRobot artifacts built from local
//! files: custom models, custom jobs, application sources and datasets.
//!
//! # Overview
//!
//! - **Local file hashing**: SHA-256 of single files and of whole folder
//!   trees, plus the deduplicated upload list built from `files` and
//!   `folder_path` ([`files`])
//! - **Plan hook**: recomputes those hashes on every plan so an edit on disk
//!   becomes an attribute diff ([`plan`])
//! - **Resources**: one [`Resource`] implementation per entity type, backed by
//!   an injected DataRobot API [`client::Service`] ([`resources`])
//! - **Provider**: [`DataRobotProvider`] routes each [`ProviderService`]
//!   operation to the right resource
//! - **Logging**: `tracing` integration honoring `TF_LOG` ([`logging`])
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use datarobot_provider::{init_logging, DataRobotProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = DataRobotProvider::new(Arc::new(MyRestClient::new()));
//!     provider.configure(json!({"api_key": "..."})).await?;
//!
//!     let plan = provider
//!         .plan(
//!             "datarobot_custom_model",
//!             None,
//!             json!({"name": "fraud", "folder_path": "model/"}),
//!             serde_json::Value::Null,
//!         )
//!         .await?;
//!     println!("{:?}", plan.changes);
//!     Ok(())
//! }
//! ```
//!
//! # Change detection
//!
//! File contents never enter state. `files_hashes`, `folder_path_hash` and
//! `file_hash` are computed attributes filled in at plan time:
//!
//! - `files_hashes`: one SHA-256 per `files` element, in order
//! - `folder_path_hash`: SHA-256 over every `(relative path, file hash)` pair
//!   of the folder, in sorted path order; an absent or empty folder hashes to
//!   `sha256("")`
//! - `file_hash`: SHA-256 of `file_path`
//!
//! Whether a hash change is an in-place update (a new model version, a
//! re-upload) or a replacement is declared by the resource schema.

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod files;
pub mod logging;
pub mod plan;
pub mod protocol;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::{ClientError, Service};
pub use config::ProviderConfig;
pub use error::{FileError, ProviderError};
pub use files::{hash_file, hash_folder, prepare_local_files, FileHash, FolderHash, WalkOptions};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use plan::plan_resource;
pub use protocol::ProviderService;
pub use provider::DataRobotProvider;
pub use resource::{Resource, ResourceContext};
pub use schema::ProviderSchema;
pub use types::{
    AttributeChange, ChangeKind, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
