//! Test harness and an in-memory DataRobot API.
//!
//! [`ProviderTester`] drives a [`ProviderService`] the way the engine does,
//! without a plugin transport. [`MemoryService`] is a [`Service`] that keeps
//! every entity in memory and records each call, so resource behavior can be
//! checked end to end.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use datarobot_provider::testing::{MemoryService, ProviderTester};
//! use datarobot_provider::DataRobotProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_custom_job() {
//!     let service = Arc::new(MemoryService::new());
//!     let tester = ProviderTester::new(DataRobotProvider::new(service.clone()));
//!     tester.configure(json!({"api_key": "test"})).await.unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("datarobot_custom_job", json!({"name": "nightly"}))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["name"], "nightly");
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::client::{
    ApplicationSource, ApplicationSourceVersion, ClientError, CreateApplicationSourceVersionRequest,
    CreateCustomJobRequest, CreateCustomModelRequest, CreateCustomModelVersionFromFilesRequest,
    CreateCustomModelVersionFromLatestRequest, CreateDatasetVersionResponse, CustomJob, CustomModel,
    CustomModelVersion, Dataset, FileItem, FileUpload, Service, UpdateApplicationSourceRequest,
    UpdateApplicationSourceVersionRequest, UpdateCustomJobRequest, UpdateCustomModelRequest,
    UpdateDatasetRequest,
};
use crate::error::ProviderError;
use crate::protocol::ProviderService;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::types::{ImportedResource, PlanResult};

/// A test harness for provider implementations.
///
/// Wraps a [`ProviderService`] and exposes each engine call, plus plan and
/// apply sequences, as plain async methods.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get a mutable reference to the underlying provider.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Ok(())` if validation passes (no error diagnostics).
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Ok(())` if configuration succeeds.
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Full plan operation with explicit config.
    pub async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, prior_state, proposed_state, config)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Upgrade resource state from an older schema version.
    pub async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .upgrade_resource_state(resource_type, version, state)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan → create → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;

        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;

        self.read(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan → update → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;

        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;

        self.read(resource_type, updated_state).await
    }

    /// Run a full delete lifecycle: plan → delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;

        self.delete(resource_type, current_state).await
    }

    /// Run a full CRUD lifecycle: create → read → update → read → delete.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created_state = self.lifecycle_create(resource_type, initial_config).await?;

        let updated_state = self
            .lifecycle_update(resource_type, created_state.clone(), updated_config)
            .await?;

        self.lifecycle_delete(resource_type, updated_state.clone())
            .await?;

        Ok(updated_state)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan result indicates changes are needed.
///
/// # Panics
///
/// Panics if the plan has no changes.
pub fn assert_plan_has_changes(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes, but got no changes"
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan does not have a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan has a change for the given path.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        !has_change,
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

// =========================================================================
// In-memory API
// =========================================================================

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    calls: Vec<String>,
    contents: BTreeMap<String, Vec<u8>>,
    custom_models: BTreeMap<String, CustomModel>,
    custom_jobs: BTreeMap<String, CustomJob>,
    application_sources: BTreeMap<String, ApplicationSource>,
    datasets: BTreeMap<String, Dataset>,
}

impl Store {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn record(&mut self, call: &str, id: &str) {
        self.calls.push(if id.is_empty() {
            call.to_string()
        } else {
            format!("{call} {id}")
        });
    }

    /// Store uploads as local items, replacing items at the same path.
    fn upload(&mut self, items: &mut Vec<FileItem>, files: &[FileUpload]) {
        for file in files {
            items.retain(|item| item.file_path != file.path);
            let id = self.id("item");
            self.contents.insert(id.clone(), file.content.clone());
            let file_name = file.path.rsplit('/').next().unwrap_or(&file.path).to_string();
            items.push(FileItem {
                id,
                file_name,
                file_path: file.path.clone(),
                file_source: "local".to_string(),
            });
        }
    }
}

/// An in-memory [`Service`].
///
/// Ids are `<kind>-<n>` from a single counter. Every call is recorded as
/// `"<method> <id>"` and can be inspected with [`MemoryService::calls`].
#[derive(Debug, Default)]
pub struct MemoryService {
    store: Mutex<Store>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.store().calls.clone()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.store().calls.clear();
    }

    /// Delete an entity behind the provider's back.
    pub fn remove(&self, id: &str) {
        let mut store = self.store();
        store.custom_models.remove(id);
        store.custom_jobs.remove(id);
        store.application_sources.remove(id);
        store.datasets.remove(id);
    }

    /// Add a non-local item to a custom model's latest version.
    pub fn add_remote_model_item(&self, id: &str, path: &str) {
        let mut store = self.store();
        let item_id = store.id("item");
        if let Some(model) = store.custom_models.get_mut(id) {
            model.latest_version.items.push(FileItem {
                id: item_id,
                file_name: path.to_string(),
                file_path: path.to_string(),
                file_source: "github".to_string(),
            });
        }
    }

    /// Current files of an entity's latest version, by path.
    pub fn files(&self, id: &str) -> BTreeMap<String, Vec<u8>> {
        let store = self.store();
        let items = if let Some(model) = store.custom_models.get(id) {
            model.latest_version.items.clone()
        } else if let Some(job) = store.custom_jobs.get(id) {
            job.items.clone()
        } else if let Some(source) = store.application_sources.get(id) {
            source.latest_version.items.clone()
        } else if store.datasets.contains_key(id) {
            return store
                .contents
                .get(id)
                .map(|content| BTreeMap::from([(String::new(), content.clone())]))
                .unwrap_or_default();
        } else {
            Vec::new()
        };
        items
            .into_iter()
            .map(|item| {
                let content = store.contents.get(&item.id).cloned().unwrap_or_default();
                (item.file_path, content)
            })
            .collect()
    }

    pub fn custom_model(&self, id: &str) -> Option<CustomModel> {
        self.store().custom_models.get(id).cloned()
    }

    pub fn custom_job(&self, id: &str) -> Option<CustomJob> {
        self.store().custom_jobs.get(id).cloned()
    }

    pub fn application_source(&self, id: &str) -> Option<ApplicationSource> {
        self.store().application_sources.get(id).cloned()
    }

    pub fn dataset(&self, id: &str) -> Option<Dataset> {
        self.store().datasets.get(id).cloned()
    }
}

fn missing(kind: &str, id: &str) -> ClientError {
    ClientError::not_found(format!("{kind} {id}"))
}

#[async_trait::async_trait]
impl Service for MemoryService {
    async fn create_custom_model(
        &self,
        req: &CreateCustomModelRequest,
    ) -> Result<CustomModel, ClientError> {
        let mut store = self.store();
        let id = store.id("cm");
        let version_id = store.id("cmv");
        store.record("create_custom_model", &id);
        let model = CustomModel {
            id: id.clone(),
            name: req.name.clone(),
            description: req.description.clone().unwrap_or_default(),
            target_type: req.target_type.clone(),
            target_name: req.target_name.clone(),
            custom_model_type: req.custom_model_type.clone(),
            language: req.language.clone().unwrap_or_default(),
            latest_version: CustomModelVersion {
                id: version_id,
                custom_model_id: id.clone(),
                ..Default::default()
            },
        };
        store.custom_models.insert(id, model.clone());
        Ok(model)
    }

    async fn get_custom_model(&self, id: &str) -> Result<CustomModel, ClientError> {
        let mut store = self.store();
        store.record("get_custom_model", id);
        store
            .custom_models
            .get(id)
            .cloned()
            .ok_or_else(|| missing("Custom Model", id))
    }

    async fn update_custom_model(
        &self,
        id: &str,
        req: &UpdateCustomModelRequest,
    ) -> Result<CustomModel, ClientError> {
        let mut store = self.store();
        store.record("update_custom_model", id);
        let model = store
            .custom_models
            .get_mut(id)
            .ok_or_else(|| missing("Custom Model", id))?;
        model.name = req.name.clone();
        model.description = req.description.clone();
        Ok(model.clone())
    }

    async fn delete_custom_model(&self, id: &str) -> Result<(), ClientError> {
        let mut store = self.store();
        store.record("delete_custom_model", id);
        store
            .custom_models
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| missing("Custom Model", id))
    }

    async fn create_custom_model_version_from_latest(
        &self,
        id: &str,
        req: &CreateCustomModelVersionFromLatestRequest,
    ) -> Result<CustomModelVersion, ClientError> {
        let mut store = self.store();
        store.record("create_custom_model_version_from_latest", id);
        let version_id = store.id("cmv");
        let model = store
            .custom_models
            .get_mut(id)
            .ok_or_else(|| missing("Custom Model", id))?;
        let version = &mut model.latest_version;
        version.id = version_id;
        version
            .items
            .retain(|item| !req.files_to_delete.contains(&item.id));
        if !req.base_environment_id.is_empty() {
            version.base_environment_id = req.base_environment_id.clone();
        }
        Ok(version.clone())
    }

    async fn create_custom_model_version_from_files(
        &self,
        id: &str,
        req: &CreateCustomModelVersionFromFilesRequest,
    ) -> Result<CustomModelVersion, ClientError> {
        let mut store = self.store();
        store.record("create_custom_model_version_from_files", id);
        let version_id = store.id("cmv");
        let mut version = store
            .custom_models
            .get(id)
            .map(|model| model.latest_version.clone())
            .ok_or_else(|| missing("Custom Model", id))?;
        version.id = version_id;
        if !req.base_environment_id.is_empty() {
            version.base_environment_id = req.base_environment_id.clone();
        }
        store.upload(&mut version.items, &req.files);
        if let Some(model) = store.custom_models.get_mut(id) {
            model.latest_version = version.clone();
        }
        Ok(version)
    }

    async fn create_custom_job(
        &self,
        req: &CreateCustomJobRequest,
    ) -> Result<CustomJob, ClientError> {
        let mut store = self.store();
        let id = store.id("cj");
        store.record("create_custom_job", &id);
        let job = CustomJob {
            id: id.clone(),
            name: req.name.clone(),
            description: req.description.clone().unwrap_or_default(),
            job_type: req.job_type.clone(),
            environment_id: req.environment_id.clone().unwrap_or_default(),
            environment_version_id: req.environment_version_id.clone().unwrap_or_default(),
            items: Vec::new(),
        };
        store.custom_jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn get_custom_job(&self, id: &str) -> Result<CustomJob, ClientError> {
        let mut store = self.store();
        store.record("get_custom_job", id);
        store
            .custom_jobs
            .get(id)
            .cloned()
            .ok_or_else(|| missing("Custom Job", id))
    }

    async fn update_custom_job(
        &self,
        id: &str,
        req: &UpdateCustomJobRequest,
    ) -> Result<CustomJob, ClientError> {
        let mut store = self.store();
        store.record("update_custom_job", id);
        let job = store
            .custom_jobs
            .get_mut(id)
            .ok_or_else(|| missing("Custom Job", id))?;
        job.name = req.name.clone();
        if let Some(description) = &req.description {
            job.description = description.clone();
        }
        if let Some(environment_id) = &req.environment_id {
            job.environment_id = environment_id.clone();
        }
        if let Some(environment_version_id) = &req.environment_version_id {
            job.environment_version_id = environment_version_id.clone();
        }
        Ok(job.clone())
    }

    async fn update_custom_job_files(
        &self,
        id: &str,
        files: &[FileUpload],
    ) -> Result<CustomJob, ClientError> {
        let mut store = self.store();
        store.record("update_custom_job_files", id);
        let mut job = store
            .custom_jobs
            .get(id)
            .cloned()
            .ok_or_else(|| missing("Custom Job", id))?;
        store.upload(&mut job.items, files);
        store.custom_jobs.insert(id.to_string(), job.clone());
        Ok(job)
    }

    async fn delete_custom_job(&self, id: &str) -> Result<(), ClientError> {
        let mut store = self.store();
        store.record("delete_custom_job", id);
        store
            .custom_jobs
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| missing("Custom Job", id))
    }

    async fn create_application_source(&self) -> Result<ApplicationSource, ClientError> {
        let mut store = self.store();
        let id = store.id("as");
        store.record("create_application_source", &id);
        let source = ApplicationSource {
            id: id.clone(),
            name: format!("Application Source {}", store.next_id),
            latest_version: ApplicationSourceVersion::default(),
        };
        store.application_sources.insert(id, source.clone());
        Ok(source)
    }

    async fn get_application_source(&self, id: &str) -> Result<ApplicationSource, ClientError> {
        let mut store = self.store();
        store.record("get_application_source", id);
        store
            .application_sources
            .get(id)
            .cloned()
            .ok_or_else(|| missing("Application Source", id))
    }

    async fn update_application_source(
        &self,
        id: &str,
        req: &UpdateApplicationSourceRequest,
    ) -> Result<ApplicationSource, ClientError> {
        let mut store = self.store();
        store.record("update_application_source", id);
        let source = store
            .application_sources
            .get_mut(id)
            .ok_or_else(|| missing("Application Source", id))?;
        source.name = req.name.clone();
        Ok(source.clone())
    }

    async fn create_application_source_version(
        &self,
        id: &str,
        req: &CreateApplicationSourceVersionRequest,
    ) -> Result<ApplicationSourceVersion, ClientError> {
        let mut store = self.store();
        store.record("create_application_source_version", id);
        let version_id = store.id("asv");
        let source = store
            .application_sources
            .get_mut(id)
            .ok_or_else(|| missing("Application Source", id))?;
        let items = match &req.base_version {
            Some(base) if *base == source.latest_version.id => source.latest_version.items.clone(),
            Some(base) => return Err(missing("Application Source version", base)),
            None => Vec::new(),
        };
        source.latest_version = ApplicationSourceVersion {
            id: version_id,
            label: req.label.clone(),
            base_environment_id: req.base_environment_id.clone().unwrap_or_default(),
            items,
            resources: req.resources.clone().unwrap_or_default(),
        };
        Ok(source.latest_version.clone())
    }

    async fn update_application_source_version(
        &self,
        id: &str,
        version_id: &str,
        req: &UpdateApplicationSourceVersionRequest,
    ) -> Result<ApplicationSourceVersion, ClientError> {
        let mut store = self.store();
        store.record("update_application_source_version", id);
        let version = store
            .application_sources
            .get_mut(id)
            .map(|source| &mut source.latest_version)
            .filter(|version| version.id == version_id)
            .ok_or_else(|| missing("Application Source version", version_id))?;
        version
            .items
            .retain(|item| !req.files_to_delete.contains(&item.id));
        Ok(version.clone())
    }

    async fn update_application_source_version_files(
        &self,
        id: &str,
        version_id: &str,
        files: &[FileUpload],
    ) -> Result<ApplicationSourceVersion, ClientError> {
        let mut store = self.store();
        store.record("update_application_source_version_files", id);
        let mut version = store
            .application_sources
            .get(id)
            .map(|source| source.latest_version.clone())
            .filter(|version| version.id == version_id)
            .ok_or_else(|| missing("Application Source version", version_id))?;
        store.upload(&mut version.items, files);
        if let Some(source) = store.application_sources.get_mut(id) {
            source.latest_version = version.clone();
        }
        Ok(version)
    }

    async fn delete_application_source(&self, id: &str) -> Result<(), ClientError> {
        let mut store = self.store();
        store.record("delete_application_source", id);
        store
            .application_sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| missing("Application Source", id))
    }

    async fn create_dataset_from_file(
        &self,
        file_name: &str,
        content: &[u8],
    ) -> Result<CreateDatasetVersionResponse, ClientError> {
        let mut store = self.store();
        let id = store.id("ds");
        let version_id = store.id("dsv");
        store.record("create_dataset_from_file", &id);
        store.contents.insert(id.clone(), content.to_vec());
        store.datasets.insert(
            id.clone(),
            Dataset {
                id: id.clone(),
                name: file_name.to_string(),
                version_id: version_id.clone(),
            },
        );
        Ok(CreateDatasetVersionResponse { id, version_id })
    }

    async fn get_dataset(&self, id: &str) -> Result<Dataset, ClientError> {
        let mut store = self.store();
        store.record("get_dataset", id);
        store
            .datasets
            .get(id)
            .cloned()
            .ok_or_else(|| missing("Dataset", id))
    }

    async fn update_dataset(&self, id: &str, req: &UpdateDatasetRequest) -> Result<Dataset, ClientError> {
        let mut store = self.store();
        store.record("update_dataset", id);
        let dataset = store
            .datasets
            .get_mut(id)
            .ok_or_else(|| missing("Dataset", id))?;
        dataset.name = req.name.clone();
        Ok(dataset.clone())
    }

    async fn delete_dataset(&self, id: &str) -> Result<(), ClientError> {
        let mut store = self.store();
        store.record("delete_dataset", id);
        store
            .datasets
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| missing("Dataset", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeChange;
    use serde_json::json;

    fn upload(path: &str, content: &str) -> FileUpload {
        FileUpload {
            path: path.to_string(),
            content: content.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_memory_service_custom_model_versions() {
        let service = MemoryService::new();
        let model = service
            .create_custom_model(&CreateCustomModelRequest {
                name: "fraud".to_string(),
                target_type: "Binary".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let version = service
            .create_custom_model_version_from_files(
                &model.id,
                &CreateCustomModelVersionFromFilesRequest {
                    base_environment_id: "env".to_string(),
                    files: vec![upload("a.py", "1"), upload("b.py", "2")],
                },
            )
            .await
            .unwrap();
        assert_ne!(version.id, model.latest_version.id);
        assert_eq!(version.base_environment_id, "env");

        let drop_a = version.items.iter().find(|item| item.file_path == "a.py").unwrap().id.clone();
        let version = service
            .create_custom_model_version_from_latest(
                &model.id,
                &CreateCustomModelVersionFromLatestRequest {
                    files_to_delete: vec![drop_a],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(version.base_environment_id, "env");
        assert_eq!(service.files(&model.id).keys().collect::<Vec<_>>(), vec!["b.py"]);
    }

    #[tokio::test]
    async fn test_memory_service_records_calls_and_not_found() {
        let service = MemoryService::new();
        let err = service.get_custom_job("cj-9").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        assert_eq!(err.to_string(), "Custom Job cj-9 not found");

        let job = service
            .create_custom_job(&CreateCustomJobRequest {
                name: "nightly".to_string(),
                job_type: "default".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        service
            .update_custom_job_files(&job.id, &[upload("run.sh", "echo")])
            .await
            .unwrap();
        service
            .update_custom_job_files(&job.id, &[upload("run.sh", "echo 2")])
            .await
            .unwrap();

        assert_eq!(service.files(&job.id)["run.sh"], b"echo 2");
        assert_eq!(service.custom_job(&job.id).unwrap().items.len(), 1);
        assert_eq!(
            service.calls(),
            vec![
                "get_custom_job cj-9".to_string(),
                format!("create_custom_job {}", job.id),
                format!("update_custom_job_files {}", job.id),
                format!("update_custom_job_files {}", job.id),
            ]
        );
    }

    #[tokio::test]
    async fn test_memory_service_application_source_versions() {
        let service = MemoryService::new();
        let source = service.create_application_source().await.unwrap();
        let first = service
            .create_application_source_version(
                &source.id,
                &CreateApplicationSourceVersionRequest {
                    label: "v1".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        service
            .update_application_source_version_files(&source.id, &first.id, &[upload("app.py", "x")])
            .await
            .unwrap();

        let second = service
            .create_application_source_version(
                &source.id,
                &CreateApplicationSourceVersionRequest {
                    label: "v2".to_string(),
                    base_version: Some(first.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);

        let stale = service
            .update_application_source_version_files(&source.id, &first.id, &[])
            .await;
        assert!(stale.is_err());
    }

    #[test]
    fn test_plan_assertions() {
        let plan = PlanResult::new(
            json!({"name": "fraud"}),
            vec![AttributeChange::added("name", json!("fraud"))],
            false,
        );
        assert_plan_creates(&plan);
        assert_plan_has_changes(&plan);
        assert_plan_changes_attribute(&plan, "name");
        assert_plan_does_not_change_attribute(&plan, "files_hashes");
        assert_plan_updates_in_place(&plan);

        assert_plan_no_changes(&PlanResult::unchanged(json!({"name": "fraud"})));
    }

    #[test]
    #[should_panic(expected = "Expected plan to require replacement")]
    fn test_assert_plan_replaces_fails() {
        assert_plan_replaces(&PlanResult::unchanged(json!({})));
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Error calculating folder_path hash")];
        assert_has_errors(&diagnostics);
        assert_error_contains(&diagnostics, "folder_path");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("Unable to find API key").with_attribute("api_key"),
            Diagnostic::error("Invalid files attribute").with_detail("element 0 has 3 members"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("Unable to find API key"));
        assert!(display.contains("(at api_key)"));
        assert!(display.contains("element 0 has 3 members"));
    }
}
