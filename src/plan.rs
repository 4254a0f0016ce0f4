//! Planning: the local-file hash hook and the planned-vs-prior diff.
//!
//! File contents never go into state. Instead the hook hashes every local
//! source on each plan and writes the digests into computed attributes
//! (`files_hashes`, `folder_path_hash`, `file_hash`). An edit on disk then
//! shows up as an ordinary attribute diff, and the schema decides whether
//! that diff is an in-place update or a replacement.

use std::collections::BTreeSet;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ProviderError;
use crate::files::{files_hashes, hash_file, hash_folder, parse_files, WalkOptions};
use crate::resource::Resource;
use crate::schema::{Attribute, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Explicit file list: a string, `[src]` or `[src, dst]` per element.
pub const FILES: &str = "files";
/// One digest per `files` element.
pub const FILES_HASHES: &str = "files_hashes";
/// Folder uploaded recursively.
pub const FOLDER_PATH: &str = "folder_path";
/// Digest of the whole `folder_path` tree.
pub const FOLDER_PATH_HASH: &str = "folder_path_hash";
/// Single file uploaded as-is.
pub const FILE_PATH: &str = "file_path";
/// Digest of `file_path`.
pub const FILE_HASH: &str = "file_hash";

/// Plan one resource instance.
///
/// A null `proposed` state is a destroy: nothing on disk is touched and the
/// planned state stays null.
pub fn plan_resource(
    resource: &dyn Resource,
    prior: Option<&Value>,
    proposed: Value,
    options: &WalkOptions,
) -> Result<PlanResult, ProviderError> {
    if proposed.is_null() {
        debug!(resource_type = resource.type_name(), "Destroy plan, skipping hash recomputation");
        return Ok(PlanResult::destroy());
    }

    let Value::Object(mut planned) = proposed else {
        return Err(ProviderError::InvalidRequest(format!(
            "proposed state for {} must be an object",
            resource.type_name()
        )));
    };

    let prior = prior.filter(|state| !state.is_null());
    let schema = resource.schema();
    fill_defaults(&schema, &mut planned);
    if let Some(Value::Object(prior)) = prior {
        carry_prior_values(&schema, prior, &mut planned);
    }

    let mut planned = Value::Object(planned);
    resource.modify_plan(prior, &mut planned, options)?;

    let changes = diff(&schema, prior, &planned);
    let requires_replace = prior.is_some()
        && changes
            .iter()
            .any(|change| schema.forces_replacement(&change.path));

    Ok(PlanResult::new(planned, changes, requires_replace))
}

/// Recompute `files_hashes` and `folder_path_hash` from the planned sources.
///
/// A null `files` yields an empty list; a null `folder_path` yields a null
/// hash. A folder that is absent or empty hashes to the empty sentinel.
pub fn apply_source_hashes(planned: &mut Value, options: &WalkOptions) -> Result<(), ProviderError> {
    let files = parse_files(planned.get(FILES).unwrap_or(&Value::Null))
        .map_err(|err| ProviderError::local_file(FILES, err))?;
    let hashes = files_hashes(&files).map_err(|err| ProviderError::local_file(FILES, err))?;

    let folder_hash = match planned.get(FOLDER_PATH).and_then(Value::as_str) {
        Some(folder) => Some(
            hash_folder(Path::new(folder), options)
                .map_err(|err| ProviderError::local_file(FOLDER_PATH, err))?,
        ),
        None => None,
    };

    debug!(
        files = hashes.len(),
        folder_path_hash = folder_hash.as_ref().map(|hash| hash.as_str()),
        "Recomputed local source hashes"
    );

    set(planned, FILES_HASHES, serde_json::to_value(&hashes)?);
    set(
        planned,
        FOLDER_PATH_HASH,
        folder_hash.map_or(Value::Null, |hash| Value::String(hash.into())),
    );
    Ok(())
}

/// Recompute `file_hash` from `file_path`. A null path yields a null hash.
pub fn apply_file_hash(planned: &mut Value) -> Result<(), ProviderError> {
    let hash = match planned.get(FILE_PATH).and_then(Value::as_str) {
        Some(path) => Some(
            hash_file(Path::new(path)).map_err(|err| ProviderError::local_file(FILE_PATH, err))?,
        ),
        None => None,
    };
    debug!(file_hash = hash.as_ref().map(|hash| hash.as_str()), "Recomputed file hash");
    set(
        planned,
        FILE_HASH,
        hash.map_or(Value::Null, |hash| Value::String(hash.into())),
    );
    Ok(())
}

fn set(state: &mut Value, name: &str, value: Value) {
    if let Value::Object(map) = state {
        map.insert(name.to_string(), value);
    }
}

fn is_computed_only(attr: &Attribute) -> bool {
    attr.flags.computed && !attr.flags.optional && !attr.flags.required
}

fn fill_defaults(schema: &Schema, planned: &mut Map<String, Value>) {
    for (name, attr) in &schema.block.attributes {
        if let Some(default) = &attr.default {
            let slot = planned.entry(name.clone()).or_insert(Value::Null);
            if slot.is_null() {
                *slot = default.clone();
            }
        }
    }
}

fn carry_prior_values(schema: &Schema, prior: &Map<String, Value>, planned: &mut Map<String, Value>) {
    for (name, attr) in &schema.block.attributes {
        if !(attr.flags.computed && attr.use_state_for_unknown) {
            continue;
        }
        let Some(previous) = prior.get(name).filter(|value| !value.is_null()) else {
            continue;
        };
        let slot = planned.entry(name.clone()).or_insert(Value::Null);
        if slot.is_null() {
            *slot = previous.clone();
        }
    }
}

/// Top-level attribute and block differences, in name order.
///
/// Computed-only attributes left null are "known after apply" and are not
/// reported as changes.
fn diff(schema: &Schema, prior: Option<&Value>, planned: &Value) -> Vec<AttributeChange> {
    let empty = Map::new();
    let prior_map = prior.and_then(Value::as_object).unwrap_or(&empty);
    let planned_map = planned.as_object().unwrap_or(&empty);

    let names: BTreeSet<&String> = prior_map.keys().chain(planned_map.keys()).collect();

    names
        .into_iter()
        .filter_map(|name| {
            let before = prior_map.get(name).filter(|v| !v.is_null());
            let after = planned_map.get(name).filter(|v| !v.is_null());

            if after.is_none() && schema.attribute(name).is_some_and(is_computed_only) {
                return None;
            }

            match (before, after) {
                (None, None) => None,
                (None, Some(after)) => Some(AttributeChange::added(name.clone(), after.clone())),
                (Some(before), None) => Some(AttributeChange::removed(name.clone(), before.clone())),
                (Some(before), Some(after)) if before != after => Some(AttributeChange::modified(
                    name.clone(),
                    before.clone(),
                    after.clone(),
                )),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceContext;
    use crate::schema::Attribute;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    /// A minimal file-backed resource: only planning is exercised here.
    struct Artifact;

    #[async_trait::async_trait]
    impl Resource for Artifact {
        fn type_name(&self) -> &'static str {
            "test_artifact"
        }

        fn schema(&self) -> Schema {
            Schema::v0()
                .with_attribute(
                    "id",
                    Attribute::computed_string().with_use_state_for_unknown(),
                )
                .with_attribute("version_id", Attribute::computed_string())
                .with_attribute("name", Attribute::required_string())
                .with_attribute("kind", Attribute::optional_string().with_force_new())
                .with_attribute(
                    "language",
                    Attribute::optional_string().with_default(json!("python")),
                )
                .with_attribute(FILES, Attribute::optional_dynamic())
                .with_attribute(FOLDER_PATH, Attribute::optional_string())
                .with_attribute(FILES_HASHES, Attribute::computed_string_list())
                .with_attribute(FOLDER_PATH_HASH, Attribute::computed_string())
        }

        fn modify_plan(
            &self,
            _prior: Option<&Value>,
            planned: &mut Value,
            options: &WalkOptions,
        ) -> Result<(), ProviderError> {
            apply_source_hashes(planned, options)
        }

        async fn create(&self, _: &ResourceContext, planned: Value) -> Result<Value, ProviderError> {
            Ok(planned)
        }

        async fn read(&self, _: &ResourceContext, state: Value) -> Result<Option<Value>, ProviderError> {
            Ok(Some(state))
        }

        async fn update(
            &self,
            _: &ResourceContext,
            _prior: Value,
            planned: Value,
        ) -> Result<Value, ProviderError> {
            Ok(planned)
        }

        async fn delete(&self, _: &ResourceContext, _state: Value) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn app_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        fs::write(dir.path().join("b.txt"), "world").unwrap();
        dir
    }

    fn config(dir: &TempDir) -> Value {
        json!({
            "name": "scorer",
            "folder_path": dir.path().to_str().unwrap(),
            "files": [dir.path().join("a.txt").to_str().unwrap()],
        })
    }

    /// Plan a create, then pretend it was applied with ids assigned.
    fn applied(dir: &TempDir) -> Value {
        let plan = plan_resource(&Artifact, None, config(dir), &WalkOptions::default()).unwrap();
        let mut state = plan.planned_state;
        state["id"] = json!("art-1");
        state["version_id"] = json!("ver-1");
        state
    }

    #[test]
    fn test_create_plan_fills_hashes_and_defaults() {
        let dir = app_dir();
        let plan = plan_resource(&Artifact, None, config(&dir), &WalkOptions::default()).unwrap();

        let state = &plan.planned_state;
        assert_eq!(
            state[FILES_HASHES],
            json!(["2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"])
        );
        assert_eq!(state[FOLDER_PATH_HASH].as_str().unwrap().len(), 64);
        assert_eq!(state["language"], "python");

        assert!(!plan.requires_replace);
        assert!(plan.change("name").is_some());
        assert!(plan.change(FOLDER_PATH_HASH).is_some());
        assert!(plan.change("id").is_none());
    }

    #[test]
    fn test_unchanged_files_produce_no_diff() {
        let dir = app_dir();
        let state = applied(&dir);

        let first = plan_resource(&Artifact, Some(&state), config(&dir), &WalkOptions::default()).unwrap();
        let second = plan_resource(&Artifact, Some(&state), config(&dir), &WalkOptions::default()).unwrap();

        assert!(first.changes.is_empty(), "unexpected changes: {:?}", first.changes);
        assert_eq!(first.planned_state[FILES_HASHES], second.planned_state[FILES_HASHES]);
        assert_eq!(first.planned_state[FOLDER_PATH_HASH], second.planned_state[FOLDER_PATH_HASH]);
        assert_eq!(first.planned_state["id"], "art-1");
    }

    #[test]
    fn test_folder_edit_between_runs_shows_diff() {
        let dir = app_dir();
        let state = applied(&dir);

        fs::write(dir.path().join("b.txt"), "world!").unwrap();
        let plan = plan_resource(&Artifact, Some(&state), config(&dir), &WalkOptions::default()).unwrap();

        let change = plan.change(FOLDER_PATH_HASH).unwrap();
        assert_eq!(change.before.as_ref(), Some(&state[FOLDER_PATH_HASH]));
        assert_ne!(change.after, change.before);
        assert!(plan.change(FILES_HASHES).is_none());
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_explicit_file_edit_changes_files_hashes() {
        let dir = app_dir();
        let state = applied(&dir);

        fs::write(dir.path().join("a.txt"), "HELLO").unwrap();
        let plan = plan_resource(&Artifact, Some(&state), config(&dir), &WalkOptions::default()).unwrap();

        assert!(plan.change(FILES_HASHES).is_some());
        // a.txt is also inside the folder
        assert!(plan.change(FOLDER_PATH_HASH).is_some());
    }

    #[test]
    fn test_destroy_skips_filesystem() {
        let dir = app_dir();
        let state = applied(&dir);
        drop(dir);

        let plan = plan_resource(&Artifact, Some(&state), Value::Null, &WalkOptions::default()).unwrap();
        assert!(plan.is_destroy());
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn test_force_new_attribute_requires_replace() {
        let dir = app_dir();
        let state = applied(&dir);

        let mut proposed = config(&dir);
        proposed["kind"] = json!("binary");
        let plan = plan_resource(&Artifact, Some(&state), proposed, &WalkOptions::default()).unwrap();
        assert!(plan.requires_replace);

        // Setting it on create is not a replacement.
        let mut proposed = config(&dir);
        proposed["kind"] = json!("binary");
        let plan = plan_resource(&Artifact, None, proposed, &WalkOptions::default()).unwrap();
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_missing_file_is_plan_error() {
        let dir = app_dir();
        let mut proposed = config(&dir);
        proposed[FILES] = json!([dir.path().join("missing.py").to_str().unwrap()]);

        let err = plan_resource(&Artifact, None, proposed, &WalkOptions::default()).unwrap_err();
        let diag = err.to_diagnostic();
        assert_eq!(diag.summary, "Error calculating files hash");
        assert_eq!(diag.attribute.as_deref(), Some(FILES));
        assert!(diag.detail.unwrap_or_default().contains("missing.py"));
    }

    #[test]
    fn test_null_sources() {
        let plan = plan_resource(&Artifact, None, json!({"name": "bare"}), &WalkOptions::default()).unwrap();
        assert_eq!(plan.planned_state[FILES_HASHES], json!([]));
        assert!(plan.planned_state[FOLDER_PATH_HASH].is_null());

        let mut planned = json!({"file_path": null});
        apply_file_hash(&mut planned).unwrap();
        assert!(planned[FILE_HASH].is_null());
    }

    #[test]
    fn test_missing_folder_hashes_to_sentinel() {
        let dir = TempDir::new().unwrap();
        let proposed = json!({
            "name": "empty",
            "folder_path": dir.path().join("not-there").to_str().unwrap(),
        });
        let plan = plan_resource(&Artifact, None, proposed, &WalkOptions::default()).unwrap();
        assert_eq!(
            plan.planned_state[FOLDER_PATH_HASH],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_apply_file_hash() {
        let dir = app_dir();
        let mut planned = json!({"file_path": dir.path().join("b.txt").to_str().unwrap()});
        apply_file_hash(&mut planned).unwrap();
        assert_eq!(
            planned[FILE_HASH],
            "486ea46224d1bb4fb680f34f7c9ad96a8f24ec88be73ea8e5a6c65260e9cb8a7"
        );
    }

    #[test]
    fn test_non_object_proposal_rejected() {
        let err = plan_resource(&Artifact, None, json!("nope"), &WalkOptions::default()).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }
}
