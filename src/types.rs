//! Value types exchanged between the engine-facing surface and resources.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a top-level attribute moves between prior state and the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One attribute diff. `before` is `None` when the attribute was null in the
/// prior state and `after` is `None` when the plan nulls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub path: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl AttributeChange {
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self { path: path.into(), before: None, after: Some(value) }
    }

    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self { path: path.into(), before: Some(value), after: None }
    }

    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self { path: path.into(), before: Some(before), after: Some(after) }
    }

    pub fn kind(&self) -> ChangeKind {
        match (&self.before, &self.after) {
            (None, _) => ChangeKind::Added,
            (_, None) => ChangeKind::Removed,
            _ => ChangeKind::Modified,
        }
    }
}

/// The outcome of planning one resource instance.
///
/// A null `planned_state` means the instance is being destroyed. Otherwise it
/// carries every attribute the apply step will see, computed hashes included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub planned_state: Value,
    /// Top-level attribute diffs against the prior state, sorted by path.
    pub changes: Vec<AttributeChange>,
    /// Set when any changed attribute is marked `force_new`.
    pub requires_replace: bool,
}

impl PlanResult {
    pub fn new(planned_state: Value, changes: Vec<AttributeChange>, requires_replace: bool) -> Self {
        Self { planned_state, changes, requires_replace }
    }

    /// A plan that leaves `state` as it is.
    pub fn unchanged(state: Value) -> Self {
        Self::new(state, Vec::new(), false)
    }

    pub fn destroy() -> Self {
        Self::unchanged(Value::Null)
    }

    pub fn is_destroy(&self) -> bool {
        self.planned_state.is_null()
    }

    /// Find the change recorded for a top-level attribute.
    pub fn change(&self, path: &str) -> Option<&AttributeChange> {
        self.changes.iter().find(|c| c.path == path)
    }

    pub fn changed_paths(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.path.as_str())
    }
}

/// State produced by importing an existing entity by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    pub resource_type: String,
    pub state: Value,
}

impl ImportedResource {
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self { resource_type: resource_type.into(), state }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names, sorted.
    pub resources: Vec<String>,
    /// Always empty; kept for the engine's metadata shape.
    pub data_sources: Vec<String>,
    pub capabilities: ServerCapabilities,
}

/// Capability flags advertised to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// The provider is asked to plan destroys (a null proposal).
    pub plan_destroy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_kind() {
        assert_eq!(AttributeChange::added("name", json!("fraud")).kind(), ChangeKind::Added);
        assert_eq!(AttributeChange::removed("description", json!("old")).kind(), ChangeKind::Removed);
        let hash = AttributeChange::modified("folder_path_hash", json!("aa"), json!("bb"));
        assert_eq!(hash.kind(), ChangeKind::Modified);
        assert_eq!(hash.before, Some(json!("aa")));
    }

    #[test]
    fn test_plan_lookup() {
        let plan = PlanResult::new(
            json!({"name": "fraud", "files_hashes": ["aa"]}),
            vec![
                AttributeChange::modified("files_hashes", json!(["00"]), json!(["aa"])),
                AttributeChange::added("name", json!("fraud")),
            ],
            false,
        );
        assert!(plan.change("name").is_some());
        assert!(plan.change("id").is_none());
        assert_eq!(plan.changed_paths().collect::<Vec<_>>(), vec!["files_hashes", "name"]);
        assert!(!plan.is_destroy());
    }

    #[test]
    fn test_destroy_plan() {
        let plan = PlanResult::destroy();
        assert!(plan.is_destroy());
        assert!(plan.changes.is_empty());
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_imported_resource() {
        let imported =
            ImportedResource::new("datarobot_custom_model", json!({"id": "65f0c0ffee"}));
        assert_eq!(imported.resource_type, "datarobot_custom_model");
        assert_eq!(imported.state["id"], "65f0c0ffee");
    }
}
