//! Validation of resource configuration against a [`Schema`].
//!
//! Runs before planning, so problems in the configuration are reported as
//! diagnostics pointing at the offending attribute instead of surfacing as
//! API errors during apply.
//!
//! # Example
//!
//! ```
//! use datarobot_provider::schema::{Schema, Attribute};
//! use datarobot_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("replicas", Attribute::optional_int64());
//!
//! assert!(validate(&schema, &json!({"name": "scoring", "replicas": 2})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "scoring", "replicas": "two"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("replicas".to_string()));
//! ```

use crate::files::parse_files;
use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema,
};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns one diagnostic per problem; an empty list means the value is valid.
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped (the provider sets them)
/// - Attribute types must match the schema
/// - Nested blocks are checked recursively, including item limits
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Like [`validate`], returning `Err` with the diagnostics when invalid.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Check the shape of a dynamic `files` attribute without touching the disk.
pub fn validate_files_attribute(config: &Value, attribute: &str) -> Vec<Diagnostic> {
    let Some(files) = config.get(attribute) else {
        return Vec::new();
    };
    match parse_files(files) {
        Ok(_) => Vec::new(),
        Err(err) => vec![Diagnostic::error("Invalid files attribute")
            .with_detail(err.to_string())
            .with_attribute(attribute)],
    }
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        },
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join_path(path, name), diagnostics);
    }

    for (name, nested) in &block.blocks {
        validate_nested_block(nested, obj.get(name), &join_path(path, name), diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (ok, expected) = match attr_type {
        AttributeType::String => (value.is_string(), "string"),
        AttributeType::Int64 => (is_int64(value), "int64"),
        AttributeType::Float64 => (value.is_number(), "float64"),
        AttributeType::Bool => (value.is_boolean(), "bool"),
        AttributeType::List(element) | AttributeType::Set(element) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}.{}", path, i);
                    validate_attribute_type(element, item, &item_path, diagnostics);
                }
                (true, "list")
            },
            None => (false, "list"),
        },
        AttributeType::Map(element) => match value.as_object() {
            Some(map) => {
                for (key, item) in map {
                    let item_path = format!("{}.{}", path, key);
                    validate_attribute_type(element, item, &item_path, diagnostics);
                }
                (true, "map")
            },
            None => (false, "map"),
        },
        AttributeType::Object(attrs) => match value.as_object() {
            Some(map) => {
                // Object members carry no required/optional flags; only types are checked.
                for (name, member_type) in attrs {
                    if let Some(member) = map.get(name) {
                        let member_path = join_path(path, name);
                        validate_attribute_type(member_type, member, &member_path, diagnostics);
                    }
                }
                (true, "object")
            },
            None => (false, "object"),
        },
        AttributeType::Dynamic => (true, "dynamic"),
    };

    if !ok {
        diagnostics.push(type_error(path, expected, value));
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let value = match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
            return;
        },
        Some(v) => v,
    };

    match (nested.nesting_mode, value) {
        (BlockNestingMode::Single, v) => validate_block(&nested.block, v, path, diagnostics),
        (BlockNestingMode::List | BlockNestingMode::Set, Value::Array(items)) => {
            check_item_count(nested, items.len(), path, diagnostics);
            for (i, item) in items.iter().enumerate() {
                validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
            }
        },
        (BlockNestingMode::Map, Value::Object(items)) => {
            check_item_count(nested, items.len(), path, diagnostics);
            for (key, item) in items {
                validate_block(&nested.block, item, &format!("{}.{}", path, key), diagnostics);
            }
        },
        (mode, v) => {
            let expected = if mode == BlockNestingMode::Map {
                "map"
            } else {
                "list"
            };
            diagnostics.push(
                Diagnostic::error(format!("Expected {} for block '{}'", expected, path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        },
    }
}

fn check_item_count(
    nested: &NestedBlock,
    len: usize,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let len = len as u32;
    if len < nested.min_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, len
            ))
            .with_attribute(path),
        );
    }
    // max_items of 0 means unlimited
    if nested.max_items > 0 && len > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' allows at most {} item(s), got {}",
                path, nested.max_items, len
            ))
            .with_attribute(path),
        );
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() => true,
        Value::Number(n) => n
            .as_f64()
            .map(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
            .unwrap_or(false),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock, Schema};
    use serde_json::json;

    fn runtime_parameters_block() -> NestedBlock {
        NestedBlock::list(
            Block::new()
                .with_attribute("key", Attribute::required_string())
                .with_attribute("type", Attribute::required_string())
                .with_attribute("value", Attribute::required_string()),
        )
    }

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "fraud model"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        assert_eq!(validate(&schema, &json!({"name": null})).len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_computed_attributes_skipped() {
        let schema = Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("files_hashes", Attribute::computed_string_list());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"id": 123, "files_hashes": "x"})).is_empty());
    }

    #[test]
    fn test_defaulted_attribute_is_still_typed() {
        let schema = Schema::v0().with_attribute(
            "job_type",
            Attribute::optional_string().with_default(json!("default")),
        );

        assert!(validate(&schema, &json!({})).is_empty());
        assert_eq!(validate(&schema, &json!({"job_type": 7})).len(), 1);
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("replicas", Attribute::optional_int64());

        assert!(validate(&schema, &json!({"replicas": 2})).is_empty());
        assert!(validate(&schema, &json!({"replicas": 2.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"replicas": 2.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"replicas": "2"})).len(), 1);
    }

    #[test]
    fn test_validate_string_list() {
        let schema = Schema::v0().with_attribute("use_case_ids", Attribute::optional_string_list());

        assert!(validate(&schema, &json!({"use_case_ids": ["a", "b"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"use_case_ids": ["a", 2]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("use_case_ids.1".to_string()));

        assert_eq!(validate(&schema, &json!({"use_case_ids": "a"})).len(), 1);
    }

    #[test]
    fn test_validate_list_block() {
        let schema = Schema::v0().with_block("runtime_parameter_values", runtime_parameters_block());

        let valid = json!({"runtime_parameter_values": [
            {"key": "DEPLOYMENT_ID", "type": "string", "value": "abc"}
        ]});
        assert!(validate(&schema, &valid).is_empty());

        let missing_value = json!({"runtime_parameter_values": [
            {"key": "DEPLOYMENT_ID", "type": "string"}
        ]});
        let diagnostics = validate(&schema, &missing_value);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("runtime_parameter_values.0.value".to_string())
        );

        let not_a_list = json!({"runtime_parameter_values": {"key": "x"}});
        let diagnostics = validate(&schema, &not_a_list);
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_list_block_item_limits() {
        let schema = Schema::v0().with_block(
            "runtime_parameter_values",
            runtime_parameters_block().with_min_items(1).with_max_items(2),
        );

        let diagnostics = validate(&schema, &json!({"runtime_parameter_values": []}));
        assert!(diagnostics[0].summary.contains("at least 1"));

        let item = json!({"key": "k", "type": "string", "value": "v"});
        let diagnostics = validate(
            &schema,
            &json!({"runtime_parameter_values": [item.clone(), item.clone(), item]}),
        );
        assert!(diagnostics[0].summary.contains("at most 2"));
    }

    #[test]
    fn test_single_block() {
        let schema = Schema::v0().with_block(
            "resources",
            NestedBlock::single(
                Block::new()
                    .with_attribute("replicas", Attribute::optional_int64())
                    .with_attribute("session_affinity", Attribute::optional_bool()),
            ),
        );

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"resources": {"replicas": 1}})).is_empty());

        let diagnostics = validate(&schema, &json!({"resources": {"session_affinity": "yes"}}));
        assert_eq!(
            diagnostics[0].attribute,
            Some("resources.session_affinity".to_string())
        );
    }

    #[test]
    fn test_map_block() {
        let schema = Schema::v0().with_block(
            "labels",
            NestedBlock::map(Block::new().with_attribute("value", Attribute::required_string())),
        );

        assert!(validate(&schema, &json!({"labels": {"team": {"value": "ml"}}})).is_empty());
        let diagnostics = validate(&schema, &json!({"labels": {"team": {}}}));
        assert_eq!(diagnostics[0].attribute, Some("labels.team.value".to_string()));
        assert!(validate(&schema, &json!({"labels": []}))[0]
            .summary
            .contains("Expected map"));
    }

    #[test]
    fn test_dynamic_accepts_anything() {
        let schema = Schema::v0().with_attribute("files", Attribute::optional_dynamic());

        assert!(validate(&schema, &json!({"files": ["a.py", ["b.py", "lib/b.py"]]})).is_empty());
        assert!(validate(&schema, &json!({"files": 42})).is_empty());
    }

    #[test]
    fn test_validate_files_attribute() {
        assert!(validate_files_attribute(&json!({}), "files").is_empty());
        assert!(validate_files_attribute(&json!({"files": ["a.py"]}), "files").is_empty());

        let diagnostics = validate_files_attribute(&json!({"files": [["a", "b", "c"]]}), "files");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("files".to_string()));
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap_or_default()
            .contains("files[0]"));
    }

    #[test]
    fn test_helpers_and_root() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(is_valid(&schema, &json!({"name": "x"})));
        assert!(!is_valid(&schema, &json!({})));
        assert!(validate_result(&schema, &json!({"name": "x"})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].attribute.is_none());
    }
}
