//! Provider configuration.
//!
//! Values set in the provider block win; unset values fall back to the
//! `DATAROBOT_*` environment variables.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::files::WalkOptions;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable holding the API endpoint.
pub const ENDPOINT_ENV_VAR: &str = "DATAROBOT_ENDPOINT";
/// Environment variable holding the API token.
pub const API_TOKEN_ENV_VAR: &str = "DATAROBOT_API_TOKEN";
/// Environment variable holding the trace context forwarded with API calls.
pub const TRACE_CONTEXT_ENV_VAR: &str = "DATAROBOT_TRACE_CONTEXT";
/// Endpoint used when neither the block nor the environment sets one.
pub const DEFAULT_ENDPOINT: &str = "https://app.datarobot.com/api/v2";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProviderBlock {
    endpoint: Option<String>,
    api_key: Option<String>,
    trace_context: Option<String>,
    follow_symlinks: Option<bool>,
}

/// Resolved provider settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub trace_context: Option<String>,
    /// Follow symlinks when walking `folder_path`.
    pub follow_symlinks: bool,
    /// Set when Terraform runs with `TF_LOG`/`TF_LOG_PROVIDER` at DEBUG or TRACE.
    pub debug: bool,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("trace_context", &self.trace_context.as_ref().map(|_| "<redacted>"))
            .field("follow_symlinks", &self.follow_symlinks)
            .field("debug", &self.debug)
            .finish()
    }
}

impl ProviderConfig {
    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Interact with DataRobot")
            .with_attribute(
                "endpoint",
                Attribute::optional_string().with_description(format!(
                    "Endpoint for the DataRobot API. Defaults to {ENDPOINT_ENV_VAR} or {DEFAULT_ENDPOINT}"
                )),
            )
            .with_attribute(
                "api_key",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!("Key to access the DataRobot API. Defaults to {API_TOKEN_ENV_VAR}")),
            )
            .with_attribute(
                "trace_context",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("DataRobot trace context"),
            )
            .with_attribute(
                "follow_symlinks",
                Attribute::optional_bool()
                    .with_description("Follow symbolic links when scanning folder_path. Defaults to false"),
            )
    }

    /// Resolve against the process environment.
    pub fn from_env(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::resolve(config, |key| std::env::var(key).ok())
    }

    /// Resolve a provider block, looking up unset values with `lookup`.
    pub fn resolve<F>(config: &Value, lookup: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let block: ProviderBlock = match config {
            Value::Null => ProviderBlock::default(),
            other => serde_json::from_value(other.clone()).map_err(|err| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(err.to_string())]
            })?,
        };

        let env = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let endpoint = block
            .endpoint
            .filter(|value| !value.is_empty())
            .or_else(|| env(ENDPOINT_ENV_VAR))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let api_key = block.api_key.or_else(|| env(API_TOKEN_ENV_VAR)).unwrap_or_default();
        if api_key.is_empty() {
            return Err(vec![Diagnostic::error("Unable to find API key")
                .with_detail(format!(
                    "API key cannot be an empty string. Set api_key or {API_TOKEN_ENV_VAR}"
                ))
                .with_attribute("api_key")]);
        }

        let trace_context = block
            .trace_context
            .filter(|value| !value.is_empty())
            .or_else(|| env(TRACE_CONTEXT_ENV_VAR));

        let debug = ["TF_LOG", "TF_LOG_PROVIDER"].into_iter().any(|key| {
            env(key).is_some_and(|level| {
                level.eq_ignore_ascii_case("debug") || level.eq_ignore_ascii_case("trace")
            })
        });

        Ok(Self {
            endpoint,
            api_key,
            trace_context,
            follow_symlinks: block.follow_symlinks.unwrap_or(false),
            debug,
        })
    }

    /// Options for folder walks under this configuration.
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            follow_symlinks: self.follow_symlinks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_block_values_win() {
        let config = ProviderConfig::resolve(
            &json!({"endpoint": "https://dr.example.com/api/v2", "api_key": "block-key"}),
            env(&[(ENDPOINT_ENV_VAR, "https://env"), (API_TOKEN_ENV_VAR, "env-key")]),
        )
        .unwrap();

        assert_eq!(config.endpoint, "https://dr.example.com/api/v2");
        assert_eq!(config.api_key, "block-key");
        assert!(!config.follow_symlinks);
    }

    #[test]
    fn test_environment_fallback_and_default_endpoint() {
        let config = ProviderConfig::resolve(
            &Value::Null,
            env(&[(API_TOKEN_ENV_VAR, "env-key"), (TRACE_CONTEXT_ENV_VAR, "trace-1")]),
        )
        .unwrap();

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.trace_context.as_deref(), Some("trace-1"));
    }

    #[test]
    fn test_missing_api_key() {
        let diagnostics = ProviderConfig::resolve(&json!({}), env(&[])).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("api_key"));

        // An explicitly empty key does not fall back to the environment.
        let diagnostics =
            ProviderConfig::resolve(&json!({"api_key": ""}), env(&[(API_TOKEN_ENV_VAR, "k")]))
                .unwrap_err();
        assert_eq!(diagnostics[0].summary, "Unable to find API key");
    }

    #[test]
    fn test_follow_symlinks_and_debug() {
        let config = ProviderConfig::resolve(
            &json!({"api_key": "k", "follow_symlinks": true}),
            env(&[("TF_LOG_PROVIDER", "TRACE")]),
        )
        .unwrap();

        assert!(config.walk_options().follow_symlinks);
        assert!(config.debug);

        let config =
            ProviderConfig::resolve(&json!({"api_key": "k"}), env(&[("TF_LOG", "WARN")])).unwrap();
        assert!(!config.debug);
    }

    #[test]
    fn test_invalid_block() {
        let diagnostics =
            ProviderConfig::resolve(&json!({"api_key": 5}), env(&[])).unwrap_err();
        assert_eq!(diagnostics[0].summary, "Invalid provider configuration");

        assert!(ProviderConfig::resolve(&json!({"apikey": "k"}), env(&[])).is_err());
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let config = ProviderConfig::resolve(&json!({"api_key": "secret-token"}), env(&[])).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("<redacted>"));
    }
}
