//! Console configuration loaded from JSON.
//!
//! ```json
//! {
//!   "session": { "bootstrap_timeout_ms": 10000, "role_lookup": { "max_retries": 3 } },
//!   "collections": { "projects": { "table": "projects_v2" } }
//! }
//! ```
//!
//! Every field is optional. Collections that are not listed use their
//! built-in table and position column.

use std::collections::BTreeMap;
use std::path::Path;

use jwgroup_ordering::{CollectionConfig, CollectionKind};
use jwgroup_session::SessionConfig;
use serde::Deserialize;

use crate::ConsoleError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub session: SessionConfig,

    /// Per-collection overrides.
    pub collections: BTreeMap<CollectionKind, CollectionConfig>,
}

impl ConsoleConfig {
    /// Parses a config from a JSON string. Out-of-range values are clamped
    /// (see [`validated`](Self::validated)).
    pub fn from_json_str(json: &str) -> Result<Self, ConsoleError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConsoleError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConsoleError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded console config");
        Self::from_json_str(&json)
    }

    /// Clamps the retry policy into its supported range.
    pub fn validated(mut self) -> Self {
        self.session.role_lookup = self.session.role_lookup.validated();
        self
    }

    /// The effective config for `kind`: the override if present, the
    /// built-in default otherwise.
    pub fn collection(&self, kind: CollectionKind) -> CollectionConfig {
        self.collections
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| kind.config())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_from_json_str_empty_object_is_default() {
        let config = ConsoleConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.session.bootstrap_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_from_json_str_partial_overrides() {
        let config = ConsoleConfig::from_json_str(
            r#"{
                "session": {
                    "bootstrap_timeout_ms": 5000,
                    "role_lookup": { "max_retries": 5 }
                },
                "collections": {
                    "projects": { "table": "projects_v2", "position_field": "sort_index" }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.session.bootstrap_timeout_ms, 5000);
        assert_eq!(config.session.admin_role, "admin");
        assert_eq!(config.session.role_lookup.max_retries, 5);
        assert_eq!(config.session.role_lookup.initial_delay_ms, 1000);

        let projects = config.collection(CollectionKind::Projects);
        assert_eq!(projects.table, "projects_v2");
        assert_eq!(projects.position_field, "sort_index");
        assert_eq!(
            config.collection(CollectionKind::Executives),
            CollectionKind::Executives.config()
        );
    }

    #[test]
    fn test_from_json_str_clamps_retry_policy() {
        let config =
            ConsoleConfig::from_json_str(r#"{ "session": { "role_lookup": { "max_retries": 500 } } }"#)
                .unwrap();
        assert_eq!(config.session.role_lookup.max_retries, jwgroup_retry::RetryPolicy::MAX_RETRIES);
    }

    #[test]
    fn test_from_json_str_unknown_collection_is_error() {
        let err = ConsoleConfig::from_json_str(r#"{ "collections": { "news": { "table": "n" } } }"#)
            .unwrap_err();
        assert!(matches!(err, ConsoleError::ConfigParse(_)));
    }

    #[test]
    fn test_from_json_file_missing_reports_path() {
        let err = ConsoleConfig::from_json_file("/nonexistent/console.json").unwrap_err();
        match err {
            ConsoleError::ConfigRead { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/console.json"));
            }
            other => panic!("expected ConfigRead, got {other:?}"),
        }
    }
}
