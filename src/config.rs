//! Reader configuration.
//!
//! Namespaces used when qualifying reserved words and when emitting primitive
//! references, plus the limits of the expansion engine. Every field has a
//! default, so an empty JSON object or YAML document is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::{err_msg, HebiError};

/// Default macro namespace reserved words qualify into.
pub const DEFAULT_MACRO_NAMESPACE: &str = "hebi.basic.._macro_";
/// Default namespace of the primitive runtime vocabulary.
pub const DEFAULT_BOOTSTRAP_NAMESPACE: &str = "hebi.bootstrap..";
pub const DEFAULT_BUILTINS_NAMESPACE: &str = "builtins..";
pub const DEFAULT_NO_OP_MARKER: &str = "pass";
pub const DEFAULT_MAX_EXPANSION_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Prefix of qualified macro names, without the trailing `.`.
    pub macro_namespace: String,
    /// Prefix of primitive references, including its `..` separator.
    pub bootstrap_namespace: String,
    /// Prefix of built-in references, including its `..` separator.
    pub builtins_namespace: String,
    /// Marker whose head is dropped (`pass:`).
    pub no_op_marker: String,
    pub max_expansion_depth: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            macro_namespace: DEFAULT_MACRO_NAMESPACE.to_string(),
            bootstrap_namespace: DEFAULT_BOOTSTRAP_NAMESPACE.to_string(),
            builtins_namespace: DEFAULT_BUILTINS_NAMESPACE.to_string(),
            no_op_marker: DEFAULT_NO_OP_MARKER.to_string(),
            max_expansion_depth: DEFAULT_MAX_EXPANSION_DEPTH,
        }
    }
}

impl ReaderConfig {
    pub fn from_json(text: &str) -> Result<Self, HebiError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| HebiError::config("invalid JSON reader configuration", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, HebiError> {
        let config: Self = serde_yaml::from_str(text)
            .map_err(|e| HebiError::config("invalid YAML reader configuration", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the reader cannot honour.
    pub fn validate(&self) -> Result<(), HebiError> {
        if self.macro_namespace.is_empty() || self.macro_namespace.ends_with('.') {
            return Err(err_msg!(
                Config,
                "macro namespace '{}' must be non-empty and must not end with '.'",
                self.macro_namespace
            ));
        }
        for (field, ns) in [
            ("bootstrap_namespace", &self.bootstrap_namespace),
            ("builtins_namespace", &self.builtins_namespace),
        ] {
            if !ns.ends_with("..") {
                return Err(err_msg!(Config, "{} '{}' must end with '..'", field, ns));
            }
        }
        if self.no_op_marker.is_empty()
            || self
                .no_op_marker
                .chars()
                .any(|c| c.is_whitespace() || c == ':')
        {
            return Err(err_msg!(
                Config,
                "no-op marker '{}' must be a single word",
                self.no_op_marker
            ));
        }
        if self.max_expansion_depth == 0 {
            return Err(err_msg!(Config, "max_expansion_depth must be at least 1"));
        }
        Ok(())
    }

    /// Qualified name of a macro in the configured namespace.
    pub fn macro_name(&self, name: &str) -> String {
        format!("{}.{}", self.macro_namespace, name)
    }

    /// Qualified name of a primitive in the bootstrap namespace.
    pub fn primitive(&self, name: &str) -> String {
        format!("{}{}", self.bootstrap_namespace, name)
    }

    pub fn builtin(&self, name: &str) -> String {
        format!("{}{}", self.builtins_namespace, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorType;

    #[test]
    fn empty_documents_yield_defaults() {
        assert_eq!(ReaderConfig::from_json("{}").unwrap(), ReaderConfig::default());
        assert_eq!(ReaderConfig::from_yaml("{}").unwrap(), ReaderConfig::default());
    }

    #[test]
    fn yaml_overrides_single_fields() {
        let config = ReaderConfig::from_yaml("macro_namespace: my.mod.._macro_\nmax_expansion_depth: 8\n")
            .unwrap();
        assert_eq!(config.macro_name("if_"), "my.mod.._macro_.if_");
        assert_eq!(config.max_expansion_depth, 8);
        assert_eq!(config.primitive("_if_"), "hebi.bootstrap.._if_");
    }

    #[test]
    fn invalid_namespaces_are_rejected() {
        let err = ReaderConfig::from_json(r#"{"bootstrap_namespace": "boot."}"#).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        let err = ReaderConfig::from_json(r#"{"macro_namespace": "m."}"#).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[test]
    fn unknown_fields_are_config_errors() {
        let err = ReaderConfig::from_json(r#"{"colour": "red"}"#).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(std::error::Error::source(&err).is_some());
    }
}
