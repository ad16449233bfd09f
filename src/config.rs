use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Rdf,
}

/// Configuration for a graph handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Namespace used by document import and the CLI when none is given
    pub default_prefix: String,
    /// Reject `create_object` on an existing `(prefix, name, type)` tuple
    pub enforce_unique_objects: bool,
    pub backend: BackendKind,
    /// On-disk directory for the RDF store; in-memory store when absent
    pub rdf_path: Option<PathBuf>,
    pub base_iri: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_prefix: "cpl".to_string(),
            enforce_unique_objects: false,
            backend: BackendKind::Memory,
            rdf_path: None,
            base_iri: "urn:cpl:".to_string(),
        }
    }
}

impl GraphConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: GraphConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_prefix(&self.default_prefix) {
            return Err(Error::Config(format!("invalid namespace prefix `{}`", self.default_prefix)));
        }
        oxigraph::model::NamedNode::new(format!("{}probe", self.base_iri))
            .map_err(|e| Error::Config(format!("invalid base IRI `{}`: {}", self.base_iri, e)))?;
        if self.backend == BackendKind::Memory && self.rdf_path.is_some() {
            return Err(Error::Config("rdf_path is only meaningful with the rdf backend".to_string()));
        }
        Ok(())
    }
}

static PREFIX_PATTERN: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]*$"));

/// Whether `prefix` can name a namespace
pub fn is_valid_prefix(prefix: &str) -> bool {
    PREFIX_PATTERN.as_ref().map(|re| re.is_match(prefix)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = GraphConfig::default();
        assert_eq!(config.default_prefix, "cpl");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_prefix_validation() {
        assert!(is_valid_prefix("cpl.filesystem"));
        assert!(is_valid_prefix("_ex-1"));
        assert!(!is_valid_prefix("1ex"));
        assert!(!is_valid_prefix("ex:a"));
        assert!(!is_valid_prefix(""));

        let config = GraphConfig { default_prefix: "bad prefix".to_string(), ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_base_iri() {
        let config = GraphConfig { base_iri: "not an iri".to_string(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_prefix": "ex", "backend": "rdf"}}"#).unwrap();

        let config = GraphConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_prefix, "ex");
        assert_eq!(config.backend, BackendKind::Rdf);
        assert_eq!(config.base_iri, "urn:cpl:");
        assert!(!config.enforce_unique_objects);
    }
}
