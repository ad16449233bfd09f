//! IRI minting and parsing for graph terms stored as RDF

use crate::core::{ProvId, Version};
use crate::error::{Error, Result};

/// Mints the IRIs under which objects, versions, relations, properties and
/// sessions are stored, all rooted at one base IRI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IriScheme {
    base: String,
}

impl IriScheme {
    pub fn new(base: impl Into<String>) -> Self {
        IriScheme { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn object(&self, id: ProvId) -> String {
        format!("{}object/{}", self.base, id)
    }

    pub fn version(&self, id: ProvId, version: Version) -> String {
        format!("{}object/{}/v{}", self.base, id, version)
    }

    pub fn relation(&self, id: ProvId) -> String {
        format!("{}relation/{}", self.base, id)
    }

    pub fn session(&self, id: ProvId) -> String {
        format!("{}session/{}", self.base, id)
    }

    /// Properties are reified; each one gets its own fresh subject.
    pub fn property(&self, id: ProvId) -> String {
        format!("{}property/{}", self.base, id)
    }

    /// Vocabulary term, e.g. `vocab("name")` -> `urn:cpl:vocab#name`
    pub fn vocab(&self, term: &str) -> String {
        format!("{}vocab#{}", self.base, term)
    }

    /// Recover the id of any minted subject (object, version, relation, session).
    pub fn parse_id(&self, iri: &str) -> Result<ProvId> {
        let rest = iri
            .strip_prefix(&self.base)
            .ok_or_else(|| Error::Backend(format!("IRI `{}` is outside base `{}`", iri, self.base)))?;
        let hex = rest
            .split('/')
            .nth(1)
            .ok_or_else(|| Error::Backend(format!("IRI `{}` carries no identifier", iri)))?;
        hex.parse().map_err(|_| Error::Backend(format!("IRI `{}` carries a bad identifier", iri)))
    }
}

impl Default for IriScheme {
    fn default() -> Self {
        IriScheme::new("urn:cpl:")
    }
}
