//! Typed PROV constructors layered over `ProvGraph`
//!
//! PROV subtypes (persons, plans, collections, ...) and derivation sub-kinds
//! are not separate object or relation types; they are ordinary objects and
//! `wasDerivedFrom` edges tagged with a `prov:type` property.

use std::fmt;

use crate::api::prov_graph::{ProvGraph, ProvObject};
use crate::core::{Endpoint, ObjectType, Outcome, ProvId, RelationInfo, RelationType};
use crate::error::Result;
use crate::storage::ProvenanceBackend;

pub const PROV_PREFIX: &str = "prov";
pub const TYPE_KEY: &str = "type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvType {
    Person,
    Organization,
    SoftwareAgent,
    Plan,
    Collection,
    EmptyCollection,
    Dictionary,
    EmptyDictionary,
}

impl ProvType {
    pub fn object_type(self) -> ObjectType {
        match self {
            ProvType::Person | ProvType::Organization | ProvType::SoftwareAgent => ObjectType::Agent,
            _ => ObjectType::Entity,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProvType::Person => "prov:Person",
            ProvType::Organization => "prov:Organization",
            ProvType::SoftwareAgent => "prov:SoftwareAgent",
            ProvType::Plan => "prov:Plan",
            ProvType::Collection => "prov:Collection",
            ProvType::EmptyCollection => "prov:EmptyCollection",
            ProvType::Dictionary => "prov:Dictionary",
            ProvType::EmptyDictionary => "prov:EmptyDictionary",
        }
    }
}

impl fmt::Display for ProvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-kinds of `wasDerivedFrom`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivationKind {
    Revision,
    PrimarySource,
    Quotation,
}

impl DerivationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DerivationKind::Revision => "prov:Revision",
            DerivationKind::PrimarySource => "prov:PrimarySource",
            DerivationKind::Quotation => "prov:Quotation",
        }
    }
}

impl<B: ProvenanceBackend + ?Sized> ProvGraph<B> {
    /// Create an object of the PROV subtype's base kind, tagged with its `prov:type`
    pub fn create_typed_object(
        &self,
        prefix: &str,
        name: &str,
        prov_type: ProvType,
        bundle: Option<ProvId>,
    ) -> Result<ProvObject> {
        let object = self.create_object(prefix, name, prov_type.object_type(), bundle)?;
        self.add_property(object.id(), PROV_PREFIX, TYPE_KEY, prov_type.as_str())?;
        Ok(object)
    }

    /// Every `prov:type` value recorded on `owner`
    pub fn prov_types(&self, owner: ProvId) -> Result<Vec<String>> {
        Ok(self
            .properties(owner, Some((PROV_PREFIX, TYPE_KEY)))?
            .into_iter()
            .map(|p| p.value.to_string())
            .collect())
    }

    /// `wasDerivedFrom` tagged with a sub-kind. The tag is only added to a newly created edge.
    pub fn was_derived_as(
        &self,
        derived: impl Into<Endpoint>,
        original: impl Into<Endpoint>,
        kind: DerivationKind,
        bundle: Option<ProvId>,
    ) -> Result<Outcome<RelationInfo>> {
        let outcome = self.create_relation(derived, original, RelationType::WasDerivedFrom, bundle)?;
        if !outcome.is_duplicate() {
            self.add_property(outcome.value.id, PROV_PREFIX, TYPE_KEY, kind.as_str())?;
        }
        Ok(outcome)
    }

    pub fn was_revision_of(
        &self,
        revised: impl Into<Endpoint>,
        original: impl Into<Endpoint>,
        bundle: Option<ProvId>,
    ) -> Result<Outcome<RelationInfo>> {
        self.was_derived_as(revised, original, DerivationKind::Revision, bundle)
    }

    pub fn had_primary_source(
        &self,
        derived: impl Into<Endpoint>,
        source: impl Into<Endpoint>,
        bundle: Option<ProvId>,
    ) -> Result<Outcome<RelationInfo>> {
        self.was_derived_as(derived, source, DerivationKind::PrimarySource, bundle)
    }

    pub fn was_quoted_from(
        &self,
        quote: impl Into<Endpoint>,
        original: impl Into<Endpoint>,
        bundle: Option<ProvId>,
    ) -> Result<Outcome<RelationInfo>> {
        self.was_derived_as(quote, original, DerivationKind::Quotation, bundle)
    }
}
