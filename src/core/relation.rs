//! The closed PROV relation vocabulary and its static properties

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::{Direction, ObjectType, ObjectVersion, ProvId};
use crate::error::{Error, Result};

/// Coarse relation bucket used by traversal filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationCategory {
    Data,
    Control,
}

/// Which endpoint of a relation is the ancestor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AncestorRole {
    Source,
    Destination,
}

/// Object types an endpoint accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Entity,
    Activity,
    Agent,
    Any,
}

impl EndpointKind {
    /// Bundles are entities for endpoint checks
    pub fn accepts(self, object_type: ObjectType) -> bool {
        match self {
            EndpointKind::Any => true,
            EndpointKind::Entity => matches!(object_type, ObjectType::Entity | ObjectType::Bundle),
            EndpointKind::Activity => object_type == ObjectType::Activity,
            EndpointKind::Agent => object_type == ObjectType::Agent,
        }
    }
}

/// Static row of the relation table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationSpec {
    pub json_group: &'static str,
    pub category: RelationCategory,
    pub ancestor: AncestorRole,
    /// PROV-JSON field naming the source endpoint
    pub source_field: &'static str,
    /// PROV-JSON field naming the destination endpoint
    pub destination_field: &'static str,
    pub source_kind: EndpointKind,
    pub destination_kind: EndpointKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationType {
    WasGeneratedBy,
    Used,
    WasInformedBy,
    WasStartedBy,
    WasEndedBy,
    WasInvalidatedBy,
    WasDerivedFrom,
    HadMember,
    HadDictionaryMember,
    SpecializationOf,
    AlternateOf,
    DerivedByInsertionFrom,
    DerivedByRemovalFrom,
    WasAttributedTo,
    WasAssociatedWith,
    ActedOnBehalfOf,
    HadPlan,
    WasInfluencedBy,
}

const fn row(
    json_group: &'static str,
    category: RelationCategory,
    source_field: &'static str,
    source_kind: EndpointKind,
    destination_field: &'static str,
    destination_kind: EndpointKind,
) -> RelationSpec {
    RelationSpec {
        json_group,
        category,
        ancestor: AncestorRole::Destination,
        source_field,
        destination_field,
        source_kind,
        destination_kind,
    }
}

use EndpointKind::{Activity as ACT, Agent as AGT, Any as ANY, Entity as ENT};
use RelationCategory::{Control as CONTROL, Data as DATA};

const WAS_GENERATED_BY: RelationSpec = row("wasGeneratedBy", DATA, "prov:entity", ENT, "prov:activity", ACT);
const USED: RelationSpec = row("used", DATA, "prov:activity", ACT, "prov:entity", ENT);
const WAS_INFORMED_BY: RelationSpec =
    row("wasInformedBy", CONTROL, "prov:informed", ACT, "prov:informant", ACT);
const WAS_STARTED_BY: RelationSpec = row("wasStartedBy", CONTROL, "prov:activity", ACT, "prov:trigger", ENT);
const WAS_ENDED_BY: RelationSpec = row("wasEndedBy", CONTROL, "prov:activity", ACT, "prov:trigger", ENT);
const WAS_INVALIDATED_BY: RelationSpec =
    row("wasInvalidatedBy", DATA, "prov:entity", ENT, "prov:activity", ACT);
const WAS_DERIVED_FROM: RelationSpec =
    row("wasDerivedFrom", DATA, "prov:generatedEntity", ENT, "prov:usedEntity", ENT);
const HAD_MEMBER: RelationSpec = row("hadMember", DATA, "prov:collection", ENT, "prov:entity", ENT);
const HAD_DICTIONARY_MEMBER: RelationSpec =
    row("hadDictionaryMember", DATA, "prov:dictionary", ENT, "prov:entity", ENT);
const SPECIALIZATION_OF: RelationSpec =
    row("specializationOf", DATA, "prov:specificEntity", ENT, "prov:generalEntity", ENT);
const ALTERNATE_OF: RelationSpec = row("alternateOf", DATA, "prov:alternate1", ENT, "prov:alternate2", ENT);
const DERIVED_BY_INSERTION_FROM: RelationSpec =
    row("derivedByInsertionFrom", DATA, "prov:after", ENT, "prov:before", ENT);
const DERIVED_BY_REMOVAL_FROM: RelationSpec =
    row("derivedByRemovalFrom", DATA, "prov:after", ENT, "prov:before", ENT);
const WAS_ATTRIBUTED_TO: RelationSpec = row("wasAttributedTo", CONTROL, "prov:entity", ENT, "prov:agent", AGT);
const WAS_ASSOCIATED_WITH: RelationSpec =
    row("wasAssociatedWith", CONTROL, "prov:activity", ACT, "prov:agent", AGT);
const ACTED_ON_BEHALF_OF: RelationSpec =
    row("actedOnBehalfOf", CONTROL, "prov:delegate", AGT, "prov:responsible", AGT);
const HAD_PLAN: RelationSpec = row("hadPlan", CONTROL, "prov:agent", AGT, "prov:plan", ENT);
const WAS_INFLUENCED_BY: RelationSpec =
    row("wasInfluencedBy", CONTROL, "prov:influencee", ANY, "prov:influencer", ANY);

impl RelationType {
    pub const ALL: [RelationType; 18] = [
        RelationType::WasGeneratedBy,
        RelationType::Used,
        RelationType::WasInformedBy,
        RelationType::WasStartedBy,
        RelationType::WasEndedBy,
        RelationType::WasInvalidatedBy,
        RelationType::WasDerivedFrom,
        RelationType::HadMember,
        RelationType::HadDictionaryMember,
        RelationType::SpecializationOf,
        RelationType::AlternateOf,
        RelationType::DerivedByInsertionFrom,
        RelationType::DerivedByRemovalFrom,
        RelationType::WasAttributedTo,
        RelationType::WasAssociatedWith,
        RelationType::ActedOnBehalfOf,
        RelationType::HadPlan,
        RelationType::WasInfluencedBy,
    ];

    pub fn spec(self) -> &'static RelationSpec {
        match self {
            RelationType::WasGeneratedBy => &WAS_GENERATED_BY,
            RelationType::Used => &USED,
            RelationType::WasInformedBy => &WAS_INFORMED_BY,
            RelationType::WasStartedBy => &WAS_STARTED_BY,
            RelationType::WasEndedBy => &WAS_ENDED_BY,
            RelationType::WasInvalidatedBy => &WAS_INVALIDATED_BY,
            RelationType::WasDerivedFrom => &WAS_DERIVED_FROM,
            RelationType::HadMember => &HAD_MEMBER,
            RelationType::HadDictionaryMember => &HAD_DICTIONARY_MEMBER,
            RelationType::SpecializationOf => &SPECIALIZATION_OF,
            RelationType::AlternateOf => &ALTERNATE_OF,
            RelationType::DerivedByInsertionFrom => &DERIVED_BY_INSERTION_FROM,
            RelationType::DerivedByRemovalFrom => &DERIVED_BY_REMOVAL_FROM,
            RelationType::WasAttributedTo => &WAS_ATTRIBUTED_TO,
            RelationType::WasAssociatedWith => &WAS_ASSOCIATED_WITH,
            RelationType::ActedOnBehalfOf => &ACTED_ON_BEHALF_OF,
            RelationType::HadPlan => &HAD_PLAN,
            RelationType::WasInfluencedBy => &WAS_INFLUENCED_BY,
        }
    }

    pub fn category(self) -> RelationCategory {
        self.spec().category
    }

    pub fn json_group(self) -> &'static str {
        self.spec().json_group
    }

    pub fn from_json_group(group: &str) -> Option<RelationType> {
        RelationType::ALL.into_iter().find(|t| t.json_group() == group)
    }

    /// Check the endpoint object types against the table
    pub fn check_endpoints(self, source: ObjectType, destination: ObjectType) -> Result<()> {
        let spec = self.spec();
        if !spec.source_kind.accepts(source) {
            return Err(Error::InvalidArgument(format!(
                "{} cannot start at {} ({} expects {:?})",
                self, source, spec.source_field, spec.source_kind
            )));
        }
        if !spec.destination_kind.accepts(destination) {
            return Err(Error::InvalidArgument(format!(
                "{} cannot end at {} ({} expects {:?})",
                self, destination, spec.destination_field, spec.destination_kind
            )));
        }
        Ok(())
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_group())
    }
}

impl FromStr for RelationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RelationType::from_json_group(s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown relation type `{}`", s)))
    }
}

/// Stored relation. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationInfo {
    pub id: ProvId,
    pub relation_type: RelationType,
    pub source: ObjectVersion,
    pub destination: ObjectVersion,
    /// Owning bundle
    pub bundle: Option<ProvId>,
}

impl RelationInfo {
    pub fn ancestor(&self) -> ObjectVersion {
        match self.relation_type.spec().ancestor {
            AncestorRole::Source => self.source,
            AncestorRole::Destination => self.destination,
        }
    }

    pub fn descendant(&self) -> ObjectVersion {
        match self.relation_type.spec().ancestor {
            AncestorRole::Source => self.destination,
            AncestorRole::Destination => self.source,
        }
    }

    /// The endpoint on the `direction` side of the relation
    pub fn endpoint_towards(&self, direction: Direction) -> ObjectVersion {
        match direction {
            Direction::Ancestors => self.ancestor(),
            Direction::Descendants => self.descendant(),
        }
    }
}

/// One traversal row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AncestryEntry {
    /// The queried `(object, version)`
    pub query: ObjectVersion,
    pub other: ObjectVersion,
    pub relation: ProvId,
    pub relation_type: RelationType,
    pub other_is_ancestor: bool,
}

impl AncestryEntry {
    pub fn from_relation(relation: &RelationInfo, direction: Direction) -> Self {
        let (query, other) = match direction {
            Direction::Ancestors => (relation.descendant(), relation.ancestor()),
            Direction::Descendants => (relation.ancestor(), relation.descendant()),
        };
        AncestryEntry {
            query,
            other,
            relation: relation.id,
            relation_type: relation.relation_type,
            other_is_ancestor: direction == Direction::Ancestors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_groups_are_unique_and_round_trip() {
        let mut seen = std::collections::HashSet::new();
        for t in RelationType::ALL {
            assert!(seen.insert(t.json_group()));
            assert_eq!(RelationType::from_json_group(t.json_group()), Some(t));
        }
        assert_eq!(RelationType::from_json_group("bundle"), None);
    }

    #[test]
    fn test_categories() {
        assert_eq!(RelationType::WasGeneratedBy.category(), RelationCategory::Data);
        assert_eq!(RelationType::Used.category(), RelationCategory::Data);
        assert_eq!(RelationType::WasAssociatedWith.category(), RelationCategory::Control);
        assert_eq!(RelationType::WasInformedBy.category(), RelationCategory::Control);
    }

    #[test]
    fn test_endpoint_discipline() {
        assert!(RelationType::WasGeneratedBy.check_endpoints(ObjectType::Entity, ObjectType::Activity).is_ok());
        assert!(RelationType::WasGeneratedBy.check_endpoints(ObjectType::Activity, ObjectType::Entity).is_err());
        assert!(RelationType::WasAttributedTo.check_endpoints(ObjectType::Bundle, ObjectType::Agent).is_ok());
        assert!(RelationType::WasInfluencedBy.check_endpoints(ObjectType::Agent, ObjectType::Entity).is_ok());
    }

    #[test]
    fn test_entries_agree_on_ancestor() {
        let e2 = ObjectVersion::new(ProvId::from_u128(2), 0);
        let p1 = ObjectVersion::new(ProvId::from_u128(1), 0);
        let rel = RelationInfo {
            id: ProvId::from_u128(9),
            relation_type: RelationType::WasGeneratedBy,
            source: e2,
            destination: p1,
            bundle: None,
        };

        let up = AncestryEntry::from_relation(&rel, Direction::Ancestors);
        assert_eq!((up.query, up.other, up.other_is_ancestor), (e2, p1, true));
        let down = AncestryEntry::from_relation(&rel, Direction::Descendants);
        assert_eq!((down.query, down.other, down.other_is_ancestor), (p1, e2, false));
    }
}
