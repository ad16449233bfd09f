//! Storage capability interface consumed by the graph handle
//!
//! A backend owns the graph state. Every method is a blocking call; backends
//! serialize their writers internally so that duplicate-relation detection,
//! version increments and bundle cascades are linearizable.

use crate::core::{
    Direction, Endpoint, ObjectInfo, ObjectType, Outcome, Property, PropertyValue, ProvId,
    RelationInfo, RelationType, Session, Version, VersionInfo, VersionSelector,
};
use crate::error::Result;

pub mod memory_backend;
pub mod rdf_backend;
pub mod indexing {
    pub mod name_index;
}

/// Arguments of `create_object`
#[derive(Debug, Clone, Copy)]
pub struct NewObject<'a> {
    pub prefix: &'a str,
    pub name: &'a str,
    pub object_type: ObjectType,
    pub bundle: Option<ProvId>,
    pub session: ProvId,
    /// Fail with `AlreadyExists` if `(prefix, name, type)` is taken
    pub unique: bool,
}

/// Arguments of `create_relation`
#[derive(Debug, Clone, Copy)]
pub struct NewRelation {
    pub relation_type: RelationType,
    pub source: Endpoint,
    pub destination: Endpoint,
    pub bundle: Option<ProvId>,
}

pub trait ProvenanceBackend: Send + Sync {
    /// Store a session record. A second registration of the same id is `AlreadyInitialized`.
    fn register_session(&self, session: &Session) -> Result<()>;

    fn session_info(&self, id: ProvId) -> Result<Session>;

    /// Allocate a new object at version 0
    fn create_object(&self, object: NewObject<'_>) -> Result<ObjectInfo>;

    /// Matching objects, most recent first. `object_type` and `bundle` narrow the match when given.
    fn lookup_objects(
        &self,
        prefix: &str,
        name: &str,
        object_type: Option<ObjectType>,
        bundle: Option<ProvId>,
    ) -> Result<Vec<ObjectInfo>>;

    /// Newest object matching `(prefix, name, type)` in any bundle, or a new
    /// one created in `object.bundle` when there is none. One atomic step;
    /// the status tells which branch was taken.
    fn lookup_or_create_object(&self, object: NewObject<'_>) -> Result<Outcome<ObjectInfo>>;

    fn object_info(&self, id: ProvId) -> Result<ObjectInfo>;

    /// Every object, optionally restricted to one prefix, in creation order
    fn all_objects(&self, prefix: Option<&str>) -> Result<Vec<ObjectInfo>>;

    fn version_info(&self, id: ProvId, version: Version) -> Result<VersionInfo>;

    /// Increment the current version of `id` and return the new number
    fn new_version(&self, id: ProvId, session: ProvId) -> Result<Version>;

    /// Assert an edge. An identical `(type, source, destination, bundle)` edge
    /// yields the existing relation with `Status::DuplicateIgnored`.
    fn create_relation(&self, relation: NewRelation) -> Result<Outcome<RelationInfo>>;

    fn relation_info(&self, id: ProvId) -> Result<RelationInfo>;

    /// One-hop relations of `id` in `direction`, in creation order.
    /// `Ancestors` selects edges whose descendant endpoint is `id`.
    fn relations_of(&self, id: ProvId, version: VersionSelector, direction: Direction) -> Result<Vec<RelationInfo>>;

    /// Append a property to an object, relation or bundle
    fn add_property(&self, owner: ProvId, prefix: &str, key: &str, value: PropertyValue) -> Result<()>;

    /// Properties of `owner` in insertion order, optionally only those under `prefix:key`
    fn properties(&self, owner: ProvId, key: Option<(&str, &str)>) -> Result<Vec<Property>>;

    /// Owners carrying `prefix:key = value`
    fn lookup_by_property(&self, prefix: &str, key: &str, value: &PropertyValue) -> Result<Vec<ProvId>>;

    /// Member objects of a bundle. Empty for unknown bundles.
    fn bundle_objects(&self, bundle: ProvId) -> Result<Vec<ObjectInfo>>;

    /// Member relations of a bundle. Empty for unknown bundles.
    fn bundle_relations(&self, bundle: ProvId) -> Result<Vec<RelationInfo>>;

    /// Delete a bundle with every member object and relation, nested
    /// bundles included, and every relation touching a deleted object.
    fn delete_bundle(&self, bundle: ProvId) -> Result<()>;
}
