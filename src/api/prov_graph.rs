//! Client-facing handle over a provenance backend
//!
//! A `ProvGraph` is built once per process attach and passed by reference;
//! it carries the session that stamps every mutation and the configuration
//! used by import and uniqueness checks.

use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

use crate::config::{is_valid_prefix, GraphConfig};
use crate::core::property::split_qualified;
use crate::core::{
    AncestryEntry, Direction, Endpoint, ObjectInfo, ObjectType, Outcome, Property, PropertyValue,
    ProvId, RelationInfo, RelationType, Session, TraversalFlags, Version, VersionInfo, VersionSelector,
};
use crate::error::{Error, Result};
use crate::interchange::export::export_bundle;
use crate::interchange::import::{import_document, validate_document, ImportOptions, ImportReport};
use crate::parsing::prov_json::ProvDocument;
use crate::querying::traversal;
use crate::storage::{NewObject, NewRelation, ProvenanceBackend};

/// Property namespace under which bundles record their document prefixes
pub const PREFIX_NAMESPACE: &str = "prefix";

/// Handle to a stored object with lazily loaded metadata
#[derive(Debug)]
pub struct ProvObject {
    id: ProvId,
    info: OnceLock<ObjectInfo>,
}

impl ProvObject {
    /// Handle whose metadata is fetched on first use
    pub fn new(id: ProvId) -> Self {
        ProvObject { id, info: OnceLock::new() }
    }

    fn loaded(info: ObjectInfo) -> Self {
        let id = info.id;
        ProvObject { id, info: OnceLock::from(info) }
    }

    pub fn id(&self) -> ProvId {
        self.id
    }

    /// Metadata, fetched from the backend the first time
    pub fn info<B: ProvenanceBackend + ?Sized>(&self, graph: &ProvGraph<B>) -> Result<&ObjectInfo> {
        if let Some(info) = self.info.get() {
            return Ok(info);
        }
        let loaded = graph.backend.object_info(self.id)?;
        Ok(self.info.get_or_init(|| loaded))
    }

    /// Drop cached metadata so the next `info` call reloads it
    pub fn invalidate(&mut self) {
        self.info = OnceLock::new();
    }
}

impl From<&ProvObject> for Endpoint {
    fn from(object: &ProvObject) -> Self {
        Endpoint::Current(object.id)
    }
}

impl Clone for ProvObject {
    fn clone(&self) -> Self {
        match self.info.get() {
            Some(info) => ProvObject::loaded(info.clone()),
            None => ProvObject::new(self.id),
        }
    }
}

pub struct ProvGraph<B: ProvenanceBackend + ?Sized> {
    backend: Arc<B>,
    session: Session,
    config: GraphConfig,
}

impl<B: ProvenanceBackend + ?Sized> ProvGraph<B> {
    /// Validate `config` and register `session` with the backend
    pub fn attach(backend: Arc<B>, session: Session, config: GraphConfig) -> Result<Self> {
        config.validate()?;
        backend.register_session(&session)?;
        info!("Attached session {} ({}) for {}", session.id, session.program, session.user);
        Ok(ProvGraph { backend, session, config })
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn session_info(&self, id: ProvId) -> Result<Session> {
        self.backend.session_info(id)
    }

    fn new_object<'a>(&self, prefix: &'a str, name: &'a str, object_type: ObjectType, bundle: Option<ProvId>) -> NewObject<'a> {
        NewObject {
            prefix,
            name,
            object_type,
            bundle,
            session: self.session.id,
            unique: self.config.enforce_unique_objects,
        }
    }

    // ---- objects ----

    pub fn create_object(
        &self,
        prefix: &str,
        name: &str,
        object_type: ObjectType,
        bundle: Option<ProvId>,
    ) -> Result<ProvObject> {
        let info = self.backend.create_object(self.new_object(prefix, name, object_type, bundle))?;
        Ok(ProvObject::loaded(info))
    }

    /// Most recent match, if any
    pub fn try_lookup_object(
        &self,
        prefix: &str,
        name: &str,
        object_type: ObjectType,
        bundle: Option<ProvId>,
    ) -> Result<Option<ProvObject>> {
        let found = self.backend.lookup_objects(prefix, name, Some(object_type), bundle)?;
        Ok(found.into_iter().next().map(ProvObject::loaded))
    }

    pub fn lookup_object(
        &self,
        prefix: &str,
        name: &str,
        object_type: ObjectType,
        bundle: Option<ProvId>,
    ) -> Result<ProvObject> {
        self.try_lookup_object(prefix, name, object_type, bundle)?
            .ok_or_else(|| Error::NotFound(format!("{} {}:{}", object_type, prefix, name)))
    }

    /// Every match, most recent first
    pub fn lookup_all_objects(
        &self,
        prefix: &str,
        name: &str,
        object_type: ObjectType,
        bundle: Option<ProvId>,
    ) -> Result<Vec<ProvObject>> {
        let found = self.backend.lookup_objects(prefix, name, Some(object_type), bundle)?;
        Ok(found.into_iter().map(ProvObject::loaded).collect())
    }

    /// Look up `(prefix, name, type)` anywhere in the graph; on a miss create
    /// it inside `bundle`. `Status::ObjectCreated` marks the create branch.
    pub fn lookup_or_create_object(
        &self,
        prefix: &str,
        name: &str,
        object_type: ObjectType,
        bundle: Option<ProvId>,
    ) -> Result<Outcome<ProvObject>> {
        let outcome = self.backend.lookup_or_create_object(self.new_object(prefix, name, object_type, bundle))?;
        Ok(Outcome::new(ProvObject::loaded(outcome.value), outcome.status))
    }

    /// Handle for a known id; metadata loads lazily
    pub fn object(&self, id: ProvId) -> ProvObject {
        ProvObject::new(id)
    }

    pub fn object_info(&self, id: ProvId) -> Result<ObjectInfo> {
        self.backend.object_info(id)
    }

    /// Enumerate objects, optionally one prefix only. Not a consistent snapshot under concurrent writers.
    pub fn all_objects(&self, prefix: Option<&str>) -> Result<Vec<ObjectInfo>> {
        self.backend.all_objects(prefix)
    }

    pub fn version_info(&self, id: ProvId, version: Version) -> Result<VersionInfo> {
        self.backend.version_info(id, version)
    }

    /// Start a new version of `object`, stamped with this session
    pub fn new_version(&self, object: &mut ProvObject) -> Result<Version> {
        let version = self.backend.new_version(object.id, self.session.id)?;
        object.invalidate();
        Ok(version)
    }

    // ---- relations ----

    /// Assert `relation_type` from `source` to `destination`. Bare objects bind
    /// to their current version. A repeated assertion reports `DuplicateIgnored`
    /// and returns the existing relation.
    pub fn create_relation(
        &self,
        source: impl Into<Endpoint>,
        destination: impl Into<Endpoint>,
        relation_type: RelationType,
        bundle: Option<ProvId>,
    ) -> Result<Outcome<RelationInfo>> {
        self.backend.create_relation(NewRelation {
            relation_type,
            source: source.into(),
            destination: destination.into(),
            bundle,
        })
    }

    pub fn relation_info(&self, id: ProvId) -> Result<RelationInfo> {
        self.backend.relation_info(id)
    }

    // ---- properties ----

    pub fn add_property(
        &self,
        owner: ProvId,
        prefix: &str,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        self.backend.add_property(owner, prefix, key, value.into())
    }

    /// `add_property` with a `prefix:key` key; unqualified keys use the default prefix
    pub fn add_qualified_property(&self, owner: ProvId, qualified: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let (prefix, key) = split_qualified(qualified, &self.config.default_prefix);
        self.add_property(owner, prefix, key, value)
    }

    pub fn properties(&self, owner: ProvId, key: Option<(&str, &str)>) -> Result<Vec<Property>> {
        self.backend.properties(owner, key)
    }

    pub fn lookup_by_property(
        &self,
        prefix: &str,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<Vec<ProvId>> {
        self.backend.lookup_by_property(prefix, key, &value.into())
    }

    // ---- bundles ----

    pub fn create_bundle(&self, prefix: &str, name: &str) -> Result<ProvObject> {
        self.create_object(prefix, name, ObjectType::Bundle, None)
    }

    pub fn lookup_bundle(&self, prefix: &str, name: &str) -> Result<ProvObject> {
        self.lookup_object(prefix, name, ObjectType::Bundle, None)
    }

    pub fn try_lookup_bundle(&self, prefix: &str, name: &str) -> Result<Option<ProvObject>> {
        self.try_lookup_object(prefix, name, ObjectType::Bundle, None)
    }

    pub fn lookup_all_bundles(&self, prefix: &str, name: &str) -> Result<Vec<ProvObject>> {
        self.lookup_all_objects(prefix, name, ObjectType::Bundle, None)
    }

    /// Record a namespace prefix mapping on a bundle
    pub fn add_prefix(&self, bundle: ProvId, prefix: &str, iri: &str) -> Result<()> {
        if !is_valid_prefix(prefix) {
            return Err(Error::InvalidArgument(format!("invalid namespace prefix `{}`", prefix)));
        }
        self.ensure_bundle(bundle)?;
        self.add_property(bundle, PREFIX_NAMESPACE, prefix, iri)
    }

    /// `(prefix, iri)` mappings recorded on a bundle
    pub fn prefixes(&self, bundle: ProvId) -> Result<Vec<(String, String)>> {
        Ok(self
            .properties(bundle, None)?
            .into_iter()
            .filter(|p| p.prefix == PREFIX_NAMESPACE)
            .map(|p| (p.key, p.value.to_string()))
            .collect())
    }

    pub fn bundle_objects(&self, bundle: ProvId) -> Result<Vec<ObjectInfo>> {
        self.backend.bundle_objects(bundle)
    }

    pub fn bundle_relations(&self, bundle: ProvId) -> Result<Vec<RelationInfo>> {
        self.backend.bundle_relations(bundle)
    }

    /// Delete a bundle and everything it contains, atomically
    pub fn delete_bundle(&self, bundle: ProvId) -> Result<()> {
        self.backend.delete_bundle(bundle)?;
        info!("Deleted bundle {}", bundle);
        Ok(())
    }

    pub(crate) fn ensure_bundle(&self, bundle: ProvId) -> Result<ObjectInfo> {
        let info = self.object_info(bundle)?;
        if info.object_type != ObjectType::Bundle {
            return Err(Error::InvalidArgument(format!("{}:{} is not a bundle", info.prefix, info.name)));
        }
        Ok(info)
    }

    // ---- traversal ----

    /// One-hop ancestry or descendants of `node`
    pub fn traverse(
        &self,
        node: ProvId,
        version: VersionSelector,
        direction: Direction,
        flags: TraversalFlags,
    ) -> Result<Vec<AncestryEntry>> {
        traversal::traverse(self.backend.as_ref(), node, version, direction, flags)
    }

    /// Transitive ancestry or descendants of `node`
    pub fn closure(
        &self,
        node: ProvId,
        version: VersionSelector,
        direction: Direction,
        flags: TraversalFlags,
    ) -> Result<Vec<AncestryEntry>> {
        traversal::closure(self.backend.as_ref(), node, version, direction, flags)
    }

    // ---- interchange ----

    pub fn import_document(&self, document: &ProvDocument, options: &ImportOptions) -> Result<ImportReport> {
        import_document(self, document, options)
    }

    /// Parse PROV-JSON text and import it
    pub fn import_json(&self, text: &str, options: &ImportOptions) -> Result<ImportReport> {
        let document = ProvDocument::parse(text)?;
        self.import_document(&document, options)
    }

    pub fn export_bundle(&self, bundle: ProvId) -> Result<ProvDocument> {
        export_bundle(self, bundle)
    }

    /// Parse and check a document without touching the graph
    pub fn validate_document(&self, text: &str) -> Result<ProvDocument> {
        debug!("Validating document of {} bytes", text.len());
        validate_document(text)
    }
}
