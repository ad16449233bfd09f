//! In-memory reference backend
//!
//! All state lives behind a single `RwLock`. Readers run concurrently,
//! writers are serialized, and every write is applied under one guard, so
//! duplicate detection, version increments and cascades are atomic.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::debug;

use crate::core::{
    now_millis, Direction, Endpoint, ObjectInfo, ObjectType, ObjectVersion, Outcome, Property,
    PropertyValue, ProvId, RelationInfo, RelationType, Session, Status, Version, VersionInfo,
    VersionSelector,
};
use crate::error::{Error, Result};
use crate::storage::indexing::name_index::NameIndex;
use crate::storage::{NewObject, NewRelation, ProvenanceBackend};

#[derive(Debug)]
struct ObjectRecord {
    info: ObjectInfo,
    versions: Vec<VersionInfo>,
    seq: u64,
}

#[derive(Debug)]
struct RelationRecord {
    info: RelationInfo,
    seq: u64,
}

type RelationKey = (RelationType, ObjectVersion, ObjectVersion, Option<ProvId>);

/// Member arena of one bundle
#[derive(Debug, Default)]
struct BundleMembers {
    objects: Vec<ProvId>,
    relations: Vec<ProvId>,
}

#[derive(Debug, Default)]
struct GraphState {
    seq: u64,
    sessions: HashMap<ProvId, Session>,
    objects: HashMap<ProvId, ObjectRecord>,
    names: NameIndex,
    relations: HashMap<ProvId, RelationRecord>,
    relation_keys: HashMap<RelationKey, ProvId>,
    /// Object id -> relations with that object at either end
    by_endpoint: HashMap<ProvId, Vec<ProvId>>,
    properties: HashMap<ProvId, Vec<Property>>,
    bundles: HashMap<ProvId, BundleMembers>,
}

impl GraphState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn object(&self, id: ProvId) -> Result<&ObjectRecord> {
        self.objects.get(&id).ok_or_else(|| Error::NotFound(format!("object {}", id)))
    }

    fn resolve(&self, endpoint: Endpoint) -> Result<(ObjectVersion, ObjectType)> {
        match endpoint {
            Endpoint::Current(id) => {
                let record = self.object(id)?;
                Ok((record.info.current(), record.info.object_type))
            }
            Endpoint::Exact(ov) => {
                let record = self.object(ov.id)?;
                if ov.version > record.info.version {
                    return Err(Error::NotFound(format!("version {}", ov)));
                }
                Ok((ov, record.info.object_type))
            }
        }
    }

    fn check_bundle(&self, bundle: Option<ProvId>) -> Result<()> {
        if let Some(bundle) = bundle {
            let record = self.object(bundle)?;
            if record.info.object_type != ObjectType::Bundle {
                return Err(Error::InvalidArgument(format!("{} is not a bundle", bundle)));
            }
        }
        Ok(())
    }

    fn check_version(&self, id: ProvId, version: VersionSelector) -> Result<()> {
        let record = self.object(id)?;
        if let VersionSelector::Exact(v) = version {
            if v > record.info.version {
                return Err(Error::NotFound(format!("version {}", ObjectVersion::new(id, v))));
            }
        }
        Ok(())
    }

    fn owner_exists(&self, owner: ProvId) -> bool {
        self.objects.contains_key(&owner) || self.relations.contains_key(&owner)
    }

    /// Matches, most recent first; ties in creation time fall back to creation order
    fn find_objects(
        &self,
        prefix: &str,
        name: &str,
        object_type: Option<ObjectType>,
        bundle: Option<ProvId>,
    ) -> Vec<ObjectInfo> {
        let mut matches: Vec<&ObjectRecord> = self
            .names
            .lookup(prefix, name)
            .iter()
            .filter_map(|id| self.objects.get(id))
            .filter(|r| object_type.map_or(true, |t| r.info.object_type == t))
            .filter(|r| bundle.is_none() || r.info.bundle == bundle)
            .collect();
        matches.sort_by(|a, b| (b.info.creation_time, b.seq).cmp(&(a.info.creation_time, a.seq)));
        matches.into_iter().map(|r| r.info.clone()).collect()
    }

    fn insert_object(&mut self, object: &NewObject<'_>) -> Result<ObjectInfo> {
        self.check_bundle(object.bundle)?;
        if object.unique && !self.find_objects(object.prefix, object.name, Some(object.object_type), None).is_empty() {
            return Err(Error::AlreadyExists(format!("{} {}:{}", object.object_type, object.prefix, object.name)));
        }

        let id = ProvId::generate();
        let creation_time = now_millis();
        let info = ObjectInfo {
            id,
            prefix: object.prefix.to_string(),
            name: object.name.to_string(),
            object_type: object.object_type,
            bundle: object.bundle,
            creation_session: object.session,
            creation_time,
            version: 0,
        };
        let versions = vec![VersionInfo { id, version: 0, session: object.session, creation_time }];
        let seq = self.next_seq();

        self.objects.insert(id, ObjectRecord { info: info.clone(), versions, seq });
        self.names.insert(object.prefix, object.name, id);
        if object.object_type == ObjectType::Bundle {
            self.bundles.entry(id).or_default();
        }
        if let Some(bundle) = object.bundle {
            self.bundles.entry(bundle).or_default().objects.push(id);
        }

        debug!("Created {} {}:{} as {}", info.object_type, info.prefix, info.name, id);
        Ok(info)
    }
}

/// Reference `ProvenanceBackend` holding the whole graph in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<GraphState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }

    /// Number of live objects, bundles included
    pub fn object_count(&self) -> Result<usize> {
        Ok(self.state.read()?.objects.len())
    }

    /// Number of live relations
    pub fn relation_count(&self) -> Result<usize> {
        Ok(self.state.read()?.relations.len())
    }
}

impl ProvenanceBackend for MemoryBackend {
    fn register_session(&self, session: &Session) -> Result<()> {
        let mut state = self.state.write()?;
        if state.sessions.contains_key(&session.id) {
            return Err(Error::AlreadyInitialized(format!("session {}", session.id)));
        }
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    fn session_info(&self, id: ProvId) -> Result<Session> {
        let state = self.state.read()?;
        state.sessions.get(&id).cloned().ok_or_else(|| Error::NotFound(format!("session {}", id)))
    }

    fn create_object(&self, object: NewObject<'_>) -> Result<ObjectInfo> {
        self.state.write()?.insert_object(&object)
    }

    fn lookup_objects(
        &self,
        prefix: &str,
        name: &str,
        object_type: Option<ObjectType>,
        bundle: Option<ProvId>,
    ) -> Result<Vec<ObjectInfo>> {
        Ok(self.state.read()?.find_objects(prefix, name, object_type, bundle))
    }

    fn lookup_or_create_object(&self, object: NewObject<'_>) -> Result<Outcome<ObjectInfo>> {
        let mut state = self.state.write()?;
        let found = state.find_objects(object.prefix, object.name, Some(object.object_type), None);
        match found.into_iter().next() {
            Some(info) => Ok(Outcome::new(info, Status::Ok)),
            None => Ok(Outcome::new(state.insert_object(&object)?, Status::ObjectCreated)),
        }
    }

    fn object_info(&self, id: ProvId) -> Result<ObjectInfo> {
        Ok(self.state.read()?.object(id)?.info.clone())
    }

    fn all_objects(&self, prefix: Option<&str>) -> Result<Vec<ObjectInfo>> {
        let state = self.state.read()?;
        let mut records: Vec<&ObjectRecord> = state
            .objects
            .values()
            .filter(|r| prefix.map_or(true, |p| r.info.prefix == p))
            .collect();
        records.sort_by_key(|r| r.seq);
        Ok(records.into_iter().map(|r| r.info.clone()).collect())
    }

    fn version_info(&self, id: ProvId, version: Version) -> Result<VersionInfo> {
        let state = self.state.read()?;
        state
            .object(id)?
            .versions
            .get(version as usize)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("version {}", ObjectVersion::new(id, version))))
    }

    fn new_version(&self, id: ProvId, session: ProvId) -> Result<Version> {
        let mut state = self.state.write()?;
        let record =
            state.objects.get_mut(&id).ok_or_else(|| Error::NotFound(format!("object {}", id)))?;
        let version = record.info.version + 1;
        record.info.version = version;
        record.versions.push(VersionInfo { id, version, session, creation_time: now_millis() });
        debug!("Object {} advanced to version {}", id, version);
        Ok(version)
    }

    fn create_relation(&self, relation: NewRelation) -> Result<Outcome<RelationInfo>> {
        let mut state = self.state.write()?;
        let (source, source_type) = state.resolve(relation.source)?;
        let (destination, destination_type) = state.resolve(relation.destination)?;
        relation.relation_type.check_endpoints(source_type, destination_type)?;
        state.check_bundle(relation.bundle)?;

        let key = (relation.relation_type, source, destination, relation.bundle);
        if let Some(existing) = state.relation_keys.get(&key) {
            if let Some(record) = state.relations.get(existing) {
                return Ok(Outcome::new(record.info.clone(), Status::DuplicateIgnored));
            }
        }

        let id = ProvId::generate();
        let info = RelationInfo {
            id,
            relation_type: relation.relation_type,
            source,
            destination,
            bundle: relation.bundle,
        };
        let seq = state.next_seq();
        state.relations.insert(id, RelationRecord { info: info.clone(), seq });
        state.relation_keys.insert(key, id);
        state.by_endpoint.entry(source.id).or_default().push(id);
        if destination.id != source.id {
            state.by_endpoint.entry(destination.id).or_default().push(id);
        }
        if let Some(bundle) = relation.bundle {
            state.bundles.entry(bundle).or_default().relations.push(id);
        }

        debug!("Created {} {} -> {} as {}", info.relation_type, source, destination, id);
        Ok(Outcome::new(info, Status::Ok))
    }

    fn relation_info(&self, id: ProvId) -> Result<RelationInfo> {
        let state = self.state.read()?;
        state
            .relations
            .get(&id)
            .map(|r| r.info.clone())
            .ok_or_else(|| Error::NotFound(format!("relation {}", id)))
    }

    fn relations_of(
        &self,
        id: ProvId,
        version: VersionSelector,
        direction: Direction,
    ) -> Result<Vec<RelationInfo>> {
        let state = self.state.read()?;
        state.check_version(id, version)?;

        let mut found: Vec<&RelationRecord> = state
            .by_endpoint
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|rid| state.relations.get(rid))
            .filter(|r| {
                // the queried node sits opposite the direction we walk
                let near = match direction {
                    Direction::Ancestors => r.info.descendant(),
                    Direction::Descendants => r.info.ancestor(),
                };
                near.id == id && version.matches(near.version)
            })
            .collect();
        found.sort_by_key(|r| r.seq);
        Ok(found.into_iter().map(|r| r.info.clone()).collect())
    }

    fn add_property(&self, owner: ProvId, prefix: &str, key: &str, value: PropertyValue) -> Result<()> {
        let mut state = self.state.write()?;
        if !state.owner_exists(owner) {
            return Err(Error::NotFound(format!("property owner {}", owner)));
        }
        state.properties.entry(owner).or_default().push(Property {
            owner,
            prefix: prefix.to_string(),
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    fn properties(&self, owner: ProvId, key: Option<(&str, &str)>) -> Result<Vec<Property>> {
        let state = self.state.read()?;
        if !state.owner_exists(owner) {
            return Err(Error::NotFound(format!("property owner {}", owner)));
        }
        Ok(state
            .properties
            .get(&owner)
            .into_iter()
            .flatten()
            .filter(|p| key.map_or(true, |(prefix, k)| p.prefix == prefix && p.key == k))
            .cloned()
            .collect())
    }

    fn lookup_by_property(&self, prefix: &str, key: &str, value: &PropertyValue) -> Result<Vec<ProvId>> {
        let state = self.state.read()?;
        let mut owners: Vec<ProvId> = state
            .properties
            .values()
            .flatten()
            .filter(|p| p.prefix == prefix && p.key == key && &p.value == value)
            .map(|p| p.owner)
            .collect();
        owners.sort();
        owners.dedup();
        Ok(owners)
    }

    fn bundle_objects(&self, bundle: ProvId) -> Result<Vec<ObjectInfo>> {
        let state = self.state.read()?;
        Ok(state
            .bundles
            .get(&bundle)
            .map(|m| m.objects.iter().filter_map(|id| state.objects.get(id)).map(|r| r.info.clone()).collect())
            .unwrap_or_default())
    }

    fn bundle_relations(&self, bundle: ProvId) -> Result<Vec<RelationInfo>> {
        let state = self.state.read()?;
        Ok(state
            .bundles
            .get(&bundle)
            .map(|m| m.relations.iter().filter_map(|id| state.relations.get(id)).map(|r| r.info.clone()).collect())
            .unwrap_or_default())
    }

    fn delete_bundle(&self, bundle: ProvId) -> Result<()> {
        let mut state = self.state.write()?;
        state.check_bundle(Some(bundle))?;

        // Collect everything first; the removal below cannot fail
        let mut doomed_objects: HashSet<ProvId> = HashSet::new();
        let mut doomed_relations: HashSet<ProvId> = HashSet::new();
        let mut pending = vec![bundle];
        doomed_objects.insert(bundle);
        while let Some(current) = pending.pop() {
            let Some(members) = state.bundles.get(&current) else { continue };
            doomed_relations.extend(members.relations.iter().copied());
            for &member in &members.objects {
                if doomed_objects.insert(member)
                    && state.objects.get(&member).is_some_and(|r| r.info.object_type == ObjectType::Bundle)
                {
                    pending.push(member);
                }
            }
        }
        for object in &doomed_objects {
            if let Some(touching) = state.by_endpoint.get(object) {
                doomed_relations.extend(touching.iter().copied());
            }
        }

        for rid in &doomed_relations {
            let Some(record) = state.relations.remove(rid) else { continue };
            let info = record.info;
            state.relation_keys.remove(&(info.relation_type, info.source, info.destination, info.bundle));
            state.properties.remove(rid);
            for end in [info.source.id, info.destination.id] {
                if !doomed_objects.contains(&end) {
                    if let Some(list) = state.by_endpoint.get_mut(&end) {
                        list.retain(|r| r != rid);
                    }
                }
            }
            if let Some(owner) = info.bundle.filter(|b| !doomed_objects.contains(b)) {
                if let Some(members) = state.bundles.get_mut(&owner) {
                    members.relations.retain(|r| r != rid);
                }
            }
        }

        for oid in &doomed_objects {
            let Some(record) = state.objects.remove(oid) else { continue };
            state.names.remove(*oid);
            state.by_endpoint.remove(oid);
            state.properties.remove(oid);
            state.bundles.remove(oid);
            if let Some(owner) = record.info.bundle.filter(|b| !doomed_objects.contains(b)) {
                if let Some(members) = state.bundles.get_mut(&owner) {
                    members.objects.retain(|o| o != oid);
                }
            }
        }

        debug!(
            "Deleted bundle {} with {} objects and {} relations",
            bundle,
            doomed_objects.len(),
            doomed_relations.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(backend: &MemoryBackend, name: &str, object_type: ObjectType, bundle: Option<ProvId>) -> ObjectInfo {
        backend
            .create_object(NewObject {
                prefix: "ex",
                name,
                object_type,
                bundle,
                session: ProvId::NONE,
                unique: false,
            })
            .unwrap()
    }

    fn relate(backend: &MemoryBackend, s: ProvId, d: ProvId, t: RelationType, bundle: Option<ProvId>) -> Outcome<RelationInfo> {
        backend
            .create_relation(NewRelation {
                relation_type: t,
                source: Endpoint::Current(s),
                destination: Endpoint::Current(d),
                bundle,
            })
            .unwrap()
    }

    #[test]
    fn test_unique_objects_rejected_when_enforced() {
        let backend = MemoryBackend::new();
        object(&backend, "a", ObjectType::Entity, None);
        let again = backend.create_object(NewObject {
            prefix: "ex",
            name: "a",
            object_type: ObjectType::Entity,
            bundle: None,
            session: ProvId::NONE,
            unique: true,
        });
        assert!(matches!(again, Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn test_duplicate_relation_is_ignored() {
        let backend = MemoryBackend::new();
        let e = object(&backend, "e", ObjectType::Entity, None);
        let p = object(&backend, "p", ObjectType::Activity, None);

        let first = relate(&backend, e.id, p.id, RelationType::WasGeneratedBy, None);
        let second = relate(&backend, e.id, p.id, RelationType::WasGeneratedBy, None);
        assert_eq!(first.status, Status::Ok);
        assert_eq!(second.status, Status::DuplicateIgnored);
        assert_eq!(first.value.id, second.value.id);
        assert_eq!(backend.relation_count().unwrap(), 1);
    }

    #[test]
    fn test_cascade_removes_touching_relations() {
        let backend = MemoryBackend::new();
        let bundle = object(&backend, "b", ObjectType::Bundle, None);
        let inner = object(&backend, "inner", ObjectType::Entity, Some(bundle.id));
        let outer = object(&backend, "outer", ObjectType::Entity, None);
        relate(&backend, outer.id, inner.id, RelationType::WasDerivedFrom, None);

        backend.delete_bundle(bundle.id).unwrap();

        assert_eq!(backend.object_count().unwrap(), 1);
        assert_eq!(backend.relation_count().unwrap(), 0);
        assert!(backend.relations_of(outer.id, VersionSelector::All, Direction::Ancestors).unwrap().is_empty());
        assert!(backend.bundle_objects(bundle.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_non_bundle_is_invalid() {
        let backend = MemoryBackend::new();
        let e = object(&backend, "e", ObjectType::Entity, None);
        assert!(matches!(backend.delete_bundle(e.id), Err(Error::InvalidArgument(_))));
    }
}
