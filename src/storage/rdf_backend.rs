//! Oxigraph-backed storage.
//!
//! Objects, versions, relations, properties and sessions are stored as
//! triples in the default graph under IRIs minted by [`IriScheme`]. Reads are
//! SPARQL SELECT queries; result ordering is applied in Rust from the stored
//! sequence numbers. Writers are serialized by an internal mutex and each
//! write lands in a single store transaction, so readers see all of it or none.
//!
//! ```ignore
//! use prov_cpl::storage::rdf_backend::RdfBackend;
//!
//! let backend = RdfBackend::open(std::path::Path::new("./prov-store"), "urn:cpl:")?;
//! ```

use oxigraph::model::vocab::xsd;
use oxigraph::model::{GraphName, Literal, NamedNode, Quad, Term};
use oxigraph::sparql::{QueryResults, QuerySolution, SparqlEvaluator};
use oxigraph::store::Store;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::debug;

use crate::config::GraphConfig;
use crate::core::{
    now_millis, Direction, Endpoint, IriScheme, ObjectInfo, ObjectType, ObjectVersion, Outcome,
    Property, PropertyValue, ProvId, RelationInfo, RelationType, Session, Status, Version,
    VersionInfo, VersionSelector,
};
use crate::error::{Error, Result};
use crate::storage::{NewObject, NewRelation, ProvenanceBackend};

pub struct RdfBackend {
    store: Store,
    iris: IriScheme,
    /// Serializes writers; holds the last issued sequence number
    writer: Mutex<u64>,
}

fn simple(value: &str) -> Literal {
    Literal::new_simple_literal(value)
}

/// SPARQL rendering of a plain string literal
fn sparql_str(value: &str) -> String {
    simple(value).to_string()
}

fn text(row: &QuerySolution, var: &str) -> Result<String> {
    match row.get(var) {
        Some(Term::Literal(l)) => Ok(l.value().to_string()),
        Some(Term::NamedNode(n)) => Ok(n.as_str().to_string()),
        Some(other) => Err(Error::Backend(format!("unexpected term {} bound to ?{}", other, var))),
        None => Err(Error::Backend(format!("?{} is unbound", var))),
    }
}

fn number<T: FromStr>(row: &QuerySolution, var: &str) -> Result<T> {
    let raw = text(row, var)?;
    raw.parse().map_err(|_| Error::Backend(format!("?{} holds non-numeric `{}`", var, raw)))
}

fn value_literal(value: &PropertyValue) -> Literal {
    match value {
        PropertyValue::String(s) => simple(s),
        PropertyValue::Number(n) => Literal::from(*n),
        PropertyValue::Boolean(b) => Literal::from(*b),
    }
}

fn literal_value(row: &QuerySolution, var: &str) -> Result<PropertyValue> {
    match row.get(var) {
        Some(Term::Literal(l)) if l.datatype() == xsd::BOOLEAN => Ok(PropertyValue::Boolean(l.value() == "true")),
        Some(Term::Literal(l)) if l.datatype() == xsd::DOUBLE => l
            .value()
            .parse()
            .map(PropertyValue::Number)
            .map_err(|_| Error::Backend(format!("bad numeric property `{}`", l.value()))),
        Some(Term::Literal(l)) => Ok(PropertyValue::String(l.value().to_string())),
        _ => Err(Error::Backend(format!("?{} is not a literal", var))),
    }
}

impl RdfBackend {
    /// Volatile in-memory store
    pub fn new(base_iri: &str) -> Result<Self> {
        Self::with_store(Store::new()?, base_iri)
    }

    /// On-disk store rooted at `path`
    pub fn open(path: &Path, base_iri: &str) -> Result<Self> {
        Self::with_store(Store::open(path)?, base_iri)
    }

    pub fn from_config(config: &GraphConfig) -> Result<Self> {
        match &config.rdf_path {
            Some(path) => Self::open(path, &config.base_iri),
            None => Self::new(&config.base_iri),
        }
    }

    fn with_store(store: Store, base_iri: &str) -> Result<Self> {
        NamedNode::new(format!("{}probe", base_iri))
            .map_err(|e| Error::Config(format!("invalid base IRI `{}`: {}", base_iri, e)))?;
        let mut backend = RdfBackend { store, iris: IriScheme::new(base_iri), writer: Mutex::new(0) };
        let last = backend.max_seq()?;
        backend.writer = Mutex::new(last);
        Ok(backend)
    }

    // Minted IRIs only extend an already validated base
    fn node(iri: String) -> NamedNode {
        NamedNode::new_unchecked(iri)
    }

    fn quad(&self, subject: &NamedNode, predicate: &str, object: impl Into<Term>) -> Quad {
        Quad::new(subject.clone(), Self::node(self.iris.vocab(predicate)), object, GraphName::DefaultGraph)
    }

    fn select(&self, body: &str) -> Result<Vec<QuerySolution>> {
        let query = format!("PREFIX v: <{}>\n{}", self.iris.vocab(""), body);
        let evaluator = SparqlEvaluator::new();
        let parsed = evaluator
            .parse_query(&query)
            .map_err(|e| Error::Backend(format!("invalid SPARQL: {}", e)))?;
        let results = parsed.on_store(&self.store).execute()?;

        let mut rows = Vec::new();
        if let QueryResults::Solutions(solutions) = results {
            for solution in solutions {
                rows.push(solution?);
            }
        }
        Ok(rows)
    }

    /// Remove then insert inside one store transaction, visible to readers only on commit
    fn commit(&self, inserts: &[Quad], removals: &[Quad]) -> Result<()> {
        let mut transaction = self.store.start_transaction()?;
        for quad in removals {
            transaction.remove(quad);
        }
        for quad in inserts {
            transaction.insert(quad);
        }
        transaction.commit()?;
        Ok(())
    }

    fn max_seq(&self) -> Result<u64> {
        let rows = self.select("SELECT (MAX(?s) AS ?m) WHERE { ?x v:seq ?s }")?;
        match rows.first() {
            Some(row) if row.get("m").is_some() => number(row, "m"),
            _ => Ok(0),
        }
    }

    fn object_rows(&self, pattern: &str) -> Result<Vec<(ObjectInfo, u64)>> {
        let rows = self.select(&format!(
            "SELECT ?o ?type ?prefix ?name ?session ?created ?version ?seq ?bundle WHERE {{
                {}
                ?o v:objectType ?type ; v:prefix ?prefix ; v:name ?name ; v:session ?session ;
                   v:created ?created ; v:version ?version ; v:seq ?seq .
                OPTIONAL {{ ?o v:bundle ?bundle }}
            }}",
            pattern
        ))?;
        rows.iter()
            .map(|row| {
                let bundle = match row.get("bundle") {
                    Some(Term::NamedNode(n)) => Some(self.iris.parse_id(n.as_str())?),
                    _ => None,
                };
                let info = ObjectInfo {
                    id: self.iris.parse_id(&text(row, "o")?)?,
                    prefix: text(row, "prefix")?,
                    name: text(row, "name")?,
                    object_type: text(row, "type")?.parse()?,
                    bundle,
                    creation_session: self.iris.parse_id(&text(row, "session")?)?,
                    creation_time: number(row, "created")?,
                    version: number(row, "version")?,
                };
                Ok((info, number(row, "seq")?))
            })
            .collect()
    }

    fn relation_rows(&self, pattern: &str) -> Result<Vec<(RelationInfo, u64)>> {
        let rows = self.select(&format!(
            "SELECT ?r ?rtype ?src ?srcv ?dst ?dstv ?seq ?bundle WHERE {{
                {}
                ?r v:relationType ?rtype ; v:source ?sv ; v:destination ?dv ; v:seq ?seq .
                ?sv v:versionOf ?src ; v:number ?srcv .
                ?dv v:versionOf ?dst ; v:number ?dstv .
                OPTIONAL {{ ?r v:bundle ?bundle }}
            }}",
            pattern
        ))?;
        rows.iter()
            .map(|row| {
                let bundle = match row.get("bundle") {
                    Some(Term::NamedNode(n)) => Some(self.iris.parse_id(n.as_str())?),
                    _ => None,
                };
                let info = RelationInfo {
                    id: self.iris.parse_id(&text(row, "r")?)?,
                    relation_type: text(row, "rtype")?.parse::<RelationType>()?,
                    source: ObjectVersion::new(self.iris.parse_id(&text(row, "src")?)?, number(row, "srcv")?),
                    destination: ObjectVersion::new(
                        self.iris.parse_id(&text(row, "dst")?)?,
                        number(row, "dstv")?,
                    ),
                    bundle,
                };
                Ok((info, number(row, "seq")?))
            })
            .collect()
    }

    fn relations_touching(&self, id: ProvId) -> Result<Vec<(RelationInfo, u64)>> {
        let object = self.iris.object(id);
        let mut rows = self.relation_rows(&format!(
            "{{ ?r v:source ?sv . ?sv v:versionOf <{0}> }} UNION {{ ?r v:destination ?dv . ?dv v:versionOf <{0}> }}",
            object
        ))?;
        // both branches match when the two endpoints are versions of `id`
        let mut seen = HashSet::new();
        rows.retain(|(info, _)| seen.insert(info.id));
        Ok(rows)
    }

    fn owner_exists(&self, owner: ProvId) -> Result<bool> {
        let rows = self.select(&format!(
            "SELECT ?s WHERE {{ {{ <{}> v:seq ?s }} UNION {{ <{}> v:seq ?s }} }}",
            self.iris.object(owner),
            self.iris.relation(owner)
        ))?;
        Ok(!rows.is_empty())
    }

    fn resolve(&self, endpoint: Endpoint) -> Result<(ObjectVersion, ObjectType)> {
        let info = self.object_info(endpoint.id())?;
        match endpoint {
            Endpoint::Current(_) => Ok((info.current(), info.object_type)),
            Endpoint::Exact(ov) if ov.version <= info.version => Ok((ov, info.object_type)),
            Endpoint::Exact(ov) => Err(Error::NotFound(format!("version {}", ov))),
        }
    }

    fn check_bundle(&self, bundle: Option<ProvId>) -> Result<()> {
        if let Some(bundle) = bundle {
            if self.object_info(bundle)?.object_type != ObjectType::Bundle {
                return Err(Error::InvalidArgument(format!("{} is not a bundle", bundle)));
            }
        }
        Ok(())
    }

    fn version_quads(&self, id: ProvId, version: Version, session: ProvId, created: u64) -> Vec<Quad> {
        let node = Self::node(self.iris.version(id, version));
        vec![
            self.quad(&node, "versionOf", Self::node(self.iris.object(id))),
            self.quad(&node, "number", Literal::from(i64::from(version))),
            self.quad(&node, "session", Self::node(self.iris.session(session))),
            self.quad(&node, "created", Literal::from(created as i64)),
        ]
    }

    /// Every stored quad with `subject`
    fn subject_quads(&self, subject: &str) -> Result<Vec<Quad>> {
        let node = Self::node(subject.to_string());
        let rows = self.select(&format!("SELECT ?p ?o WHERE {{ <{}> ?p ?o }}", subject))?;
        let mut quads = Vec::with_capacity(rows.len());
        for row in &rows {
            if let (Some(Term::NamedNode(p)), Some(o)) = (row.get("p"), row.get("o")) {
                quads.push(Quad::new(node.clone(), p.clone(), o.clone(), GraphName::DefaultGraph));
            }
        }
        Ok(quads)
    }

    /// Caller holds the writer lock and passes its sequence counter
    fn insert_object(&self, last_seq: &mut u64, object: &NewObject<'_>) -> Result<ObjectInfo> {
        self.check_bundle(object.bundle)?;
        if object.unique
            && !self.lookup_objects(object.prefix, object.name, Some(object.object_type), None)?.is_empty()
        {
            return Err(Error::AlreadyExists(format!("{} {}:{}", object.object_type, object.prefix, object.name)));
        }

        let id = ProvId::generate();
        let creation_time = now_millis();
        let seq = *last_seq + 1;
        let node = Self::node(self.iris.object(id));
        let mut quads = vec![
            self.quad(&node, "objectType", simple(object.object_type.as_str())),
            self.quad(&node, "prefix", simple(object.prefix)),
            self.quad(&node, "name", simple(object.name)),
            self.quad(&node, "session", Self::node(self.iris.session(object.session))),
            self.quad(&node, "created", Literal::from(creation_time as i64)),
            self.quad(&node, "version", Literal::from(0i64)),
            self.quad(&node, "seq", Literal::from(seq as i64)),
        ];
        if let Some(bundle) = object.bundle {
            quads.push(self.quad(&node, "bundle", Self::node(self.iris.object(bundle))));
        }
        quads.extend(self.version_quads(id, 0, object.session, creation_time));
        self.commit(&quads, &[])?;
        *last_seq = seq;

        debug!("Stored {} {}:{} as {}", object.object_type, object.prefix, object.name, id);
        Ok(ObjectInfo {
            id,
            prefix: object.prefix.to_string(),
            name: object.name.to_string(),
            object_type: object.object_type,
            bundle: object.bundle,
            creation_session: object.session,
            creation_time,
            version: 0,
        })
    }

    fn property_subjects(&self, owner: ProvId) -> Result<Vec<String>> {
        let rows = self.select(&format!("SELECT ?p WHERE {{ ?p v:owner {} }}", sparql_str(&owner.to_string())))?;
        rows.iter().map(|row| text(row, "p")).collect()
    }
}

impl ProvenanceBackend for RdfBackend {
    fn register_session(&self, session: &Session) -> Result<()> {
        let _guard = self.writer.lock()?;
        let subject = self.iris.session(session.id);
        if !self.select(&format!("SELECT ?r WHERE {{ <{}> v:record ?r }}", subject))?.is_empty() {
            return Err(Error::AlreadyInitialized(format!("session {}", session.id)));
        }
        let record = serde_json::to_string(session)?;
        self.commit(&[self.quad(&Self::node(subject), "record", simple(&record))], &[])
    }

    fn session_info(&self, id: ProvId) -> Result<Session> {
        let rows = self.select(&format!("SELECT ?r WHERE {{ <{}> v:record ?r }}", self.iris.session(id)))?;
        let row = rows.first().ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        Ok(serde_json::from_str(&text(row, "r")?)?)
    }

    fn create_object(&self, object: NewObject<'_>) -> Result<ObjectInfo> {
        let mut last_seq = self.writer.lock()?;
        self.insert_object(&mut last_seq, &object)
    }

    fn lookup_or_create_object(&self, object: NewObject<'_>) -> Result<Outcome<ObjectInfo>> {
        let mut last_seq = self.writer.lock()?;
        let found = self.lookup_objects(object.prefix, object.name, Some(object.object_type), None)?;
        match found.into_iter().next() {
            Some(info) => Ok(Outcome::new(info, Status::Ok)),
            None => Ok(Outcome::new(self.insert_object(&mut last_seq, &object)?, Status::ObjectCreated)),
        }
    }

    fn lookup_objects(
        &self,
        prefix: &str,
        name: &str,
        object_type: Option<ObjectType>,
        bundle: Option<ProvId>,
    ) -> Result<Vec<ObjectInfo>> {
        let mut pattern = format!("?o v:prefix {} ; v:name {} .", sparql_str(prefix), sparql_str(name));
        if let Some(t) = object_type {
            pattern.push_str(&format!(" ?o v:objectType {} .", sparql_str(t.as_str())));
        }
        if let Some(b) = bundle {
            pattern.push_str(&format!(" ?o v:bundle <{}> .", self.iris.object(b)));
        }
        let mut rows = self.object_rows(&pattern)?;
        rows.sort_by(|(a, a_seq), (b, b_seq)| (b.creation_time, b_seq).cmp(&(a.creation_time, a_seq)));
        Ok(rows.into_iter().map(|(info, _)| info).collect())
    }

    fn object_info(&self, id: ProvId) -> Result<ObjectInfo> {
        self.object_rows(&format!("VALUES ?o {{ <{}> }}", self.iris.object(id)))?
            .into_iter()
            .next()
            .map(|(info, _)| info)
            .ok_or_else(|| Error::NotFound(format!("object {}", id)))
    }

    fn all_objects(&self, prefix: Option<&str>) -> Result<Vec<ObjectInfo>> {
        let pattern = prefix.map(|p| format!("?o v:prefix {} .", sparql_str(p))).unwrap_or_default();
        let mut rows = self.object_rows(&pattern)?;
        rows.sort_by_key(|(_, seq)| *seq);
        Ok(rows.into_iter().map(|(info, _)| info).collect())
    }

    fn version_info(&self, id: ProvId, version: Version) -> Result<VersionInfo> {
        let rows = self.select(&format!(
            "SELECT ?session ?created WHERE {{ <{}> v:session ?session ; v:created ?created }}",
            self.iris.version(id, version)
        ))?;
        let row = rows
            .first()
            .ok_or_else(|| Error::NotFound(format!("version {}", ObjectVersion::new(id, version))))?;
        Ok(VersionInfo {
            id,
            version,
            session: self.iris.parse_id(&text(row, "session")?)?,
            creation_time: number(row, "created")?,
        })
    }

    fn new_version(&self, id: ProvId, session: ProvId) -> Result<Version> {
        let _guard = self.writer.lock()?;
        let info = self.object_info(id)?;
        let version = info.version + 1;
        let node = Self::node(self.iris.object(id));

        let removals = [self.quad(&node, "version", Literal::from(i64::from(info.version)))];
        let mut inserts = vec![self.quad(&node, "version", Literal::from(i64::from(version)))];
        inserts.extend(self.version_quads(id, version, session, now_millis()));
        self.commit(&inserts, &removals)?;

        debug!("Object {} advanced to version {}", id, version);
        Ok(version)
    }

    fn create_relation(&self, relation: NewRelation) -> Result<Outcome<RelationInfo>> {
        let mut last_seq = self.writer.lock()?;
        let (source, source_type) = self.resolve(relation.source)?;
        let (destination, destination_type) = self.resolve(relation.destination)?;
        relation.relation_type.check_endpoints(source_type, destination_type)?;
        self.check_bundle(relation.bundle)?;

        let source_node = self.iris.version(source.id, source.version);
        let destination_node = self.iris.version(destination.id, destination.version);
        let existing = self
            .relation_rows(&format!(
                "?r v:relationType {} ; v:source <{}> ; v:destination <{}> .",
                sparql_str(relation.relation_type.json_group()),
                source_node,
                destination_node
            ))?
            .into_iter()
            .find(|(info, _)| info.bundle == relation.bundle);
        if let Some((info, _)) = existing {
            return Ok(Outcome::new(info, Status::DuplicateIgnored));
        }

        let id = ProvId::generate();
        let seq = *last_seq + 1;
        let node = Self::node(self.iris.relation(id));
        let mut quads = vec![
            self.quad(&node, "relationType", simple(relation.relation_type.json_group())),
            self.quad(&node, "source", Self::node(source_node)),
            self.quad(&node, "destination", Self::node(destination_node)),
            self.quad(&node, "seq", Literal::from(seq as i64)),
        ];
        if let Some(bundle) = relation.bundle {
            quads.push(self.quad(&node, "bundle", Self::node(self.iris.object(bundle))));
        }
        self.commit(&quads, &[])?;
        *last_seq = seq;

        debug!("Stored {} {} -> {} as {}", relation.relation_type, source, destination, id);
        Ok(Outcome::new(
            RelationInfo { id, relation_type: relation.relation_type, source, destination, bundle: relation.bundle },
            Status::Ok,
        ))
    }

    fn relation_info(&self, id: ProvId) -> Result<RelationInfo> {
        self.relation_rows(&format!("VALUES ?r {{ <{}> }}", self.iris.relation(id)))?
            .into_iter()
            .next()
            .map(|(info, _)| info)
            .ok_or_else(|| Error::NotFound(format!("relation {}", id)))
    }

    fn relations_of(
        &self,
        id: ProvId,
        version: VersionSelector,
        direction: Direction,
    ) -> Result<Vec<RelationInfo>> {
        let info = self.object_info(id)?;
        if let VersionSelector::Exact(v) = version {
            if v > info.version {
                return Err(Error::NotFound(format!("version {}", ObjectVersion::new(id, v))));
            }
        }

        let mut rows: Vec<(RelationInfo, u64)> = self
            .relations_touching(id)?
            .into_iter()
            .filter(|(r, _)| {
                let near = match direction {
                    Direction::Ancestors => r.descendant(),
                    Direction::Descendants => r.ancestor(),
                };
                near.id == id && version.matches(near.version)
            })
            .collect();
        rows.sort_by_key(|(_, seq)| *seq);
        Ok(rows.into_iter().map(|(r, _)| r).collect())
    }

    fn add_property(&self, owner: ProvId, prefix: &str, key: &str, value: PropertyValue) -> Result<()> {
        let mut last_seq = self.writer.lock()?;
        if !self.owner_exists(owner)? {
            return Err(Error::NotFound(format!("property owner {}", owner)));
        }
        let seq = *last_seq + 1;
        let node = Self::node(self.iris.property(ProvId::generate()));
        let quads = [
            self.quad(&node, "owner", simple(&owner.to_string())),
            self.quad(&node, "propPrefix", simple(prefix)),
            self.quad(&node, "propKey", simple(key)),
            self.quad(&node, "value", value_literal(&value)),
            self.quad(&node, "seq", Literal::from(seq as i64)),
        ];
        self.commit(&quads, &[])?;
        *last_seq = seq;
        Ok(())
    }

    fn properties(&self, owner: ProvId, key: Option<(&str, &str)>) -> Result<Vec<Property>> {
        if !self.owner_exists(owner)? {
            return Err(Error::NotFound(format!("property owner {}", owner)));
        }
        let mut pattern = format!("?p v:owner {} .", sparql_str(&owner.to_string()));
        if let Some((prefix, k)) = key {
            pattern.push_str(&format!(" ?p v:propPrefix {} ; v:propKey {} .", sparql_str(prefix), sparql_str(k)));
        }
        let rows = self.select(&format!(
            "SELECT ?prefix ?key ?value ?seq WHERE {{ {} ?p v:propPrefix ?prefix ; v:propKey ?key ; v:value ?value ; v:seq ?seq }}",
            pattern
        ))?;

        let mut found = rows
            .iter()
            .map(|row| {
                let property =
                    Property { owner, prefix: text(row, "prefix")?, key: text(row, "key")?, value: literal_value(row, "value")? };
                Ok((property, number::<u64>(row, "seq")?))
            })
            .collect::<Result<Vec<_>>>()?;
        found.sort_by_key(|(_, seq)| *seq);
        Ok(found.into_iter().map(|(p, _)| p).collect())
    }

    fn lookup_by_property(&self, prefix: &str, key: &str, value: &PropertyValue) -> Result<Vec<ProvId>> {
        let rows = self.select(&format!(
            "SELECT ?owner ?value WHERE {{ ?p v:owner ?owner ; v:propPrefix {} ; v:propKey {} ; v:value ?value }}",
            sparql_str(prefix),
            sparql_str(key)
        ))?;
        let mut owners = Vec::new();
        for row in &rows {
            if &literal_value(row, "value")? == value {
                owners.push(text(row, "owner")?.parse::<ProvId>()?);
            }
        }
        owners.sort();
        owners.dedup();
        Ok(owners)
    }

    fn bundle_objects(&self, bundle: ProvId) -> Result<Vec<ObjectInfo>> {
        let mut rows = self.object_rows(&format!("?o v:bundle <{}> .", self.iris.object(bundle)))?;
        rows.sort_by_key(|(_, seq)| *seq);
        Ok(rows.into_iter().map(|(info, _)| info).collect())
    }

    fn bundle_relations(&self, bundle: ProvId) -> Result<Vec<RelationInfo>> {
        let mut rows = self.relation_rows(&format!("?r v:bundle <{}> .", self.iris.object(bundle)))?;
        rows.sort_by_key(|(_, seq)| *seq);
        Ok(rows.into_iter().map(|(info, _)| info).collect())
    }

    fn delete_bundle(&self, bundle: ProvId) -> Result<()> {
        let _guard = self.writer.lock()?;
        self.check_bundle(Some(bundle))?;

        let mut doomed_objects: HashSet<ProvId> = HashSet::from([bundle]);
        let mut doomed_relations: HashSet<ProvId> = HashSet::new();
        let mut pending = vec![bundle];
        while let Some(current) = pending.pop() {
            doomed_relations.extend(self.bundle_relations(current)?.into_iter().map(|r| r.id));
            for member in self.bundle_objects(current)? {
                if doomed_objects.insert(member.id) && member.object_type == ObjectType::Bundle {
                    pending.push(member.id);
                }
            }
        }
        for object in &doomed_objects {
            doomed_relations.extend(self.relations_touching(*object)?.into_iter().map(|(r, _)| r.id));
        }

        let mut removals = Vec::new();
        for relation in &doomed_relations {
            removals.extend(self.subject_quads(&self.iris.relation(*relation))?);
            for property in self.property_subjects(*relation)? {
                removals.extend(self.subject_quads(&property)?);
            }
        }
        for object in &doomed_objects {
            removals.extend(self.subject_quads(&self.iris.object(*object))?);
            let versions =
                self.select(&format!("SELECT ?v WHERE {{ ?v v:versionOf <{}> }}", self.iris.object(*object)))?;
            for row in &versions {
                removals.extend(self.subject_quads(&text(row, "v")?)?);
            }
            for property in self.property_subjects(*object)? {
                removals.extend(self.subject_quads(&property)?);
            }
        }
        self.commit(&[], &removals)?;

        debug!(
            "Deleted bundle {} with {} objects and {} relations",
            bundle,
            doomed_objects.len(),
            doomed_relations.len()
        );
        Ok(())
    }
}
