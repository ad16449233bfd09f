//! All-or-nothing document import
//!
//! The document is checked completely before the first write: required
//! fields, cycles, endpoint resolution, anchor and responsible agent. The
//! commit then runs inside a freshly created bundle; if any write fails the
//! bundle is deleted (cascading) before the error is returned.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::api::prov_graph::ProvGraph;
use crate::config::is_valid_prefix;
use crate::core::property::split_qualified;
use crate::core::relation::{EndpointKind, RelationType};
use crate::core::{ObjectType, ProvId};
use crate::error::{Error, Result};
use crate::parsing::cycle_check::{ensure_acyclic, find_cycles};
use crate::parsing::prov_json::{Attribute, ProvDocument};
use crate::storage::ProvenanceBackend;

/// Declares that a pre-existing entity is the same thing as a document entity
#[derive(Debug, Clone)]
pub struct Anchor {
    pub object: ProvId,
    /// Name of the matching entity in the document
    pub document_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Name of the bundle that receives the document
    pub bundle_name: String,
    /// Object prefix for document nodes; the configured default when absent
    pub namespace: Option<String>,
    pub anchor: Option<Anchor>,
    /// Agent the bundle is attributed to (only together with an anchor)
    pub responsible_agent: Option<ProvId>,
}

impl ImportOptions {
    pub fn new(bundle_name: impl Into<String>) -> Self {
        ImportOptions { bundle_name: bundle_name.into(), ..Default::default() }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn anchor(mut self, object: ProvId, document_name: impl Into<String>) -> Self {
        self.anchor = Some(Anchor { object, document_name: document_name.into() });
        self
    }

    pub fn responsible_agent(mut self, agent: ProvId) -> Self {
        self.responsible_agent = Some(agent);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub bundle: ProvId,
    pub objects_created: usize,
    pub objects_reused: usize,
    pub relations_created: usize,
    pub relations_duplicate: usize,
}

/// Where a relation endpoint name points
#[derive(Debug, Clone, Copy)]
enum Target {
    /// Index into `ProvDocument::nodes`
    Node(usize),
    Existing(ProvId),
}

struct Plan {
    namespace: String,
    /// `(source, destination)` per document relation
    endpoints: Vec<(Target, Target)>,
    anchor: Option<(ProvId, usize)>,
}

fn resolve<B: ProvenanceBackend + ?Sized>(
    graph: &ProvGraph<B>,
    document: &ProvDocument,
    namespace: &str,
    name: &str,
    kind: EndpointKind,
) -> Result<Option<Target>> {
    if let Some(index) = document.nodes.iter().position(|n| n.name == name && kind.accepts(n.object_type)) {
        return Ok(Some(Target::Node(index)));
    }
    for object_type in ObjectType::ALL.into_iter().filter(|t| kind.accepts(*t)) {
        if let Some(found) = graph.try_lookup_object(namespace, name, object_type, None)? {
            return Ok(Some(Target::Existing(found.id())));
        }
    }
    Ok(None)
}

fn plan<B: ProvenanceBackend + ?Sized>(
    graph: &ProvGraph<B>,
    document: &ProvDocument,
    options: &ImportOptions,
) -> Result<Plan> {
    let namespace = options.namespace.clone().unwrap_or_else(|| graph.config().default_prefix.clone());
    if !is_valid_prefix(&namespace) {
        return Err(Error::InvalidArgument(format!("invalid namespace prefix `{}`", namespace)));
    }
    if options.bundle_name.is_empty() {
        return Err(Error::InvalidArgument("bundle name must not be empty".to_string()));
    }

    ensure_acyclic(document.edges())?;

    let mut endpoints = Vec::with_capacity(document.relations.len());
    for relation in &document.relations {
        let spec = relation.relation_type.spec();
        let side = |name: &str, kind: EndpointKind, field: &str| -> Result<Target> {
            resolve(graph, document, &namespace, name, kind)?.ok_or_else(|| Error::MalformedDocument {
                group: spec.json_group.to_string(),
                key: relation.key.clone(),
                reason: format!("`{}` names unknown {:?} `{}`", field, kind, name),
            })
        };
        let source = side(&relation.source, spec.source_kind, spec.source_field)?;
        let destination = side(&relation.destination, spec.destination_kind, spec.destination_field)?;
        endpoints.push((source, destination));
    }

    let anchor = match &options.anchor {
        Some(anchor) => {
            let existing = graph.object_info(anchor.object)?;
            let index = document
                .nodes
                .iter()
                .position(|n| n.name == anchor.document_name && n.object_type == ObjectType::Entity)
                .ok_or_else(|| {
                    Error::InvalidArgument(format!("document has no entity named `{}`", anchor.document_name))
                })?;
            RelationType::AlternateOf.check_endpoints(existing.object_type, ObjectType::Entity)?;
            Some((anchor.object, index))
        }
        None => None,
    };

    if let Some(agent) = options.responsible_agent {
        let info = graph.object_info(agent)?;
        if info.object_type != ObjectType::Agent {
            return Err(Error::InvalidArgument(format!("{}:{} is not an agent", info.prefix, info.name)));
        }
        if options.anchor.is_none() {
            warn!("Responsible agent given without an anchor; no attribution will be recorded");
        }
    }

    Ok(Plan { namespace, endpoints, anchor })
}

fn attach_attributes<B: ProvenanceBackend + ?Sized>(
    graph: &ProvGraph<B>,
    owner: ProvId,
    namespace: &str,
    attributes: &[Attribute],
) -> Result<()> {
    for attribute in attributes {
        let (prefix, key) = split_qualified(&attribute.key, namespace);
        graph.add_property(owner, prefix, key, attribute.value.clone())?;
    }
    Ok(())
}

fn commit<B: ProvenanceBackend + ?Sized>(
    graph: &ProvGraph<B>,
    document: &ProvDocument,
    options: &ImportOptions,
    plan: &Plan,
    bundle: ProvId,
) -> Result<ImportReport> {
    let mut report = ImportReport { bundle, ..Default::default() };

    for (prefix, iri) in &document.prefixes {
        graph.add_prefix(bundle, prefix, iri)?;
    }

    if let (Some(_), Some(agent)) = (&options.anchor, options.responsible_agent) {
        graph.create_relation(bundle, agent, RelationType::WasAttributedTo, Some(bundle))?;
    }

    let mut node_ids: HashMap<usize, ProvId> = HashMap::new();
    for (index, node) in document.nodes.iter().enumerate() {
        let outcome = graph.lookup_or_create_object(&plan.namespace, &node.name, node.object_type, Some(bundle))?;
        let id = outcome.value.id();
        if outcome.is_created() {
            attach_attributes(graph, id, &plan.namespace, &node.attributes)?;
            report.objects_created += 1;
        } else {
            report.objects_reused += 1;
        }
        node_ids.insert(index, id);
    }

    let id_of = |target: Target| -> Result<ProvId> {
        match target {
            Target::Existing(id) => Ok(id),
            Target::Node(index) => node_ids
                .get(&index)
                .copied()
                .ok_or_else(|| Error::Backend(format!("document node {} was not materialized", index))),
        }
    };

    if let Some((anchor, index)) = plan.anchor {
        graph.create_relation(anchor, id_of(Target::Node(index))?, RelationType::AlternateOf, Some(bundle))?;
    }

    for (relation, (source, destination)) in document.relations.iter().zip(&plan.endpoints) {
        let outcome =
            graph.create_relation(id_of(*source)?, id_of(*destination)?, relation.relation_type, Some(bundle))?;
        if outcome.is_duplicate() {
            report.relations_duplicate += 1;
        } else {
            attach_attributes(graph, outcome.value.id, &plan.namespace, &relation.attributes)?;
            report.relations_created += 1;
        }
    }

    Ok(report)
}

/// Import `document` into a new bundle. Nothing is written when validation fails,
/// and nothing is left behind when a write fails.
pub fn import_document<B: ProvenanceBackend + ?Sized>(
    graph: &ProvGraph<B>,
    document: &ProvDocument,
    options: &ImportOptions,
) -> Result<ImportReport> {
    let plan = plan(graph, document, options)?;
    let bundle = graph.create_bundle(&plan.namespace, &options.bundle_name)?.id();
    debug!("Importing {} nodes and {} relations into bundle {}", document.nodes.len(), document.relations.len(), bundle);

    match commit(graph, document, options, &plan, bundle) {
        Ok(report) => {
            info!(
                "Imported bundle {}:{} ({} objects created, {} reused, {} relations)",
                plan.namespace, options.bundle_name, report.objects_created, report.objects_reused, report.relations_created
            );
            Ok(report)
        }
        Err(e) => {
            warn!("Import into bundle {} failed, rolling back: {}", bundle, e);
            if let Err(cleanup) = graph.delete_bundle(bundle) {
                warn!("Rollback of bundle {} failed: {}", bundle, cleanup);
            }
            Err(e)
        }
    }
}

/// Parse and check a PROV-JSON text without a graph. Every problem found is
/// reported; a lone problem keeps its own error variant.
pub fn validate_document(text: &str) -> Result<ProvDocument> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let (document, mut problems) = ProvDocument::from_value_lenient(&value);
    let cyclic = find_cycles(document.edges());
    if !cyclic.is_empty() {
        problems.push(Error::CyclicDocument(cyclic));
    }

    match problems.len() {
        0 => Ok(document),
        1 => Err(problems.remove(0)),
        _ => Err(Error::MalformedDocument {
            group: "document".to_string(),
            key: "*".to_string(),
            reason: problems.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "),
        }),
    }
}
