//! Bundle export to the PROV-JSON document model

use std::collections::HashSet;
use tracing::debug;

use crate::api::prov_graph::{ProvGraph, PREFIX_NAMESPACE};
use crate::core::{ObjectInfo, ObjectType, ProvId};
use crate::error::Result;
use crate::parsing::prov_json::{Attribute, DocumentNode, DocumentRelation, ProvDocument};
use crate::storage::ProvenanceBackend;

fn attributes<B: ProvenanceBackend + ?Sized>(graph: &ProvGraph<B>, owner: ProvId) -> Result<Vec<Attribute>> {
    Ok(graph
        .properties(owner, None)?
        .into_iter()
        .filter(|p| p.prefix != PREFIX_NAMESPACE)
        .map(|p| Attribute { key: p.qualified_key(), value: p.value })
        .collect())
}

fn node<B: ProvenanceBackend + ?Sized>(graph: &ProvGraph<B>, info: &ObjectInfo) -> Result<DocumentNode> {
    // Nested bundles appear as plain entities
    let object_type = match info.object_type {
        ObjectType::Bundle => ObjectType::Entity,
        other => other,
    };
    Ok(DocumentNode { object_type, name: info.name.clone(), attributes: attributes(graph, info.id)? })
}

/// Render a bundle as a document.
///
/// Nodes are the bundle's member objects, nested bundles included as
/// entities, plus any outside object a member relation points at, so the
/// result can be imported on its own. Relations
/// touching the exported bundle itself are left out.
pub fn export_bundle<B: ProvenanceBackend + ?Sized>(graph: &ProvGraph<B>, bundle: ProvId) -> Result<ProvDocument> {
    graph.ensure_bundle(bundle)?;
    let mut document = ProvDocument { prefixes: graph.prefixes(bundle)?, ..Default::default() };

    let mut emitted: HashSet<ProvId> = HashSet::new();
    for member in graph.bundle_objects(bundle)? {
        document.nodes.push(node(graph, &member)?);
        emitted.insert(member.id);
    }

    for relation in graph.bundle_relations(bundle)? {
        if relation.source.id == bundle || relation.destination.id == bundle {
            continue;
        }
        let source = graph.object_info(relation.source.id)?;
        let destination = graph.object_info(relation.destination.id)?;
        for endpoint in [&source, &destination] {
            if emitted.insert(endpoint.id) {
                document.nodes.push(node(graph, endpoint)?);
            }
        }
        document.relations.push(DocumentRelation {
            relation_type: relation.relation_type,
            key: relation.id.to_string(),
            source: source.name,
            destination: destination.name,
            attributes: attributes(graph, relation.id)?,
        });
    }

    debug!("Exported bundle {} with {} nodes and {} relations", bundle, document.nodes.len(), document.relations.len());
    Ok(document)
}
