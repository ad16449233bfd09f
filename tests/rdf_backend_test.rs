mod common;

use common::attach;
use prov_cpl::config::{BackendKind, GraphConfig};
use prov_cpl::core::{Direction, ObjectType, ProvId, RelationType, TraversalFlags, VersionSelector};
use prov_cpl::storage::rdf_backend::RdfBackend;
use prov_cpl::storage::ProvenanceBackend;
use prov_cpl::Error;
use std::sync::Arc;
use tempfile::TempDir;

fn open(dir: &TempDir) -> Arc<dyn ProvenanceBackend> {
    let config = GraphConfig {
        backend: BackendKind::Rdf,
        rdf_path: Some(dir.path().to_path_buf()),
        ..GraphConfig::default()
    };
    Arc::new(RdfBackend::from_config(&config).unwrap())
}

#[test]
fn test_graph_survives_reopen() {
    let dir = TempDir::new().unwrap();

    let (doc, run, relation, session) = {
        let graph = attach(open(&dir));
        let mut doc = graph.create_object("ex", "doc", ObjectType::Entity, None).unwrap();
        let run = graph.create_object("ex", "run", ObjectType::Activity, None).unwrap();
        graph.new_version(&mut doc).unwrap();
        let relation = graph.create_relation(&doc, &run, RelationType::WasGeneratedBy, None).unwrap().into_value();
        graph.add_property(doc.id(), "ex", "size", 12i64).unwrap();
        (doc.id(), run.id(), relation, graph.session().id)
    };

    let graph = attach(open(&dir));
    let info = graph.object_info(doc).unwrap();
    assert_eq!(info.version, 1);
    assert_eq!(info.name, "doc");
    assert_eq!(graph.version_info(doc, 1).unwrap().session, session);
    assert_eq!(graph.session_info(session).unwrap().id, session);
    assert_eq!(graph.relation_info(relation.id).unwrap(), relation);
    assert_eq!(graph.properties(doc, None).unwrap().len(), 1);

    let ancestors = graph.traverse(doc, VersionSelector::Exact(1), Direction::Ancestors, TraversalFlags::NONE).unwrap();
    assert_eq!(ancestors.len(), 1);
    assert_eq!(ancestors[0].other.id, run);

    // creation order continues after the reopened objects
    let later = graph.create_object("ex", "later", ObjectType::Entity, None).unwrap();
    let order: Vec<ProvId> = graph.all_objects(Some("ex")).unwrap().iter().map(|o| o.id).collect();
    assert_eq!(order, vec![doc, run, later.id()]);
}

#[test]
fn test_bundle_delete_persists() {
    let dir = TempDir::new().unwrap();
    let bundle = {
        let graph = attach(open(&dir));
        let bundle = graph.create_bundle("ex", "b").unwrap();
        let member = graph.create_object("ex", "m", ObjectType::Entity, Some(bundle.id())).unwrap();
        graph.add_property(member.id(), "ex", "k", "v").unwrap();
        graph.delete_bundle(bundle.id()).unwrap();
        bundle.id()
    };

    let graph = attach(open(&dir));
    assert!(matches!(graph.object_info(bundle), Err(Error::NotFound(_))));
    assert!(graph.lookup_by_property("ex", "k", "v").unwrap().is_empty());
    assert!(graph.all_objects(None).unwrap().is_empty());
}

#[test]
fn test_names_with_sparql_metacharacters() {
    let graph = attach(Arc::new(RdfBackend::new("http://example.org/prov/").unwrap()));
    for name in ["a\"b", "line\nbreak", "back\\slash", "<iri>", "{ } ."] {
        let created = graph.create_object("ex", name, ObjectType::Entity, None).unwrap();
        let found = graph.lookup_object("ex", name, ObjectType::Entity, None).unwrap();
        assert_eq!(found.id(), created.id(), "{:?}", name);
        assert_eq!(found.info(&graph).unwrap().name, name);
    }
}
