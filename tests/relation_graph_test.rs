mod common;

use common::{activity, agent, attach, backends, entity, graphs};
use prov_cpl::core::relation::RelationCategory;
use prov_cpl::core::{ObjectType, ObjectVersion, RelationType, Status};
use prov_cpl::Error;
use std::sync::Arc;

#[test]
fn test_bare_object_binds_current_version() {
    for (label, graph) in graphs() {
        let mut doc = entity(&graph, "doc");
        let run = activity(&graph, "run");
        graph.new_version(&mut doc).unwrap();

        let relation = graph.create_relation(&doc, &run, RelationType::WasGeneratedBy, None).unwrap();
        assert_eq!(relation.status, Status::Ok, "{}", label);
        assert_eq!(relation.value.source, ObjectVersion::new(doc.id(), 1));
        assert_eq!(relation.value.destination, ObjectVersion::new(run.id(), 0));
        assert_eq!(graph.relation_info(relation.value.id).unwrap(), relation.value, "{}", label);
    }
}

#[test]
fn test_duplicate_edge_is_idempotent() {
    for (label, graph) in graphs() {
        let doc = entity(&graph, "doc");
        let run = activity(&graph, "run");

        let first = graph.create_relation(&doc, &run, RelationType::WasGeneratedBy, None).unwrap();
        let second = graph.create_relation(&doc, &run, RelationType::WasGeneratedBy, None).unwrap();
        assert_eq!(second.status, Status::DuplicateIgnored, "{}", label);
        assert!(second.is_duplicate());
        assert_eq!(second.value.id, first.value.id);

        // another container or type is another edge
        let bundle = graph.create_bundle("ex", "b").unwrap();
        let in_bundle = graph.create_relation(&doc, &run, RelationType::WasGeneratedBy, Some(bundle.id())).unwrap();
        assert_eq!(in_bundle.status, Status::Ok);
        assert_ne!(in_bundle.value.id, first.value.id);
        let invalidated = graph.create_relation(&doc, &run, RelationType::WasInvalidatedBy, None).unwrap();
        assert_ne!(invalidated.value.id, first.value.id);
    }
}

#[test]
fn test_concurrent_identical_inserts_store_one_relation() {
    for (label, backend) in backends() {
        let graph = Arc::new(attach(backend));
        let bundle = graph.create_bundle("ex", "shared").unwrap().id();
        let doc = entity(&graph, "doc").id();
        let run = activity(&graph, "run").id();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let graph = Arc::clone(&graph);
                std::thread::spawn(move || {
                    graph.create_relation(doc, run, RelationType::WasGeneratedBy, Some(bundle)).unwrap()
                })
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let first = outcomes[0].value.id;
        assert!(outcomes.iter().all(|o| o.value.id == first), "{}", label);
        assert_eq!(outcomes.iter().filter(|o| o.status == Status::Ok).count(), 1, "{}", label);
        assert_eq!(outcomes.iter().filter(|o| o.status == Status::DuplicateIgnored).count(), 7, "{}", label);
        assert_eq!(graph.bundle_relations(bundle).unwrap().len(), 1, "{}", label);
    }
}

#[test]
fn test_duplicate_detection_is_per_version() {
    for (label, graph) in graphs() {
        let mut doc = entity(&graph, "doc");
        let run = activity(&graph, "run");
        let v0 = graph.create_relation(&doc, &run, RelationType::WasGeneratedBy, None).unwrap();
        graph.new_version(&mut doc).unwrap();
        let v1 = graph.create_relation(&doc, &run, RelationType::WasGeneratedBy, None).unwrap();
        assert_eq!(v1.status, Status::Ok, "{}", label);
        assert_ne!(v0.value.id, v1.value.id);
    }
}

#[test]
fn test_endpoint_types_are_checked() {
    for (label, graph) in graphs() {
        let doc = entity(&graph, "doc");
        let run = activity(&graph, "run");
        let alice = agent(&graph, "alice");

        // `used` goes activity -> entity
        assert!(
            matches!(graph.create_relation(&doc, &run, RelationType::Used, None), Err(Error::InvalidArgument(_))),
            "{}",
            label
        );
        assert!(graph.create_relation(&run, &doc, RelationType::Used, None).is_ok());
        assert!(matches!(
            graph.create_relation(&doc, &run, RelationType::WasAttributedTo, None),
            Err(Error::InvalidArgument(_))
        ));
        assert!(graph.create_relation(&doc, &alice, RelationType::WasAttributedTo, None).is_ok());
        // anything may influence anything
        assert!(graph.create_relation(&alice, &doc, RelationType::WasInfluencedBy, None).is_ok());
        // a bundle stands in for an entity
        let bundle = graph.create_bundle("ex", "b").unwrap();
        assert!(graph.create_relation(&bundle, &alice, RelationType::WasAttributedTo, None).is_ok(), "{}", label);
    }
}

#[test]
fn test_exact_version_endpoint_must_exist() {
    for (label, graph) in graphs() {
        let doc = entity(&graph, "doc");
        let other = entity(&graph, "other");
        let future = ObjectVersion::new(doc.id(), 3);
        assert!(
            matches!(graph.create_relation(future, &other, RelationType::WasDerivedFrom, None), Err(Error::NotFound(_))),
            "{}",
            label
        );
        let past = ObjectVersion::new(doc.id(), 0);
        assert!(graph.create_relation(past, &other, RelationType::WasDerivedFrom, None).is_ok());
    }
}

#[test]
fn test_container_must_be_a_bundle() {
    for (label, graph) in graphs() {
        let doc = entity(&graph, "doc");
        let other = entity(&graph, "other");
        assert!(
            matches!(
                graph.create_relation(&doc, &other, RelationType::WasDerivedFrom, Some(other.id())),
                Err(Error::InvalidArgument(_))
            ),
            "{}",
            label
        );
        assert!(matches!(
            graph.create_object("ex", "x", ObjectType::Entity, Some(doc.id())),
            Err(Error::InvalidArgument(_))
        ));
    }
}

#[test]
fn test_relation_properties() {
    for (label, graph) in graphs() {
        let doc = entity(&graph, "doc");
        let run = activity(&graph, "run");
        let relation = graph.create_relation(&doc, &run, RelationType::WasGeneratedBy, None).unwrap().into_value();
        graph.add_property(relation.id, "prov", "role", "output").unwrap();

        let props = graph.properties(relation.id, None).unwrap();
        assert_eq!(props.len(), 1, "{}", label);
        assert_eq!(props[0].value.as_str(), Some("output"));
        // relation creation leaves endpoint properties alone
        assert!(graph.properties(doc.id(), None).unwrap().is_empty());
    }
}

#[test]
fn test_relation_table() {
    let data: Vec<RelationType> =
        RelationType::ALL.into_iter().filter(|t| t.category() == RelationCategory::Data).collect();
    assert_eq!(data.len(), 10);
    assert_eq!(RelationType::WasGeneratedBy.spec().source_field, "prov:entity");
    assert_eq!(RelationType::WasGeneratedBy.spec().destination_field, "prov:activity");
    assert_eq!(RelationType::WasAssociatedWith.category(), RelationCategory::Control);
    assert_eq!("wasDerivedFrom".parse::<RelationType>().unwrap(), RelationType::WasDerivedFrom);
    assert!("wasFooedBy".parse::<RelationType>().is_err());
}
