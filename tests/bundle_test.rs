mod common;

use common::{activity, attach, backends, entity, graphs};
use prov_cpl::core::{Direction, ObjectType, ProvId, RelationType, TraversalFlags, VersionSelector};
use prov_cpl::Error;

#[test]
fn test_bundle_membership() {
    for (label, graph) in graphs() {
        let bundle = graph.create_bundle("ex", "run-1").unwrap();
        assert_eq!(bundle.info(&graph).unwrap().object_type, ObjectType::Bundle, "{}", label);
        assert_eq!(graph.lookup_bundle("ex", "run-1").unwrap().id(), bundle.id());
        assert!(graph.try_lookup_bundle("ex", "run-2").unwrap().is_none());

        let inside = graph.create_object("ex", "inside", ObjectType::Entity, Some(bundle.id())).unwrap();
        let run = graph.create_object("ex", "run", ObjectType::Activity, Some(bundle.id())).unwrap();
        let outside = entity(&graph, "outside");
        let r = graph.create_relation(&inside, &run, RelationType::WasGeneratedBy, Some(bundle.id())).unwrap();
        graph.create_relation(&outside, &run, RelationType::WasGeneratedBy, None).unwrap();

        let objects: Vec<ProvId> = graph.bundle_objects(bundle.id()).unwrap().iter().map(|o| o.id).collect();
        assert_eq!(objects, vec![inside.id(), run.id()], "{}", label);
        let relations: Vec<ProvId> = graph.bundle_relations(bundle.id()).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(relations, vec![r.value.id], "{}", label);

        // scoped lookups only see members
        assert!(graph.try_lookup_object("ex", "outside", ObjectType::Entity, Some(bundle.id())).unwrap().is_none());
        assert!(graph.try_lookup_object("ex", "inside", ObjectType::Entity, Some(bundle.id())).unwrap().is_some());
    }
}

#[test]
fn test_prefixes_recorded_on_bundle() {
    for (label, graph) in graphs() {
        let bundle = graph.create_bundle("ex", "b").unwrap();
        graph.add_prefix(bundle.id(), "ex", "http://example.org/").unwrap();
        graph.add_prefix(bundle.id(), "foaf", "http://xmlns.com/foaf/0.1/").unwrap();
        assert_eq!(
            graph.prefixes(bundle.id()).unwrap(),
            vec![
                ("ex".to_string(), "http://example.org/".to_string()),
                ("foaf".to_string(), "http://xmlns.com/foaf/0.1/".to_string())
            ],
            "{}",
            label
        );

        assert!(matches!(graph.add_prefix(bundle.id(), "1bad", "http://x/"), Err(Error::InvalidArgument(_))));
        let doc = entity(&graph, "doc");
        assert!(matches!(graph.add_prefix(doc.id(), "ex", "http://x/"), Err(Error::InvalidArgument(_))));
    }
}

#[test]
fn test_delete_cascades_atomically() {
    for (label, graph) in graphs() {
        let bundle = graph.create_bundle("ex", "doomed").unwrap();
        let nested = graph.create_object("ex", "nested", ObjectType::Bundle, Some(bundle.id())).unwrap();
        let member = graph.create_object("ex", "member", ObjectType::Entity, Some(bundle.id())).unwrap();
        let deep = graph.create_object("ex", "deep", ObjectType::Entity, Some(nested.id())).unwrap();
        let keeper = entity(&graph, "keeper");
        let run = activity(&graph, "run");

        graph.create_relation(&member, &run, RelationType::WasGeneratedBy, Some(bundle.id())).unwrap();
        graph.create_relation(&deep, &run, RelationType::WasGeneratedBy, Some(nested.id())).unwrap();
        // outside edge touching a member
        graph.create_relation(&keeper, &member, RelationType::WasDerivedFrom, None).unwrap();
        let survivor = graph.create_relation(&keeper, &run, RelationType::WasGeneratedBy, None).unwrap();
        graph.add_property(member.id(), "ex", "k", "v").unwrap();

        graph.delete_bundle(bundle.id()).unwrap();

        assert!(graph.bundle_objects(bundle.id()).unwrap().is_empty(), "{}", label);
        assert!(graph.bundle_relations(bundle.id()).unwrap().is_empty());
        assert!(graph.bundle_objects(nested.id()).unwrap().is_empty());
        for gone in [bundle.id(), nested.id(), member.id(), deep.id()] {
            assert!(matches!(graph.object_info(gone), Err(Error::NotFound(_))), "{}", label);
        }
        assert!(graph.try_lookup_bundle("ex", "doomed").unwrap().is_none());

        // no orphaned relation references a deleted node
        let up = graph.traverse(keeper.id(), VersionSelector::All, Direction::Ancestors, TraversalFlags::NONE).unwrap();
        assert_eq!(up.iter().map(|e| e.relation).collect::<Vec<_>>(), vec![survivor.value.id], "{}", label);
        let down = graph.traverse(run.id(), VersionSelector::All, Direction::Descendants, TraversalFlags::NONE).unwrap();
        assert_eq!(down.len(), 1, "{}", label);
        assert!(graph.relation_info(survivor.value.id).is_ok());
    }
}

#[test]
fn test_delete_requires_a_bundle() {
    for (label, graph) in graphs() {
        let doc = entity(&graph, "doc");
        assert!(matches!(graph.delete_bundle(doc.id()), Err(Error::InvalidArgument(_))), "{}", label);
        assert!(matches!(graph.delete_bundle(ProvId::generate()), Err(Error::NotFound(_))));
        assert!(graph.object_info(doc.id()).is_ok());
    }
}

#[test]
fn test_readers_never_see_a_partial_cascade() {
    const MEMBERS: usize = 200;
    for (label, backend) in backends() {
        let graph = std::sync::Arc::new(attach(backend));
        let bundle = graph.create_bundle("ex", "big").unwrap().id();
        let run = graph.create_object("ex", "run", ObjectType::Activity, Some(bundle)).unwrap();
        for i in 0..MEMBERS {
            let out = graph.create_object("ex", &format!("out-{}", i), ObjectType::Entity, Some(bundle)).unwrap();
            graph.create_relation(&out, &run, RelationType::WasGeneratedBy, Some(bundle)).unwrap();
        }

        let reader = {
            let graph = std::sync::Arc::clone(&graph);
            std::thread::spawn(move || {
                let mut observed = Vec::new();
                loop {
                    let objects = graph.bundle_objects(bundle).unwrap().len();
                    let relations = graph.bundle_relations(bundle).unwrap().len();
                    observed.push((objects, relations));
                    if objects == 0 && relations == 0 {
                        return observed;
                    }
                }
            })
        };
        graph.delete_bundle(bundle).unwrap();

        for (objects, relations) in reader.join().unwrap() {
            assert!(objects == 0 || objects == MEMBERS + 1, "{}: saw {} members", label, objects);
            assert!(relations == 0 || relations == MEMBERS, "{}: saw {} relations", label, relations);
        }
    }
}
