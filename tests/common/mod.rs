#![allow(dead_code)]

use prov_cpl::api::prov_graph::{ProvGraph, ProvObject};
use prov_cpl::config::GraphConfig;
use prov_cpl::core::{ObjectType, Session};
use prov_cpl::storage::memory_backend::MemoryBackend;
use prov_cpl::storage::rdf_backend::RdfBackend;
use prov_cpl::storage::ProvenanceBackend;
use std::sync::Arc;

pub type Graph = ProvGraph<dyn ProvenanceBackend>;

/// One fresh, empty backend of every kind, labelled for assertion messages
pub fn backends() -> Vec<(&'static str, Arc<dyn ProvenanceBackend>)> {
    vec![
        ("memory", Arc::new(MemoryBackend::new()) as Arc<dyn ProvenanceBackend>),
        ("rdf", Arc::new(RdfBackend::new("urn:cpl:").unwrap()) as Arc<dyn ProvenanceBackend>),
    ]
}

pub fn attach(backend: Arc<dyn ProvenanceBackend>) -> Graph {
    attach_with(backend, GraphConfig::default())
}

pub fn attach_with(backend: Arc<dyn ProvenanceBackend>, config: GraphConfig) -> Graph {
    ProvGraph::attach(backend, Session::new("tester", "prov-cpl-tests", "cargo test"), config).unwrap()
}

/// A fresh graph per backend kind
pub fn graphs() -> Vec<(&'static str, Graph)> {
    backends().into_iter().map(|(label, backend)| (label, attach(backend))).collect()
}

pub fn entity(graph: &Graph, name: &str) -> ProvObject {
    graph.create_object("ex", name, ObjectType::Entity, None).unwrap()
}

pub fn activity(graph: &Graph, name: &str) -> ProvObject {
    graph.create_object("ex", name, ObjectType::Activity, None).unwrap()
}

pub fn agent(graph: &Graph, name: &str) -> ProvObject {
    graph.create_object("ex", name, ObjectType::Agent, None).unwrap()
}
