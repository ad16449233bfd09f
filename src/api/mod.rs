pub mod prov_factory;
pub mod prov_graph;
