//! cpl-tool - command line access to a provenance graph
//!
//! Usage:
//!   cpl-tool --store data/prov import run.json --bundle run-42
//!   cpl-tool --store data/prov ancestors report.pdf --recursive
//!   cpl-tool --store data/prov disclose wasDerivedFrom report.pdf data.csv
//!   cpl-tool validate run.json

use clap::{Parser, Subcommand};
use prov_cpl::api::prov_graph::ProvGraph;
use prov_cpl::config::{BackendKind, GraphConfig};
use prov_cpl::core::relation::EndpointKind;
use prov_cpl::core::{
    AncestryEntry, Direction, ObjectType, ProvId, RelationType, Session, TraversalFlags, VersionSelector,
};
use prov_cpl::interchange::import::ImportOptions;
use prov_cpl::storage::memory_backend::MemoryBackend;
use prov_cpl::storage::rdf_backend::RdfBackend;
use prov_cpl::storage::ProvenanceBackend;
use prov_cpl::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type Graph = ProvGraph<dyn ProvenanceBackend>;

#[derive(Parser, Debug)]
#[command(name = "cpl-tool")]
#[command(about = "Record, query and exchange provenance graphs")]
struct Args {
    /// Directory of an on-disk RDF store (in-memory graph when absent)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Namespace prefix of named objects
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ancestors of a named object
    Ancestors(TraversalArgs),
    /// Descendants of a named object
    Descendants(TraversalArgs),
    /// Assert a relation between two named objects
    Disclose {
        /// PROV-JSON relation group, e.g. wasDerivedFrom
        relation: RelationType,
        source: String,
        destination: String,
        /// Bundle name the relation belongs to
        #[arg(long)]
        bundle: Option<String>,
    },
    /// Import a PROV-JSON document into a new bundle
    Import {
        file: PathBuf,
        #[arg(long)]
        bundle: String,
    },
    /// Print a bundle as PROV-JSON
    Export { bundle: String },
    /// Check a PROV-JSON document without importing it
    Validate { file: PathBuf },
    /// List stored objects
    Objects,
}

#[derive(clap::Args, Debug)]
struct TraversalArgs {
    name: String,
    /// Object type (entity, activity, agent, bundle)
    #[arg(long = "type", default_value = "entity")]
    object_type: ObjectType,
    /// Follow relations transitively
    #[arg(short, long)]
    recursive: bool,
    /// Skip data dependencies
    #[arg(long)]
    no_data: bool,
    /// Skip control dependencies
    #[arg(long)]
    no_control: bool,
}

fn load_config(args: &Args) -> Result<GraphConfig> {
    let mut config = match &args.config {
        Some(path) => GraphConfig::from_file(path)?,
        None => GraphConfig::default(),
    };
    if let Some(prefix) = &args.prefix {
        config.default_prefix = prefix.clone();
    }
    if let Some(store) = &args.store {
        config.backend = BackendKind::Rdf;
        config.rdf_path = Some(store.clone());
    }
    config.validate()?;
    Ok(config)
}

fn open_graph(config: GraphConfig) -> Result<Graph> {
    let backend: Arc<dyn ProvenanceBackend> = match config.backend {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        BackendKind::Rdf => Arc::new(RdfBackend::from_config(&config)?),
    };
    ProvGraph::attach(backend, Session::capture(), config)
}

/// Newest object called `name` whose type fits `kind`
fn find_named(graph: &Graph, name: &str, kind: EndpointKind) -> Result<ProvId> {
    let prefix = graph.config().default_prefix.clone();
    let mut best: Option<(u64, ProvId)> = None;
    for object_type in ObjectType::ALL.into_iter().filter(|t| kind.accepts(*t)) {
        if let Some(object) = graph.try_lookup_object(&prefix, name, object_type, None)? {
            let info = object.info(graph)?;
            if best.map_or(true, |(time, _)| info.creation_time > time) {
                best = Some((info.creation_time, info.id));
            }
        }
    }
    best.map(|(_, id)| id).ok_or_else(|| Error::NotFound(format!("{}:{}", prefix, name)))
}

fn print_entries(graph: &Graph, entries: &[AncestryEntry]) -> Result<()> {
    for entry in entries {
        let other = graph.object_info(entry.other.id)?;
        let arrow = if entry.other_is_ancestor { "<-" } else { "->" };
        println!(
            "{} {} {}:{}@{} [{}] ({})",
            entry.query, arrow, other.prefix, other.name, entry.other.version, other.object_type, entry.relation_type
        );
    }
    Ok(())
}

fn run_traversal(graph: &Graph, args: &TraversalArgs, direction: Direction) -> Result<()> {
    let prefix = &graph.config().default_prefix;
    let object = graph.lookup_object(prefix, &args.name, args.object_type, None)?;
    let mut flags = TraversalFlags::NONE;
    if args.no_data {
        flags |= TraversalFlags::NO_DATA_DEPENDENCIES;
    }
    if args.no_control {
        flags |= TraversalFlags::NO_CONTROL_DEPENDENCIES;
    }
    let entries = if args.recursive {
        graph.closure(object.id(), VersionSelector::All, direction, flags)?
    } else {
        graph.traverse(object.id(), VersionSelector::All, direction, flags)?
    };
    print_entries(graph, &entries)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;

    if let Command::Validate { file } = &args.command {
        let text = std::fs::read_to_string(file)?;
        let document = prov_cpl::interchange::import::validate_document(&text)?;
        println!("{}: {} nodes, {} relations, no problems found", file.display(), document.nodes.len(), document.relations.len());
        return Ok(());
    }

    let graph = open_graph(config)?;
    match &args.command {
        Command::Ancestors(traversal) => run_traversal(&graph, traversal, Direction::Ancestors)?,
        Command::Descendants(traversal) => run_traversal(&graph, traversal, Direction::Descendants)?,
        Command::Disclose { relation, source, destination, bundle } => {
            let spec = relation.spec();
            let source = find_named(&graph, source, spec.source_kind)?;
            let destination = find_named(&graph, destination, spec.destination_kind)?;
            let bundle = match bundle {
                Some(name) => Some(graph.lookup_bundle(&graph.config().default_prefix, name)?.id()),
                None => None,
            };
            let outcome = graph.create_relation(source, destination, *relation, bundle)?;
            println!("{} {:?}", outcome.value.id, outcome.status);
        }
        Command::Import { file, bundle } => {
            let text = std::fs::read_to_string(file)?;
            let report = graph.import_json(&text, &ImportOptions::new(bundle.clone()))?;
            println!(
                "bundle {}: {} objects created, {} reused, {} relations created, {} duplicates",
                report.bundle,
                report.objects_created,
                report.objects_reused,
                report.relations_created,
                report.relations_duplicate
            );
        }
        Command::Export { bundle } => {
            let bundle = graph.lookup_bundle(&graph.config().default_prefix, bundle)?;
            println!("{}", graph.export_bundle(bundle.id())?.to_json_string()?);
        }
        Command::Objects => {
            for info in graph.all_objects(args.prefix.as_deref())? {
                println!("{} {}:{} [{}] v{}", info.id, info.prefix, info.name, info.object_type, info.version);
            }
        }
        Command::Validate { .. } => {}
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
