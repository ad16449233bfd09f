//! # prov-cpl
//!
//! prov-cpl records and queries provenance: the history of how entities,
//! activities and agents came to be, kept as a directed, typed, versioned
//! graph grouped into named bundles and annotated with namespaced properties.
//!
//! ## Features
//!
//! - Versioned provenance objects with per-version session metadata
//! - The closed PROV-DM relation vocabulary with fixed ancestor/descendant polarity
//! - Bundles with atomic cascading deletion
//! - One-hop and transitive ancestry/descendant traversal
//! - PROV-JSON import/export with cycle validation
//! - In-memory and Oxigraph-backed (RDF) storage backends
//!
//! ## Example
//!
//! ```rust
//! use prov_cpl::api::prov_graph::ProvGraph;
//! use prov_cpl::config::GraphConfig;
//! use prov_cpl::core::{Direction, ObjectType, Session, TraversalFlags, VersionSelector};
//! use prov_cpl::core::relation::RelationType;
//! use prov_cpl::storage::memory_backend::MemoryBackend;
//! use std::sync::Arc;
//!
//! fn example() -> prov_cpl::Result<()> {
//!     let graph = ProvGraph::attach(
//!         Arc::new(MemoryBackend::new()),
//!         Session::capture(),
//!         GraphConfig::default(),
//!     )?;
//!     let doc = graph.create_object("ex", "doc.txt", ObjectType::Entity, None)?;
//!     let convert = graph.create_object("ex", "convert", ObjectType::Activity, None)?;
//!     graph.create_relation(&doc, &convert, RelationType::WasGeneratedBy, None)?;
//!
//!     let ancestors = graph.traverse(
//!         doc.id(),
//!         VersionSelector::All,
//!         Direction::Ancestors,
//!         TraversalFlags::NONE,
//!     )?;
//!     assert_eq!(ancestors.len(), 1);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]

/// Identifiers, sessions, objects, relations and properties
pub mod core;

/// Graph configuration
pub mod config;

/// Storage backend capability interface and implementations
pub mod storage;

/// PROV-JSON document model and validation
pub mod parsing;

/// Ancestry/descendant traversal
pub mod querying;

/// Document import and export
pub mod interchange;

/// Client-facing graph handle and PROV helpers
pub mod api;

/// Provenance sources (file system)
pub mod sources;

pub mod error {
    //! Error types and result definitions

    use thiserror::Error;

    /// Result type alias for provenance operations
    pub type Result<T> = std::result::Result<T, Error>;

    /// Main error type for provenance operations
    #[derive(Error, Debug)]
    pub enum Error {
        /// A lookup missed
        #[error("Not found: {0}")]
        NotFound(String),

        /// Duplicate create where uniqueness is enforced
        #[error("Already exists: {0}")]
        AlreadyExists(String),

        /// A one-time registration was repeated
        #[error("Already initialized: {0}")]
        AlreadyInitialized(String),

        /// Malformed argument or wrong object type for an operation
        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        /// Opaque failure passed through from the storage layer
        #[error("Backend failure: {0}")]
        Backend(String),

        /// Import aborted because the document's relations form cycles
        #[error("Document contains relation cycles through: {}", .0.join(", "))]
        CyclicDocument(Vec<String>),

        /// A document group is missing a required field or is badly shaped
        #[error("Malformed document in `{group}` entry `{key}`: {reason}")]
        MalformedDocument {
            /// Document group (`entity`, `wasGeneratedBy`, ...)
            group: String,
            /// Entry key within the group
            key: String,
            /// What is wrong with the entry
            reason: String,
        },

        /// Configuration error
        #[error("Configuration error: {0}")]
        Config(String),

        /// IO error
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        /// Serialization error
        #[error("Serialization error: {0}")]
        Serialization(String),
    }

    impl From<serde_json::Error> for Error {
        fn from(err: serde_json::Error) -> Self {
            Error::Serialization(err.to_string())
        }
    }

    impl From<oxigraph::store::StorageError> for Error {
        fn from(err: oxigraph::store::StorageError) -> Self {
            Error::Backend(err.to_string())
        }
    }

    impl From<oxigraph::sparql::QueryEvaluationError> for Error {
        fn from(err: oxigraph::sparql::QueryEvaluationError) -> Self {
            Error::Backend(err.to_string())
        }
    }

    impl<T> From<std::sync::PoisonError<T>> for Error {
        fn from(err: std::sync::PoisonError<T>) -> Self {
            Error::Backend(format!("lock poisoned: {}", err))
        }
    }
}

// Re-export commonly used types
pub use error::{Error, Result};
