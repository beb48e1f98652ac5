//! # Fukurow
//!
//! A SPARQL 1.1 query engine over a temporal RDF quad store: every quad
//! carries a `[valid_from, valid_to)` validity interval, so a query can ask
//! either "what holds now" or "what held as of time T".
//!
//! This crate is a thin facade over the engine's component crates, each
//! independently usable:
//!
//! - [`fukurow_core`] — the RDF term and temporal quad data model
//! - [`fukurow_store`] — the temporal quad store
//! - [`fukurow_sparql`] — the parser, planner, streaming operators and
//!   aggregator that answer a query against a store
//! - [`fukurow_cli`] — the `fukurow` command-line tool
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use fukurow::prelude::*;
//!
//! let store = QuadStore::new();
//! store.add_current(Quad::new(
//!     Term::iri("http://example.org/alice"),
//!     Term::iri("http://example.org/age"),
//!     Term::Literal(Literal::typed("30", "http://www.w3.org/2001/XMLSchema#integer")),
//! )).unwrap();
//!
//! let cfg = EngineConfig::default();
//! let result = evaluate_query(
//!     &store,
//!     "SELECT ?age WHERE { <http://example.org/alice> <http://example.org/age> ?age }",
//!     &cfg,
//! ).unwrap();
//! ```

#[cfg(feature = "fukurow-core")]
pub use fukurow_core as core;

#[cfg(feature = "fukurow-store")]
pub use fukurow_store as store;

#[cfg(feature = "fukurow-sparql")]
pub use fukurow_sparql as sparql;

#[cfg(feature = "fukurow-cli")]
pub use fukurow_cli as cli;

pub use serde;
pub use serde_json;
pub use anyhow;

/// Current crate version, read from `Cargo.toml` at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenience imports covering the common path: build a store, run a
/// query against it.
pub mod prelude {
    #[cfg(feature = "fukurow-core")]
    pub use fukurow_core::model::{Literal, Quad, Term, VarId};

    #[cfg(feature = "fukurow-store")]
    pub use fukurow_store::{QuadPattern, QuadStore, ReadLock, StoreError};

    #[cfg(feature = "fukurow-sparql")]
    pub use fukurow_sparql::{evaluate_query, BindingRow, EngineConfig, EngineError, ExecutionResult};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_constant_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[cfg(all(feature = "fukurow-store", feature = "fukurow-sparql"))]
    #[test]
    fn select_query_runs_against_a_freshly_populated_store() {
        use prelude::*;

        let store = QuadStore::new();
        store
            .add_current(Quad::new(
                Term::iri("http://example.org/alice"),
                Term::iri("http://example.org/age"),
                Term::Literal(Literal::typed("30", "http://www.w3.org/2001/XMLSchema#integer")),
            ))
            .unwrap();

        let cfg = EngineConfig::default();
        let result = evaluate_query(
            &store,
            "SELECT ?age WHERE { <http://example.org/alice> <http://example.org/age> ?age }",
            &cfg,
        )
        .unwrap();

        match result {
            ExecutionResult::Select { rows, .. } => assert_eq!(rows.len(), 1),
            _ => panic!("expected a SELECT result"),
        }
    }
}
