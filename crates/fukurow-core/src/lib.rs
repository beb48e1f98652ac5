//! RDF term and temporal quad data model shared by the store and the
//! SPARQL engine.

pub mod model;

pub use model::*;
