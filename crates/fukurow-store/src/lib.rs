//! Temporal quad store: a subject/predicate/object-indexed `[valid_from,
//! valid_to)` history of RDF quads, guarded by a single reader/writer lock.

pub mod store;

pub use store::{QuadPattern, QuadStore, ReadLock, StoreError};
