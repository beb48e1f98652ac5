//! Temporal quad store consumed by the SPARQL execution engine.
//!
//! Storage is a single append-only `Vec<StoredQuad>` plus subject/
//! predicate/object indices over it, generalized from triples-with-
//! provenance to quads-with-validity-intervals. A `RwLock` around the
//! whole structure gives the multi-reader/single-writer protocol the
//! execution engine treats as a precondition: a cursor holds a read
//! guard for its entire lifetime via `acquire_read`.

use fukurow_core::model::{Quad, StoredQuad, Term, VALID_FOREVER};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock was poisoned by a panicking writer")]
    LockPoisoned,
    #[error("commit_batch called without a matching begin_batch")]
    NoActiveBatch,
}

type RowIndex = usize;

#[derive(Default)]
struct Indices {
    by_subject: HashMap<Term, SmallVec<[RowIndex; 8]>>,
}

impl Indices {
    fn record(&mut self, quad: &Quad, idx: RowIndex) {
        self.by_subject.entry(quad.subject.clone()).or_default().push(idx);
    }
}

struct Inner {
    rows: Vec<StoredQuad>,
    index: Indices,
    clock: AtomicI64,
    batch: Option<Vec<Quad>>,
}

impl Inner {
    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    /// Finds the row index of a current quad with the exact given
    /// `(s, p, o[, g])`, if one exists.
    fn find_current_exact(&self, quad: &Quad) -> Option<RowIndex> {
        let candidates = self.index.by_subject.get(&quad.subject)?;
        candidates.iter().copied().find(|&idx| {
            let row = &self.rows[idx];
            row.is_current() && row.quad == *quad
        })
    }

    fn insert_row(&mut self, quad: Quad, valid_from: i64) {
        let idx = self.rows.len();
        self.index.record(&quad, idx);
        self.rows.push(StoredQuad { quad, valid_from, valid_to: VALID_FOREVER });
    }

    /// Idempotent current-add: a quad already current is left untouched,
    /// never shortening or closing its validity interval.
    fn add_current(&mut self, quad: Quad) {
        if self.find_current_exact(&quad).is_some() {
            return;
        }
        let now = self.tick();
        self.insert_row(quad, now);
    }
}

/// Range-scan pattern over a quad's positions; `None` means "any" there.
#[derive(Debug, Clone, Default)]
pub struct QuadPattern {
    pub subject: Option<Term>,
    pub predicate: Option<Term>,
    pub object: Option<Term>,
    pub graph: Option<Term>,
}

impl QuadPattern {
    pub fn new(subject: Option<Term>, predicate: Option<Term>, object: Option<Term>) -> Self {
        QuadPattern { subject, predicate, object, graph: None }
    }

    fn matches(&self, quad: &Quad) -> bool {
        self.subject.as_ref().is_none_or(|s| s == &quad.subject)
            && self.predicate.as_ref().is_none_or(|p| p == &quad.predicate)
            && self.object.as_ref().is_none_or(|o| o == &quad.object)
            && self.graph.as_ref().is_none_or(|g| Some(g) == quad.graph.as_ref())
    }
}

/// A held shared-read lock over the store, scoped to one execution cursor's
/// lifetime.
pub struct ReadLock<'a> {
    guard: RwLockReadGuard<'a, Inner>,
}

impl<'a> ReadLock<'a> {
    /// Range scan over the current-valid index; unconstrained positions in
    /// `pattern` match anything. Materializes into a `Vec` since a lazy
    /// iterator borrowing the guard would have to outlive `self`, which
    /// callers already satisfy by holding `ReadLock` for the cursor's
    /// whole lifetime anyway.
    pub fn query_current(&self, pattern: &QuadPattern) -> Vec<Quad> {
        self.scan(pattern, |row| row.is_current())
    }

    /// Range scan as of a logical-time instant: a row matches if its
    /// validity interval covers `as_of`.
    pub fn query_as_of(&self, pattern: &QuadPattern, as_of: i64) -> Vec<Quad> {
        self.scan(pattern, |row| row.valid_from <= as_of && as_of < row.valid_to)
    }

    fn scan(&self, pattern: &QuadPattern, keep: impl Fn(&StoredQuad) -> bool) -> Vec<Quad> {
        let candidate_rows: Box<dyn Iterator<Item = RowIndex>> = match &pattern.subject {
            Some(s) => Box::new(
                self.guard
                    .index
                    .by_subject
                    .get(s)
                    .map(|v| v.as_slice())
                    .unwrap_or(&[])
                    .iter()
                    .copied(),
            ),
            None => Box::new(0..self.guard.rows.len()),
        };
        candidate_rows
            .filter_map(|idx| self.guard.rows.get(idx))
            .filter(|row| keep(row) && pattern.matches(&row.quad))
            .map(|row| row.quad.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.guard.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.rows.is_empty()
    }
}

/// Temporal quad store: the only shared mutable resource in the engine.
/// Readers take `acquire_read`; writers take exclusive access for the
/// duration of a single call or a batch.
pub struct QuadStore {
    inner: RwLock<Inner>,
}

impl Default for QuadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadStore {
    pub fn new() -> Self {
        QuadStore {
            inner: RwLock::new(Inner {
                rows: Vec::new(),
                index: Indices::default(),
                clock: AtomicI64::new(0),
                batch: None,
            }),
        }
    }

    /// Scoped shared access, held across the entire lifetime of an
    /// execution cursor.
    pub fn acquire_read(&self) -> Result<ReadLock<'_>, StoreError> {
        let guard = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(ReadLock { guard })
    }

    /// Non-batched add: idempotent, never shortens an existing current
    /// entry's validity interval.
    pub fn add_current(&self, quad: Quad) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.add_current(quad);
        Ok(())
    }

    pub fn begin_batch(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.batch = Some(Vec::new());
        Ok(())
    }

    pub fn add_current_batched(&self, quad: Quad) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        match &mut inner.batch {
            Some(pending) => {
                pending.push(quad);
                Ok(())
            }
            None => Err(StoreError::NoActiveBatch),
        }
    }

    /// Atomically publishes every quad queued since `begin_batch`.
    pub fn commit_batch(&self) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let pending = inner.batch.take().ok_or(StoreError::NoActiveBatch)?;
        let count = pending.len();
        for quad in pending {
            inner.add_current(quad);
        }
        Ok(count)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.acquire_read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.acquire_read()?.is_empty())
    }
}
