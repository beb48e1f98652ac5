//! Binding rows: the ordered variable-to-term tables that flow between
//! streaming operators.

use fukurow_core::model::{Term, VarId};

/// An ordered list of `(var, value)` pairs. Insertion order is preserved so
/// that projection renders columns in the order they were first bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingRow {
    pairs: Vec<(VarId, Term)>,
}

impl BindingRow {
    pub fn new() -> Self {
        BindingRow { pairs: Vec::new() }
    }

    /// `FindBinding`: returns the index of `var` in this row, or `None`.
    /// Deterministic across repeated calls on an unmodified row.
    pub fn find(&self, var: VarId) -> Option<usize> {
        self.pairs.iter().position(|(v, _)| *v == var)
    }

    pub fn get(&self, var: VarId) -> Option<&Term> {
        self.find(var).map(|idx| &self.pairs[idx].1)
    }

    pub fn is_bound(&self, var: VarId) -> bool {
        self.find(var).is_some()
    }

    /// Binds `var` to `value`, overwriting an existing binding in place so
    /// its original column position is preserved.
    pub fn bind(&mut self, var: VarId, value: Term) {
        if let Some(idx) = self.find(var) {
            self.pairs[idx].1 = value;
        } else {
            self.pairs.push((var, value));
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(VarId, Term)> {
        self.pairs.iter()
    }

    /// A row extended with `var = value`; used by scans and joins to build
    /// a new row without mutating the parent.
    pub fn extended(&self, var: VarId, value: Term) -> BindingRow {
        let mut next = self.clone();
        next.bind(var, value);
        next
    }

    /// Joins `self` with `other`: variables shared by both rows must agree
    /// on their bound term, per SPARQL join compatibility. Returns `None`
    /// when a shared variable disagrees.
    pub fn merge_compatible(&self, other: &BindingRow) -> Option<BindingRow> {
        let mut merged = self.clone();
        for (var, value) in other.iter() {
            match merged.get(*var) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => merged.bind(*var, value.clone()),
            }
        }
        Some(merged)
    }

    /// Whether `other` disqualifies `self` under `MINUS` semantics: they
    /// share at least one variable, and every shared variable agrees.
    /// Disjoint-domain rows (no shared variables) pass through — they
    /// never disqualify.
    pub fn shares_compatible_binding(&self, other: &BindingRow) -> bool {
        let shared: Vec<_> = self.pairs.iter().filter(|(var, _)| other.get(*var).is_some()).collect();
        !shared.is_empty() && shared.iter().all(|(var, value)| other.get(*var) == Some(value))
    }

    /// An order-independent fingerprint of this row's bindings, used by
    /// `Distinct` to detect duplicates without caring about column order.
    pub fn fingerprint(&self) -> Vec<(VarId, Term)> {
        let mut sorted: Vec<(VarId, Term)> = self.pairs.clone();
        sorted.sort_by_key(|(var, _)| var.0);
        sorted
    }
}
