//! SPARQL 1.1 query engine over a temporal quad store.
//!
//! - [`parser`] — hand-rolled recursive-descent parser producing a
//!   positional AST ([`ast`]); [`lexer`] supplies its case-insensitive
//!   keyword pre-pass.
//! - [`analyzer`] — filter-variable analysis and pushdown-level
//!   computation.
//! - [`planner`] — triple-pattern join ordering and per-level filter
//!   attachment.
//! - [`operators`] — the streaming join/optional/minus/union/distinct/
//!   order-by/limit operators.
//! - [`aggregate`] — `GROUP BY`/aggregate/`HAVING` evaluation.
//! - [`exprlang`] — the `FILTER`/`HAVING`/`ORDER BY`/projection expression
//!   evaluator.
//! - [`evaluator`] — wires all of the above into `evaluate_query`.
//! - [`config`] — [`config::EngineConfig`] and the scoped-thread helper.

pub mod aggregate;
pub mod analyzer;
pub mod ast;
pub mod bindings;
pub mod config;
pub mod evaluator;
pub mod exprlang;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod planner;
pub mod span;
pub mod value;

pub use bindings::BindingRow;
pub use config::EngineConfig;
pub use evaluator::{evaluate_query, EngineError, ExecutionResult};
pub use span::Span;
