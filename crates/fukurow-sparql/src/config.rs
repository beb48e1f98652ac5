//! Engine-wide configuration and the scoped-thread helper used to give
//! deeply nested patterns (recursive `OPTIONAL`/`MINUS`/`EXISTS` evaluation)
//! more stack than the platform default.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default graph IRI used when a query doesn't name one explicitly.
    pub default_graph: Option<String>,
    /// Stack size given to [`execute_on_scoped_thread`].
    pub worker_stack_size: usize,
    /// Soft cap on rows materialized by a blocking operator (`DISTINCT`,
    /// `ORDER BY`) before a query is abandoned; `None` means unbounded.
    pub materialize_soft_cap: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { default_graph: None, worker_stack_size: 8 * 1024 * 1024, materialize_soft_cap: None }
    }
}

/// Runs `f` on a dedicated thread with `stack_size` bytes of stack,
/// blocking the caller until it completes. Recursive EXISTS/MINUS
/// evaluation can nest deeper than the default thread stack comfortably
/// allows on worst-case queries. Uses `std::thread::scope` so `f` can
/// borrow from the caller's stack frame (the store read lock, the query
/// text, the plan) instead of requiring owned `'static` data.
pub fn execute_on_scoped_thread<T, F>(stack_size: usize, f: F) -> T
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    std::thread::scope(|scope| {
        std::thread::Builder::new()
            .stack_size(stack_size)
            .spawn_scoped(scope, f)
            .expect("failed to spawn worker thread")
            .join()
            .expect("worker thread panicked")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_graph_and_positive_stack_size() {
        let cfg = EngineConfig::default();
        assert!(cfg.default_graph.is_none());
        assert!(cfg.worker_stack_size > 0);
    }

    #[test]
    fn scoped_thread_returns_the_closures_value() {
        let result = execute_on_scoped_thread(1024 * 1024, || 2 + 2);
        assert_eq!(result, 4);
    }
}
