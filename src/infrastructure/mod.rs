//! Infrastructure layer implementations
//!
//! In-memory implementations of the repository, lookup and sink traits used by
//! the command handlers and the metrics pipeline.

mod graph_repository_impl;
mod metrics_repository_impl;

pub use graph_repository_impl::InMemoryGraphRepository;
pub use metrics_repository_impl::InMemoryMetricsStore;
