//! Graph aggregates

pub mod graph;
pub mod snapshot;

pub use graph::*;
pub use snapshot::*;
