//! Graph machinery backing the commit-time SSI check.

pub mod digraph;
pub mod serialization_graph;

pub use digraph::DiGraph;
pub use serialization_graph::SerializationGraph;
