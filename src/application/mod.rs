//! Application services: content retrieval, probes and the store port.

pub mod content;
pub mod error;
pub mod probes;
pub mod store;
