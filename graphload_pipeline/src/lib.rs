//! # Graphload Pipeline
//!
//! Bulk ingestion pipeline for loading a directed property graph from two
//! flat record sources into a remote graph store.
//!
//! This crate provides:
//! - **Record loading** from the node-attribute and edge-list sources,
//!   skipping malformed lines — [`records`]
//! - **Identity handling**: the deduplicated name set and the post-creation
//!   name → identifier map — [`identity`]
//! - **Batch dispatch** over the store boundary, without retries —
//!   [`dispatch::BatchDispatcher`]
//! - **Bounded worker pool** with producer-side batching, backpressure, and
//!   fail-fast cancellation — [`pool::BatchPool`]
//! - **Node and edge phases** built on the pool — [`nodes`], [`edges`]
//! - **Phase sequencing** with the identifier-resolution barrier between
//!   them — [`coordinator::Coordinator`]
//!
//! The ordering constraint the whole design serves: an edge cannot be
//! created until both endpoints exist and their store-assigned identifiers
//! are known. Nodes are therefore created first, identifiers are read back
//! in one bulk scan, and only then are edges built and submitted.
//!
//! Unit tests run against mock submit functions; the integration suite in
//! `tests/` drives [`coordinator::Coordinator`] end to end against an
//! in-process mock of the store's REST endpoints.

pub mod coordinator;
pub mod dispatch;
pub mod edges;
pub mod identity;
pub mod nodes;
pub mod pool;
pub mod records;

pub use coordinator::{Coordinator, LoadPhase, LoadSettings, LoadSummary};
pub use dispatch::{store_submit_fn, BatchDispatcher, SubmitFn};
pub use edges::{create_edges, EdgeLoadOutcome};
pub use identity::{
    build_identity_set, identity_map_from_rows, resolve_identities, IdentityMap, IdentitySet,
};
pub use nodes::{create_nodes, NodeLoadOutcome};
pub use pool::BatchPool;
pub use records::{
    load_edge_source, load_node_source, load_records, parse_edge_line, parse_node_line, EdgePair,
    NodeRecord, RecordSet,
};
