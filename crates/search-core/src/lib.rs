//! # search-core
//!
//! Shared, storage-agnostic logic for the hybrid code search engine: the
//! `Chunk` data model, deterministic chunk identity, the chunking extension
//! point, the `ModelClient` and `Store` trait contracts, the pure hybrid
//! scoring function, and an in-memory `Store` for tests.
//!
//! This crate has no tokio runtime requirement beyond `async-trait` method
//! signatures, no SQL driver, and no filesystem I/O of its own — the native
//! application (`search-app`) supplies the Postgres-backed `Store`, the
//! concrete `ModelClient` providers, and the filesystem walker.

pub mod chunking;
pub mod error;
pub mod identity;
pub mod model;
pub mod models;
pub mod scoring;
pub mod store;

pub use models::Chunk;
pub use store::{SearchOpts, Store};
