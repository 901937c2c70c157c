//! Error taxonomy for the core trait contracts.
//!
//! Two library-facing error enums, one per trait boundary
//! ([`crate::model::ModelClient`] and [`crate::store::Store`]), both
//! built on [`thiserror`]. Application code at the CLI/pipeline boundary
//! is expected to fold these into `anyhow::Error` rather than match on
//! variants.

use thiserror::Error;

/// Errors a [`crate::model::ModelClient`] implementation may return, per
/// the error taxonomy table: `AuthMissing` is fatal at the first call but
/// never at construction (so a client can be built without a credential
/// and degrade gracefully at query time); `Upstream` covers both a
/// non-success HTTP response and a malformed one, including a
/// dimensionality mismatch against the configured `dim()`; `Empty` covers
/// a well-formed response that simply carries no vector.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No credential was configured for this client.
    #[error("no credential configured for this model client")]
    AuthMissing,

    /// The provider rejected the request, or returned a malformed or
    /// dimensionally-mismatched response, after exhausting any retry
    /// budget.
    #[error("model provider error: {0}")]
    Upstream(String),

    /// The provider returned a well-formed response with no vector.
    #[error("model response carried no vector")]
    Empty,
}

/// Errors a [`crate::store::Store`] implementation may return.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected the operation; implementations fold
    /// their native driver error into this string rather than leaking a
    /// driver-specific type across the trait boundary.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A `search` call was given an embedding whose length does not match
    /// the store's configured vector dimension.
    #[error("query vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The store has not been initialized (`init_schema` never ran, or
    /// ran against a different dimension than is now configured).
    #[error("store not initialized or schema mismatch: {0}")]
    SchemaMismatch(String),
}
