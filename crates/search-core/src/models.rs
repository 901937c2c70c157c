//! Core data model: the `Chunk`, the unit of indexable content.
//!
//! See `(repository, ref, path, line_start, line_end)` as the uniqueness
//! key a `Store` must enforce; `id` is derived deterministically from
//! `(path, line_start, line_end)` — see [`crate::identity::chunk_id`].

use chrono::{DateTime, Utc};

/// A contiguous line range of a file, stored as an indivisible unit of
/// retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Deterministic identifier, see [`crate::identity::chunk_id`].
    pub id: String,
    /// Logical repository label (clone URL, or `"local"`, or anything else
    /// the caller chooses) — opaque to the core, never parsed here.
    pub repository: String,
    /// Symbolic ref label (branch/tag/dir name). May be empty.
    pub r#ref: String,
    /// Repo-relative path, forward slashes.
    pub path: String,
    /// Lowercase language tag, `""` if unknown. See [`crate::chunking::detect_language`].
    pub language: String,
    /// Up to ~240 chars of prose describing the chunk.
    pub summary: String,
    /// Raw chunk text, exactly the text of `[line_start, line_end]`.
    pub content: String,
    /// 1-based, inclusive.
    pub line_start: i32,
    /// 1-based, inclusive. Always `>= line_start`.
    pub line_end: i32,
    /// Embedding of `summary`, absent until a successful `embed` call.
    pub summary_vec: Option<Vec<f32>>,
    /// Hex SHA-256 of `content`, drives delta detection.
    pub content_hash: String,
    /// Set on first successful summarization; preserved across later
    /// upserts where the incoming summary is empty.
    pub summarized_at: Option<DateTime<Utc>>,
    /// Set on first insert, preserved across every later upsert.
    pub created_at: DateTime<Utc>,
}

/// Lightweight projection of stored chunk state, used by the indexer's
/// delta policy to decide whether fresh summarization/embedding is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMeta {
    pub content_hash: String,
    pub summary: String,
    pub has_vec: bool,
}

/// A chunk plus the composite score it earned in a `search` call.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
}
