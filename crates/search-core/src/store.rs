//! The `Store` contract: durable chunk persistence and the hybrid
//! ranking query, plus an in-memory implementation for tests.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Chunk, ChunkMeta, ScoredChunk};
use crate::scoring;

/// Optional filters and raw query text carried into `Store::search`.
///
/// `query_text` drives lexical/trigram scoring and the script-bias/noise
/// heuristics; an empty `query_text` must yield an empty result (see
/// the empty-query property).
#[derive(Debug, Clone, Default)]
pub struct SearchOpts {
    pub repository: Option<String>,
    pub r#ref: Option<String>,
    pub language: Option<String>,
    pub path_contains: Option<String>,
    pub query_text: String,
}

impl SearchOpts {
    fn matches(&self, chunk: &Chunk) -> bool {
        if let Some(r) = &self.repository {
            if &chunk.repository != r {
                return false;
            }
        }
        if let Some(r) = &self.r#ref {
            if &chunk.r#ref != r {
                return false;
            }
        }
        if let Some(l) = &self.language {
            if &chunk.language != l {
                return false;
            }
        }
        if let Some(p) = &self.path_contains {
            if !chunk.path.contains(p.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Durable storage backend for chunks, and the single source of truth
/// for ranking queries.
#[async_trait]
pub trait Store: Send + Sync {
    /// Idempotently ensure the schema exists for embedding dimension
    /// `dim`. Must fail if a prior schema exists with a different `dim`.
    async fn init_schema(&self, dim: usize) -> Result<(), StoreError>;

    /// Lookup by the natural key, `ref` deliberately excluded — used by
    /// the indexer's delta policy.
    async fn get_chunk_meta(
        &self,
        repository: &str,
        path: &str,
        line_start: i32,
        line_end: i32,
    ) -> Result<Option<ChunkMeta>, StoreError>;

    /// Insert or merge on `(repository, ref, path, line_start, line_end)`
    /// conflict, per the merge rules in the data model: `content`,
    /// `language`, `content_hash` always overwritten; `summary` and
    /// `summary_vec` overwritten only when the incoming value is
    /// present/non-empty; `summarized_at` set only alongside a non-empty
    /// incoming summary; `created_at` preserved.
    async fn upsert_chunk(&self, chunk: &Chunk) -> Result<(), StoreError>;

    /// Distinct sorted repository labels present.
    async fn list_repositories(&self) -> Result<Vec<String>, StoreError>;

    /// Distinct sorted refs for `repository`.
    async fn list_refs(&self, repository: &str) -> Result<Vec<String>, StoreError>;

    /// The hybrid ranking query. `query_vec` is absent when the caller's
    /// embed attempt failed; every candidate's `sem_sim` is then 0,
    /// degrading to lexical-only ranking.
    async fn search(
        &self,
        query_vec: Option<&[f32]>,
        k: usize,
        opts: &SearchOpts,
    ) -> Result<Vec<ScoredChunk>, StoreError>;
}

/// In-memory `Store`, brute-force over every stored chunk. Used by the
/// core crate's own tests and available to application tests that don't
/// want a live Postgres instance.
#[derive(Default)]
pub struct InMemoryStore {
    chunks: std::sync::RwLock<Vec<Chunk>>,
    dim: std::sync::RwLock<Option<usize>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(repository: &str, r#ref: &str, path: &str, line_start: i32, line_end: i32) -> (String, String, String, i32, i32) {
    (
        repository.to_string(),
        r#ref.to_string(),
        path.to_string(),
        line_start,
        line_end,
    )
}

#[async_trait]
impl Store for InMemoryStore {
    async fn init_schema(&self, dim: usize) -> Result<(), StoreError> {
        let mut current = self.dim.write().unwrap();
        match *current {
            Some(existing) if existing != dim => Err(StoreError::SchemaMismatch(format!(
                "schema already initialized for dim {existing}, cannot reinitialize for {dim}"
            ))),
            _ => {
                *current = Some(dim);
                Ok(())
            }
        }
    }

    async fn get_chunk_meta(
        &self,
        repository: &str,
        path: &str,
        line_start: i32,
        line_end: i32,
    ) -> Result<Option<ChunkMeta>, StoreError> {
        let chunks = self.chunks.read().unwrap();
        Ok(chunks
            .iter()
            .find(|c| {
                c.repository == repository
                    && c.path == path
                    && c.line_start == line_start
                    && c.line_end == line_end
            })
            .map(|c| ChunkMeta {
                content_hash: c.content_hash.clone(),
                summary: c.summary.clone(),
                has_vec: c.summary_vec.is_some(),
            }))
    }

    async fn upsert_chunk(&self, chunk: &Chunk) -> Result<(), StoreError> {
        let mut chunks = self.chunks.write().unwrap();
        let k = key(
            &chunk.repository,
            &chunk.r#ref,
            &chunk.path,
            chunk.line_start,
            chunk.line_end,
        );
        if let Some(existing) = chunks.iter_mut().find(|c| {
            key(&c.repository, &c.r#ref, &c.path, c.line_start, c.line_end) == k
        }) {
            existing.content = chunk.content.clone();
            existing.language = chunk.language.clone();
            existing.content_hash = chunk.content_hash.clone();
            if !chunk.summary.is_empty() {
                existing.summary = chunk.summary.clone();
                existing.summarized_at = chunk.summarized_at.or(existing.summarized_at);
            }
            if chunk.summary_vec.is_some() {
                existing.summary_vec = chunk.summary_vec.clone();
            }
            // created_at is preserved: existing.created_at left untouched.
        } else {
            chunks.push(chunk.clone());
        }
        Ok(())
    }

    async fn list_repositories(&self) -> Result<Vec<String>, StoreError> {
        let chunks = self.chunks.read().unwrap();
        let mut repos: Vec<String> = chunks.iter().map(|c| c.repository.clone()).collect();
        repos.sort();
        repos.dedup();
        Ok(repos)
    }

    async fn list_refs(&self, repository: &str) -> Result<Vec<String>, StoreError> {
        let chunks = self.chunks.read().unwrap();
        let mut refs: Vec<String> = chunks
            .iter()
            .filter(|c| c.repository == repository)
            .map(|c| c.r#ref.clone())
            .collect();
        refs.sort();
        refs.dedup();
        Ok(refs)
    }

    async fn search(
        &self,
        query_vec: Option<&[f32]>,
        k: usize,
        opts: &SearchOpts,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        if opts.query_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let chunks = self.chunks.read().unwrap();
        let candidates: Vec<Chunk> = chunks.iter().filter(|c| opts.matches(c)).cloned().collect();
        let scores = scoring::score_candidates(&candidates, query_vec, &opts.query_text);
        let mut scored: Vec<ScoredChunk> = candidates
            .into_iter()
            .zip(scores)
            .map(|(chunk, score)| ScoredChunk { chunk, score })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_chunk(path: &str, content_hash: &str, summary: &str) -> Chunk {
        Chunk {
            id: crate::identity::chunk_id(path, 1, 1),
            repository: "repo".into(),
            r#ref: "main".into(),
            path: path.into(),
            language: "go".into(),
            summary: summary.into(),
            content: "content".into(),
            line_start: 1,
            line_end: 1,
            summary_vec: if summary.is_empty() { None } else { Some(vec![1.0, 0.0]) },
            content_hash: content_hash.into(),
            summarized_at: if summary.is_empty() { None } else { Some(Utc::now()) },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_meta_roundtrips() {
        let store = InMemoryStore::new();
        let chunk = sample_chunk("main.go", "hash1", "a summary");
        store.upsert_chunk(&chunk).await.unwrap();
        let meta = store
            .get_chunk_meta("repo", "main.go", 1, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.content_hash, "hash1");
        assert!(meta.has_vec);
    }

    #[tokio::test]
    async fn no_duplicate_rows_on_repeated_upsert() {
        let store = InMemoryStore::new();
        let chunk = sample_chunk("main.go", "hash1", "a summary");
        store.upsert_chunk(&chunk).await.unwrap();
        store.upsert_chunk(&chunk).await.unwrap();
        let repos = store.list_repositories().await.unwrap();
        assert_eq!(repos, vec!["repo".to_string()]);
    }

    #[tokio::test]
    async fn merge_preserves_summary_and_vector() {
        let store = InMemoryStore::new();
        let full = sample_chunk("main.go", "hash1", "first summary");
        store.upsert_chunk(&full).await.unwrap();

        let mut refresh = sample_chunk("main.go", "hash2", "");
        refresh.summary_vec = None;
        store.upsert_chunk(&refresh).await.unwrap();

        let meta = store
            .get_chunk_meta("repo", "main.go", 1, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.summary, "first summary");
        assert!(meta.has_vec);
        assert_eq!(meta.content_hash, "hash2");
    }

    #[tokio::test]
    async fn init_schema_rejects_dimension_change() {
        let store = InMemoryStore::new();
        store.init_schema(384).await.unwrap();
        store.init_schema(384).await.unwrap();
        assert!(store.init_schema(768).await.is_err());
    }

    #[tokio::test]
    async fn empty_query_text_returns_empty() {
        let store = InMemoryStore::new();
        store.upsert_chunk(&sample_chunk("main.go", "hash1", "s")).await.unwrap();
        let opts = SearchOpts::default();
        let results = store.search(None, 10, &opts).await.unwrap();
        assert!(results.is_empty());
    }
}
