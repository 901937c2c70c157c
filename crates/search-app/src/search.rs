//! Search service: trim the query, embed it, delegate to the store.
//!
//! Embed failures degrade gracefully to lexical-only ranking rather than
//! surfacing to the caller — the store treats an absent vector as
//! `sem_sim = 0` on every candidate.

use std::sync::Arc;

use anyhow::Result;
use search_core::model::ModelClient;
use search_core::models::ScoredChunk;
use search_core::store::{SearchOpts, Store};

pub struct SearchService {
    store: Arc<dyn Store>,
    model: Arc<dyn ModelClient>,
}

impl SearchService {
    pub fn new(store: Arc<dyn Store>, model: Arc<dyn ModelClient>) -> Self {
        Self { store, model }
    }

    pub async fn query(&self, text: &str, k: usize, mut opts: SearchOpts) -> Result<Vec<ScoredChunk>> {
        let trimmed = text.trim().to_string();
        opts.query_text = trimmed.clone();

        let query_vec = match self.model.embed(&trimmed).await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, falling back to lexical-only ranking");
                None
            }
        };

        let mut results = self.store.search(query_vec.as_deref(), k, &opts).await?;
        for r in &mut results {
            if !r.score.is_finite() {
                r.score = 0.0;
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::stub::StubClient;
    use search_core::models::Chunk;
    use search_core::store::InMemoryStore;

    fn chunk(path: &str) -> Chunk {
        Chunk {
            id: "id".into(),
            repository: "r".into(),
            r#ref: "main".into(),
            path: path.into(),
            language: "go".into(),
            summary: "does a thing".into(),
            content: "package main".into(),
            line_start: 1,
            line_end: 1,
            summary_vec: Some(vec![0.0; 4]),
            content_hash: "h".into(),
            summarized_at: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn empty_query_yields_empty_results() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_chunk(&chunk("main.go")).await.unwrap();
        let model: Arc<dyn ModelClient> = Arc::new(StubClient::new(4));
        let service = SearchService::new(store, model);
        let results = service.query("   ", 10, SearchOpts::default()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn non_empty_query_returns_results_even_with_zero_vector_stub() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_chunk(&chunk("main.go")).await.unwrap();
        let model: Arc<dyn ModelClient> = Arc::new(StubClient::new(4));
        let service = SearchService::new(store, model);
        let results = service.query("does a thing", 10, SearchOpts::default()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].score.is_finite());
    }
}
