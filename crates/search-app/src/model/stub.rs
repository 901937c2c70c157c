//! Deterministic in-process model client for tests and offline use.
//!
//! Never fails. `embed` returns an all-zero vector of the configured
//! dimension; `summarize` extracts the first non-empty comment-like line
//! from the first five lines of content, falling back to `"Code file:
//! <path>"`.

use async_trait::async_trait;
use search_core::error::ModelError;
use search_core::model::ModelClient;

pub struct StubClient {
    dims: usize,
}

impl StubClient {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

fn heuristic_summary(path: &str, content: &str) -> String {
    for line in content.lines().take(5) {
        let trimmed = line.trim();
        let is_comment = trimmed.starts_with('#') || trimmed.starts_with("//");
        if is_comment && trimmed.len() > 10 {
            return trimmed.to_string();
        }
    }
    format!("Code file: {path}")
}

#[async_trait]
impl ModelClient for StubClient {
    fn dim(&self) -> usize {
        self.dims
    }

    async fn summarize(&self, path: &str, _language: &str, content: &str) -> Result<String, ModelError> {
        Ok(heuristic_summary(path, content))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ModelError> {
        Ok(vec![0.0; self.dims])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embed_returns_all_zero_vector_of_configured_dim() {
        let client = StubClient::new(8);
        let vec = client.embed("anything").await.unwrap();
        assert_eq!(vec.len(), 8);
        assert!(vec.iter().all(|&v| v == 0.0));
    }

    #[tokio::test]
    async fn summarize_extracts_first_comment_line() {
        let client = StubClient::new(4);
        let content = "// this line explains the module\npackage main\n";
        let summary = client.summarize("main.go", "go", content).await.unwrap();
        assert_eq!(summary, "// this line explains the module");
    }

    #[tokio::test]
    async fn summarize_falls_back_to_code_file_label() {
        let client = StubClient::new(4);
        let summary = client.summarize("main.go", "go", "package main\n").await.unwrap();
        assert_eq!(summary, "Code file: main.go");
    }

    #[tokio::test]
    async fn short_comment_is_not_used_as_summary() {
        let client = StubClient::new(4);
        // "// ok" has length <= 10, should be skipped.
        let summary = client.summarize("a.go", "go", "// ok\npackage main\n").await.unwrap();
        assert_eq!(summary, "Code file: a.go");
    }
}
