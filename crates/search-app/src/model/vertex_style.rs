//! Vertex-style HTTPS JSON model client.
//!
//! Targets a GCP `aiplatform.googleapis.com` style predict endpoint.
//! Authentication is conveyed out-of-band: the caller supplies a bearer
//! token already obtained via whatever credential flow applies (service
//! account, workload identity, ...); this client never fetches or
//! refreshes tokens itself.

use std::time::Duration;

use async_trait::async_trait;
use search_core::error::ModelError;
use search_core::model::ModelClient;

use crate::config::ModelConfig;

const DEFAULT_EMBED_MODEL: &str = "textembedding-gecko@003";
const DEFAULT_SUMMARY_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_DIMS: usize = 768;
const DEFAULT_LOCATION: &str = "us-central1";

/// Upper bound on characters of chunk content sent in a summarization
/// prompt, per spec.md §4.2's "~8 KB of input to the model" limit — the
/// indexer's own 400 KB pre-check (`pipeline.rs`) is a much coarser cap
/// upstream of this one.
const PROMPT_CONTENT_CAP_CHARS: usize = 8_000;

fn cap_prompt_content(content: &str) -> String {
    content.chars().take(PROMPT_CONTENT_CAP_CHARS).collect()
}

pub struct VertexStyleClient {
    http: reqwest::Client,
    bearer_token: Option<String>,
    project: Option<String>,
    location: String,
    embed_model: String,
    summary_model: String,
    dims: usize,
    max_retries: u32,
}

impl VertexStyleClient {
    /// `project`/`bearer_token` are optional: a client without a
    /// credential can still be constructed (so a caller that only needs
    /// graceful degradation, like the search service, doesn't fail at
    /// startup) — the first `embed`/`summarize` call then returns
    /// [`ModelError::AuthMissing`].
    pub fn new(config: &ModelConfig, project: Option<String>, bearer_token: Option<String>) -> Result<Self, anyhow::Error> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if config.insecure_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            bearer_token,
            project,
            location: config.location.clone().unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            embed_model: config.model.clone().unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            dims: config.dims.unwrap_or(DEFAULT_DIMS),
            max_retries: config.max_retries,
        })
    }

    fn predict_url(&self, project: &str, model: &str) -> String {
        format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{proj}/locations/{loc}/publishers/google/models/{model}:predict",
            loc = self.location,
            proj = project,
            model = model,
        )
    }

    async fn post_with_retry(&self, model: &str, body: &serde_json::Value) -> Result<serde_json::Value, ModelError> {
        let project = self.project.as_deref().ok_or(ModelError::AuthMissing)?;
        let token = self.bearer_token.as_deref().ok_or(ModelError::AuthMissing)?;
        let url = self.predict_url(project, model);

        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let req = self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {token}"))
                .header("Content-Type", "application/json")
                .json(body);

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json::<serde_json::Value>()
                            .await
                            .map_err(|e| ModelError::Upstream(format!("malformed response: {e}")));
                    }
                    if status.as_u16() == 429 || status.is_server_error() {
                        let text = resp.text().await.unwrap_or_default();
                        last_err = Some(ModelError::Upstream(format!("{status}: {text}")));
                        continue;
                    }
                    let text = resp.text().await.unwrap_or_default();
                    return Err(ModelError::Upstream(format!("{status}: {text}")));
                }
                Err(e) => {
                    last_err = Some(ModelError::Upstream(e.to_string()));
                    continue;
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ModelError::Upstream("retries exhausted".to_string())))
    }
}

#[async_trait]
impl ModelClient for VertexStyleClient {
    fn dim(&self) -> usize {
        self.dims
    }

    async fn summarize(&self, path: &str, language: &str, content: &str) -> Result<String, ModelError> {
        let capped = cap_prompt_content(content);
        let body = serde_json::json!({
            "instances": [{
                "content": format!(
                    "Summarize this source file ({path}, {language}) in 1-2 sentences, at most 240 characters, no code fences, no newlines:\n{capped}"
                ),
            }],
        });
        let json = self.post_with_retry(&self.summary_model, &body).await?;
        json["predictions"][0]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| ModelError::Upstream("no predictions in response".to_string()))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let body = serde_json::json!({
            "instances": [{ "content": text }],
        });
        let json = self.post_with_retry(&self.embed_model, &body).await?;
        let vector: Vec<f32> = json["predictions"][0]["embeddings"]["values"]
            .as_array()
            .ok_or(ModelError::Empty)?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        if vector.is_empty() {
            return Err(ModelError::Empty);
        }
        if vector.len() != self.dims {
            return Err(ModelError::Upstream(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dims,
                vector.len()
            )));
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_url_embeds_project_and_location() {
        let config = ModelConfig {
            provider: "vertex".into(),
            model: None,
            dims: None,
            base_url: None,
            project: None,
            location: Some("europe-west1".into()),
            max_retries: 1,
            timeout_secs: 5,
            insecure_tls: false,
        };
        let client = VertexStyleClient::new(&config, Some("my-project".to_string()), Some("token".to_string())).unwrap();
        let url = client.predict_url("my-project", &client.embed_model);
        assert!(url.contains("europe-west1-aiplatform.googleapis.com"));
        assert!(url.contains("projects/my-project"));
        assert!(url.contains("locations/europe-west1"));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ModelConfig::default();
        let client = VertexStyleClient::new(&config, Some("p".to_string()), Some("t".to_string())).unwrap();
        assert_eq!(client.dim(), DEFAULT_DIMS);
        assert_eq!(client.location, DEFAULT_LOCATION);
    }

    #[test]
    fn prompt_content_is_capped() {
        let huge: String = "x".repeat(PROMPT_CONTENT_CAP_CHARS + 1000);
        assert_eq!(cap_prompt_content(&huge).len(), PROMPT_CONTENT_CAP_CHARS);
        assert_eq!(cap_prompt_content("short"), "short");
    }

    #[tokio::test]
    async fn missing_credential_fails_at_first_call_not_construction() {
        let config = ModelConfig::default();
        let client = VertexStyleClient::new(&config, None, None).unwrap();
        let err = client.embed("hello").await.unwrap_err();
        assert!(matches!(err, ModelError::AuthMissing));
    }
}
