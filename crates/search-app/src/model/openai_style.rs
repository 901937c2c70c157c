//! OpenAI-style HTTPS JSON model client.
//!
//! Calls `POST /v1/embeddings` for [`ModelClient::embed`] and
//! `POST /v1/chat/completions` for [`ModelClient::summarize`]. Retry
//! strategy: HTTP 429/5xx and transport errors retry with exponential
//! backoff (1s, 2s, 4s, ... capped at 32s); any other 4xx fails
//! immediately.

use std::time::Duration;

use async_trait::async_trait;
use search_core::error::ModelError;
use search_core::model::ModelClient;

use crate::config::ModelConfig;

const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";
const DEFAULT_DIMS: usize = 1536;
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Upper bound on characters of chunk content sent in a summarization
/// prompt, per spec.md §4.2's "~8 KB of input to the model" limit — the
/// indexer's own 400 KB pre-check (`pipeline.rs`) is a much coarser cap
/// upstream of this one.
const PROMPT_CONTENT_CAP_CHARS: usize = 8_000;

fn cap_prompt_content(content: &str) -> String {
    content.chars().take(PROMPT_CONTENT_CAP_CHARS).collect()
}

pub struct OpenAiStyleClient {
    http: reqwest::Client,
    api_key: Option<String>,
    project: Option<String>,
    base_url: String,
    embed_model: String,
    summary_model: String,
    dims: usize,
    max_retries: u32,
}

impl OpenAiStyleClient {
    /// `api_key` is optional: a client can be constructed without one (no
    /// `OPENAI_API_KEY` set) so callers that only need graceful
    /// degradation — the search service — don't fail at startup. The
    /// first `embed`/`summarize` call on a credential-less client returns
    /// [`ModelError::AuthMissing`].
    pub fn new(config: &ModelConfig, api_key: Option<String>) -> Result<Self, anyhow::Error> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if config.insecure_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;

        // Project-scoped API keys (prefix `sk-proj-`) also emit a project
        // identifier header when both are supplied.
        let project = if api_key.as_deref().is_some_and(|k| k.starts_with("sk-proj-")) {
            config.project.clone()
        } else {
            None
        };

        Ok(Self {
            http,
            api_key,
            project,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            embed_model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            dims: config.dims.unwrap_or(DEFAULT_DIMS),
            max_retries: config.max_retries,
        })
    }

    fn auth_request(&self, builder: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        let builder = builder
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json");
        match &self.project {
            Some(project) => builder.header("OpenAI-Project", project.clone()),
            None => builder,
        }
    }

    async fn post_with_retry(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ModelError> {
        let api_key = self.api_key.as_deref().ok_or(ModelError::AuthMissing)?;
        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let req = self.auth_request(self.http.post(url), api_key).json(body);
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
impl ModelClient for OpenAiStyleClient {
    fn dim(&self) -> usize {
        self.dims
    }

    async fn summarize(&self, path: &str, language: &str, content: &str) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let capped = cap_prompt_content(content);
        let body = serde_json::json!({
            "model": self.summary_model,
            "messages": [
                {"role": "system", "content": "Summarize the given source file in 1-2 sentences, at most 240 characters, no code fences, no newlines."},
                {"role": "user", "content": format!("path: {path}\nlanguage: {language}\n\n{capped}")},
            ],
            "max_tokens": 120,
        });
        let json = self.post_with_retry(&url, &body).await?;
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| ModelError::Upstream("no choices in chat completion response".to_string()))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.embed_model,
            "input": text,
        });
        let json = self.post_with_retry(&url, &body).await?;
        let vector: Vec<f32> = json["data"][0]["embedding"]
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
    fn project_header_only_added_for_project_scoped_keys() {
        let config = ModelConfig {
            provider: "openai".into(),
            model: None,
            dims: None,
            base_url: None,
            project: Some("proj_123".into()),
            location: None,
            max_retries: 1,
            timeout_secs: 5,
            insecure_tls: false,
        };
        let scoped = OpenAiStyleClient::new(&config, Some("sk-proj-abc".to_string())).unwrap();
        assert_eq!(scoped.project, Some("proj_123".to_string()));

        let plain = OpenAiStyleClient::new(&config, Some("sk-abc".to_string())).unwrap();
        assert_eq!(plain.project, None);
    }

    #[test]
    fn defaults_fill_in_when_config_is_unset() {
        let config = ModelConfig {
            provider: "openai".into(),
            model: None,
            dims: None,
            base_url: None,
            project: None,
            location: None,
            max_retries: 5,
            timeout_secs: 20,
            insecure_tls: false,
        };
        let client = OpenAiStyleClient::new(&config, Some("sk-abc".to_string())).unwrap();
        assert_eq!(client.dim(), DEFAULT_DIMS);
        assert_eq!(client.embed_model, DEFAULT_MODEL);
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
        let client = OpenAiStyleClient::new(&config, None).unwrap();
        let err = client.embed("hello").await.unwrap_err();
        assert!(matches!(err, ModelError::AuthMissing));
    }
}
