//! Model provider selection.
//!
//! Exactly one [`ModelClient`] variant is constructed from configuration;
//! all three are interchangeable through the same trait. Per the
//! `AuthMissing` error-taxonomy entry ("fatal at first call"),
//! construction never fails merely because a credential is absent — a
//! client missing its credential builds successfully and returns
//! `ModelError::AuthMissing` from its first `embed`/`summarize` call,
//! which lets the search service degrade to lexical-only ranking instead
//! of refusing to start.

pub mod openai_style;
pub mod stub;
pub mod vertex_style;

use std::sync::Arc;

use anyhow::{bail, Result};
use search_core::model::ModelClient;

use crate::config::ModelConfig;
use openai_style::OpenAiStyleClient;
use stub::StubClient;
use vertex_style::VertexStyleClient;

pub fn create_client(config: &ModelConfig) -> Result<Arc<dyn ModelClient>> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY").ok();
            let client = OpenAiStyleClient::new(config, api_key)?;
            Ok(Arc::new(client))
        }
        "vertex" => {
            let project = config.project.clone().or_else(|| std::env::var("VERTEX_PROJECT_ID").ok());
            let token = std::env::var("VERTEX_ACCESS_TOKEN").ok();
            let client = VertexStyleClient::new(config, project, token)?;
            Ok(Arc::new(client))
        }
        "stub" => {
            let dims = config.dims.unwrap_or(8);
            Ok(Arc::new(StubClient::new(dims)))
        }
        other => bail!("unknown model provider: {other}"),
    }
}
