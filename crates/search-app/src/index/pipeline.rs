//! The indexing pipeline: walk → filter → chunk → delta-gated
//! summarize/embed → idempotent upsert.
//!
//! A bounded channel decouples a single producer (the tree walker) from
//! a pool of consumers (the workers that do the model/store work).
//! Sizing the pool at `min(available parallelism, 8)` reproduces the
//! upstream system's unexplained cap of 8 workers as an explicit,
//! documented constant rather than a tuning-free magic number.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{anyhow, Result};
use chrono::Utc;
use search_core::chunking::{detect_language, ChunkPolicy, WholeFileChunker};
use search_core::error::ModelError;
use search_core::identity;
use search_core::model::ModelClient;
use search_core::models::Chunk;
use search_core::store::Store;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::walk::{walk, WalkedFile};

/// Reproduces the upstream system's undocumented worker pool cap; the
/// spec leaves this unjustified and asks that it be a named constant.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Upper bound on characters sent to `summarize`, per the indexer's
/// pre-check (larger than the model's own ~8 KB prompt truncation).
const SUMMARIZE_CAP_CHARS: usize = 400_000;

const HEURISTIC_SUMMARY_LEN: usize = 240;

#[derive(Debug, Default)]
pub struct IndexStats {
    pub files_seen: u64,
    pub chunks_upserted: u64,
    pub summarized: u64,
    pub embedded: u64,
    pub errors: u64,
}

#[derive(Default)]
struct Counters {
    files_seen: AtomicU64,
    chunks_upserted: AtomicU64,
    summarized: AtomicU64,
    embedded: AtomicU64,
    errors: AtomicU64,
    /// Set once by the first worker to observe `ModelError::AuthMissing`.
    /// Unlike `Upstream`, which gets a per-chunk heuristic/no-vector
    /// fallback, `AuthMissing` is fatal: every subsequent call on the
    /// same client would fail identically, so the run aborts instead of
    /// retrying per chunk.
    fatal: StdMutex<Option<String>>,
}

impl Counters {
    fn snapshot(&self) -> IndexStats {
        IndexStats {
            files_seen: self.files_seen.load(Ordering::Relaxed),
            chunks_upserted: self.chunks_upserted.load(Ordering::Relaxed),
            summarized: self.summarized.load(Ordering::Relaxed),
            embedded: self.embedded.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    fn report_fatal(&self, message: String) {
        let mut fatal = self.fatal.lock().unwrap();
        if fatal.is_none() {
            *fatal = Some(message);
        }
    }
}

fn heuristic_summary(content: &str) -> String {
    content.trim().chars().take(HEURISTIC_SUMMARY_LEN).collect()
}

/// Runs the delta policy and upsert for every chunk produced from one
/// file. Per-chunk and per-file failures are logged and do not abort the
/// run (progress over completeness) — except `ModelError::AuthMissing`,
/// which is fatal: it is reported to `counters` and the cancellation
/// token is tripped so the whole run winds down instead of retrying a
/// credential error on every remaining chunk.
async fn process_file(
    file: &WalkedFile,
    repository: &str,
    ref_label: &str,
    chunker: &dyn ChunkPolicy,
    store: &dyn Store,
    model: &dyn ModelClient,
    counters: &Counters,
    cancel: &CancellationToken,
) {
    let content = match tokio::fs::read_to_string(&file.abs_path).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %file.rel_path, error = %e, "failed to read file, skipping");
            counters.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let language = detect_language(&file.rel_path);

    for raw in chunker.chunk(&content) {
        if cancel.is_cancelled() {
            return;
        }

        let hash = identity::content_hash(&raw.content);
        let id = identity::chunk_id(&file.rel_path, raw.line_start, raw.line_end);

        let meta = match store
            .get_chunk_meta(repository, &file.rel_path, raw.line_start, raw.line_end)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(path = %file.rel_path, error = %e, "get_chunk_meta failed, skipping chunk");
                counters.errors.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        let found = meta.is_some();
        let stored_hash_matches = meta.as_ref().map(|m| m.content_hash == hash).unwrap_or(false);
        let stored_summary = meta.as_ref().map(|m| m.summary.clone()).unwrap_or_default();
        let has_vec = meta.as_ref().map(|m| m.has_vec).unwrap_or(false);

        let need_summary = !found || !stored_hash_matches || stored_summary.is_empty();
        let need_embed = !found || !stored_hash_matches || !has_vec;

        let summary = if need_summary {
            let capped: String = raw.content.chars().take(SUMMARIZE_CAP_CHARS).collect();
            match model.summarize(&file.rel_path, &language, &capped).await {
                Ok(s) if !s.trim().is_empty() => {
                    counters.summarized.fetch_add(1, Ordering::Relaxed);
                    s
                }
                Ok(_) => heuristic_summary(&raw.content),
                Err(ModelError::AuthMissing) => {
                    tracing::error!(path = %file.rel_path, "summarize failed: no credential configured, aborting run");
                    counters.report_fatal("summarize: no credential configured".to_string());
                    cancel.cancel();
                    return;
                }
                Err(e) => {
                    tracing::warn!(path = %file.rel_path, error = %e, "summarize failed, using heuristic");
                    heuristic_summary(&raw.content)
                }
            }
        } else {
            stored_summary
        };

        let summary_vec = if need_embed {
            match model.embed(&summary).await {
                Ok(v) => {
                    counters.embedded.fetch_add(1, Ordering::Relaxed);
                    Some(v)
                }
                Err(ModelError::AuthMissing) => {
                    tracing::error!(path = %file.rel_path, "embed failed: no credential configured, aborting run");
                    counters.report_fatal("embed: no credential configured".to_string());
                    cancel.cancel();
                    return;
                }
                Err(e) => {
                    tracing::warn!(path = %file.rel_path, error = %e, "embed failed, upserting without vector");
                    None
                }
            }
        } else {
            None
        };

        let chunk = Chunk {
            id,
            repository: repository.to_string(),
            r#ref: ref_label.to_string(),
            path: file.rel_path.clone(),
            language: language.clone(),
            summary,
            content: raw.content,
            line_start: raw.line_start,
            line_end: raw.line_end,
            summary_vec,
            content_hash: hash,
            summarized_at: if need_summary { Some(Utc::now()) } else { None },
            created_at: Utc::now(),
        };

        if let Err(e) = store.upsert_chunk(&chunk).await {
            tracing::error!(path = %file.rel_path, error = %e, "upsert_chunk failed");
            counters.errors.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        counters.chunks_upserted.fetch_add(1, Ordering::Relaxed);
    }

    counters.files_seen.fetch_add(1, Ordering::Relaxed);
}

fn worker_pool_size(max_workers: Option<usize>) -> usize {
    max_workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(DEFAULT_MAX_WORKERS)
    })
}

/// Run the full indexing pipeline over `root`, tagging every chunk with
/// `repository`/`ref_label`. Cancellation stops new dispatch immediately;
/// in-flight work is allowed to finish. Returns `Err` if any worker hits
/// `ModelError::AuthMissing` — the one model failure that is fatal to
/// the run rather than a per-chunk fallback.
pub async fn run_index(
    root: &Path,
    repository: &str,
    ref_label: &str,
    store: Arc<dyn Store>,
    model: Arc<dyn ModelClient>,
    max_workers: Option<usize>,
    queue_capacity_multiplier: usize,
    cancel: CancellationToken,
) -> Result<IndexStats> {
    let pool_size = worker_pool_size(max_workers);
    let capacity = (pool_size * queue_capacity_multiplier).max(1);
    let (tx, rx) = mpsc::channel::<WalkedFile>(capacity);
    let rx = Arc::new(Mutex::new(rx));
    let counters = Arc::new(Counters::default());

    let root_owned = root.to_path_buf();
    let producer_cancel = cancel.clone();
    let producer = tokio::task::spawn_blocking(move || walk(&root_owned));

    let sender = tokio::spawn(async move {
        let files = match producer.await {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(error = %e, "walker task panicked");
                return;
            }
        };
        for file in files {
            if producer_cancel.is_cancelled() {
                break;
            }
            if tx.send(file).await.is_err() {
                break;
            }
        }
    });

    let mut workers = Vec::with_capacity(pool_size);
    for _ in 0..pool_size {
        let rx = Arc::clone(&rx);
        let store = Arc::clone(&store);
        let model = Arc::clone(&model);
        let counters = Arc::clone(&counters);
        let repository = repository.to_string();
        let ref_label = ref_label.to_string();
        let cancel = cancel.clone();
        let chunker = WholeFileChunker;

        workers.push(tokio::spawn(async move {
            loop {
                let item = {
                    let mut guard = rx.lock().await;
                    tokio::select! {
                        _ = cancel.cancelled() => None,
                        v = guard.recv() => v,
                    }
                };
                match item {
                    Some(file) => {
                        process_file(
                            &file,
                            &repository,
                            &ref_label,
                            &chunker,
                            store.as_ref(),
                            model.as_ref(),
                            &counters,
                            &cancel,
                        )
                        .await
                    }
                    None => break,
                }
            }
        }));
    }

    let _ = sender.await;
    for w in workers {
        let _ = w.await;
    }

    let stats = counters.snapshot();
    match counters.fatal.lock().unwrap().clone() {
        Some(message) => Err(anyhow!(message)),
        None => Ok(stats),
    }
}
