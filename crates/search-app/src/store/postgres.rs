//! Postgres-backed `Store`, using `pgvector` for cosine ANN search,
//! `pg_trgm` for path trigram similarity, and a generated weighted
//! `tsvector` column (`path` > `summary` > `content`, bands A/B/C) for
//! lexical relevance.
//!
//! Ranking itself is computed exactly in Rust via
//! [`search_core::scoring`] over the full filtered candidate set — the
//! ANN/GIN/trigram indexes accelerate the filter predicates an engine
//! may apply, but (per the design note on ANN freshness) none of them is
//! trusted to produce the final ordering on its own.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use search_core::error::StoreError;
use search_core::models::{Chunk, ChunkMeta, ScoredChunk};
use search_core::scoring;
use search_core::store::{SearchOpts, Store};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn vector_literal(v: &[f32]) -> String {
    let mut s = String::with_capacity(v.len() * 8 + 2);
    s.push('[');
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        s.push_str(&x.to_string());
    }
    s.push(']');
    s
}

/// Escape `LIKE` wildcard characters (`%`, `_`) and the escape character
/// itself (`\`) so a `path_contains` substring is matched literally, not
/// interpreted as a pattern.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn parse_vector_literal(s: &str) -> Vec<f32> {
    s.trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .filter(|t| !t.is_empty())
        .map(|t| t.trim().parse::<f32>().unwrap_or(0.0))
        .collect()
}

fn map_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn row_to_chunk(row: &sqlx::postgres::PgRow) -> Result<Chunk, StoreError> {
    let vec_text: Option<String> = row.try_get("summary_vec_text").map_err(map_err)?;
    Ok(Chunk {
        id: row.try_get("id").map_err(map_err)?,
        repository: row.try_get("repository").map_err(map_err)?,
        r#ref: row.try_get("ref").map_err(map_err)?,
        path: row.try_get("path").map_err(map_err)?,
        language: row.try_get("language").map_err(map_err)?,
        summary: row.try_get("summary").map_err(map_err)?,
        content: row.try_get("content").map_err(map_err)?,
        line_start: row.try_get("line_start").map_err(map_err)?,
        line_end: row.try_get("line_end").map_err(map_err)?,
        summary_vec: vec_text.map(|t| parse_vector_literal(&t)),
        content_hash: row.try_get("content_hash").map_err(map_err)?,
        summarized_at: row.try_get("summarized_at").map_err(map_err)?,
        created_at: row.try_get("created_at").map_err(map_err)?,
    })
}

#[async_trait]
impl Store for PostgresStore {
    async fn init_schema(&self, dim: usize) -> Result<(), StoreError> {
        if dim == 0 {
            return Err(StoreError::SchemaMismatch("embedding dimension must be nonzero".into()));
        }

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        sqlx::query("CREATE EXTENSION IF NOT EXISTS pg_trgm")
            .execute(&self.pool)
            .await
            .map_err(map_err)?;

        let existing_dim: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT (regexp_match(format_type(a.atttypid, a.atttypmod), 'vector\((\d+)\)'))[1]::int
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            WHERE c.relname = 'chunks' AND a.attname = 'summary_vec' AND a.attnum > 0 AND NOT a.attisdropped
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?
        .flatten();

        if let Some(existing) = existing_dim {
            if existing as usize != dim {
                return Err(StoreError::SchemaMismatch(format!(
                    "chunks.summary_vec already sized for dim {existing}, cannot reinitialize for {dim}"
                )));
            }
        } else {
            let create_table = format!(
                r#"
                CREATE TABLE IF NOT EXISTS chunks (
                    id TEXT PRIMARY KEY,
                    repository TEXT NOT NULL,
                    ref TEXT NOT NULL,
                    path TEXT NOT NULL,
                    language TEXT NOT NULL DEFAULT '',
                    summary TEXT NOT NULL DEFAULT '',
                    content TEXT NOT NULL,
                    line_start INT NOT NULL,
                    line_end INT NOT NULL,
                    summary_vec vector({dim}),
                    content_hash TEXT NOT NULL,
                    summarized_at TIMESTAMPTZ,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    search_vector tsvector GENERATED ALWAYS AS (
                        setweight(to_tsvector('simple', coalesce(path, '')), 'A') ||
                        setweight(to_tsvector('english', coalesce(summary, '')), 'B') ||
                        setweight(to_tsvector('english', coalesce(content, '')), 'C')
                    ) STORED
                )
                "#
            );
            sqlx::query(&create_table).execute(&self.pool).await.map_err(map_err)?;
        }

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS chunks_natural_key ON chunks (repository, ref, path, line_start, line_end)",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        sqlx::query("CREATE INDEX IF NOT EXISTS chunks_fts_idx ON chunks USING GIN (search_vector)")
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS chunks_vec_idx ON chunks USING hnsw (summary_vec vector_cosine_ops)",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        sqlx::query("CREATE INDEX IF NOT EXISTS chunks_path_trgm_idx ON chunks USING GIN (path gin_trgm_ops)")
            .execute(&self.pool)
            .await
            .map_err(map_err)?;

        Ok(())
    }

    async fn get_chunk_meta(
        &self,
        repository: &str,
        path: &str,
        line_start: i32,
        line_end: i32,
    ) -> Result<Option<ChunkMeta>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT content_hash, summary, (summary_vec IS NOT NULL) AS has_vec
            FROM chunks
            WHERE repository = $1 AND path = $2 AND line_start = $3 AND line_end = $4
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(repository)
        .bind(path)
        .bind(line_start)
        .bind(line_end)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(row.map(|r| ChunkMeta {
            content_hash: r.get("content_hash"),
            summary: r.get("summary"),
            has_vec: r.get("has_vec"),
        }))
    }

    async fn upsert_chunk(&self, chunk: &Chunk) -> Result<(), StoreError> {
        let vec_literal = chunk.summary_vec.as_ref().map(|v| vector_literal(v));

        sqlx::query(
            r#"
            INSERT INTO chunks (id, repository, ref, path, language, summary, content, line_start, line_end, summary_vec, content_hash, summarized_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10::vector, $11, $12, $13)
            ON CONFLICT (repository, ref, path, line_start, line_end) DO UPDATE SET
                content = EXCLUDED.content,
                language = EXCLUDED.language,
                content_hash = EXCLUDED.content_hash,
                summary = CASE WHEN EXCLUDED.summary <> '' THEN EXCLUDED.summary ELSE chunks.summary END,
                summary_vec = CASE WHEN EXCLUDED.summary_vec IS NOT NULL THEN EXCLUDED.summary_vec ELSE chunks.summary_vec END,
                summarized_at = CASE WHEN EXCLUDED.summarized_at IS NOT NULL THEN EXCLUDED.summarized_at ELSE chunks.summarized_at END
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.repository)
        .bind(&chunk.r#ref)
        .bind(&chunk.path)
        .bind(&chunk.language)
        .bind(&chunk.summary)
        .bind(&chunk.content)
        .bind(chunk.line_start)
        .bind(chunk.line_end)
        .bind(vec_literal)
        .bind(&chunk.content_hash)
        .bind(chunk.summarized_at)
        .bind(chunk.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(())
    }

    async fn list_repositories(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT DISTINCT repository FROM chunks ORDER BY repository")
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(rows)
    }

    async fn list_refs(&self, repository: &str) -> Result<Vec<String>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT DISTINCT ref FROM chunks WHERE repository = $1 ORDER BY ref")
            .bind(repository)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(rows)
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

        let mut sql = String::from(
            "SELECT id, repository, ref, path, language, summary, content, line_start, line_end, \
             summary_vec::text AS summary_vec_text, content_hash, summarized_at, created_at FROM chunks WHERE 1 = 1",
        );
        let mut binds: Vec<String> = Vec::new();
        if let Some(r) = &opts.repository {
            binds.push(r.clone());
            sql.push_str(&format!(" AND repository = ${}", binds.len()));
        }
        if let Some(r) = &opts.r#ref {
            binds.push(r.clone());
            sql.push_str(&format!(" AND ref = ${}", binds.len()));
        }
        if let Some(l) = &opts.language {
            binds.push(l.clone());
            sql.push_str(&format!(" AND language = ${}", binds.len()));
        }
        if let Some(p) = &opts.path_contains {
            binds.push(format!("%{}%", escape_like(p)));
            sql.push_str(&format!(" AND path LIKE ${} ESCAPE '\\'", binds.len()));
        }

        let mut query = sqlx::query(&sql);
        for b in &binds {
            query = query.bind(b);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(map_err)?;
        let candidates: Vec<Chunk> = rows.iter().map(row_to_chunk).collect::<Result<_, _>>()?;

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
