//! The hybrid ranking function.
//!
//! Four signals per candidate — vector cosine similarity, weighted
//! full-text lexical relevance, path trigram similarity, and two small
//! domain nudges (script bias, noise penalty) — combined into one score
//! after per-query min/max normalization. A concrete `Store` (Postgres,
//! in-memory) is free to compute the raw signals however fits its
//! backend; this module is the one place the combination weights and
//! the bias/penalty rules live, so both backends agree on the same
//! numbers for the same inputs.

use std::collections::HashSet;

use crate::models::Chunk;

const SCRIPT_KEYWORDS: &[&str] = &[
    "script", "scripts", "bash", "shell", "code", "program", "programs", "python", "cli",
];
const POSITIVE_LANGS: &[&str] = &["shell", "bash", "sh", "python", "py", "go"];
const NEGATIVE_LANGS: &[&str] = &["yaml", "terraform", "tf", "json"];
const NOISE_SEGMENTS: &[&str] = &[
    "sample", "samples", "example", "examples", "test", "tests", "mock", "mocks", "fixture",
    "fixtures", "tmp", "temp", "sandbox",
];
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "in", "on", "to", "for", "is", "that", "this", "with",
    "as", "by", "at", "from", "be", "are", "was", "were", "it", "its", "i", "you", "do", "does",
];

const W_SEM: f64 = 0.80;
const W_LEX: f64 = 0.15;
const W_TRI: f64 = 0.05;
const W_BIAS: f64 = 0.10;
const W_NOISE: f64 = 0.07;

/// Raw, un-normalized per-candidate signals, before the per-query min/max
/// normalization pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSignals {
    pub sem_sim: f64,
    pub lex_sum: f64,
    pub tri: f64,
    pub script_bias: i32,
    pub noise_penalty: i32,
}

/// Cosine similarity clamped to `[0, 1]`; 0 if either vector is empty or
/// a zero vector (undefined direction).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if mag_a < f64::EPSILON || mag_b < f64::EPSILON {
        return 0.0;
    }
    (dot / (mag_a * mag_b)).clamp(-1.0, 1.0)
}

/// `sem_sim = clamp(1 - cosine_distance(vec, query), 0, 1)`, 0 if the
/// chunk has no vector or the query carries none.
pub fn sem_sim(chunk_vec: Option<&[f32]>, query_vec: Option<&[f32]>) -> f64 {
    match (chunk_vec, query_vec) {
        // cosine_distance = 1 - cosine_similarity, so 1 - cosine_distance = cosine_similarity.
        (Some(a), Some(b)) => cosine_similarity(a, b).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Lowercase lexeme extraction: split on non-alphanumeric boundaries,
/// drop stopwords, drop purely numeric tokens, drop empties.
pub fn lexemes(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty())
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

fn band_contains(haystack: &str, lexeme: &str) -> bool {
    haystack.to_lowercase().contains(lexeme)
}

/// Weighted full-text relevance against the disjunction of `query`
/// lexemes and the phrase form of `query`, both contributing. Bands
/// mirror the store's weighted full-text column: path (A) > summary (B)
/// > content (C). Clamped to `[0, 1]` per spec before the per-query
/// max-normalization pass, so a multi-term match doesn't inflate the
/// candidate set's max and compress every other candidate's normalized
/// score.
pub fn lex_sum(chunk: &Chunk, query: &str) -> f64 {
    let terms = lexemes(query);
    let phrase = query.trim().to_lowercase();
    let mut score = 0.0;
    for lexeme in &terms {
        if band_contains(&chunk.path, lexeme) {
            score += 1.0;
        }
        if band_contains(&chunk.summary, lexeme) {
            score += 0.5;
        }
        if band_contains(&chunk.content, lexeme) {
            score += 0.25;
        }
    }
    if !phrase.is_empty() {
        if band_contains(&chunk.path, &phrase) {
            score += 1.0;
        }
        if band_contains(&chunk.summary, &phrase) {
            score += 0.5;
        }
        if band_contains(&chunk.content, &phrase) {
            score += 0.25;
        }
    }
    score.clamp(0.0, 1.0)
}

fn trigram_set(s: &str) -> HashSet<[char; 3]> {
    let padded: Vec<char> = format!("  {}  ", s.to_lowercase()).chars().collect();
    padded.windows(3).map(|w| [w[0], w[1], w[2]]).collect()
}

/// Jaccard similarity of character trigrams, the same notion `pg_trgm`'s
/// `similarity()` implements.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let sa = trigram_set(a);
    let sb = trigram_set(b);
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// The longest alphanumeric-ish token in `q` (letters, digits, `.`, `_`,
/// `-`). Ties keep the first occurrence.
pub fn longest_token(q: &str) -> Option<String> {
    let is_tok_char = |c: char| c.is_alphanumeric() || matches!(c, '.' | '_' | '-');
    let mut best: Option<String> = None;
    let mut current = String::new();
    let mut flush = |current: &mut String, best: &mut Option<String>| {
        if !current.is_empty() {
            if best.as_ref().map(|b| b.len() < current.len()).unwrap_or(true) {
                *best = Some(current.clone());
            }
            current.clear();
        }
    };
    for c in q.chars() {
        if is_tok_char(c) {
            current.push(c);
        } else {
            flush(&mut current, &mut best);
        }
    }
    flush(&mut current, &mut best);
    best
}

/// `tri` = trigram similarity of `path` against the longest token in `q`.
pub fn tri(path: &str, query: &str) -> f64 {
    match longest_token(query) {
        Some(tok) => trigram_similarity(path, &tok),
        None => 0.0,
    }
}

/// +1 if `q` carries a script-ish keyword and `language` is a scripting
/// language; -1 if the same keywords appear but `language` is a config
/// language; 0 otherwise.
pub fn script_bias(query: &str, language: &str) -> i32 {
    let q_lower = query.to_lowercase();
    let has_keyword = SCRIPT_KEYWORDS.iter().any(|k| {
        q_lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|w| w == *k)
    });
    if !has_keyword {
        return 0;
    }
    let lang = language.to_lowercase();
    if POSITIVE_LANGS.contains(&lang.as_str()) {
        1
    } else if NEGATIVE_LANGS.contains(&lang.as_str()) {
        -1
    } else {
        0
    }
}

/// 1 if any path segment names a sample/example/test/mock/fixture/tmp/
/// temp/sandbox directory, 0 otherwise.
pub fn noise_penalty(path: &str) -> i32 {
    let hit = path
        .split('/')
        .any(|seg| NOISE_SEGMENTS.contains(&seg.to_lowercase().as_str()));
    if hit {
        1
    } else {
        0
    }
}

/// Compute the raw signals for one candidate.
pub fn raw_signals(chunk: &Chunk, query_vec: Option<&[f32]>, query_text: &str) -> RawSignals {
    RawSignals {
        sem_sim: sem_sim(chunk.summary_vec.as_deref(), query_vec),
        lex_sum: lex_sum(chunk, query_text),
        tri: tri(&chunk.path, query_text),
        script_bias: script_bias(query_text, &chunk.language),
        noise_penalty: noise_penalty(&chunk.path),
    }
}

fn normalize(values: &[f64]) -> Vec<f64> {
    let max = values.iter().cloned().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        vec![0.0; values.len()]
    } else {
        values.iter().map(|v| v / max).collect()
    }
}

/// `score = 0.80 sem_sim_n + 0.15 lex_sum_n + 0.05 tri_n + 0.10 script_bias
/// - 0.07 noise_penalty`. Any NaN/±inf is reported as 0.
fn composite(sem_n: f64, lex_n: f64, tri_n: f64, bias: i32, penalty: i32) -> f64 {
    let score = W_SEM * sem_n + W_LEX * lex_n + W_TRI * tri_n + W_BIAS * bias as f64
        - W_NOISE * penalty as f64;
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Score a full candidate set for one query: per-query min/max
/// normalization of `sem_sim`/`lex_sum`/`tri`, then the composite
/// formula. Returns scores in the same order as `candidates`. An empty
/// `query_text` yields an empty result (callers are expected to have
/// already short-circuited on this; kept here as a defensive no-op).
pub fn score_candidates(
    candidates: &[Chunk],
    query_vec: Option<&[f32]>,
    query_text: &str,
) -> Vec<f64> {
    if query_text.trim().is_empty() {
        return Vec::new();
    }
    let signals: Vec<RawSignals> = candidates
        .iter()
        .map(|c| raw_signals(c, query_vec, query_text))
        .collect();
    let sem_n = normalize(&signals.iter().map(|s| s.sem_sim).collect::<Vec<_>>());
    let lex_n = normalize(&signals.iter().map(|s| s.lex_sum).collect::<Vec<_>>());
    let tri_n = normalize(&signals.iter().map(|s| s.tri).collect::<Vec<_>>());
    signals
        .iter()
        .enumerate()
        .map(|(i, s)| composite(sem_n[i], lex_n[i], tri_n[i], s.script_bias, s.noise_penalty))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(path: &str, language: &str, summary: &str, content: &str) -> Chunk {
        Chunk {
            id: "id".into(),
            repository: "r".into(),
            r#ref: "main".into(),
            path: path.into(),
            language: language.into(),
            summary: summary.into(),
            content: content.into(),
            line_start: 1,
            line_end: 1,
            summary_vec: Some(vec![1.0, 0.0]),
            content_hash: "h".into(),
            summarized_at: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn empty_query_yields_no_scores() {
        let c = chunk("a.go", "go", "s", "c");
        assert!(score_candidates(&[c], None, "").is_empty());
        assert!(score_candidates(&[], None, "   ").is_empty());
    }

    #[test]
    fn script_bias_symmetry() {
        let shell = chunk("scripts/wipe.sh", "shell", "wipes disk", "rm -rf /");
        let yaml = chunk("config/wipe.yaml", "yaml", "wipes disk", "kind: Job");
        let scores = score_candidates(&[shell, yaml], Some(&[1.0, 0.0]), "script that deletes disk");
        assert!(scores[0] - scores[1] >= 0.10 - 1e-9);
    }

    #[test]
    fn noise_penalty_is_exactly_point_zero_seven() {
        let a = chunk("src/foo.go", "go", "does a thing", "code");
        let b = chunk("samples/foo.go", "go", "does a thing", "code");
        let scores = score_candidates(&[a, b], Some(&[1.0, 0.0]), "thing");
        assert!((scores[0] - scores[1] - 0.07).abs() < 1e-9);
    }

    #[test]
    fn components_stay_in_unit_range_after_normalization() {
        let candidates = vec![
            chunk("a.go", "go", "alpha beta", "alpha content"),
            chunk("b.py", "python", "beta gamma", "beta content"),
            chunk("c.yaml", "yaml", "gamma delta", "gamma content"),
        ];
        let scores = score_candidates(&candidates, Some(&[1.0, 0.0]), "alpha beta gamma");
        for s in scores {
            assert!(s.is_finite());
            assert!(s >= -0.07 - 1e-9 && s <= 1.10 + 1e-9);
        }
    }

    #[test]
    fn trigram_similarity_matches_close_paths() {
        let sim = trigram_similarity("scripts/wipe.sh", "wipe.sh");
        assert!(sim > 0.0);
        assert_eq!(trigram_similarity("", "x"), 0.0);
    }

    #[test]
    fn longest_token_picks_maximal_run() {
        assert_eq!(
            longest_token("a query about main.go please"),
            Some("main.go".to_string())
        );
        assert_eq!(longest_token("   "), None);
    }

    #[test]
    fn lex_sum_is_clamped_to_one() {
        let c = chunk("alpha beta gamma", "go", "alpha beta gamma", "alpha beta gamma");
        assert_eq!(lex_sum(&c, "alpha beta gamma"), 1.0);
    }
}
