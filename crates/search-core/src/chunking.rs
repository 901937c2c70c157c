//! Chunking extension point and language detection.
//!
//! The current core policy (`WholeFileChunker`) treats each file as a
//! single chunk spanning `1..(count of newlines + 1)`. `ChunkPolicy` is
//! the seam an alternate chunker (window-based, syntactic) would
//! implement; any such chunker must still respect the invariants spoken
//! of in the data model: `line_start >= 1`, `line_end >= line_start`,
//! chunks from the same file never overlap, and `content` is exactly the
//! text of the named line span.

/// A single candidate chunk produced by a [`ChunkPolicy`], before it is
/// wrapped into a full [`crate::models::Chunk`] with repository/ref/id.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChunk {
    pub line_start: i32,
    pub line_end: i32,
    pub content: String,
}

/// Pluggable chunking strategy. Implementations must not overlap chunks
/// within a single file and must return at least one chunk for any input
/// (including empty content).
pub trait ChunkPolicy: Send + Sync {
    fn chunk(&self, content: &str) -> Vec<RawChunk>;
}

/// The current core policy: one chunk per file, the entire file.
///
/// A file of N newlines produces a chunk with `line_end = N + 1`. The
/// sentinel case — exactly one line with no trailing newline — also
/// yields `line_end = 1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WholeFileChunker;

impl ChunkPolicy for WholeFileChunker {
    fn chunk(&self, content: &str) -> Vec<RawChunk> {
        let newline_count = content.bytes().filter(|&b| b == b'\n').count();
        let line_end = (newline_count + 1) as i32;
        vec![RawChunk {
            line_start: 1,
            line_end,
            content: content.to_string(),
        }]
    }
}

/// Derive a lowercase language tag from a file extension.
///
/// Unknown extensions produce the extension itself (sans the leading
/// dot), lowercased. An empty extension yields an empty language.
pub fn detect_language(path: &str) -> String {
    let ext = match path.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => return String::new(),
    };
    if ext.is_empty() {
        return String::new();
    }
    let ext_lower = ext.to_lowercase();
    let known = match ext_lower.as_str() {
        "sh" | "bash" | "zsh" => "shell",
        "py" | "pyi" => "python",
        "go" => "go",
        "md" | "markdown" => "markdown",
        "tf" | "tfvars" => "terraform",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "rb" => "ruby",
        "yaml" | "yml" => "yaml",
        "json" => "json",
        _ => ext_lower.as_str(),
    };
    known.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_no_trailing_newline() {
        let chunks = WholeFileChunker.chunk("package main");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].line_start, 1);
        assert_eq!(chunks[0].line_end, 1);
    }

    #[test]
    fn n_newlines_yields_n_plus_1_line_end() {
        let chunks = WholeFileChunker.chunk("package main\n\nfunc main() {}\n");
        assert_eq!(chunks[0].line_end, 4);
    }

    #[test]
    fn empty_file_yields_single_chunk() {
        let chunks = WholeFileChunker.chunk("");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].line_start, 1);
        assert_eq!(chunks[0].line_end, 1);
    }

    #[test]
    fn content_is_exact_span() {
        let text = "line one\nline two\n";
        let chunks = WholeFileChunker.chunk(text);
        assert_eq!(chunks[0].content, text);
    }

    #[test]
    fn known_extensions() {
        assert_eq!(detect_language("scripts/wipe.sh"), "shell");
        assert_eq!(detect_language("a/b/main.go"), "go");
        assert_eq!(detect_language("x.PY"), "python");
        assert_eq!(detect_language("config/wipe.yaml"), "yaml");
        assert_eq!(detect_language("infra/main.tf"), "terraform");
    }

    #[test]
    fn unknown_extension_falls_back_to_extension() {
        assert_eq!(detect_language("data.proto"), "proto");
    }

    #[test]
    fn empty_extension_yields_empty_language() {
        assert_eq!(detect_language("Makefile"), "");
        assert_eq!(detect_language("no_extension_at_all"), "");
    }
}
