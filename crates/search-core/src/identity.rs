//! Deterministic chunk identity.
//!
//! `id(path, line_start, line_end)` must be stable across runs and
//! platforms (spec invariant: deterministic identity). It is the SHA-256
//! hex digest of the composite string `path + "#" + line_start + ":" +
//! line_end` — both the composition and the hash algorithm are fixed so
//! that any reimplementation converges on the same ids for the same input.

use sha2::{Digest, Sha256};

/// Compute the stable chunk identifier for a `(path, line_start, line_end)`
/// triple.
///
/// # Example
///
/// ```
/// use search_core::identity::chunk_id;
///
/// let a = chunk_id("main.go", 1, 4);
/// let b = chunk_id("main.go", 1, 4);
/// assert_eq!(a, b);
/// assert_ne!(a, chunk_id("main.go", 1, 5));
/// ```
pub fn chunk_id(path: &str, line_start: i32, line_end: i32) -> String {
    let composite = format!("{}#{}:{}", path, line_start, line_end);
    let mut hasher = Sha256::new();
    hasher.update(composite.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compute the hex SHA-256 digest of chunk content, used for delta
/// detection (`content_hash`).
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let a = chunk_id("src/main.rs", 1, 10);
        let b = chunk_id("src/main.rs", 1, 10);
        assert_eq!(a, b);
    }

    #[test]
    fn distinguishes_path_and_range() {
        let a = chunk_id("a.rs", 1, 10);
        let b = chunk_id("b.rs", 1, 10);
        let c = chunk_id("a.rs", 1, 11);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn is_64_char_hex() {
        let id = chunk_id("main.go", 1, 4);
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn content_hash_changes_with_content() {
        let h1 = content_hash("package main\n");
        let h2 = content_hash("package main\n\nfunc main() {}\n");
        assert_ne!(h1, h2);
        assert_eq!(h1, content_hash("package main\n"));
    }
}
