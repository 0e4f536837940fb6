use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Key for cache entries: a file identified by path plus a hash of its
/// content, so stale entries fall out naturally when the file changes.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    pub path: String,
    pub content_hash: String,
}

impl CacheKey {
    /// Build a key from a relative path and the file content it refers to.
    pub fn for_content(path: &str, content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let content_hash = format!("{:x}", hasher.finalize());
        Self {
            path: path.to_string(),
            content_hash,
        }
    }
}

/// Cache hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_changes_with_content() {
        let a = CacheKey::for_content("src/a.ts", "import './b';");
        let b = CacheKey::for_content("src/a.ts", "import './c';");
        assert_eq!(a.path, b.path);
        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn key_is_stable_for_same_content() {
        let a = CacheKey::for_content("src/a.ts", "import './b';");
        let b = CacheKey::for_content("src/a.ts", "import './b';");
        assert_eq!(a, b);
    }
}
