use parking_lot::Mutex;
use std::collections::HashMap;

use super::types::{CacheKey, CacheStats};

/// Injectable cross-invocation cache collaborator.
///
/// The pipeline itself holds no state between runs; a caller that wants
/// repeated assemblies over an unchanged project to skip import re-parsing
/// constructs one of these and passes it in by reference. Lifecycle is
/// construct → query/insert → clear.
#[derive(Debug, Default)]
pub struct AssemblyCache {
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    imports: HashMap<CacheKey, Vec<String>>,
    hits: usize,
    misses: usize,
}

impl AssemblyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the parsed import list for a (path, content-hash) key.
    pub fn get_imports(&self, key: &CacheKey) -> Option<Vec<String>> {
        let mut inner = self.inner.lock();
        match inner.imports.get(key).cloned() {
            Some(imports) => {
                inner.hits += 1;
                Some(imports)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Record the parsed import list for a key.
    pub fn insert_imports(&self, key: CacheKey, imports: Vec<String>) {
        self.inner.lock().imports.insert(key, imports);
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.imports.len(),
        }
    }

    /// Drop all entries and counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.imports.clear();
        inner.hits = 0;
        inner.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn get_or_insert_tracks_hits_and_misses() {
        let cache = AssemblyCache::new();
        let key = CacheKey::for_content("src/a.ts", "import './b';");

        assert_eq!(cache.get_imports(&key), None);
        cache.insert_imports(key.clone(), vec!["src/b.ts".to_string()]);
        assert_eq!(
            cache.get_imports(&key),
            Some(vec!["src/b.ts".to_string()])
        );

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn clear_resets_entries_and_counters() {
        let cache = AssemblyCache::new();
        let key = CacheKey::for_content("src/a.ts", "x");
        cache.insert_imports(key.clone(), vec![]);
        cache.get_imports(&key);

        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats, CacheStats::default());
    }
}
