use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::Path;

use super::imports::ImportParser;
use crate::cache::{AssemblyCache, CacheKey};
use crate::constants::MAX_CONCURRENT_PARSES;
use crate::models::FileHandle;
use crate::utils::CancelToken;

/// Forward dependency mapping: relative file path → the relative paths it
/// imports. A missing key means the file was unknown or unparseable, which
/// is distinct from a present key with an empty list.
pub type DependencyGraph = BTreeMap<String, Vec<String>>;

/// Inverted mapping: imported path → the files that import it. Files with
/// no importers are simply absent.
pub type ReverseDependencyGraph = BTreeMap<String, Vec<String>>;

/// Builds the forward dependency graph for one assembly run.
///
/// Import parsing is I/O bound, so files are processed by a bounded pool of
/// concurrent tasks. Per-file parse failures are logged and leave the file
/// out of the graph; they never abort the batch.
pub struct DependencyGraphBuilder<'a> {
    parser: &'a dyn ImportParser,
    cache: Option<&'a AssemblyCache>,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(parser: &'a dyn ImportParser) -> Self {
        Self {
            parser,
            cache: None,
        }
    }

    /// Attach a caller-owned cache consulted before each parse.
    pub fn with_cache(mut self, cache: &'a AssemblyCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Parse every candidate file and assemble the forward graph.
    pub async fn build(
        &self,
        files: &[FileHandle],
        root: &Path,
        cancel: &CancelToken,
    ) -> DependencyGraph {
        let results: Vec<Option<(String, Vec<String>)>> =
            stream::iter(files.iter().map(|file| self.parse_one(file, root, cancel)))
                .buffer_unordered(MAX_CONCURRENT_PARSES)
                .collect()
                .await;

        results.into_iter().flatten().collect()
    }

    async fn parse_one(
        &self,
        file: &FileHandle,
        root: &Path,
        cancel: &CancelToken,
    ) -> Option<(String, Vec<String>)> {
        if cancel.is_cancelled() {
            return None;
        }

        let relative = file.relative_path().to_string();

        // Cache keys are content hashes, so a changed file misses naturally.
        let key = match tokio::fs::read_to_string(file.absolute_path()).await {
            Ok(content) => Some(CacheKey::for_content(&relative, &content)),
            Err(_) => None,
        };
        if let (Some(cache), Some(key)) = (self.cache, key.as_ref()) {
            if let Some(imports) = cache.get_imports(key) {
                return Some((relative, imports));
            }
        }

        match self.parser.parse_imports(file, root).await {
            Ok(imports) => {
                if let (Some(cache), Some(key)) = (self.cache, key) {
                    cache.insert_imports(key, imports.clone());
                }
                Some((relative, imports))
            }
            Err(err) => {
                tracing::warn!("Failed to parse imports for {relative}: {err:#}");
                None
            }
        }
    }
}

/// Derive the reverse graph with a single pass over the forward graph.
pub fn invert_graph(graph: &DependencyGraph) -> ReverseDependencyGraph {
    let mut reverse: ReverseDependencyGraph = BTreeMap::new();
    for (file, imports) in graph {
        for dep in imports {
            reverse.entry(dep.clone()).or_default().push(file.clone());
        }
    }
    for importers in reverse.values_mut() {
        importers.sort();
        importers.dedup();
    }
    reverse
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::imports::MockImportParser;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn handle(rel: &str) -> FileHandle {
        FileHandle::from_relative(rel, &PathBuf::from("/project"))
    }

    #[tokio::test]
    async fn parse_failure_leaves_other_files_in_graph() {
        let mut parser = MockImportParser::new();
        parser.expect_parse_imports().returning(|file, _root| {
            match file.relative_path() {
                "src/a.ts" => Ok(vec!["src/b.ts".to_string()]),
                "src/b.ts" => Ok(vec![]),
                other => Err(anyhow::anyhow!("unparseable: {other}")),
            }
        });

        let files = vec![handle("src/a.ts"), handle("src/b.ts"), handle("src/bad.ts")];
        let builder = DependencyGraphBuilder::new(&parser);
        let graph = builder
            .build(&files, Path::new("/project"), &CancelToken::new())
            .await;

        // The failing file is absent as a key; an empty import list is not.
        assert_eq!(graph.get("src/a.ts"), Some(&vec!["src/b.ts".to_string()]));
        assert_eq!(graph.get("src/b.ts"), Some(&vec![]));
        assert_eq!(graph.get("src/bad.ts"), None);
    }

    #[tokio::test]
    async fn cancellation_skips_remaining_files() {
        let mut parser = MockImportParser::new();
        parser.expect_parse_imports().never();

        let cancel = CancelToken::new();
        cancel.cancel();

        let files = vec![handle("src/a.ts")];
        let builder = DependencyGraphBuilder::new(&parser);
        let graph = builder.build(&files, Path::new("/project"), &cancel).await;
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn cache_hit_skips_the_parser() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.ts"), "import './b';").unwrap();
        fs::write(temp_dir.path().join("b.ts"), "export const b = 1;").unwrap();

        let files = vec![
            FileHandle::new(temp_dir.path().join("a.ts"), temp_dir.path()),
            FileHandle::new(temp_dir.path().join("b.ts"), temp_dir.path()),
        ];

        let mut parser = MockImportParser::new();
        parser
            .expect_parse_imports()
            .times(2) // once per file, first run only
            .returning(|file, _root| match file.relative_path() {
                "a.ts" => Ok(vec!["b.ts".to_string()]),
                _ => Ok(vec![]),
            });

        let cache = AssemblyCache::new();
        let builder = DependencyGraphBuilder::new(&parser).with_cache(&cache);

        let first = builder
            .build(&files, temp_dir.path(), &CancelToken::new())
            .await;
        let second = builder
            .build(&files, temp_dir.path(), &CancelToken::new())
            .await;

        assert_eq!(first, second);
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn reverse_graph_is_consistent_with_forward_graph() {
        let mut graph = DependencyGraph::new();
        graph.insert(
            "src/a.ts".to_string(),
            vec!["src/b.ts".to_string(), "src/c.ts".to_string()],
        );
        graph.insert("src/b.ts".to_string(), vec!["src/c.ts".to_string()]);
        graph.insert("src/c.ts".to_string(), vec![]);

        let reverse = invert_graph(&graph);

        for (file, imports) in &graph {
            for dep in imports {
                assert!(
                    reverse[dep].contains(file),
                    "reverse[{dep}] should contain {file}"
                );
            }
        }
        for (dep, importers) in &reverse {
            for importer in importers {
                assert!(graph[importer].contains(dep));
            }
        }

        // No importers → absent from the reverse map.
        assert_eq!(reverse.get("src/a.ts"), None);
        assert_eq!(
            reverse.get("src/c.ts"),
            Some(&vec!["src/a.ts".to_string(), "src/b.ts".to_string()])
        );
    }
}
