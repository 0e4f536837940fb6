use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use crate::models::FileHandle;

/// Capability for extracting the project-internal imports of one file.
///
/// Implementations receive the file and the project root and return the
/// resolved, root-relative paths it imports. Failures are per-file; the
/// graph builder isolates them and never aborts the batch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImportParser: Send + Sync {
    async fn parse_imports(&self, file: &FileHandle, root: &Path) -> Result<Vec<String>>;
}

static ES_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:import|export)\b[^'"]*['"]([^'"]+)['"]"#).expect("ES import regex")
});
static REQUIRE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).expect("require regex"));
static PY_FROM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*from\s+([\w.]+)\s+import\b").expect("python from regex"));
static PY_IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*import\s+([\w.]+)").expect("python import regex"));
static RS_MOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+([A-Za-z_][A-Za-z0-9_]*)\s*;").expect("rust mod regex")
});

const JS_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs"];

/// Default `ImportParser`: purely lexical line matching, no AST work.
///
/// Specifiers are resolved against the set of known candidate files;
/// anything that lands outside the project (standard library, third-party
/// packages) is dropped.
pub struct LexicalImportParser {
    known_files: HashSet<String>,
}

impl LexicalImportParser {
    pub fn new(candidates: &[FileHandle]) -> Self {
        Self {
            known_files: candidates
                .iter()
                .map(|f| f.relative_path().to_string())
                .collect(),
        }
    }

    /// Extract and resolve imports from already-read content.
    pub fn imports_from_content(&self, file: &FileHandle, content: &str) -> Vec<String> {
        let extension = file
            .relative_path()
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        let mut resolved = Vec::new();
        for line in content.lines() {
            for spec in extract_specifiers(&extension, line) {
                if let Some(path) = self.resolve(&extension, &spec, file) {
                    if path != file.relative_path() {
                        resolved.push(path);
                    }
                }
            }
        }

        resolved.sort();
        resolved.dedup();
        resolved
    }

    fn resolve(&self, extension: &str, spec: &str, importer: &FileHandle) -> Option<String> {
        match extension {
            "ts" | "tsx" | "js" | "jsx" | "mjs" => self.resolve_js(spec, importer),
            "py" => self.resolve_py(spec, importer),
            "rs" => self.resolve_rs(spec, importer),
            _ => None,
        }
    }

    fn resolve_js(&self, spec: &str, importer: &FileHandle) -> Option<String> {
        if !spec.starts_with('.') {
            // Bare specifier: package import, not a project file.
            return None;
        }

        let base = normalize(&format!("{}/{}", importer.relative_dir(), spec));
        if self.known_files.contains(&base) {
            return Some(base);
        }
        for ext in JS_EXTENSIONS {
            let with_ext = format!("{base}.{ext}");
            if self.known_files.contains(&with_ext) {
                return Some(with_ext);
            }
            let index = format!("{base}/index.{ext}");
            if self.known_files.contains(&index) {
                return Some(index);
            }
        }
        None
    }

    fn resolve_py(&self, spec: &str, importer: &FileHandle) -> Option<String> {
        let as_path = spec.trim_start_matches('.').replace('.', "/");
        let bases = [
            as_path.clone(),
            normalize(&format!("{}/{}", importer.relative_dir(), as_path)),
        ];
        for base in bases {
            if base.is_empty() {
                continue;
            }
            let module = format!("{base}.py");
            if self.known_files.contains(&module) {
                return Some(module);
            }
            let package = format!("{base}/__init__.py");
            if self.known_files.contains(&package) {
                return Some(package);
            }
        }
        None
    }

    fn resolve_rs(&self, name: &str, importer: &FileHandle) -> Option<String> {
        let dir = importer.relative_dir();
        // mod declarations in lib.rs/main.rs/mod.rs resolve beside the file;
        // in other files they resolve into a directory named after the file.
        let file_name = importer
            .relative_path()
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let search_dir = if matches!(file_name, "lib.rs" | "main.rs" | "mod.rs") {
            dir.to_string()
        } else {
            normalize(&format!("{}/{}", dir, file_name.trim_end_matches(".rs")))
        };

        let plain = normalize(&format!("{search_dir}/{name}.rs"));
        if self.known_files.contains(&plain) {
            return Some(plain);
        }
        let module = normalize(&format!("{search_dir}/{name}/mod.rs"));
        if self.known_files.contains(&module) {
            return Some(module);
        }
        None
    }
}

#[async_trait]
impl ImportParser for LexicalImportParser {
    async fn parse_imports(&self, file: &FileHandle, _root: &Path) -> Result<Vec<String>> {
        let content = tokio::fs::read_to_string(file.absolute_path())
            .await
            .with_context(|| format!("Failed to read file: {}", file.relative_path()))?;
        Ok(self.imports_from_content(file, &content))
    }
}

fn extract_specifiers(extension: &str, line: &str) -> Vec<String> {
    let mut specs = Vec::new();
    match extension {
        "ts" | "tsx" | "js" | "jsx" | "mjs" => {
            if let Some(caps) = ES_IMPORT_RE.captures(line) {
                specs.push(caps[1].to_string());
            }
            for caps in REQUIRE_RE.captures_iter(line) {
                specs.push(caps[1].to_string());
            }
        }
        "py" => {
            if let Some(caps) = PY_FROM_RE.captures(line) {
                specs.push(caps[1].to_string());
            } else if let Some(caps) = PY_IMPORT_RE.captures(line) {
                specs.push(caps[1].to_string());
            }
        }
        "rs" => {
            if let Some(caps) = RS_MOD_RE.captures(line) {
                specs.push(caps[1].to_string());
            }
        }
        _ => {}
    }
    specs
}

/// Collapse `.` and `..` components of a forward-slash path.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for comp in path.split('/') {
        match comp {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn handles(paths: &[&str]) -> Vec<FileHandle> {
        let root = PathBuf::from("/project");
        paths
            .iter()
            .map(|p| FileHandle::from_relative(*p, &root))
            .collect()
    }

    #[test]
    fn resolves_relative_js_specifiers() {
        let files = handles(&["src/a.ts", "src/b.ts", "src/sub/c.ts", "src/widgets/index.ts"]);
        let parser = LexicalImportParser::new(&files);

        let imports = parser.imports_from_content(
            &files[0],
            concat!(
                "import { b } from './b';\n",
                "import c from \"./sub/c\";\n",
                "import widgets from './widgets';\n",
                "const d = require('./b');\n",
                "import fs from 'fs';\n",
            ),
        );

        assert_eq!(
            imports,
            vec!["src/b.ts", "src/sub/c.ts", "src/widgets/index.ts"]
        );
    }

    #[test]
    fn resolves_parent_directory_specifiers() {
        let files = handles(&["src/sub/c.ts", "src/b.ts"]);
        let parser = LexicalImportParser::new(&files);

        let imports = parser.imports_from_content(&files[0], "import { b } from '../b';\n");
        assert_eq!(imports, vec!["src/b.ts"]);
    }

    #[test]
    fn drops_unresolvable_specifiers() {
        let files = handles(&["src/a.ts"]);
        let parser = LexicalImportParser::new(&files);

        let imports = parser.imports_from_content(
            &files[0],
            "import missing from './missing';\nimport react from 'react';\n",
        );
        assert!(imports.is_empty());
    }

    #[test]
    fn resolves_python_modules_and_packages() {
        let files = handles(&["app/main.py", "app/util.py", "app/models/__init__.py"]);
        let parser = LexicalImportParser::new(&files);

        let imports = parser.imports_from_content(
            &files[0],
            "import os\nfrom app.util import helper\nimport app.models\n",
        );
        assert_eq!(imports, vec!["app/models/__init__.py", "app/util.py"]);
    }

    #[test]
    fn resolves_rust_mod_declarations() {
        let files = handles(&["src/lib.rs", "src/graph.rs", "src/scoring/mod.rs"]);
        let parser = LexicalImportParser::new(&files);

        let imports =
            parser.imports_from_content(&files[0], "pub mod graph;\nmod scoring;\nmod missing;\n");
        assert_eq!(imports, vec!["src/graph.rs", "src/scoring/mod.rs"]);
    }

    #[test]
    fn self_import_is_ignored() {
        let files = handles(&["src/a.ts"]);
        let parser = LexicalImportParser::new(&files);

        let imports = parser.imports_from_content(&files[0], "import self from './a';\n");
        assert!(imports.is_empty());
    }
}
