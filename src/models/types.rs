use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Opaque reference to a project file: absolute location plus its
/// project-root-relative projection, forward-slash normalized.
///
/// Owned by the caller; the pipeline only ever reads through it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileHandle {
    absolute: PathBuf,
    relative: String,
}

impl FileHandle {
    /// Create a handle for `absolute` inside the project rooted at `root`.
    pub fn new(absolute: PathBuf, root: &Path) -> Self {
        let relative = absolute
            .strip_prefix(root)
            .unwrap_or(&absolute)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Self { absolute, relative }
    }

    /// Build a handle directly from an already-relative path (tests, callers
    /// that track their own roots).
    pub fn from_relative(relative: impl Into<String>, root: &Path) -> Self {
        let relative = relative.into().replace('\\', "/");
        Self {
            absolute: root.join(&relative),
            relative,
        }
    }

    pub fn absolute_path(&self) -> &Path {
        &self.absolute
    }

    /// Forward-slash normalized path relative to the project root.
    pub fn relative_path(&self) -> &str {
        &self.relative
    }

    /// Parent directory of the relative path ("" for root-level files).
    pub fn relative_dir(&self) -> &str {
        match self.relative.rfind('/') {
            Some(idx) => &self.relative[..idx],
            None => "",
        }
    }
}

/// A half-open source range. Lines and columns are 0-based; display code
/// adds 1 when rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl SourceRange {
    pub fn lines(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            start_col: 0,
            end_line,
            end_col: 0,
        }
    }

    /// Number of lines the range spans, inclusive of both ends.
    pub fn line_span(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Symbol categories reported by external symbol providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Class,
    Struct,
    Function,
    Method,
    Interface,
    Trait,
    Enum,
    Namespace,
    Constructor,
    Module,
    Variable,
    Constant,
    Property,
    Field,
    TypeParameter,
    Other,
}

impl SymbolKind {
    /// Kinds that form a file's exported top-level surface.
    pub fn is_exported(&self) -> bool {
        matches!(
            self,
            SymbolKind::Class
                | SymbolKind::Struct
                | SymbolKind::Function
                | SymbolKind::Interface
                | SymbolKind::Trait
                | SymbolKind::Enum
                | SymbolKind::Module
                | SymbolKind::Variable
                | SymbolKind::Constant
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Interface => "interface",
            SymbolKind::Trait => "trait",
            SymbolKind::Enum => "enum",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Module => "module",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Property => "property",
            SymbolKind::Field => "field",
            SymbolKind::TypeParameter => "type parameter",
            SymbolKind::Other => "symbol",
        }
    }
}

/// A symbol reported by an external provider. Children form a tree owned
/// by their parent entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub name: String,
    pub kind: SymbolKind,
    pub range: SourceRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SymbolEntry>,
}

impl SymbolEntry {
    pub fn new(name: impl Into<String>, kind: SymbolKind, range: SourceRange) -> Self {
        Self {
            name: name.into(),
            kind,
            range,
            detail: None,
            children: Vec::new(),
        }
    }

    /// Total number of entries in this subtree, including self.
    pub fn count_recursive(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(SymbolEntry::count_recursive)
            .sum::<usize>()
    }
}

/// Serialize a symbol tree to a depth-bounded JSON rendering, the shape the
/// active-symbol children hierarchy is delivered in.
pub fn serialize_symbol_hierarchy(symbols: &[SymbolEntry], max_depth: usize) -> String {
    fn prune(entry: &SymbolEntry, depth: usize) -> SymbolEntry {
        let mut pruned = entry.clone();
        if depth == 0 {
            pruned.children = Vec::new();
        } else {
            pruned.children = entry.children.iter().map(|c| prune(c, depth - 1)).collect();
        }
        pruned
    }

    let bounded: Vec<SymbolEntry> = symbols.iter().map(|s| prune(s, max_depth)).collect();
    serde_json::to_string_pretty(&bounded).unwrap_or_else(|_| "[]".to_string())
}

/// A definition/implementation/type-definition site of the active symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolLocation {
    pub file: String,
    pub range: SourceRange,
}

/// One edge of the active symbol's call hierarchy: the peer symbol, the
/// file it lives in, and the specific call-site range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdge {
    pub symbol: String,
    pub file: String,
    pub call_site: SourceRange,
}

/// A type definition referenced by the active symbol, content pre-truncated
/// by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencedType {
    pub file: String,
    pub content: String,
}

/// Everything known about the symbol enclosing the user's cursor.
///
/// Resolved once per assembly run by an external provider; this crate never
/// calls a symbol provider itself and never mutates the struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSymbolContext {
    pub name: String,
    pub kind: SymbolKind,
    pub range: SourceRange,
    /// Relative path of the file that owns the symbol.
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default)]
    pub definitions: Vec<SymbolLocation>,
    #[serde(default)]
    pub implementations: Vec<SymbolLocation>,
    #[serde(default)]
    pub type_definitions: Vec<SymbolLocation>,
    #[serde(default)]
    pub incoming_calls: Vec<CallEdge>,
    #[serde(default)]
    pub outgoing_calls: Vec<CallEdge>,
    /// Pre-serialized, depth-bounded children tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_hierarchy: Option<String>,
    #[serde(default)]
    pub referenced_types: Vec<ReferencedType>,
}

impl ActiveSymbolContext {
    /// Union of every file path related to the symbol: definition sites,
    /// implementations, type definitions, referenced types, and both call
    /// directions.
    pub fn related_files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = self
            .definitions
            .iter()
            .chain(&self.implementations)
            .chain(&self.type_definitions)
            .map(|loc| loc.file.as_str())
            .chain(self.referenced_types.iter().map(|t| t.file.as_str()))
            .chain(self.incoming_calls.iter().map(|e| e.file.as_str()))
            .chain(self.outgoing_calls.iter().map(|e| e.file.as_str()))
            .collect();
        files.sort_unstable();
        files.dedup();
        files
    }
}

/// Cursor position inside the active editor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: usize,
    pub column: usize,
}

/// The active editor state handed in by the host: which file is open,
/// where the cursor is, and what the user asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorContext {
    pub file: FileHandle,
    pub cursor: CursorPosition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

/// Kind of a recorded project change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }
}

/// A recent change record supplied by the host (git layer, file watcher).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentChange {
    pub path: String,
    pub kind: ChangeKind,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Diagnostic severity, displayed but never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
    Hint,
}

impl DiagnosticSeverity {
    pub fn display_name(&self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
            DiagnosticSeverity::Hint => "hint",
        }
    }
}

/// One diagnostic attached to a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub range: SourceRange,
}

/// A candidate file with its accumulated relevance score.
#[derive(Debug, Clone)]
pub struct ScoredFile {
    pub handle: FileHandle,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn relative_path_is_forward_slash_normalized() {
        let root = Path::new("/work/project");
        let handle = FileHandle::new(PathBuf::from("/work/project/src/lib.rs"), root);
        assert_eq!(handle.relative_path(), "src/lib.rs");
        assert_eq!(handle.relative_dir(), "src");
    }

    #[test]
    fn root_level_file_has_empty_dir() {
        let root = Path::new("/work/project");
        let handle = FileHandle::new(PathBuf::from("/work/project/Cargo.toml"), root);
        assert_eq!(handle.relative_dir(), "");
    }

    #[test]
    fn line_span_is_inclusive() {
        assert_eq!(SourceRange::lines(3, 7).line_span(), 5);
        assert_eq!(SourceRange::lines(4, 4).line_span(), 1);
    }

    #[test]
    fn related_files_are_deduplicated() {
        let ctx = ActiveSymbolContext {
            name: "handler".to_string(),
            kind: SymbolKind::Function,
            range: SourceRange::lines(10, 20),
            file: "src/server.ts".to_string(),
            detail: None,
            definitions: vec![SymbolLocation {
                file: "src/server.ts".to_string(),
                range: SourceRange::lines(10, 10),
            }],
            implementations: vec![],
            type_definitions: vec![],
            incoming_calls: vec![CallEdge {
                symbol: "dispatch".to_string(),
                file: "src/router.ts".to_string(),
                call_site: SourceRange::lines(42, 42),
            }],
            outgoing_calls: vec![CallEdge {
                symbol: "log".to_string(),
                file: "src/router.ts".to_string(),
                call_site: SourceRange::lines(15, 15),
            }],
            children_hierarchy: None,
            referenced_types: vec![],
        };

        assert_eq!(ctx.related_files(), vec!["src/router.ts", "src/server.ts"]);
    }

    #[test]
    fn hierarchy_serialization_bounds_depth() {
        let mut root = SymbolEntry::new("Outer", SymbolKind::Class, SourceRange::lines(0, 50));
        let mut mid = SymbolEntry::new("inner", SymbolKind::Method, SourceRange::lines(5, 10));
        mid.children.push(SymbolEntry::new(
            "deep",
            SymbolKind::Variable,
            SourceRange::lines(6, 6),
        ));
        root.children.push(mid);

        let rendered = serialize_symbol_hierarchy(&[root], 1);
        assert!(rendered.contains("inner"));
        assert!(!rendered.contains("deep"));
    }
}
