// Gateway module for models - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod types;

// Public re-exports - the ONLY way to access the shared data model
pub use types::{
    serialize_symbol_hierarchy, ActiveSymbolContext, CallEdge, ChangeKind, CursorPosition,
    DiagnosticSeverity, EditorContext, FileDiagnostic, FileHandle, RecentChange, ReferencedType,
    ScoredFile, SourceRange, SymbolEntry, SymbolKind, SymbolLocation,
};
