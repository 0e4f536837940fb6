// Gateway module for context - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod graph;
mod imports;
mod loader;
mod packer;
mod scorer;
mod summarizer;
mod tree;

// Public re-exports - the ONLY way to access context functionality
pub use graph::{invert_graph, DependencyGraph, DependencyGraphBuilder, ReverseDependencyGraph};
pub use imports::{ImportParser, LexicalImportParser};
pub use loader::{LoaderConfig, ProjectScanner};
pub use packer::{
    assemble_project_context, AssemblyInputs, AssemblyStats, ContextDocument, ContextPacker,
    PackInputs, SectionBudget,
};
pub use scorer::{RelevanceScorer, ScoreWeights, ScoringInputs};
pub use summarizer::{
    CandidatePriority, ContentCandidate, ContentSummarizer, SummarizerConfig,
};
pub use tree::{FileTree, TreeNode};
