use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::graph::{DependencyGraph, ReverseDependencyGraph};
use crate::app::BudgetConfig;
use crate::constants;
use crate::models::{ActiveSymbolContext, EditorContext, FileHandle, ScoredFile};

/// Weights for the relevance scoring signals.
///
/// All signals are additive; the exact values are empirical defaults and
/// carry no meaning beyond "higher is preferred more".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub active_file: f64,
    pub definition: f64,
    pub implementation: f64,
    pub type_definition: f64,
    pub referenced_type: f64,
    pub call_hierarchy: f64,
    pub symbol_relation: f64,
    pub forward_dependency: f64,
    pub reverse_dependency: f64,
    pub same_directory: f64,
    pub sibling_directory: f64,
    pub ancestor_per_level: f64,
    pub ancestor_cap: f64,
    pub symbol_rich_file: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            active_file: constants::WEIGHT_ACTIVE_FILE,
            definition: constants::WEIGHT_DEFINITION,
            implementation: constants::WEIGHT_IMPLEMENTATION,
            type_definition: constants::WEIGHT_TYPE_DEFINITION,
            referenced_type: constants::WEIGHT_REFERENCED_TYPE,
            call_hierarchy: constants::WEIGHT_CALL_HIERARCHY,
            symbol_relation: constants::WEIGHT_SYMBOL_RELATION,
            forward_dependency: constants::WEIGHT_FORWARD_DEPENDENCY,
            reverse_dependency: constants::WEIGHT_REVERSE_DEPENDENCY,
            same_directory: constants::WEIGHT_SAME_DIRECTORY,
            sibling_directory: constants::WEIGHT_SIBLING_DIRECTORY,
            ancestor_per_level: constants::WEIGHT_ANCESTOR_PER_LEVEL,
            ancestor_cap: constants::WEIGHT_ANCESTOR_CAP,
            symbol_rich_file: constants::WEIGHT_SYMBOL_RICH_FILE,
        }
    }
}

/// Everything the scorer may draw signals from. All structural inputs are
/// optional; absent inputs simply contribute no score.
#[derive(Default)]
pub struct ScoringInputs<'a> {
    pub files: &'a [FileHandle],
    pub editor: Option<&'a EditorContext>,
    pub graph: Option<&'a DependencyGraph>,
    pub reverse_graph: Option<&'a ReverseDependencyGraph>,
    pub active_symbol: Option<&'a ActiveSymbolContext>,
    pub symbol_counts: Option<&'a HashMap<String, usize>>,
}

/// Multi-signal file relevance ranking.
pub struct RelevanceScorer {
    weights: ScoreWeights,
    max_files: usize,
    max_symbols_per_file: usize,
}

/// Per-category path sets derived once from the active symbol.
struct SymbolPathSets<'a> {
    definitions: HashSet<&'a str>,
    implementations: HashSet<&'a str>,
    type_definitions: HashSet<&'a str>,
    referenced_types: HashSet<&'a str>,
    incoming: HashSet<&'a str>,
    outgoing: HashSet<&'a str>,
    all_related: HashSet<&'a str>,
}

impl<'a> SymbolPathSets<'a> {
    fn from_context(ctx: &'a ActiveSymbolContext) -> Self {
        let definitions: HashSet<&str> =
            ctx.definitions.iter().map(|l| l.file.as_str()).collect();
        let implementations: HashSet<&str> =
            ctx.implementations.iter().map(|l| l.file.as_str()).collect();
        let type_definitions: HashSet<&str> =
            ctx.type_definitions.iter().map(|l| l.file.as_str()).collect();
        let referenced_types: HashSet<&str> =
            ctx.referenced_types.iter().map(|t| t.file.as_str()).collect();
        let incoming: HashSet<&str> =
            ctx.incoming_calls.iter().map(|e| e.file.as_str()).collect();
        let outgoing: HashSet<&str> =
            ctx.outgoing_calls.iter().map(|e| e.file.as_str()).collect();
        let all_related = ctx.related_files().into_iter().collect();

        Self {
            definitions,
            implementations,
            type_definitions,
            referenced_types,
            incoming,
            outgoing,
            all_related,
        }
    }
}

impl RelevanceScorer {
    pub fn new(weights: ScoreWeights, budget: &BudgetConfig) -> Self {
        Self {
            weights,
            max_files: budget.max_files,
            max_symbols_per_file: budget.max_symbols_per_file,
        }
    }

    /// Rank the candidate files by accumulated score, descending.
    ///
    /// Zero-score files are dropped entirely; the active file (if any) is
    /// forced to the front regardless of its numeric score; the result is
    /// truncated to the configured maximum count.
    pub fn rank(&self, inputs: &ScoringInputs) -> Vec<ScoredFile> {
        let active_rel = inputs.editor.map(|e| e.file.relative_path());
        let symbol_sets = inputs.active_symbol.map(SymbolPathSets::from_context);
        let active_deps: Option<&Vec<String>> = active_rel
            .and_then(|rel| inputs.graph.and_then(|g| g.get(rel)));
        let active_importers: Option<&Vec<String>> = active_rel
            .and_then(|rel| inputs.reverse_graph.and_then(|g| g.get(rel)));

        let mut scored: Vec<ScoredFile> = inputs
            .files
            .iter()
            .filter_map(|file| {
                let rel = file.relative_path();
                let is_active = active_rel == Some(rel);
                let score = self.score_file(
                    file,
                    is_active,
                    active_rel,
                    symbol_sets.as_ref(),
                    active_deps,
                    active_importers,
                    inputs.symbol_counts,
                );

                // Zero total relevance is noise, not a low rank. The active
                // file survives regardless so it can be forced to the front.
                if score > 0.0 || is_active {
                    Some(ScoredFile {
                        handle: file.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.handle.relative_path().cmp(b.handle.relative_path()))
        });

        if let Some(active) = active_rel {
            if let Some(pos) = scored
                .iter()
                .position(|s| s.handle.relative_path() == active)
            {
                let entry = scored.remove(pos);
                scored.insert(0, entry);
            }
        }

        scored.truncate(self.max_files);
        tracing::debug!("ranked {} candidate files", scored.len());
        scored
    }

    #[allow(clippy::too_many_arguments)]
    fn score_file(
        &self,
        file: &FileHandle,
        is_active: bool,
        active_rel: Option<&str>,
        symbol_sets: Option<&SymbolPathSets>,
        active_deps: Option<&Vec<String>>,
        active_importers: Option<&Vec<String>>,
        symbol_counts: Option<&HashMap<String, usize>>,
    ) -> f64 {
        let rel = file.relative_path();
        let mut score = 0.0;

        if is_active {
            score += self.weights.active_file;
        }

        if let Some(sets) = symbol_sets {
            if sets.definitions.contains(rel) {
                score += self.weights.definition;
            }
            if sets.implementations.contains(rel) {
                score += self.weights.implementation;
            }
            if sets.type_definitions.contains(rel) {
                score += self.weights.type_definition;
            }
            if sets.referenced_types.contains(rel) {
                score += self.weights.referenced_type;
            }
            // One shared weight per call direction; a file on both ends of
            // the hierarchy earns it twice, never twice per direction.
            if sets.incoming.contains(rel) {
                score += self.weights.call_hierarchy;
            }
            if sets.outgoing.contains(rel) {
                score += self.weights.call_hierarchy;
            }
            if sets.all_related.contains(rel) {
                score += self.weights.symbol_relation;
            }
        }

        if let Some(deps) = active_deps {
            if deps.iter().any(|d| d == rel) {
                score += self.weights.forward_dependency;
            }
        }
        if let Some(importers) = active_importers {
            if importers.iter().any(|i| i == rel) {
                score += self.weights.reverse_dependency;
            }
        }

        if let Some(active) = active_rel {
            if !is_active {
                score += self.locality_score(rel, active);
            }
        }

        if let Some(counts) = symbol_counts {
            if counts.get(rel).copied().unwrap_or(0) > self.max_symbols_per_file {
                score += self.weights.symbol_rich_file;
            }
        }

        score
    }

    /// Directory locality relative to the active file: same directory,
    /// sibling directory, or a shared ancestor scaled by prefix depth.
    fn locality_score(&self, rel: &str, active_rel: &str) -> f64 {
        let dir = parent_dir(rel);
        let active_dir = parent_dir(active_rel);

        if dir == active_dir {
            return self.weights.same_directory;
        }
        if parent_dir(dir) == parent_dir(active_dir) {
            return self.weights.sibling_directory;
        }

        let depth = common_prefix_depth(dir, active_dir);
        if depth == 0 {
            return 0.0;
        }
        (depth as f64 * self.weights.ancestor_per_level).min(self.weights.ancestor_cap)
    }
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Number of leading path components two directories share.
fn common_prefix_depth(a: &str, b: &str) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    a.split('/')
        .zip(b.split('/'))
        .take_while(|(x, y)| x == y)
        .count()
}
