use futures::FutureExt;
use std::collections::HashMap;
use std::fs;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use super::graph::{invert_graph, DependencyGraph, DependencyGraphBuilder};
use super::imports::ImportParser;
use super::scorer::{RelevanceScorer, ScoringInputs};
use super::summarizer::{clamp_str, ContentSummarizer, SummarizerConfig};
use super::tree::FileTree;
use crate::app::{AppConfig, BudgetConfig};
use crate::cache::AssemblyCache;
use crate::constants::{
    CANCELLED_PLACEHOLDER, DIFF_MAX_LEN, FAILURE_PLACEHOLDER, MIN_MEANINGFUL_LEN,
    NO_INPUT_PLACEHOLDER, TRUNCATION_MARKER,
};
use crate::models::{
    ActiveSymbolContext, EditorContext, FileDiagnostic, FileHandle, RecentChange, ScoredFile,
    SymbolEntry,
};
use crate::utils::{estimate_tokens, CancelToken};

/// The single running character budget for the whole document.
///
/// Created at assembly start from the configured maximum and decremented
/// monotonically; it is never exceeded, truncation-marker overhead
/// included.
#[derive(Debug)]
pub struct SectionBudget {
    remaining: usize,
}

impl SectionBudget {
    pub fn new(max: usize) -> Self {
        Self { remaining: max }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Per-stage truncation discipline: pass the stage's natural output
    /// through. Output that overflows the remaining space is cut to leave
    /// room for the truncation marker; if not even the marker fits, the
    /// stage contributes nothing.
    pub fn fit(&mut self, text: String) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        if text.len() <= self.remaining {
            self.remaining -= text.len();
            return Some(text);
        }
        if self.remaining > TRUNCATION_MARKER.len() {
            let mut cut = clamp_str(&text, self.remaining - TRUNCATION_MARKER.len()).to_string();
            cut.push_str(TRUNCATION_MARKER);
            self.remaining -= cut.len();
            return Some(cut);
        }
        None
    }

    /// All-or-nothing append used for bookkeeping lines that must not be
    /// themselves truncated.
    pub fn try_consume(&mut self, len: usize) -> bool {
        if len <= self.remaining {
            self.remaining -= len;
            true
        } else {
            false
        }
    }
}

/// Auxiliary inputs for one packing run.
pub struct PackInputs<'a> {
    pub ranked: &'a [ScoredFile],
    pub root: &'a Path,
    pub graph: Option<&'a DependencyGraph>,
    pub symbols: Option<&'a HashMap<String, Vec<SymbolEntry>>>,
    pub active_symbol: Option<&'a ActiveSymbolContext>,
    pub recent_changes: &'a [RecentChange],
    pub diagnostics: Option<&'a HashMap<String, Vec<FileDiagnostic>>>,
}

/// Observational counters for a finished assembly.
#[derive(Debug, Clone, Default)]
pub struct AssemblyStats {
    pub candidate_files: usize,
    pub included_files: usize,
    pub skipped_files: usize,
    pub used_chars: usize,
    pub max_chars: usize,
    pub estimated_tokens: usize,
}

/// The assembled context document plus the relative paths its file-bodies
/// section actually covers.
#[derive(Debug, Clone)]
pub struct ContextDocument {
    pub content: String,
    pub included_files: Vec<String>,
    pub stats: AssemblyStats,
}

/// Assembles the context document section by section under one shared
/// budget:
/// FileStructure → RecentChanges → ExistingPaths → ModifiedPaths →
/// SymbolIndex → ActiveSymbolDetail → FileBodies.
///
/// The moment the budget is exhausted the packer halts and returns what it
/// has; later stages are skipped outright.
pub struct ContextPacker {
    budget_cfg: BudgetConfig,
    summarizer: ContentSummarizer,
}

impl ContextPacker {
    pub fn new(budget: BudgetConfig, summarizer: SummarizerConfig) -> Self {
        Self {
            budget_cfg: budget,
            summarizer: ContentSummarizer::with_config(summarizer),
        }
    }

    pub fn pack(&self, inputs: &PackInputs, cancel: &CancelToken) -> ContextDocument {
        let mut budget = SectionBudget::new(self.budget_cfg.max_total_len);
        let mut content = String::new();
        let mut included = Vec::new();
        let mut skipped = 0usize;

        let stages: [fn(&Self, &PackInputs, &mut SectionBudget) -> String; 6] = [
            Self::stage_file_structure,
            Self::stage_recent_changes,
            Self::stage_existing_paths,
            Self::stage_modified_paths,
            Self::stage_symbol_index,
            Self::stage_active_symbol,
        ];

        for stage in stages {
            if cancel.is_cancelled() || budget.is_exhausted() {
                skipped = inputs.ranked.len();
                return self.finish(inputs, cancel, content, included, skipped);
            }
            let natural = stage(self, inputs, &mut budget);
            if let Some(fitted) = budget.fit(natural) {
                content.push_str(&fitted);
            }
        }

        if !cancel.is_cancelled() && !budget.is_exhausted() {
            self.stage_file_bodies(
                inputs,
                cancel,
                &mut budget,
                &mut content,
                &mut included,
                &mut skipped,
            );
        } else {
            skipped = inputs.ranked.len();
        }

        self.finish(inputs, cancel, content, included, skipped)
    }

    fn finish(
        &self,
        inputs: &PackInputs,
        cancel: &CancelToken,
        mut content: String,
        included: Vec<String>,
        skipped: usize,
    ) -> ContextDocument {
        if content.is_empty() && cancel.is_cancelled() {
            content =
                clamp_str(CANCELLED_PLACEHOLDER, self.budget_cfg.max_total_len).to_string();
        }

        let stats = AssemblyStats {
            candidate_files: inputs.ranked.len(),
            included_files: included.len(),
            skipped_files: skipped,
            used_chars: content.len(),
            max_chars: self.budget_cfg.max_total_len,
            estimated_tokens: estimate_tokens(&content),
        };

        ContextDocument {
            content,
            included_files: included,
            stats,
        }
    }

    fn stage_file_structure(&self, inputs: &PackInputs, _budget: &mut SectionBudget) -> String {
        let tree = FileTree::from_paths(
            inputs
                .ranked
                .iter()
                .map(|s| s.handle.relative_path()),
        );
        if tree.is_empty() {
            return String::new();
        }
        format!("=== PROJECT STRUCTURE ===\n{}\n", tree.render())
    }

    fn stage_recent_changes(&self, inputs: &PackInputs, _budget: &mut SectionBudget) -> String {
        if inputs.recent_changes.is_empty() {
            return String::new();
        }

        let mut changes: Vec<&RecentChange> = inputs.recent_changes.iter().collect();
        changes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut section = String::from("=== RECENT CHANGES ===\n");
        for change in changes {
            section.push_str(&format!(
                "[{}] {}: {} ({})\n",
                change.kind.display_name(),
                change.path,
                change.summary,
                change.timestamp.format("%Y-%m-%d %H:%M UTC"),
            ));
            if let Some(diff) = &change.diff {
                section.push_str(clamp_str(diff, DIFF_MAX_LEN));
                if !diff.ends_with('\n') || diff.len() > DIFF_MAX_LEN {
                    section.push('\n');
                }
            }
        }
        section.push('\n');
        section
    }

    fn stage_existing_paths(&self, inputs: &PackInputs, _budget: &mut SectionBudget) -> String {
        if inputs.ranked.is_empty() {
            return String::new();
        }
        let paths: Vec<&str> = inputs
            .ranked
            .iter()
            .map(|s| s.handle.relative_path())
            .collect();
        render_path_listing("=== FILES ===", &paths, self.budget_cfg.max_displayed_paths)
    }

    fn stage_modified_paths(&self, inputs: &PackInputs, _budget: &mut SectionBudget) -> String {
        if inputs.recent_changes.is_empty() {
            return String::new();
        }

        let mut changes: Vec<&RecentChange> = inputs.recent_changes.iter().collect();
        changes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut seen = Vec::new();
        for change in changes {
            if !seen.iter().any(|p| *p == change.path.as_str()) {
                seen.push(change.path.as_str());
            }
        }
        render_path_listing(
            "=== RECENTLY MODIFIED PATHS ===",
            &seen,
            self.budget_cfg.max_displayed_paths,
        )
    }

    fn stage_symbol_index(&self, inputs: &PackInputs, budget: &mut SectionBudget) -> String {
        let Some(symbols) = inputs.symbols else {
            return String::new();
        };

        let mut section = String::new();
        for scored in inputs.ranked {
            let rel = scored.handle.relative_path();
            let Some(entries) = symbols.get(rel) else {
                continue;
            };
            if entries.is_empty() {
                continue;
            }

            section.push_str(rel);
            section.push_str(":\n");
            for entry in entries.iter().take(self.budget_cfg.max_symbols_per_file) {
                section.push_str(&format!(
                    "  {} {} (line {})\n",
                    entry.kind.display_name(),
                    entry.name,
                    entry.range.start_line + 1,
                ));
            }
            if entries.len() > self.budget_cfg.max_symbols_per_file {
                section.push_str(&format!(
                    "  ...and {} more\n",
                    entries.len() - self.budget_cfg.max_symbols_per_file
                ));
            }
        }
        if section.is_empty() {
            return String::new();
        }

        let section = format!("=== SYMBOL INDEX ===\n{section}\n");
        // The section carries its own ceiling on top of the shared budget.
        clip_with_marker(
            section,
            self.budget_cfg.max_symbol_section_len.min(budget.remaining()),
        )
    }

    fn stage_active_symbol(&self, inputs: &PackInputs, budget: &mut SectionBudget) -> String {
        let Some(ctx) = inputs.active_symbol else {
            return String::new();
        };

        let mut section = String::from("=== ACTIVE SYMBOL ===\n");
        section.push_str(&format!(
            "{} {} ({}, lines {}-{})\n",
            ctx.kind.display_name(),
            ctx.name,
            ctx.file,
            ctx.range.start_line + 1,
            ctx.range.end_line + 1,
        ));
        if let Some(detail) = &ctx.detail {
            section.push_str(&format!("detail: {detail}\n"));
        }

        render_locations(&mut section, "defined at", &ctx.definitions);
        render_locations(&mut section, "implemented at", &ctx.implementations);
        render_locations(&mut section, "type defined at", &ctx.type_definitions);

        if !ctx.incoming_calls.is_empty() {
            section.push_str("incoming calls:\n");
            for edge in &ctx.incoming_calls {
                section.push_str(&format!(
                    "  {} ({}:{})\n",
                    edge.symbol,
                    edge.file,
                    edge.call_site.start_line + 1
                ));
            }
        }
        if !ctx.outgoing_calls.is_empty() {
            section.push_str("outgoing calls:\n");
            for edge in &ctx.outgoing_calls {
                section.push_str(&format!(
                    "  {} ({}:{})\n",
                    edge.symbol,
                    edge.file,
                    edge.call_site.start_line + 1
                ));
            }
        }
        if let Some(children) = &ctx.children_hierarchy {
            section.push_str("children:\n");
            section.push_str(children);
            section.push('\n');
        }
        if !ctx.referenced_types.is_empty() {
            section.push_str("referenced types:\n");
            for referenced in &ctx.referenced_types {
                section.push_str(&format!("--- {} ---\n", referenced.file));
                section.push_str(&referenced.content);
                section.push('\n');
            }
        }
        section.push('\n');

        clip_with_marker(
            section,
            self.budget_cfg.max_active_symbol_len.min(budget.remaining()),
        )
    }

    fn stage_file_bodies(
        &self,
        inputs: &PackInputs,
        cancel: &CancelToken,
        budget: &mut SectionBudget,
        content: &mut String,
        included: &mut Vec<String>,
        skipped: &mut usize,
    ) {
        if inputs.ranked.is_empty() {
            return;
        }

        if let Some(header) = budget.fit("=== FILE CONTENTS ===\n".to_string()) {
            content.push_str(&header);
        } else {
            *skipped = inputs.ranked.len();
            return;
        }

        for (idx, scored) in inputs.ranked.iter().enumerate() {
            if cancel.is_cancelled() || budget.remaining() < MIN_MEANINGFUL_LEN {
                *skipped = inputs.ranked.len() - idx;
                break;
            }

            let rel = scored.handle.relative_path();
            let mut block = format!("--- File: {rel} ---\n");

            if let Some(diags) = inputs.diagnostics.and_then(|m| m.get(rel)) {
                for diag in diags {
                    block.push_str(&format!(
                        "[{} @ line {}] {}\n",
                        diag.severity.display_name(),
                        diag.range.start_line + 1,
                        diag.message,
                    ));
                }
            }

            // A file missing from the graph is unknown, not import-free;
            // only a present entry renders an annotation.
            if let Some(imports) = inputs.graph.and_then(|g| g.get(rel)) {
                block.push_str(&render_imports_line(
                    imports,
                    self.budget_cfg.max_displayed_imports,
                ));
            }

            let overhead = block.len() + 2; // trailing blank line
            if budget.remaining() <= overhead + MIN_MEANINGFUL_LEN {
                *skipped = inputs.ranked.len() - idx;
                break;
            }
            let per_file_budget = (budget.remaining() - overhead).min(self.budget_cfg.max_file_len);

            let body = match fs::read_to_string(scored.handle.absolute_path()) {
                Ok(text) => {
                    let symbols = inputs.symbols.and_then(|m| m.get(rel)).map(Vec::as_slice);
                    self.summarizer.summarize(
                        rel,
                        &text,
                        symbols,
                        inputs.active_symbol,
                        per_file_budget,
                    )
                }
                Err(err) => format!("[Error reading file: {err}]"),
            };

            block.push_str(&body);
            block.push_str("\n\n");

            match budget.fit(block) {
                Some(fitted) => {
                    content.push_str(&fitted);
                    included.push(rel.to_string());
                }
                None => {
                    *skipped = inputs.ranked.len() - idx;
                    break;
                }
            }
        }

        if *skipped > 0 {
            let note = format!("[... {skipped} more files omitted ...]\n");
            if budget.try_consume(note.len()) {
                content.push_str(&note);
            }
        }
    }
}

/// Top-level inputs to a full assembly run. Everything beyond the candidate
/// files and the root is optional collaborator data.
#[derive(Debug, Clone, Default)]
pub struct AssemblyInputs {
    pub files: Vec<FileHandle>,
    pub root: PathBuf,
    pub editor: Option<EditorContext>,
    pub active_symbol: Option<ActiveSymbolContext>,
    pub symbols: HashMap<String, Vec<SymbolEntry>>,
    pub recent_changes: Vec<RecentChange>,
    pub diagnostics: HashMap<String, Vec<FileDiagnostic>>,
}

/// Run the whole pipeline: dependency graph → relevance ranking → packing.
///
/// Never panics outward: invalid input short-circuits to a placeholder
/// document, and any unexpected collaborator failure degrades to a
/// placeholder with a logged warning.
pub async fn assemble_project_context(
    inputs: &AssemblyInputs,
    config: &AppConfig,
    parser: &dyn ImportParser,
    cache: Option<&AssemblyCache>,
    cancel: &CancelToken,
) -> ContextDocument {
    if inputs.files.is_empty() || inputs.root.as_os_str().is_empty() {
        return placeholder_document(NO_INPUT_PLACEHOLDER, config);
    }

    let pipeline = async {
        let mut builder = DependencyGraphBuilder::new(parser);
        if let Some(cache) = cache {
            builder = builder.with_cache(cache);
        }
        let graph = builder.build(&inputs.files, &inputs.root, cancel).await;
        let reverse = invert_graph(&graph);

        let symbol_counts: HashMap<String, usize> = inputs
            .symbols
            .iter()
            .map(|(path, entries)| {
                let count = entries.iter().map(SymbolEntry::count_recursive).sum();
                (path.clone(), count)
            })
            .collect();

        let scorer = RelevanceScorer::new(config.weights.clone(), &config.budget);
        let ranked = scorer.rank(&ScoringInputs {
            files: &inputs.files,
            editor: inputs.editor.as_ref(),
            graph: Some(&graph),
            reverse_graph: Some(&reverse),
            active_symbol: inputs.active_symbol.as_ref(),
            symbol_counts: Some(&symbol_counts),
        });

        let packer = ContextPacker::new(config.budget.clone(), config.summarizer.clone());
        packer.pack(
            &PackInputs {
                ranked: &ranked,
                root: &inputs.root,
                graph: Some(&graph),
                symbols: Some(&inputs.symbols),
                active_symbol: inputs.active_symbol.as_ref(),
                recent_changes: &inputs.recent_changes,
                diagnostics: Some(&inputs.diagnostics),
            },
            cancel,
        )
    };

    match AssertUnwindSafe(pipeline).catch_unwind().await {
        Ok(document) => document,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .copied()
                .map(str::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!("Context assembly failed unexpectedly: {message}");
            placeholder_document(FAILURE_PLACEHOLDER, config)
        }
    }
}

fn placeholder_document(placeholder: &str, config: &AppConfig) -> ContextDocument {
    let content = clamp_str(placeholder, config.budget.max_total_len).to_string();
    let stats = AssemblyStats {
        used_chars: content.len(),
        max_chars: config.budget.max_total_len,
        estimated_tokens: estimate_tokens(&content),
        ..AssemblyStats::default()
    };
    ContextDocument {
        content,
        included_files: Vec::new(),
        stats,
    }
}

fn render_path_listing(header: &str, paths: &[&str], max_displayed: usize) -> String {
    let mut section = format!("{header}\n");
    for path in paths.iter().take(max_displayed) {
        section.push_str(path);
        section.push('\n');
    }
    if paths.len() > max_displayed {
        section.push_str(&format!("...and {} more\n", paths.len() - max_displayed));
    }
    section.push('\n');
    section
}

fn render_imports_line(imports: &[String], max_displayed: usize) -> String {
    if imports.is_empty() {
        return "imports: (none)\n".to_string();
    }
    let shown: Vec<&str> = imports
        .iter()
        .take(max_displayed)
        .map(String::as_str)
        .collect();
    if imports.len() > max_displayed {
        format!(
            "imports: {} ...and {} more\n",
            shown.join(", "),
            imports.len() - max_displayed
        )
    } else {
        format!("imports: {}\n", shown.join(", "))
    }
}

fn render_locations(
    section: &mut String,
    label: &str,
    locations: &[crate::models::SymbolLocation],
) {
    for location in locations {
        section.push_str(&format!(
            "{label}: {}:{}\n",
            location.file,
            location.range.start_line + 1
        ));
    }
}

/// Clip a section to its own ceiling, marker included.
fn clip_with_marker(section: String, max: usize) -> String {
    if section.len() <= max {
        return section;
    }
    if max <= TRUNCATION_MARKER.len() {
        return String::new();
    }
    let mut clipped = clamp_str(&section, max - TRUNCATION_MARKER.len()).to_string();
    clipped.push_str(TRUNCATION_MARKER);
    clipped
}
