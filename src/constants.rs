/// Constants module to avoid magic numbers in the codebase

// Concurrency
pub const MAX_CONCURRENT_PARSES: usize = 8;

// Document Budgets (characters)
pub const DEFAULT_MAX_TOTAL_LEN: usize = 48_000;
pub const DEFAULT_MAX_FILE_LEN: usize = 6_000;
pub const DEFAULT_MAX_SYMBOLS_PER_FILE: usize = 30;
pub const DEFAULT_MAX_SYMBOL_SECTION_LEN: usize = 4_000;
pub const DEFAULT_MAX_ACTIVE_SYMBOL_LEN: usize = 3_000;
pub const DEFAULT_MAX_DISPLAYED_IMPORTS: usize = 8;
pub const DEFAULT_MAX_DISPLAYED_PATHS: usize = 40;
pub const DEFAULT_MAX_FILES: usize = 25;

// Summarizer Tuning
pub const PREAMBLE_SCAN_LINES: usize = 20;
pub const DEFAULT_PREAMBLE_FRACTION: f64 = 0.15;
pub const DEFAULT_IMPORT_FRACTION: f64 = 0.20;
pub const DEFAULT_OVERLAP_THRESHOLD_PCT: u32 = 70;
pub const DEFAULT_CALL_SITE_MAX_LEN: usize = 400;
pub const DEFAULT_FILLER_MAX_LEN: usize = 1_200;
pub const MIN_MEANINGFUL_LEN: usize = 24;
pub const STUB_PREVIEW_LEN: usize = 200;

// Recent Changes Display
pub const DIFF_MAX_LEN: usize = 600;

// Output Markers
pub const TRUNCATION_MARKER: &str = "\n[... truncated ...]";
pub const GAP_MARKER: &str = "\n[...]\n";
pub const NO_INPUT_PLACEHOLDER: &str =
    "[No project context available: no candidate files or workspace root was provided]";
pub const CANCELLED_PLACEHOLDER: &str =
    "[Context assembly was cancelled before any content could be gathered]";
pub const FAILURE_PLACEHOLDER: &str =
    "[Project context could not be assembled due to an internal error]";

// Default Relevance Weights
pub const WEIGHT_ACTIVE_FILE: f64 = 1000.0;
pub const WEIGHT_DEFINITION: f64 = 50.0;
pub const WEIGHT_IMPLEMENTATION: f64 = 40.0;
pub const WEIGHT_TYPE_DEFINITION: f64 = 35.0;
pub const WEIGHT_REFERENCED_TYPE: f64 = 30.0;
pub const WEIGHT_CALL_HIERARCHY: f64 = 25.0;
pub const WEIGHT_SYMBOL_RELATION: f64 = 10.0;
pub const WEIGHT_FORWARD_DEPENDENCY: f64 = 30.0;
pub const WEIGHT_REVERSE_DEPENDENCY: f64 = 20.0;
pub const WEIGHT_SAME_DIRECTORY: f64 = 15.0;
pub const WEIGHT_SIBLING_DIRECTORY: f64 = 8.0;
pub const WEIGHT_ANCESTOR_PER_LEVEL: f64 = 2.0;
pub const WEIGHT_ANCESTOR_CAP: f64 = 10.0;
pub const WEIGHT_SYMBOL_RICH_FILE: f64 = 5.0;

// File Loading
pub const DEFAULT_MAX_FILE_SIZE: usize = 1024 * 1024; // 1MB
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "mjs", "jsx", "ts", "tsx", "go", "java", "cpp", "cc", "cxx", "c", "h",
    "hpp", "cs", "rb", "php", "swift", "kt", "scala", "sql", "sh", "toml", "yaml", "yml", "json",
];
