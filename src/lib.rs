pub mod app;
pub mod cache;
pub mod constants;
pub mod context;
pub mod models;
pub mod utils;

pub use app::{load_config, AppConfig, BudgetConfig};
pub use cache::AssemblyCache;
pub use context::{
    assemble_project_context, AssemblyInputs, ContextDocument, ContextPacker, ImportParser,
    LexicalImportParser, ProjectScanner,
};
pub use models::{ActiveSymbolContext, EditorContext, FileHandle, SymbolEntry};
pub use utils::{init_logger, CancelToken, ContextureError};
