// Gateway module for utils - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod cancel;
mod errors;
mod logger;
mod tokenizer;

// Public re-exports - the ONLY way to access utils functionality
pub use cancel::CancelToken;
pub use errors::ContextureError;
pub use logger::init_logger;
pub use tokenizer::estimate_tokens;
