//! Loads an obfuscated language model and its tokenizer into memory and runs
//! text generation on them without ever handing file paths to the engine.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod ir;
pub mod loader;
pub mod tokenizer;

pub use app::{guard_panics, install_panic_hook, run};
pub use error::AppError;
