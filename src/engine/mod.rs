pub mod backend;
mod device;
mod pipeline;
mod types;

// Re-export the Backend trait and factory function
pub use backend::{create_backend, Backend, CpuBackend};
pub use device::Device;
pub use pipeline::{LlmPipeline, LOGITS_LAYER};
pub use types::{EngineError, GenerationConfig, GenerationResult, DEFAULT_MAX_NEW_TOKENS};
