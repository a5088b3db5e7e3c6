pub mod decrypt;
mod loader;
mod types;

pub use decrypt::{decryptor_for, Decryptor, Passthrough, XorDecryptor};
pub use loader::{load_language_model, load_model, MODEL_BIN, MODEL_XML};
pub use types::{LoadError, ModelBuffers, WeightTensor};
