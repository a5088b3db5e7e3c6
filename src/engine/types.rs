use std::error::Error;
use std::fmt;

/// Default cap on generated tokens per call
pub const DEFAULT_MAX_NEW_TOKENS: usize = 100;

/// Options for a single generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Upper bound on tokens produced beyond the prompt
    pub max_new_tokens: usize,
}

impl GenerationConfig {
    pub fn with_max_new_tokens(max_new_tokens: usize) -> Self {
        Self { max_new_tokens }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { max_new_tokens: DEFAULT_MAX_NEW_TOKENS }
    }
}

/// Everything a generation call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    /// Decoded text of the new tokens only
    pub text: String,
    /// New token ids, in order
    pub tokens: Vec<u32>,
    /// Number of ids the prompt encoded to
    pub prompt_tokens: usize,
    /// Whether generation ended on the end-of-sequence token
    pub stopped_at_eos: bool,
}

/// Errors raised while building or running a pipeline
#[derive(Debug)]
pub enum EngineError {
    /// Known compute target this build cannot run on
    UnsupportedDevice(String),
    /// Target name not recognized at all
    UnknownDevice(String),
    /// The model graph or weights do not describe a runnable model
    InvalidModel(String),
    /// Encoding or decoding failed
    Tokenizer(String),
    /// The prompt encoded to no tokens
    EmptyPrompt,
    /// Failure inside the compute backend
    Backend(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::UnsupportedDevice(d) => {
                write!(f, "Device {} is not available in this build", d)
            }
            EngineError::UnknownDevice(d) => write!(f, "Unknown device: {}", d),
            EngineError::InvalidModel(msg) => write!(f, "Invalid model: {}", msg),
            EngineError::Tokenizer(msg) => write!(f, "Tokenizer error: {}", msg),
            EngineError::EmptyPrompt => write!(f, "Prompt is empty"),
            EngineError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl Error for EngineError {}
