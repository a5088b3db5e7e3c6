//! The linear load → build → generate sequence behind the command line.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{error, info};

use crate::config::Settings;
use crate::engine::{GenerationConfig, LlmPipeline};
use crate::error::{AppError, UNKNOWN_FAILURE};
use crate::loader::{decryptor_for, load_language_model};
use crate::tokenizer::{load_tokenizer_artifacts, Tokenizer};

/// Loads the model and tokenizer from `models_dir`, builds a pipeline and
/// generates a continuation of `prompt`.
///
/// # Errors
/// Every failure is an `AppError::Resource`: a file that cannot be opened or
/// read, an artifact the engine rejects, or a failed generation.
pub fn run(models_dir: &Path, prompt: &str, settings: &Settings) -> Result<String, AppError> {
    info!("Models directory: {}", models_dir.display());

    let decryptor = decryptor_for(settings.decryption.xor_key.as_deref())?;

    let model = load_language_model(models_dir, decryptor.as_ref())?;
    let artifacts = load_tokenizer_artifacts(models_dir, decryptor.as_ref())?;
    let tokenizer = Tokenizer::from_artifacts(&artifacts)?;

    let pipe = LlmPipeline::new(model, tokenizer, &settings.device.target)?;
    let config = GenerationConfig::with_max_new_tokens(settings.generation.max_new_tokens);

    Ok(pipe.generate(prompt, &config)?)
}

/// Runs `f`, turning a panic into a resource error carrying [`UNKNOWN_FAILURE`].
pub fn guard_panics<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(_) => {
            error!("Generation aborted without an error value");
            Err(AppError::Resource(UNKNOWN_FAILURE.to_string()))
        }
    }
}

/// Routes panic reports through tracing so stderr only carries the boundary message.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| error!("Panic: {}", info)));
}
