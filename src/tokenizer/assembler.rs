use std::path::Path;

use tracing::debug;

use crate::loader::{load_model, Decryptor, LoadError, ModelBuffers};

pub const TOKENIZER_XML: &str = "openvino_tokenizer.xml";
pub const TOKENIZER_BIN: &str = "openvino_tokenizer.bin";
pub const DETOKENIZER_XML: &str = "openvino_detokenizer.xml";
pub const DETOKENIZER_BIN: &str = "openvino_detokenizer.bin";

/// In-memory encoder and decoder models, ready to build a [`super::Tokenizer`] from.
#[derive(Debug, Clone)]
pub struct TokenizerArtifacts {
    /// Text to token ids
    pub encoder: ModelBuffers,
    /// Token ids to text
    pub decoder: ModelBuffers,
}

/// Loads both tokenizer halves from their fixed file names under `models_dir`.
///
/// The decoder half comes from the detokenizer files. Loading the encoder
/// files twice would silently hand the encoder graph to the decode path.
pub fn load_tokenizer_artifacts(
    models_dir: &Path,
    decryptor: &dyn Decryptor,
) -> Result<TokenizerArtifacts, LoadError> {
    let encoder = load_model(
        models_dir.join(TOKENIZER_XML),
        models_dir.join(TOKENIZER_BIN),
        decryptor,
    )?;
    let decoder = load_model(
        models_dir.join(DETOKENIZER_XML),
        models_dir.join(DETOKENIZER_BIN),
        decryptor,
    )?;

    debug!(
        "Tokenizer artifacts: encoder {} + {} bytes, decoder {} + {} bytes",
        encoder.graph.len(),
        encoder.weights.byte_size(),
        decoder.graph.len(),
        decoder.weights.byte_size()
    );

    Ok(TokenizerArtifacts { encoder, decoder })
}
