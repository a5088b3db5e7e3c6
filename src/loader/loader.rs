use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::decrypt::Decryptor;
use super::types::{LoadError, ModelBuffers, WeightTensor};

/// Graph description of the language model
pub const MODEL_XML: &str = "openvino_model.xml";
/// Weights of the language model
pub const MODEL_BIN: &str = "openvino_model.bin";

/// Reads a graph description and its weights fully into memory.
///
/// Both files are opened before either is read, so a missing weights file
/// fails the same way as a missing graph file. The bytes of each file go
/// through `decryptor` before they are returned.
///
/// # Errors
/// `LoadError::CannotOpen` if either file cannot be opened, `LoadError::Io`
/// on a read failure, `LoadError::InvalidText` if the decrypted graph is not
/// UTF-8.
pub fn load_model<P: AsRef<Path>, Q: AsRef<Path>>(
    graph_path: P,
    weights_path: Q,
    decryptor: &dyn Decryptor,
) -> Result<ModelBuffers, LoadError> {
    let graph_path = graph_path.as_ref();
    let weights_path = weights_path.as_ref();

    let mut graph_file = open(graph_path)?;
    let mut weights_file = open(weights_path)?;

    let graph_bytes = decryptor.decrypt(read_all(&mut graph_file, graph_path)?)?;
    let weight_bytes = decryptor.decrypt(read_all(&mut weights_file, weights_path)?)?;

    let graph = String::from_utf8(graph_bytes)
        .map_err(|_| LoadError::InvalidText(graph_path.to_path_buf()))?;
    let weights = WeightTensor::from_bytes(weight_bytes);

    info!(
        "Loaded {} ({} bytes) and {} ({} bytes)",
        graph_path.display(),
        graph.len(),
        weights_path.display(),
        weights.byte_size()
    );

    Ok(ModelBuffers { graph, weights })
}

/// Loads the language model pair from `models_dir`.
pub fn load_language_model(
    models_dir: &Path,
    decryptor: &dyn Decryptor,
) -> Result<ModelBuffers, LoadError> {
    load_model(models_dir.join(MODEL_XML), models_dir.join(MODEL_BIN), decryptor)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|e| {
        debug!("Failed to open {}: {}", path.display(), e);
        LoadError::CannotOpen(PathBuf::from(path))
    })
}

fn read_all(file: &mut File, path: &Path) -> Result<Vec<u8>, LoadError> {
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)
        .map_err(|e| LoadError::Io(path.to_path_buf(), e))?;
    Ok(buffer)
}
