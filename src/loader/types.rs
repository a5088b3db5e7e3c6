use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use crate::ir::ElementType;

/// A raw weight buffer together with its element type and shape descriptor.
///
/// The loader always produces a flat `u8` tensor of shape `[len]`; the engine
/// reinterprets slices of it through the Const layers of the graph.
#[derive(Clone, PartialEq, Eq)]
pub struct WeightTensor {
    element_type: ElementType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl WeightTensor {
    /// Wraps `data` as a one-dimensional `u8` tensor
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { element_type: ElementType::U8, shape: vec![data.len()], data }
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Size of the buffer in bytes
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for WeightTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WeightTensor {{ element_type: {}, shape: {:?}, data: truncated }}",
            self.element_type, self.shape
        )
    }
}

/// An in-memory model: graph description text plus its weights
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelBuffers {
    pub graph: String,
    pub weights: WeightTensor,
}

/// Errors raised while bringing model files into memory
#[derive(Debug)]
pub enum LoadError {
    /// One of the two files could not be opened
    CannotOpen(PathBuf),
    /// The file opened but reading it failed
    Io(PathBuf, std::io::Error),
    /// The graph description is not valid UTF-8 after decryption
    InvalidText(PathBuf),
    /// The decryption hook rejected the data or its key
    Decrypt(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoadError::CannotOpen(path) => {
                write!(f, "Cannot open model or weights file: {}", path.display())
            }
            LoadError::Io(path, e) => write!(f, "Failed to read {}: {}", path.display(), e),
            LoadError::InvalidText(path) => {
                write!(f, "Graph description {} is not valid UTF-8", path.display())
            }
            LoadError::Decrypt(msg) => write!(f, "Decryption failed: {}", msg),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadError::Io(_, e) => Some(e),
            _ => None,
        }
    }
}
