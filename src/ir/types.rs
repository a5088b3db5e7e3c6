use std::error::Error;
use std::fmt;

/// Element types a Const layer may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    U8,
    I32,
    I64,
    F32,
}

impl ElementType {
    /// Size in bytes of a single element
    pub fn size(&self) -> usize {
        match self {
            ElementType::U8 => 1,
            ElementType::I32 | ElementType::F32 => 4,
            ElementType::I64 => 8,
        }
    }

    pub fn parse(name: &str) -> Result<Self, IrError> {
        match name.to_ascii_lowercase().as_str() {
            "u8" => Ok(ElementType::U8),
            "i32" => Ok(ElementType::I32),
            "i64" => Ok(ElementType::I64),
            "f32" => Ok(ElementType::F32),
            other => Err(IrError::UnsupportedElementType(other.to_string())),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ElementType::U8 => "u8",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::F32 => "f32",
        };
        write!(f, "{}", name)
    }
}

/// Placement of a Const layer inside the weight buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstInfo {
    pub element_type: ElementType,
    /// Static shape; a scalar has an empty shape
    pub shape: Vec<usize>,
    /// Byte offset into the weight buffer
    pub offset: usize,
    /// Byte length inside the weight buffer
    pub size: usize,
}

impl ConstInfo {
    /// Total number of elements described by the shape, `None` on overflow
    pub fn element_count(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
    }

    /// Number of bytes the shape needs, `None` on overflow
    pub fn byte_len(&self) -> Option<usize> {
        self.element_count()?.checked_mul(self.element_type.size())
    }
}

/// One `<layer>` entry of a graph description
#[derive(Debug, Clone)]
pub struct IrLayer {
    pub id: u64,
    pub name: String,
    /// Operation type, e.g. `Parameter`, `Const`, `Result`
    pub kind: String,
    /// Present only for `Const` layers
    pub constant: Option<ConstInfo>,
}

impl fmt::Display for IrLayer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.constant {
            Some(c) => write!(
                f,
                "{} ({}) {} [{}]",
                self.name,
                self.kind,
                c.element_type,
                c.shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(" x ")
            ),
            None => write!(f, "{} ({})", self.name, self.kind),
        }
    }
}

/// Decoded contents of a Const layer
#[derive(Debug, Clone, PartialEq)]
pub enum ConstData {
    U8(Vec<u8>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
}

/// Errors raised while reading a graph description or its constants
#[derive(Debug)]
pub enum IrError {
    /// Structural problem in the XML text
    InvalidFormat(String),
    /// A layer the caller asked for is not present
    LayerNotFound(String),
    /// Element type outside the supported set
    UnsupportedElementType(String),
    /// Const layer points outside the weight buffer or disagrees with its shape
    InvalidConst(String),
}

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IrError::InvalidFormat(msg) => write!(f, "Invalid graph description: {}", msg),
            IrError::LayerNotFound(name) => write!(f, "Layer not found: {}", name),
            IrError::UnsupportedElementType(t) => write!(f, "Unsupported element type: {}", t),
            IrError::InvalidConst(msg) => write!(f, "Invalid constant: {}", msg),
        }
    }
}

impl Error for IrError {}
