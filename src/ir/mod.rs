mod reader;
mod types;

// Re-export from reader
pub use reader::{read_const, IrGraph};
// Re-export from types
pub use types::{ConstData, ConstInfo, ElementType, IrError, IrLayer};
