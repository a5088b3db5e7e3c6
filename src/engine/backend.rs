use std::fmt::{self, Debug};
use std::sync::Arc;

use ndarray::{Array2, ArrayView1};

use super::device::Device;
use super::types::EngineError;

/// A trait for next-token compute backends
pub trait Backend: Send + Sync + Debug {
    /// Picks the next token given the logits table and the last token in the sequence.
    ///
    /// # Parameters
    /// * `logits` - Next-token logits with shape (vocab, vocab); row `i` scores
    ///   the successors of token `i`
    /// * `last` - Id of the most recent token
    fn next_token(&self, logits: &Array2<f32>, last: u32) -> Result<u32, EngineError>;
}

/// CPU backend implementation using ndarray
#[derive(Clone, Default)]
pub struct CpuBackend {}

impl CpuBackend {
    /// Create a new CPU backend instance.
    pub fn new() -> Self {
        Self {}
    }

    /// Index of the largest finite value, lowest index on ties.
    pub fn argmax(&self, row: ArrayView1<f32>) -> Option<usize> {
        row.iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })
            .map(|(i, _)| i)
    }
}

impl Debug for CpuBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuBackend").finish()
    }
}

impl Backend for CpuBackend {
    fn next_token(&self, logits: &Array2<f32>, last: u32) -> Result<u32, EngineError> {
        let (rows, _) = logits.dim();
        let index = last as usize;
        if index >= rows {
            return Err(EngineError::Backend(format!(
                "token {} has no row in a logits table of {} rows",
                last, rows
            )));
        }
        self.argmax(logits.row(index))
            .map(|i| i as u32)
            .ok_or_else(|| {
                EngineError::Backend(format!("no finite logits for successors of token {}", last))
            })
    }
}

/// Creates the backend for a compute target
pub fn create_backend(device: Device) -> Result<Arc<dyn Backend>, EngineError> {
    match device {
        Device::Cpu => Ok(Arc::new(CpuBackend::new())),
        Device::Gpu | Device::Npu => Err(EngineError::UnsupportedDevice(device.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_argmax_ties_pick_lowest_index() {
        let backend = CpuBackend::new();
        let row = array![1.0f32, 3.0, 3.0, -2.0];
        assert_eq!(backend.argmax(row.view()), Some(1));
    }

    #[test]
    fn test_argmax_ignores_nan() {
        let backend = CpuBackend::new();
        let row = array![f32::NAN, -1.0, f32::NAN];
        assert_eq!(backend.argmax(row.view()), Some(1));
        let all_nan = array![f32::NAN];
        assert_eq!(backend.argmax(all_nan.view()), None);
    }

    #[test]
    fn test_next_token_reads_row_of_last_token() {
        let backend = CpuBackend::new();
        let logits = array![[0.0f32, 1.0], [5.0, 0.0]];
        assert_eq!(backend.next_token(&logits, 0).unwrap(), 1);
        assert_eq!(backend.next_token(&logits, 1).unwrap(), 0);
        assert!(backend.next_token(&logits, 2).is_err());
    }

    #[test]
    fn test_only_cpu_is_available() {
        assert!(create_backend(Device::Cpu).is_ok());
        assert!(matches!(create_backend(Device::Gpu), Err(EngineError::UnsupportedDevice(_))));
    }
}
