use std::fmt;
use std::str::FromStr;

use super::types::EngineError;

/// Compute target a pipeline is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu,
    Npu,
}

impl FromStr for Device {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPU" => Ok(Device::Cpu),
            "GPU" => Ok(Device::Gpu),
            "NPU" => Ok(Device::Npu),
            other => Err(EngineError::UnknownDevice(other.to_string())),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Device::Cpu => "CPU",
            Device::Gpu => "GPU",
            Device::Npu => "NPU",
        };
        write!(f, "{}", name)
    }
}
