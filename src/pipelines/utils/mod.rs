use crate::error::{PipelineError, Result};
use candle_core::Device;

/// Which device to run inference on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceRequest {
    /// First available accelerator (CUDA, then Metal), otherwise CPU.
    #[default]
    Auto,
    /// CPU only.
    Cpu,
    /// A specific CUDA GPU.
    Cuda(usize),
    /// A specific Metal GPU.
    Metal(usize),
}

impl DeviceRequest {
    /// Open the requested device.
    ///
    /// [`DeviceRequest::Auto`] never fails; explicit accelerator requests fail with
    /// [`PipelineError::Device`] when the GPU cannot be opened.
    pub fn resolve(self) -> Result<Device> {
        match self {
            DeviceRequest::Auto => Ok(probe_accelerator().unwrap_or(Device::Cpu)),
            DeviceRequest::Cpu => Ok(Device::Cpu),
            DeviceRequest::Cuda(i) => Device::new_cuda(i).map_err(|e| {
                PipelineError::Device(format!(
                    "Failed to init CUDA device {i}: {e}. Try CPU as fallback."
                ))
            }),
            DeviceRequest::Metal(i) => Device::new_metal(i).map_err(|e| {
                PipelineError::Device(format!(
                    "Failed to init Metal device {i}: {e}. Try CPU as fallback."
                ))
            }),
        }
    }
}

fn probe_accelerator() -> Option<Device> {
    if candle_core::utils::cuda_is_available() {
        match Device::new_cuda(0) {
            Ok(device) => return Some(device),
            Err(e) => tracing::warn!("CUDA reported available but failed to open: {e}"),
        }
    }
    if candle_core::utils::metal_is_available() {
        match Device::new_metal(0) {
            Ok(device) => return Some(device),
            Err(e) => tracing::warn!("Metal reported available but failed to open: {e}"),
        }
    }
    None
}

/// Coarse class of a resolved device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// CUDA or Metal GPU.
    Accelerator,
    /// CPU.
    GeneralProcessor,
}

impl DeviceKind {
    /// Classify a resolved device.
    pub fn of(device: &Device) -> Self {
        if device.is_cpu() {
            DeviceKind::GeneralProcessor
        } else {
            DeviceKind::Accelerator
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeviceKind::Accelerator => "accelerator",
            DeviceKind::GeneralProcessor => "cpu",
        };
        write!(f, "{name}")
    }
}
