// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0

/// Environment-dependent driver failures.
///
/// Programming errors (unknown uniforms, foreign or deleted handles) are not reported
/// here; they panic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("program {label} failed to compile: {message}")]
    Compile { label: String, message: String },
    #[error("program {label} failed to link: {message}")]
    Link { label: String, message: String },
    #[error("out of memory: requested {requested} bytes, {available} bytes available")]
    OutOfMemory { requested: usize, available: usize },
    #[error("context lost")]
    ContextLost,
    #[error("texture dimensions {width}x{height} exceed the maximum of {max}")]
    InvalidDimensions { width: u32, height: u32, max: u32 },
}

impl DriverError {
    /// True when the whole context is unusable and has to be recreated.
    pub fn is_context_lost(&self) -> bool {
        matches!(
            self,
            DriverError::OutOfMemory { .. } | DriverError::ContextLost
        )
    }
}
