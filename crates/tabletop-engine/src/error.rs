use thiserror::Error;

/// Failures of the rendering core.
///
/// None of these reach the host as a panic: the lifecycle controller logs them
/// and degrades to drawing nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// Shader program failed to compile/link, or lacks a required input.
    /// Fatal to acquisition only.
    #[error("shader program `{label}` failed to link: {log}")]
    ShaderLink { label: &'static str, log: String },

    /// Resize with a non-positive dimension. The previous transform is kept.
    #[error("invalid surface size {width}x{height}")]
    InvalidSurfaceSize { width: i32, height: i32 },

    /// GPU work attempted without a live context or acquired resources.
    #[error("GPU context used outside of its acquire/release window")]
    StaleContextUse,
}
