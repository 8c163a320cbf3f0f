//! Math and size types shared by the transform pipeline and renderers.
//!
//! Conventions:
//! - Matrices are column-major (`cols[c][r]`), the layout uniforms are uploaded in.
//! - Clip space follows the GL convention (right-handed view space, camera
//!   looking down -Z, NDC depth in [-1, 1]). Shaders remap depth for wgpu.

mod mat4;
mod size;

pub use mat4::Mat4;
pub use size::SurfaceSize;
