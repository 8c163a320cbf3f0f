//! GPU context abstraction.
//!
//! [`GpuContext`] is the command surface renderers talk to: programs, buffers,
//! attribute/uniform locations and immediate-mode draw calls. The production
//! implementation is [`WgpuContext`], which records the command stream and
//! replays it into a wgpu render pass when the host presents the frame.

mod context;
mod replay;
mod wgpu_context;

#[cfg(test)]
pub(crate) mod recording;

pub use context::{
    AttribLocation, BufferId, Capability, GpuContext, Primitive, ProgramDesc, ProgramId,
    UniformLocation,
};
pub use wgpu_context::WgpuContext;
