//! The table scene: fixed geometry, its transform, the renderer that draws it
//! and the lifecycle controller that decides when drawing is allowed.
//!
//! Control flow is host signal → [`SurfaceController`] → [`Renderer`]
//! (`acquire` on visibility, `draw_frame` on paint, `release` on loss of
//! visibility) with [`TransformPipeline::recompute`] on every resize.

mod config;
mod geometry;
mod lifecycle;
mod program;
mod renderer;
mod transform;

pub use config::{SceneConfig, ShaderVariant};
pub use geometry::{
    DrawRange, TABLE_DRAWS, TABLE_POSITIONS, TABLE_VERTEX_COUNT, TABLE_VERTICES, VertexLayout,
};
pub use lifecycle::{HostCommand, HostRequests, Phase, Signal, SurfaceController, SurfaceState};
pub use program::{
    A_COLOR, A_POSITION, POINT_SIZE, U_COLOR, U_MATRIX, UNIFORM_COLOR_PROGRAM,
    VERTEX_COLOR_PROGRAM,
};
pub use renderer::{RenderResources, Renderer};
pub use transform::{
    ModelConfig, ModelOrder, Projection, TransformConfig, TransformPipeline, TransformState,
};
