//! The two shader programs the table can be drawn with.

use crate::gfx::ProgramDesc;

pub const A_POSITION: &str = "a_Position";
pub const A_COLOR: &str = "a_Color";
pub const U_MATRIX: &str = "u_Matrix";
pub const U_COLOR: &str = "u_Color";

/// Point size in pixels used for the mallets.
pub const POINT_SIZE: f32 = 10.0;

/// Byte offsets in the shared uniform block (see the WGSL `Uniforms` struct).
const MATRIX_OFFSET: u32 = 0;
const COLOR_OFFSET: u32 = 64;

/// Per-vertex color, interpolated across primitives.
pub static VERTEX_COLOR_PROGRAM: ProgramDesc = ProgramDesc {
    label: "tabletop vertex-color program",
    source: include_str!("shaders/table_vertex_color.wgsl"),
    attributes: &[(A_POSITION, 0), (A_COLOR, 1)],
    uniforms: &[(U_MATRIX, MATRIX_OFFSET)],
    point_size: POINT_SIZE,
};

/// Flat color per draw taken from `u_Color`.
pub static UNIFORM_COLOR_PROGRAM: ProgramDesc = ProgramDesc {
    label: "tabletop uniform-color program",
    source: include_str!("shaders/table_uniform_color.wgsl"),
    attributes: &[(A_POSITION, 0)],
    uniforms: &[(U_MATRIX, MATRIX_OFFSET), (U_COLOR, COLOR_OFFSET)],
    point_size: POINT_SIZE,
};
