//! The fixed table mesh and how it is drawn.

use crate::gfx::Primitive;

/// Floats per vertex in [`TABLE_VERTICES`]: `x, y, r, g, b`.
const FLOATS_PER_VERTEX: usize = 5;
pub const TABLE_VERTEX_COUNT: usize = 10;

/// Interleaved `[x, y, r, g, b]` table data.
pub const TABLE_VERTICES: [f32; TABLE_VERTEX_COUNT * FLOATS_PER_VERTEX] = [
    // table: triangle fan around the center
    0.0, 0.0, 1.0, 1.0, 1.0, //
    -0.5, -0.8, 0.7, 0.7, 0.7, //
    0.5, -0.8, 0.7, 0.7, 0.7, //
    0.5, 0.8, 0.7, 0.7, 0.7, //
    -0.5, 0.8, 0.7, 0.7, 0.7, //
    -0.5, -0.8, 0.7, 0.7, 0.7, //
    // centerline
    -0.5, 0.0, 1.0, 0.0, 0.0, //
    0.5, 0.0, 1.0, 0.0, 0.0, //
    // mallets
    0.0, -0.4, 0.0, 0.0, 1.0, //
    0.0, 0.4, 1.0, 0.0, 0.0, //
];

/// [`TABLE_VERTICES`] without the color components: `[x, y]` per vertex.
pub const TABLE_POSITIONS: [f32; TABLE_VERTEX_COUNT * 2] = strip_colors(&TABLE_VERTICES);

static VERTEX_COLOR_DATA: [f32; TABLE_VERTEX_COUNT * FLOATS_PER_VERTEX] = TABLE_VERTICES;
static POSITION_DATA: [f32; TABLE_VERTEX_COUNT * 2] = TABLE_POSITIONS;

const fn strip_colors(
    src: &[f32; TABLE_VERTEX_COUNT * FLOATS_PER_VERTEX],
) -> [f32; TABLE_VERTEX_COUNT * 2] {
    let mut out = [0.0; TABLE_VERTEX_COUNT * 2];
    let mut i = 0;
    while i < TABLE_VERTEX_COUNT {
        out[i * 2] = src[i * FLOATS_PER_VERTEX];
        out[i * 2 + 1] = src[i * FLOATS_PER_VERTEX + 1];
        i += 1;
    }
    out
}

const BYTES_PER_FLOAT: u32 = 4;

/// Attribute layout of one vertex in the uploaded buffer.
///
/// Position always comes first; color, when present, follows it directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub position_components: u32,
    pub color_components: Option<u32>,
}

impl VertexLayout {
    pub const POSITION_COLOR: Self = Self {
        position_components: 2,
        color_components: Some(3),
    };

    pub const POSITION_ONLY: Self = Self {
        position_components: 2,
        color_components: None,
    };

    /// Bytes between consecutive vertices.
    pub const fn stride(self) -> u32 {
        let color = match self.color_components {
            Some(n) => n,
            None => 0,
        };
        (self.position_components + color) * BYTES_PER_FLOAT
    }

    pub const fn position_offset(self) -> u32 {
        0
    }

    pub const fn color_offset(self) -> Option<u32> {
        match self.color_components {
            Some(_) => Some(self.position_components * BYTES_PER_FLOAT),
            None => None,
        }
    }

    /// Table data in this layout, ready for upload.
    pub fn table_bytes(self) -> &'static [u8] {
        match self.color_components {
            Some(_) => bytemuck::cast_slice(&VERTEX_COLOR_DATA),
            None => bytemuck::cast_slice(&POSITION_DATA),
        }
    }
}

/// One draw call over a contiguous vertex range.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawRange {
    pub primitive: Primitive,
    pub first: u32,
    pub count: u32,
    /// Flat color used by programs that take `u_Color`.
    pub color: [f32; 4],
}

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

/// Draw order of the table: surface, centerline, then each mallet.
pub const TABLE_DRAWS: [DrawRange; 4] = [
    DrawRange { primitive: Primitive::TriangleFan, first: 0, count: 6, color: WHITE },
    DrawRange { primitive: Primitive::Lines, first: 6, count: 2, color: RED },
    DrawRange { primitive: Primitive::Points, first: 8, count: 1, color: BLUE },
    DrawRange { primitive: Primitive::Points, first: 9, count: 1, color: RED },
];
