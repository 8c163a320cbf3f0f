use crate::gfx::ProgramDesc;

use super::geometry::VertexLayout;
use super::program::{UNIFORM_COLOR_PROGRAM, VERTEX_COLOR_PROGRAM};
use super::transform::{ModelConfig, Projection, TransformConfig};

/// Which shader program colors the table.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ShaderVariant {
    /// Per-vertex `a_Color`, interpolated.
    #[default]
    VertexColor,
    /// Positions only; each draw range sets its own `u_Color`.
    UniformColor,
}

impl ShaderVariant {
    pub fn program(self) -> &'static ProgramDesc {
        match self {
            Self::VertexColor => &VERTEX_COLOR_PROGRAM,
            Self::UniformColor => &UNIFORM_COLOR_PROGRAM,
        }
    }

    pub fn layout(self) -> VertexLayout {
        match self {
            Self::VertexColor => VertexLayout::POSITION_COLOR,
            Self::UniformColor => VertexLayout::POSITION_ONLY,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneConfig {
    pub shader: ShaderVariant,
    pub transform: TransformConfig,
    pub clear_color: [f32; 4],
}

impl SceneConfig {
    /// Vertex colors straight in clip space.
    pub fn flat() -> Self {
        Self {
            shader: ShaderVariant::VertexColor,
            transform: TransformConfig::flat(),
            clear_color: [0.0; 4],
        }
    }

    /// Flat per-draw colors straight in clip space.
    pub fn flat_uniform_color() -> Self {
        Self {
            shader: ShaderVariant::UniformColor,
            ..Self::flat()
        }
    }

    /// Aspect-corrected orthographic view, no model transform.
    pub fn orthographic() -> Self {
        Self {
            transform: TransformConfig {
                projection: Projection::Orthographic,
                model: ModelConfig::NONE,
            },
            ..Self::flat()
        }
    }

    /// Tilted table under a 45° perspective.
    pub fn perspective() -> Self {
        Self {
            transform: TransformConfig::default(),
            ..Self::flat()
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::perspective()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_perspective_with_vertex_colors() {
        let config = SceneConfig::default();
        assert_eq!(config.shader, ShaderVariant::VertexColor);
        assert_eq!(config.transform.projection, Projection::PERSPECTIVE_45);
        assert_eq!(config.clear_color, [0.0; 4]);
    }

    #[test]
    fn variants_pair_program_with_matching_layout() {
        assert_eq!(ShaderVariant::VertexColor.layout().stride(), 20);
        assert!(ShaderVariant::VertexColor.program().attribute("a_Color").is_some());
        assert_eq!(ShaderVariant::UniformColor.layout().stride(), 8);
        assert!(ShaderVariant::UniformColor.program().uniform("u_Color").is_some());
    }
}
