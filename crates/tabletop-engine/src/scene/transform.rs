//! Model/projection composition, rebuilt on every valid resize.

use crate::coords::{Mat4, SurfaceSize};
use crate::error::RenderError;

/// How clip space is derived from the surface size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Projection {
    /// Vertices are already in clip space.
    Identity,
    /// Aspect-corrected orthographic view: the short axis spans `[-1, 1]`,
    /// the long axis `[-aspect, aspect]`, depth `[-1, 1]`.
    Orthographic,
    Perspective {
        fov_y_degrees: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub const PERSPECTIVE_45: Self = Self::Perspective {
        fov_y_degrees: 45.0,
        near: 1.0,
        far: 10.0,
    };

    /// Projection matrix for a valid surface size.
    pub fn matrix(self, size: SurfaceSize) -> Mat4 {
        match self {
            Self::Identity => Mat4::IDENTITY,
            Self::Orthographic => {
                let (w, h) = (size.width as f32, size.height as f32);
                if size.width > size.height {
                    let aspect = w / h;
                    Mat4::orthographic(-aspect, aspect, -1.0, 1.0, -1.0, 1.0)
                } else {
                    let aspect = h / w;
                    Mat4::orthographic(-1.0, 1.0, -aspect, aspect, -1.0, 1.0)
                }
            }
            Self::Perspective {
                fov_y_degrees,
                near,
                far,
            } => Mat4::perspective(fov_y_degrees, size.aspect_ratio(), near, far),
        }
    }
}

/// Order in which the model translation and rotation are applied to vertices.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ModelOrder {
    /// Translate first, then rotate about the origin: `model = R · T`.
    #[default]
    TranslateThenRotate,
    /// Rotate in place, then translate: `model = T · R`.
    RotateThenTranslate,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ModelConfig {
    pub translate_z: f32,
    pub rotate_x_degrees: f32,
    pub order: ModelOrder,
}

impl ModelConfig {
    /// No model transform at all.
    pub const NONE: Self = Self {
        translate_z: 0.0,
        rotate_x_degrees: 0.0,
        order: ModelOrder::TranslateThenRotate,
    };

    pub fn matrix(&self) -> Mat4 {
        let t = Mat4::translation(0.0, 0.0, self.translate_z);
        let r = Mat4::rotation_x(self.rotate_x_degrees.to_radians());
        match self.order {
            ModelOrder::TranslateThenRotate => r * t,
            ModelOrder::RotateThenTranslate => t * r,
        }
    }
}

impl Default for ModelConfig {
    /// Table pushed 2.5 units away from the camera and tilted 30° about X.
    fn default() -> Self {
        Self {
            translate_z: -2.5,
            rotate_x_degrees: 30.0,
            order: ModelOrder::TranslateThenRotate,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformConfig {
    pub projection: Projection,
    pub model: ModelConfig,
}

impl TransformConfig {
    /// Pure 2D clip space: identity projection and model.
    pub const fn flat() -> Self {
        Self {
            projection: Projection::Identity,
            model: ModelConfig::NONE,
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            projection: Projection::PERSPECTIVE_45,
            model: ModelConfig::default(),
        }
    }
}

/// Matrices of one resize, always rebuilt together.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformState {
    pub model: Mat4,
    pub projection: Mat4,
    /// `projection × model`.
    pub combined: Mat4,
}

#[derive(Debug, Clone)]
pub struct TransformPipeline {
    config: TransformConfig,
}

impl TransformPipeline {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Builds the transform for a surface of `size`.
    ///
    /// Rejects non-positive dimensions; callers keep their previous state.
    pub fn recompute(&self, size: SurfaceSize) -> Result<TransformState, RenderError> {
        if !size.is_valid() {
            return Err(RenderError::InvalidSurfaceSize {
                width: size.width,
                height: size.height,
            });
        }

        let model = self.config.model.matrix();
        let projection = self.config.projection.matrix(size);
        let combined = projection * model;

        log::trace!("model {model:?}");
        log::trace!("projection {projection:?}");
        log::trace!("combined {combined:?} for {}x{}", size.width, size.height);

        Ok(TransformState {
            model,
            projection,
            combined,
        })
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new(TransformConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_mat_approx(a: &Mat4, b: &Mat4) {
        for c in 0..4 {
            for r in 0..4 {
                assert!(
                    (a.cols[c][r] - b.cols[c][r]).abs() <= EPS,
                    "mismatch at cols[{c}][{r}]: {} vs {}",
                    a.cols[c][r],
                    b.cols[c][r]
                );
            }
        }
    }

    // ── perspective ─────────────────────────────────────────────────────────

    #[test]
    fn combined_is_projection_times_model() {
        let state = TransformPipeline::default()
            .recompute(SurfaceSize::new(800, 600))
            .unwrap();
        assert_mat_approx(&state.combined, &(state.projection * state.model));
    }

    #[test]
    fn perspective_uses_float_aspect() {
        let state = TransformPipeline::default()
            .recompute(SurfaceSize::new(3, 2))
            .unwrap();
        let f = 1.0 / 22.5f32.to_radians().tan();
        assert!((state.projection.cols[0][0] - f / 1.5).abs() <= EPS);
        assert!((state.projection.cols[1][1] - f).abs() <= EPS);
        assert_eq!(state.projection.cols[2][3], -1.0);
    }

    #[test]
    fn default_model_moves_origin_behind_near_plane() {
        let state = TransformPipeline::default()
            .recompute(SurfaceSize::new(100, 100))
            .unwrap();
        // R·T sends the origin to R·(0, 0, -2.5).
        let (s, c) = 30f32.to_radians().sin_cos();
        let origin = state.model.cols[3];
        assert!((origin[1] - 2.5 * s).abs() <= EPS);
        assert!((origin[2] + 2.5 * c).abs() <= EPS);
    }

    #[test]
    fn rotate_then_translate_keeps_translation_column() {
        let pipeline = TransformPipeline::new(TransformConfig {
            projection: Projection::PERSPECTIVE_45,
            model: ModelConfig {
                order: ModelOrder::RotateThenTranslate,
                ..ModelConfig::default()
            },
        });
        let state = pipeline.recompute(SurfaceSize::new(100, 100)).unwrap();
        assert_eq!(state.model.cols[3], [0.0, 0.0, -2.5, 1.0]);
    }

    // ── invalid sizes ───────────────────────────────────────────────────────

    #[test]
    fn zero_or_negative_sizes_are_rejected() {
        let pipeline = TransformPipeline::default();
        for (w, h) in [(0, 600), (800, 0), (-4, 10), (0, 0)] {
            assert_eq!(
                pipeline.recompute(SurfaceSize::new(w, h)),
                Err(RenderError::InvalidSurfaceSize { width: w, height: h })
            );
        }
    }

    // ── other projections ───────────────────────────────────────────────────

    #[test]
    fn flat_config_is_identity() {
        let state = TransformPipeline::new(TransformConfig::flat())
            .recompute(SurfaceSize::new(640, 480))
            .unwrap();
        assert_eq!(state.combined, Mat4::IDENTITY);
    }

    #[test]
    fn orthographic_landscape_widens_x() {
        let pipeline = TransformPipeline::new(TransformConfig {
            projection: Projection::Orthographic,
            model: ModelConfig::NONE,
        });
        let state = pipeline.recompute(SurfaceSize::new(200, 100)).unwrap();
        assert!((state.projection.cols[0][0] - 0.5).abs() <= EPS);
        assert!((state.projection.cols[1][1] - 1.0).abs() <= EPS);
    }

    #[test]
    fn orthographic_portrait_widens_y() {
        let pipeline = TransformPipeline::new(TransformConfig {
            projection: Projection::Orthographic,
            model: ModelConfig::NONE,
        });
        let state = pipeline.recompute(SurfaceSize::new(100, 200)).unwrap();
        assert!((state.projection.cols[0][0] - 1.0).abs() <= EPS);
        assert!((state.projection.cols[1][1] - 0.5).abs() <= EPS);
    }
}
