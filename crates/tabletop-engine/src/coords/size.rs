/// Drawable surface size in physical pixels, as reported by the host.
///
/// Signed on purpose: hosts report zero (and some platforms negative) sizes for
/// minimized or collapsed surfaces. Such sizes are never used for rendering.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: i32,
    pub height: i32,
}

impl SurfaceSize {
    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// `width / height` as a float ratio. Only meaningful when [`is_valid`](Self::is_valid).
    #[inline]
    pub fn aspect_ratio(self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_size_is_valid() {
        assert!(SurfaceSize::new(1, 1).is_valid());
    }

    #[test]
    fn zero_or_negative_size_is_invalid() {
        assert!(!SurfaceSize::new(0, 600).is_valid());
        assert!(!SurfaceSize::new(800, 0).is_valid());
        assert!(!SurfaceSize::new(-1, 600).is_valid());
    }

    #[test]
    fn aspect_ratio_uses_float_division() {
        // 3 / 2 would truncate to 1 with integer division.
        assert_eq!(SurfaceSize::new(3, 2).aspect_ratio(), 1.5);
        assert_eq!(SurfaceSize::new(720, 1280).aspect_ratio(), 0.5625);
    }
}
