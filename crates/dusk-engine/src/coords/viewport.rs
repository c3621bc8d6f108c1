use super::Rect;

/// Screen size in physical pixels.
///
/// The lighting targets are sized from this when a frame renders, and the
/// visible screen region used for culling is `[0, width) x [0, height)`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Visible screen rectangle.
    #[inline]
    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Size rounded up to whole pixels, never below 1x1.
    #[inline]
    pub fn pixel_size(self) -> (u32, u32) {
        let w = if self.width.is_finite() { self.width.ceil().max(1.0) } else { 1.0 };
        let h = if self.height.is_finite() { self.height.ceil().max(1.0) } else { 1.0 };
        (w as u32, h as u32)
    }
}
