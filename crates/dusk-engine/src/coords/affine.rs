use core::ops::Mul;

use super::{Rect, Vec2};

/// 2D affine transform.
///
/// Maps `(x, y)` to `(a*x + c*y + tx, b*x + d*y + ty)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine2 {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Affine2 {
    pub const IDENTITY: Affine2 = Affine2 { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0 };

    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    #[inline]
    pub const fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    #[inline]
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Returns the transform that applies `self` first, then `outer`.
    #[inline]
    pub fn then(self, outer: Affine2) -> Affine2 {
        Affine2 {
            a: outer.a * self.a + outer.c * self.b,
            b: outer.b * self.a + outer.d * self.b,
            c: outer.a * self.c + outer.c * self.d,
            d: outer.b * self.c + outer.d * self.d,
            tx: outer.a * self.tx + outer.c * self.ty + outer.tx,
            ty: outer.b * self.tx + outer.d * self.ty + outer.ty,
        }
    }

    #[inline]
    pub fn apply(self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    /// Axis-aligned bounds of `rect` after transformation.
    #[inline]
    pub fn transform_bounds(self, rect: Rect) -> Rect {
        let [p0, p1, p2, p3] = rect.corners();
        let pts = [self.apply(p0), self.apply(p1), self.apply(p2), self.apply(p3)];
        Rect::from_points(pts).unwrap_or_default()
    }
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `parent * child`: the child's transform expressed in the parent's space.
impl Mul for Affine2 {
    type Output = Affine2;
    #[inline]
    fn mul(self, child: Affine2) -> Affine2 {
        child.then(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_neutral() {
        let t = Affine2::new(2.0, 0.5, -1.0, 3.0, 4.0, 5.0);
        assert_eq!(Affine2::IDENTITY * t, t);
        assert_eq!(t * Affine2::IDENTITY, t);
    }

    #[test]
    fn then_applies_inner_first() {
        let scale = Affine2::scale(2.0, 2.0);
        let shift = Affine2::translation(10.0, 0.0);
        let p = Vec2::new(1.0, 1.0);
        assert_eq!(scale.then(shift).apply(p), Vec2::new(12.0, 2.0));
        assert_eq!(shift.then(scale).apply(p), Vec2::new(22.0, 2.0));
    }

    #[test]
    fn transform_bounds_covers_rotation() {
        // 90 degree rotation: (x, y) -> (-y, x)
        let rot = Affine2::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0);
        let b = rot.transform_bounds(Rect::new(0.0, 0.0, 4.0, 2.0));
        assert_eq!(b, Rect::new(-2.0, 0.0, 2.0, 4.0));
    }
}
