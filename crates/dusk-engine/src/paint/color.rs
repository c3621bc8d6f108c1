/// Linear RGB color, channels nominally in `[0, 1]`.
///
/// Equality is exact per channel. Colors that differ only by rounding are
/// different colors as far as the emptiness test is concerned.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Creates a color from a packed `0xRRGGBB` value.
    #[inline]
    pub fn from_hex(hex: u32) -> Self {
        Self::from_u8(((hex >> 16) & 0xFF) as u8, ((hex >> 8) & 0xFF) as u8, (hex & 0xFF) as u8)
    }

    #[inline]
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// A scalar stored in the red channel; green and blue are zero.
    ///
    /// This is how darkness levels travel through the level target.
    #[inline]
    pub const fn scalar(v: f32) -> Self {
        Self::new(v, 0.0, 0.0)
    }

    /// Linear interpolation, `self` at `t = 0` and `other` at `t = 1`.
    ///
    /// `t` is not clamped, matching shader `mix`.
    #[inline]
    pub fn mix(self, other: Rgb, t: f32) -> Rgb {
        let s = 1.0 - t;
        Rgb::new(
            self.r * s + other.r * t,
            self.g * s + other.g * t,
            self.b * s + other.b * t,
        )
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Opaque clear value for a render pass.
    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color { r: self.r as f64, g: self.g as f64, b: self.b as f64, a: 1.0 }
    }
}
