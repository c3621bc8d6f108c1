/// Blur settings read on every `draw`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlurConfig {
    pub enabled: bool,
    /// Blur radius in pixels before the lighting scale factor.
    pub strength: f32,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self { enabled: true, strength: 8.0 }
    }
}

/// Performance knobs consumed by the lighting pipeline.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PerformanceConfig {
    pub blur: BlurConfig,
}

impl PerformanceConfig {
    /// Everything off.
    pub fn low() -> Self {
        Self { blur: BlurConfig { enabled: false, ..BlurConfig::default() } }
    }
}
