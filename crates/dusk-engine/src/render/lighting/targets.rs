use crate::paint::Rgb;

use super::backend::{
    LightingBackend, SampleType, ScaleMode, TargetDesc, TargetFormat, TargetId, TargetSize,
};

/// Darkness level, stored in the red channel.
pub const DARKNESS_LEVEL: usize = 0;
/// Daylight color; holds the composited result after a composite.
pub const DAYLIGHT_COLOR: usize = 1;
/// Darkness color.
pub const DARKNESS_COLOR: usize = 2;
pub const TARGET_COUNT: usize = 3;

/// Configuration shared by all three lighting targets.
pub const LIGHTING_TARGET: TargetDesc = TargetDesc {
    label: "dusk.lighting.target",
    format: TargetFormat::Rgb,
    sample_type: SampleType::UnsignedByte,
    scale_mode: ScaleMode::Linear,
};

/// The three persistent lighting render targets and their clear colors.
///
/// A clear color is the GPU clear value and the "nothing drew here" sentinel
/// at the same time. Clear colors survive `release`; GPU targets do not.
#[derive(Debug)]
pub struct RenderTargetSet {
    desc: TargetDesc,
    clear_colors: [Rgb; TARGET_COUNT],
    ids: Option<[TargetId; TARGET_COUNT]>,
    size: TargetSize,
}

impl Default for RenderTargetSet {
    fn default() -> Self {
        Self::new(LIGHTING_TARGET)
    }
}

impl RenderTargetSet {
    pub fn new(desc: TargetDesc) -> Self {
        Self {
            desc,
            clear_colors: [Rgb::BLACK; TARGET_COUNT],
            ids: None,
            size: TargetSize::new(1, 1),
        }
    }

    #[inline]
    pub fn desc(&self) -> &TargetDesc {
        &self.desc
    }

    #[inline]
    pub fn is_acquired(&self) -> bool {
        self.ids.is_some()
    }

    /// Target handles, `None` until acquired.
    #[inline]
    pub fn ids(&self) -> Option<[TargetId; TARGET_COUNT]> {
        self.ids
    }

    #[inline]
    pub fn size(&self) -> TargetSize {
        self.size
    }

    #[inline]
    pub fn clear_colors(&self) -> [Rgb; TARGET_COUNT] {
        self.clear_colors
    }

    #[inline]
    pub fn clear_color(&self, index: usize) -> Rgb {
        self.clear_colors[index]
    }

    #[inline]
    pub fn set_clear_color(&mut self, index: usize, color: Rgb) {
        self.clear_colors[index] = color;
    }

    /// Creates the targets on first call; later calls return the same ids.
    pub fn acquire<B: LightingBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        size: TargetSize,
    ) -> [TargetId; TARGET_COUNT] {
        if let Some(ids) = self.ids {
            return ids;
        }

        let desc = self.desc;
        let ids = [(); TARGET_COUNT].map(|_| backend.create_target(&desc, size));
        log::debug!(
            "lighting | acquired {} targets ({}x{})",
            TARGET_COUNT,
            size.width,
            size.height
        );

        self.ids = Some(ids);
        self.size = size;
        ids
    }

    /// Resizes all targets to `size`. Returns whether anything changed.
    pub fn resize<B: LightingBackend + ?Sized>(&mut self, backend: &mut B, size: TargetSize) -> bool {
        let Some(ids) = self.ids else {
            return false;
        };
        if self.size == size {
            return false;
        }

        for id in ids {
            backend.resize_target(id, size);
        }
        self.size = size;
        true
    }

    pub fn release<B: LightingBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(ids) = self.ids.take() {
            for id in ids {
                backend.destroy_target(id);
            }
            log::debug!("lighting | released targets");
        }
    }
}
