use std::cell::RefCell;
use std::rc::Rc;

use super::backend::{
    BlurDirection, BlurPass, LightingBackend, PooledTarget, TargetDesc, TargetId, TargetSize,
};
use super::error::LightingError;

pub const MIN_KERNEL_SIZE: u32 = 3;
pub const MAX_KERNEL_SIZE: u32 = 15;
/// Half-kernel length of [`MAX_KERNEL_SIZE`], center tap included.
pub const MAX_HALF_KERNEL: usize = (MAX_KERNEL_SIZE as usize) / 2 + 1;

/// Normalized half Gaussian kernel, center weight first.
///
/// `kernel_size` is clamped to the supported odd range. The full kernel
/// (center once, every other weight twice) sums to one.
pub fn gaussian_kernel(kernel_size: u32) -> Vec<f32> {
    let size = kernel_size.clamp(MIN_KERNEL_SIZE, MAX_KERNEL_SIZE) | 1;
    let radius = (size / 2) as usize;
    let sigma = size as f32 / 2.5;
    let denom = 2.0 * sigma * sigma;

    let mut weights: Vec<f32> = (0..=radius)
        .map(|i| {
            let x = i as f32;
            (-(x * x) / denom).exp()
        })
        .collect();

    let total = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Two-pass separable Gaussian blur applied in place to one target.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBlur {
    /// Blur radius in target pixels at resolution 1.
    pub strength: f32,
    /// Downsample factor of the intermediate texture.
    pub passes: u32,
    pub kernel_size: u32,
    pub resolution: f32,
}

impl TextureBlur {
    pub fn new(strength: f32, passes: u32, kernel_size: u32) -> Self {
        Self { strength, passes: passes.max(1), kernel_size, resolution: 1.0 }
    }

    #[inline]
    pub fn effective_strength(&self) -> f32 {
        self.strength * self.resolution
    }

    /// Blurs `target` horizontally into a downsampled pooled texture, then
    /// vertically back into `target`.
    ///
    /// A non-positive or non-finite strength leaves the target untouched.
    pub fn apply<B: LightingBackend + ?Sized>(
        &self,
        backend: &mut B,
        desc: &TargetDesc,
        target: TargetId,
        size: TargetSize,
    ) -> Result<(), LightingError> {
        let strength = self.effective_strength();
        if !strength.is_finite() || strength <= 0.0 {
            return Ok(());
        }

        let downsample = self.passes.max(1);
        let reduced = size.downsampled(downsample);
        let weights = gaussian_kernel(self.kernel_size);
        let step = strength / downsample as f32;

        let mut temp = PooledTarget::borrow(backend, desc, reduced)?;
        let temp_id = temp.id();

        temp.backend().blur_pass(&BlurPass {
            direction: BlurDirection::Horizontal,
            src: target,
            src_size: size,
            dst: temp_id,
            dst_size: reduced,
            step,
            weights: &weights,
        });
        temp.backend().blur_pass(&BlurPass {
            direction: BlurDirection::Vertical,
            src: temp_id,
            src_size: reduced,
            dst: target,
            dst_size: size,
            step: step / downsample as f32,
            weights: &weights,
        });

        Ok(())
    }
}

/// Blur handle shared between its owner and a filter list.
pub type SharedBlur = Rc<RefCell<TextureBlur>>;

/// Blur filters registered with a scene; resolution follows the view zoom.
#[derive(Debug)]
pub struct BlurFilterList {
    filters: Vec<SharedBlur>,
    resolution: f32,
}

impl Default for BlurFilterList {
    fn default() -> Self {
        Self { filters: Vec::new(), resolution: 1.0 }
    }
}

impl BlurFilterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `blur` at the list's current resolution.
    pub fn add(&mut self, blur: TextureBlur) -> SharedBlur {
        let shared = Rc::new(RefCell::new(TextureBlur { resolution: self.resolution, ..blur }));
        self.filters.push(Rc::clone(&shared));
        shared
    }

    /// Returns whether `blur` was registered.
    pub fn remove(&mut self, blur: &SharedBlur) -> bool {
        let before = self.filters.len();
        self.filters.retain(|f| !Rc::ptr_eq(f, blur));
        self.filters.len() != before
    }

    pub fn set_resolution(&mut self, resolution: f32) {
        self.resolution = resolution;
        for f in &self.filters {
            f.borrow_mut().resolution = resolution;
        }
    }

    #[inline]
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
