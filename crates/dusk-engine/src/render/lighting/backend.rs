//! GPU abstraction consumed by the lighting pipeline.
//!
//! The controller never touches wgpu directly. It asks a [`LightingBackend`]
//! for render targets, stage draws, blits, blur passes and the composite
//! draw, which keeps the frame logic testable without a device.

use crate::coords::{Vec2, Viewport};
use crate::paint::Rgb;

use super::composite::LightingCompositeShader;
use super::error::LightingError;

/// Opaque handle to a render target owned by a backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

/// Render target size in pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn from_viewport(viewport: Viewport) -> Self {
        let (width, height) = viewport.pixel_size();
        Self { width, height }
    }

    /// Size divided by `factor`, rounded up, never below 1x1.
    #[inline]
    pub fn downsampled(self, factor: u32) -> Self {
        let f = factor.max(1);
        Self::new(self.width.div_ceil(f).max(1), self.height.div_ceil(f).max(1))
    }

    #[inline]
    pub fn to_array(self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

/// Channel layout of a render target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TargetFormat {
    Rgb,
    Rgba,
}

/// Storage type of each channel.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SampleType {
    UnsignedByte,
    HalfFloat,
}

/// Filtering used when the target is sampled.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScaleMode {
    Nearest,
    Linear,
}

/// Render target configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TargetDesc {
    pub label: &'static str,
    pub format: TargetFormat,
    pub sample_type: SampleType,
    pub scale_mode: ScaleMode,
}

/// One mesh ready for the stage pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDraw {
    /// Triangle list in screen pixels.
    pub vertices: Vec<Vec2>,
    /// Color written to each of the three targets.
    pub colors: [Rgb; 3],
}

/// Stage render into the three lighting targets.
///
/// Every target is cleared to its clear color before the draws, so an empty
/// `draws` slice still resets the targets.
#[derive(Debug, Clone, PartialEq)]
pub struct StagePass<'a> {
    pub targets: [TargetId; 3],
    pub clear_colors: [Rgb; 3],
    pub draws: &'a [MeshDraw],
}

/// Inputs of the composite draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CompositeInputs {
    pub darkness_level: TargetId,
    pub daylight_color: TargetId,
    pub darkness_color: TargetId,
}

/// Axis of a separable blur pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlurDirection {
    Horizontal,
    Vertical,
}

/// One separable blur pass from `src` into `dst`.
///
/// Sizes are the content sizes; a pooled texture may be larger than its
/// content and the backend samples only the content region.
#[derive(Debug, Clone, PartialEq)]
pub struct BlurPass<'a> {
    pub direction: BlurDirection,
    pub src: TargetId,
    pub src_size: TargetSize,
    pub dst: TargetId,
    pub dst_size: TargetSize,
    /// Distance between taps in source texels.
    pub step: f32,
    /// Half kernel, center weight first.
    pub weights: &'a [f32],
}

/// GPU primitives the lighting pipeline is built on.
///
/// Calls are recorded in submission order; none of them block on the GPU.
pub trait LightingBackend {
    fn create_target(&mut self, desc: &TargetDesc, size: TargetSize) -> TargetId;

    /// Resizes a target. Its contents are undefined afterwards.
    fn resize_target(&mut self, id: TargetId, size: TargetSize);

    /// Forgets a target. Work already recorded against it still completes.
    fn destroy_target(&mut self, id: TargetId);

    fn render_stage(&mut self, pass: &StagePass<'_>);

    /// Borrows a temporary target of at least `size` from the shared pool.
    ///
    /// Returns the handle and the actual texture size. Prefer
    /// [`PooledTarget::borrow`], which guarantees the return.
    fn borrow_temp_target(
        &mut self,
        desc: &TargetDesc,
        size: TargetSize,
    ) -> Result<(TargetId, TargetSize), LightingError>;

    fn return_temp_target(&mut self, id: TargetId);

    /// Copies `src` into the top-left corner of `dst` without scaling.
    fn blit(&mut self, src: TargetId, dst: TargetId);

    /// Draws a full-screen quad into `dst` with the composite program.
    fn draw_composite(
        &mut self,
        shader: &LightingCompositeShader,
        dst: TargetId,
        inputs: &CompositeInputs,
    );

    fn blur_pass(&mut self, pass: &BlurPass<'_>);
}

/// Scoped borrow of a pooled temporary target.
///
/// The target goes back to the pool when the guard drops, including on early
/// returns. Use [`PooledTarget::backend`] to keep issuing calls while the
/// borrow is alive.
pub struct PooledTarget<'a, B: LightingBackend + ?Sized> {
    backend: &'a mut B,
    id: TargetId,
    size: TargetSize,
}

impl<'a, B: LightingBackend + ?Sized> PooledTarget<'a, B> {
    pub fn borrow(
        backend: &'a mut B,
        desc: &TargetDesc,
        size: TargetSize,
    ) -> Result<Self, LightingError> {
        let (id, size) = backend.borrow_temp_target(desc, size)?;
        Ok(Self { backend, id, size })
    }

    #[inline]
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Actual texture size, which may exceed the requested size.
    #[inline]
    pub fn size(&self) -> TargetSize {
        self.size
    }

    #[inline]
    pub fn backend(&mut self) -> &mut B {
        self.backend
    }
}

impl<B: LightingBackend + ?Sized> Drop for PooledTarget<'_, B> {
    fn drop(&mut self) {
        self.backend.return_temp_target(self.id);
    }
}
