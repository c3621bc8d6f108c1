//! Lighting composite: blends daylight toward darkness by the level mask.
//!
//! For every output pixel each input is sampled at
//! `uv * (output_size / input_size)`, so inputs only need to cover the output
//! area starting at their origin. The result is written opaque with blending
//! disabled.

use bytemuck::{Pod, Zeroable};

use crate::paint::Rgb;

use super::backend::{CompositeInputs, LightingBackend, PooledTarget, TargetId, TargetSize};
use super::error::LightingError;
use super::targets::{DARKNESS_COLOR, DARKNESS_LEVEL, DAYLIGHT_COLOR, RenderTargetSet};

/// Composite uniform block. Matches `CompositeUniforms` in `composite.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct CompositeUniforms {
    pub output_size: [f32; 2],
    pub darkness_level_input_size: [f32; 2],
    pub daylight_color_input_size: [f32; 2],
    pub darkness_color_input_size: [f32; 2],
}

/// Fixed-function state of the composite draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawState {
    pub blend: bool,
}

/// Per-instance state of the composite program.
///
/// The program itself is compiled by the backend once per device; this only
/// holds what changes between calls.
#[derive(Debug, Clone)]
pub struct LightingCompositeShader {
    uniforms: CompositeUniforms,
    state: DrawState,
}

impl Default for LightingCompositeShader {
    fn default() -> Self {
        Self::new()
    }
}

impl LightingCompositeShader {
    pub fn new() -> Self {
        Self {
            uniforms: CompositeUniforms::default(),
            state: DrawState { blend: false },
        }
    }

    #[inline]
    pub fn uniforms(&self) -> &CompositeUniforms {
        &self.uniforms
    }

    #[inline]
    pub fn state(&self) -> DrawState {
        self.state
    }

    pub fn set_sizes(
        &mut self,
        output: TargetSize,
        darkness_level: TargetSize,
        daylight_color: TargetSize,
        darkness_color: TargetSize,
    ) {
        self.uniforms = CompositeUniforms {
            output_size: output.to_array(),
            darkness_level_input_size: darkness_level.to_array(),
            daylight_color_input_size: daylight_color.to_array(),
            darkness_color_input_size: darkness_color.to_array(),
        };
    }

    /// Composites the target set into its daylight target.
    ///
    /// The daylight target is snapshotted into a pooled texture first, since
    /// it is both an input and the destination. The snapshot is returned to
    /// the pool before this returns, on every path.
    pub fn composite<B: LightingBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        targets: &RenderTargetSet,
        ids: [TargetId; 3],
    ) -> Result<(), LightingError> {
        let size = targets.size();
        let mut temp = PooledTarget::borrow(backend, targets.desc(), size)?;
        let snapshot = temp.id();

        temp.backend().blit(ids[DAYLIGHT_COLOR], snapshot);

        self.set_sizes(size, size, temp.size(), size);
        let inputs = CompositeInputs {
            darkness_level: ids[DARKNESS_LEVEL],
            daylight_color: snapshot,
            darkness_color: ids[DARKNESS_COLOR],
        };
        temp.backend().draw_composite(self, ids[DAYLIGHT_COLOR], &inputs);

        log::debug!("lighting | composite {}x{}", size.width, size.height);
        Ok(())
    }
}

/// Ratio that maps output texture coordinates into an input texture.
#[inline]
pub fn texture_coord_scale(output: [f32; 2], input: [f32; 2]) -> [f32; 2] {
    [output[0] / input[0], output[1] / input[1]]
}

/// CPU reference of the composite fragment.
#[inline]
pub fn composite_pixel(level: Rgb, daylight: Rgb, darkness: Rgb) -> Rgb {
    daylight.mix(darkness, level.r)
}
