//! In-memory [`LightingBackend`] that records every call.

use std::collections::HashMap;

use crate::paint::Rgb;

use super::backend::{
    BlurDirection, BlurPass, CompositeInputs, LightingBackend, MeshDraw, StagePass, TargetDesc,
    TargetId, TargetSize,
};
use super::composite::{CompositeUniforms, LightingCompositeShader};
use super::error::LightingError;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { id: TargetId, size: TargetSize },
    Resize { id: TargetId, size: TargetSize },
    Destroy(TargetId),
    RenderStage { targets: [TargetId; 3], clear_colors: [Rgb; 3], draws: Vec<MeshDraw> },
    BorrowTemp { id: TargetId, size: TargetSize },
    ReturnTemp(TargetId),
    Blit { src: TargetId, dst: TargetId },
    Composite { dst: TargetId, inputs: CompositeInputs, uniforms: CompositeUniforms, blend: bool },
    BlurPass {
        direction: BlurDirection,
        src: TargetId,
        src_size: TargetSize,
        dst: TargetId,
        dst_size: TargetSize,
        step: f32,
        weights: Vec<f32>,
    },
}

/// Temp textures are rounded up to powers of two, like a real pool.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub sizes: HashMap<TargetId, TargetSize>,
    pub borrowed: usize,
    pool_limit: Option<usize>,
    next_id: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool_limit(mut self, limit: usize) -> Self {
        self.pool_limit = Some(limit);
        self
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn stage_passes(&self) -> Vec<&Call> {
        self.calls.iter().filter(|c| matches!(c, Call::RenderStage { .. })).collect()
    }

    fn alloc(&mut self, size: TargetSize) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.sizes.insert(id, size);
        id
    }
}

impl LightingBackend for RecordingBackend {
    fn create_target(&mut self, _desc: &TargetDesc, size: TargetSize) -> TargetId {
        let id = self.alloc(size);
        self.calls.push(Call::Create { id, size });
        id
    }

    fn resize_target(&mut self, id: TargetId, size: TargetSize) {
        self.sizes.insert(id, size);
        self.calls.push(Call::Resize { id, size });
    }

    fn destroy_target(&mut self, id: TargetId) {
        self.sizes.remove(&id);
        self.calls.push(Call::Destroy(id));
    }

    fn render_stage(&mut self, pass: &StagePass<'_>) {
        self.calls.push(Call::RenderStage {
            targets: pass.targets,
            clear_colors: pass.clear_colors,
            draws: pass.draws.to_vec(),
        });
    }

    fn borrow_temp_target(
        &mut self,
        _desc: &TargetDesc,
        size: TargetSize,
    ) -> Result<(TargetId, TargetSize), LightingError> {
        if self.pool_limit.is_some_and(|limit| self.borrowed >= limit) {
            return Err(LightingError::TexturePoolExhausted {
                width: size.width,
                height: size.height,
            });
        }

        let actual = TargetSize::new(size.width.next_power_of_two(), size.height.next_power_of_two());
        let id = self.alloc(actual);
        self.borrowed += 1;
        self.calls.push(Call::BorrowTemp { id, size: actual });
        Ok((id, actual))
    }

    fn return_temp_target(&mut self, id: TargetId) {
        self.borrowed -= 1;
        self.calls.push(Call::ReturnTemp(id));
    }

    fn blit(&mut self, src: TargetId, dst: TargetId) {
        self.calls.push(Call::Blit { src, dst });
    }

    fn draw_composite(
        &mut self,
        shader: &LightingCompositeShader,
        dst: TargetId,
        inputs: &CompositeInputs,
    ) {
        self.calls.push(Call::Composite {
            dst,
            inputs: *inputs,
            uniforms: *shader.uniforms(),
            blend: shader.state().blend,
        });
    }

    fn blur_pass(&mut self, pass: &BlurPass<'_>) {
        self.calls.push(Call::BlurPass {
            direction: pass.direction,
            src: pass.src,
            src_size: pass.src_size,
            dst: pass.dst,
            dst_size: pass.dst_size,
            step: pass.step,
            weights: pass.weights.to_vec(),
        });
    }
}
