//! wgpu implementation of [`LightingBackend`].
//!
//! [`WgpuLighting`] owns the lighting textures, the scratch texture pool and
//! the compiled programs. Work is recorded through a [`WgpuLightingFrame`],
//! which borrows a [`RenderCtx`] and one command encoder:
//!
//! ```ignore
//! let mut frame = lighting.begin_frame(gpu.render_ctx());
//! framebuffer.update(&mut frame, &view)?;
//! frame.submit();
//! ```

mod blur;
mod common;
mod composite;
mod readback;
mod stage;
mod target;

use std::collections::HashMap;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use crate::render::RenderCtx;
use crate::render::lighting::{
    BlurPass, CompositeInputs, LightingBackend, LightingCompositeShader, LightingError, StagePass,
    TargetDesc, TargetId, TargetSize,
};

use blur::{BlurBindings, BlurRenderer};
use common::{QUAD_STRIP, Samplers};
use composite::{CompositeBindings, CompositeRenderer};
use stage::{StageRenderer, StageTargets};
use target::{GpuTarget, TexturePool};

/// GPU resources of the lighting pipeline on one device.
pub struct WgpuLighting {
    targets: HashMap<TargetId, GpuTarget>,
    pool: TexturePool,
    next_id: u32,

    samplers: Samplers,
    quad_vbo: wgpu::Buffer,

    stage: StageRenderer,
    composite: CompositeRenderer,
    blur: BlurRenderer,
}

impl WgpuLighting {
    pub fn new(device: &wgpu::Device) -> Self {
        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("dusk lighting quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_STRIP),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            targets: HashMap::new(),
            pool: TexturePool::default(),
            next_id: 0,
            samplers: Samplers::new(device),
            quad_vbo,
            stage: StageRenderer::default(),
            composite: CompositeRenderer::default(),
            blur: BlurRenderer::default(),
        }
    }

    /// Caps how many scratch textures may be borrowed at once.
    pub fn with_pool_limit(mut self, limit: usize) -> Self {
        self.pool = TexturePool::with_limit(limit);
        self
    }

    /// Starts recording lighting work into a fresh command encoder.
    pub fn begin_frame<'a>(&'a mut self, ctx: RenderCtx<'a>) -> WgpuLightingFrame<'a> {
        let encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("dusk lighting encoder"),
        });
        WgpuLightingFrame { ctx, encoder, lighting: self }
    }

    pub fn target_texture(&self, id: TargetId) -> Option<&wgpu::Texture> {
        self.targets.get(&id).map(|t| &t.texture)
    }

    pub fn target_view(&self, id: TargetId) -> Option<&wgpu::TextureView> {
        self.targets.get(&id).map(|t| &t.view)
    }

    pub fn target_size(&self, id: TargetId) -> Option<TargetSize> {
        self.targets.get(&id).map(|t| t.size)
    }

    /// Reads a target back as tightly packed RGBA8 rows.
    ///
    /// Blocks on the GPU. Meant for tools and debugging.
    pub fn read_target(&self, ctx: RenderCtx<'_>, id: TargetId) -> Result<Vec<u8>> {
        let target = self
            .targets
            .get(&id)
            .with_context(|| format!("unknown lighting target {id:?}"))?;
        readback::read_rgba8(&ctx, &target.texture, target.format, target.size)
    }

    /// Drops idle scratch textures.
    pub fn trim_pool(&mut self) {
        self.pool.clear();
    }

    fn alloc_id(&mut self) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}

/// One encoder's worth of lighting work.
///
/// Dropping a frame without [`submit`](Self::submit) discards its commands.
pub struct WgpuLightingFrame<'a> {
    ctx: RenderCtx<'a>,
    encoder: wgpu::CommandEncoder,
    lighting: &'a mut WgpuLighting,
}

impl WgpuLightingFrame<'_> {
    pub fn submit(self) -> wgpu::SubmissionIndex {
        self.ctx.queue.submit([self.encoder.finish()])
    }
}

impl LightingBackend for WgpuLightingFrame<'_> {
    fn create_target(&mut self, desc: &TargetDesc, size: TargetSize) -> TargetId {
        let id = self.lighting.alloc_id();
        let target = GpuTarget::new(self.ctx.device, desc, size);
        self.lighting.targets.insert(id, target);
        id
    }

    fn resize_target(&mut self, id: TargetId, size: TargetSize) {
        let Some(target) = self.lighting.targets.get_mut(&id) else {
            log::warn!("lighting | resize of unknown target {id:?}");
            return;
        };
        if target.size != size {
            *target = GpuTarget::new(self.ctx.device, &target.desc, size);
            // Scratch buckets were sized for the old screen.
            self.lighting.pool.clear();
        }
    }

    // Dropping the handle lets wgpu free the texture once commands already
    // recorded in this frame have executed.
    fn destroy_target(&mut self, id: TargetId) {
        self.lighting.targets.remove(&id);
    }

    fn render_stage(&mut self, pass: &StagePass<'_>) {
        let WgpuLighting { targets, stage, .. } = &mut *self.lighting;
        let [a, b, c] = pass.targets;
        let (Some(a), Some(b), Some(c)) = (targets.get(&a), targets.get(&b), targets.get(&c)) else {
            log::warn!("lighting | stage pass with unknown targets {:?}", pass.targets);
            return;
        };

        let stage_targets = StageTargets {
            views: [&a.view, &b.view, &c.view],
            format: a.format,
            size: a.size,
            clear: pass.clear_colors.map(|color| color.to_wgpu()),
        };
        stage.render(&self.ctx, &mut self.encoder, &stage_targets, pass.draws);
    }

    fn borrow_temp_target(
        &mut self,
        desc: &TargetDesc,
        size: TargetSize,
    ) -> Result<(TargetId, TargetSize), LightingError> {
        let target = self.lighting.pool.borrow(self.ctx.device, desc, size)?;
        let actual = target.size;
        let id = self.lighting.alloc_id();
        self.lighting.targets.insert(id, target);
        Ok((id, actual))
    }

    fn return_temp_target(&mut self, id: TargetId) {
        if let Some(target) = self.lighting.targets.remove(&id) {
            self.lighting.pool.give_back(target);
        }
        log::trace!("lighting | {} pool textures in use", self.lighting.pool.borrowed());
    }

    fn blit(&mut self, src: TargetId, dst: TargetId) {
        let targets = &self.lighting.targets;
        let (Some(s), Some(d)) = (targets.get(&src), targets.get(&dst)) else {
            log::warn!("lighting | blit with unknown targets {src:?} -> {dst:?}");
            return;
        };

        self.encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &s.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: &d.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: s.size.width.min(d.size.width),
                height: s.size.height.min(d.size.height),
                depth_or_array_layers: 1,
            },
        );
    }

    fn draw_composite(
        &mut self,
        shader: &LightingCompositeShader,
        dst: TargetId,
        inputs: &CompositeInputs,
    ) {
        let WgpuLighting { targets, samplers, quad_vbo, composite, .. } = &mut *self.lighting;
        let (Some(out), Some(level), Some(day), Some(dark)) = (
            targets.get(&dst),
            targets.get(&inputs.darkness_level),
            targets.get(&inputs.daylight_color),
            targets.get(&inputs.darkness_color),
        ) else {
            log::warn!("lighting | composite with unknown targets");
            return;
        };

        let bindings = CompositeBindings {
            dst: &out.view,
            dst_format: out.format,
            dst_size: out.size,
            darkness_level: &level.view,
            daylight_color: &day.view,
            darkness_color: &dark.view,
            sampler: samplers.get(level.desc.scale_mode),
        };
        composite.render(
            &self.ctx,
            &mut self.encoder,
            quad_vbo,
            &bindings,
            shader.uniforms(),
            shader.state().blend,
        );
    }

    fn blur_pass(&mut self, pass: &BlurPass<'_>) {
        let WgpuLighting { targets, samplers, quad_vbo, blur, .. } = &mut *self.lighting;
        let (Some(src), Some(dst)) = (targets.get(&pass.src), targets.get(&pass.dst)) else {
            log::warn!("lighting | blur with unknown targets {:?} -> {:?}", pass.src, pass.dst);
            return;
        };

        let bindings = BlurBindings {
            src: &src.view,
            src_texture_size: src.size,
            dst: &dst.view,
            dst_format: dst.format,
            sampler: samplers.get(src.desc.scale_mode),
        };
        blur.render(&self.ctx, &mut self.encoder, quad_vbo, &bindings, pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{Affine2, Rect, Viewport};
    use crate::device::{Gpu, GpuInit};
    use crate::paint::Rgb;
    use crate::render::lighting::{
        BlurFilterList, FrameOutcome, LIGHTING_TARGET, LightingFramebuffer, PerformanceConfig,
        Region, RegionColors, RegionSet, SCENE_REGION, ScreenView,
    };

    /// Headless device, or `None` on machines without any adapter.
    fn gpu() -> Option<Gpu> {
        match Gpu::new_blocking(GpuInit::default()) {
            Ok(gpu) => Some(gpu),
            Err(err) => {
                eprintln!("no wgpu adapter, skipping: {err:#}");
                None
            }
        }
    }

    fn colors() -> RegionColors {
        RegionColors {
            background: Rgb::from_hex(0x808080),
            ambient_daylight: Rgb::WHITE,
            ambient_darkness: Rgb::from_hex(0x200040),
        }
    }

    /// A fully dark region covering the whole 100x50 screen.
    fn dark_screen() -> RegionSet {
        let screen = Rect::new(0.0, 0.0, 100.0, 50.0);
        [
            Region::new(SCENE_REGION, screen, 0.0, colors()),
            Region::new("night", screen, 1.0, colors()),
        ]
        .into_iter()
        .collect()
    }

    fn view() -> ScreenView {
        ScreenView::new(Viewport::new(100.0, 50.0), Affine2::IDENTITY)
    }

    #[test]
    fn composite_writes_darkness_where_level_is_full() {
        let Some(gpu) = gpu() else { return };
        let mut lighting = WgpuLighting::new(gpu.device());
        let mut filters = BlurFilterList::new();
        let mut fb = LightingFramebuffer::new();

        fb.draw(&PerformanceConfig::default(), &mut filters);
        fb.refresh(&dark_screen()).unwrap();

        let mut frame = lighting.begin_frame(gpu.render_ctx());
        let outcome = fb.update(&mut frame, &view()).unwrap();
        frame.submit();
        assert_eq!(outcome, FrameOutcome::Rendered { composited: true });

        let id = fb.output().unwrap();
        let size = lighting.target_size(id).unwrap();
        let pixels = lighting.read_target(gpu.render_ctx(), id).unwrap();
        assert_eq!(pixels.len(), (size.width * size.height * 4) as usize);

        let center = ((size.height / 2 * size.width + size.width / 2) * 4) as usize;
        let px = &pixels[center..center + 4];
        for (got, want) in px.iter().zip([0x20u8, 0x00, 0x40, 0xff]) {
            assert!(got.abs_diff(want) <= 1, "pixel {px:?}");
        }
    }

    #[test]
    fn tear_down_in_the_rendering_frame_submits_cleanly() {
        let Some(gpu) = gpu() else { return };
        let mut lighting = WgpuLighting::new(gpu.device());
        let mut filters = BlurFilterList::new();
        let mut fb = LightingFramebuffer::new();

        fb.draw(&PerformanceConfig::default(), &mut filters);
        fb.refresh(&dark_screen()).unwrap();

        let mut frame = lighting.begin_frame(gpu.render_ctx());
        fb.update(&mut frame, &view()).unwrap();
        let id = fb.output().unwrap();
        fb.tear_down(&mut frame, &mut filters);
        frame.submit();
        gpu.device()
            .poll(wgpu::PollType::Wait { submission_index: None, timeout: None })
            .unwrap();

        assert!(lighting.target_texture(id).is_none());
        assert!(fb.output().is_none());
    }

    #[test]
    fn resizing_a_target_drops_idle_scratch_textures() {
        let Some(gpu) = gpu() else { return };
        let mut lighting = WgpuLighting::new(gpu.device());

        let mut frame = lighting.begin_frame(gpu.render_ctx());
        let id = frame.create_target(&LIGHTING_TARGET, TargetSize::new(100, 50));
        let (temp, _) = frame.borrow_temp_target(&LIGHTING_TARGET, TargetSize::new(100, 50)).unwrap();
        frame.return_temp_target(temp);
        frame.resize_target(id, TargetSize::new(100, 50));
        assert_eq!(frame.lighting.pool.idle(), 1);

        frame.resize_target(id, TargetSize::new(300, 200));
        assert_eq!(frame.lighting.pool.idle(), 0);
        frame.submit();
    }
}
