use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::render::RenderCtx;
use crate::render::lighting::{BlurDirection, BlurPass, MAX_HALF_KERNEL, TargetSize};

use super::common::{QuadVertex, sampler_entry, strip_primitive, texture_entry, uniform_entry};

/// Separable blur program; one draw per [`BlurPass`].
#[derive(Default)]
pub(super) struct BlurRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
}

/// Source and destination of one pass, with real texture sizes.
pub(super) struct BlurBindings<'t> {
    pub src: &'t wgpu::TextureView,
    pub src_texture_size: TargetSize,
    pub dst: &'t wgpu::TextureView,
    pub dst_format: wgpu::TextureFormat,
    pub sampler: &'t wgpu::Sampler,
}

impl BlurRenderer {
    pub(super) fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        quad: &wgpu::Buffer,
        bindings: &BlurBindings<'_>,
        pass: &BlurPass<'_>,
    ) {
        self.ensure_pipeline(ctx, bindings.dst_format);
        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let uniforms = BlurUniforms::new(pass, bindings.src_texture_size);
        let ubo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("dusk lighting blur ubo"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("dusk lighting blur bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(bindings.src),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(bindings.sampler),
                },
            ],
        });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("dusk lighting blur pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: bindings.dst,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let dst = pass.dst_size;
        rpass.set_viewport(0.0, 0.0, dst.width as f32, dst.height as f32, 0.0, 1.0);
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.set_vertex_buffer(0, quad.slice(..));
        rpass.draw(0..4, 0..1);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("dusk lighting blur shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blur.wgsl").into()),
        });

        let bind_group_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("dusk lighting blur bgl"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                texture_entry(1),
                sampler_entry(2),
            ],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("dusk lighting blur pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("dusk lighting blur pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: strip_primitive(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
    }
}

/// Matches `BlurUniforms` in `blur.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct BlurUniforms {
    direction: [f32; 2],
    uv_scale: [f32; 2],
    uv_clamp: [f32; 2],
    _pad0: [f32; 2],
    weights: [[f32; 4]; 2],
    tap_radius: u32,
    _pad1: [u32; 3],
}

impl BlurUniforms {
    fn new(pass: &BlurPass<'_>, src_texture: TargetSize) -> Self {
        let tex_w = src_texture.width.max(1) as f32;
        let tex_h = src_texture.height.max(1) as f32;
        let content_w = pass.src_size.width.min(src_texture.width).max(1) as f32;
        let content_h = pass.src_size.height.min(src_texture.height).max(1) as f32;

        let direction = match pass.direction {
            BlurDirection::Horizontal => [pass.step / tex_w, 0.0],
            BlurDirection::Vertical => [0.0, pass.step / tex_h],
        };

        let mut weights = [[0.0f32; 4]; 2];
        let taps = pass.weights.len().min(MAX_HALF_KERNEL);
        for (i, w) in pass.weights.iter().take(taps).enumerate() {
            weights[i / 4][i % 4] = *w;
        }

        Self {
            direction,
            uv_scale: [content_w / tex_w, content_h / tex_h],
            uv_clamp: [(content_w - 0.5) / tex_w, (content_h - 0.5) / tex_h],
            _pad0: [0.0; 2],
            weights,
            tap_radius: taps.saturating_sub(1) as u32,
            _pad1: [0; 3],
        }
    }
}
