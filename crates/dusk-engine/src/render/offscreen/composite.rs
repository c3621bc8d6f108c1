use wgpu::util::DeviceExt;

use crate::render::RenderCtx;
use crate::render::lighting::{CompositeUniforms, TargetSize};

use super::common::{QuadVertex, sampler_entry, strip_primitive, texture_entry, uniform_entry};

/// Composite program, compiled once per device and output format.
#[derive(Default)]
pub(super) struct CompositeRenderer {
    pipeline_key: Option<(wgpu::TextureFormat, bool)>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
}

/// Resources bound for one composite draw.
pub(super) struct CompositeBindings<'t> {
    pub dst: &'t wgpu::TextureView,
    pub dst_format: wgpu::TextureFormat,
    pub dst_size: TargetSize,
    pub darkness_level: &'t wgpu::TextureView,
    pub daylight_color: &'t wgpu::TextureView,
    pub darkness_color: &'t wgpu::TextureView,
    pub sampler: &'t wgpu::Sampler,
}

impl CompositeRenderer {
    pub(super) fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        quad: &wgpu::Buffer,
        bindings: &CompositeBindings<'_>,
        uniforms: &CompositeUniforms,
        blend: bool,
    ) {
        self.ensure_pipeline(ctx, bindings.dst_format, blend);
        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        // Uniforms get their own buffer so several composites can share an
        // encoder.
        let ubo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("dusk lighting composite ubo"),
            contents: bytemuck::bytes_of(uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("dusk lighting composite bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(bindings.darkness_level),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(bindings.daylight_color),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(bindings.darkness_color),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(bindings.sampler),
                },
            ],
        });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("dusk lighting composite pass"),
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

        let size = bindings.dst_size;
        rpass.set_viewport(0.0, 0.0, size.width as f32, size.height as f32, 0.0, 1.0);
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.set_vertex_buffer(0, quad.slice(..));
        rpass.draw(0..4, 0..1);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, format: wgpu::TextureFormat, blend: bool) {
        if self.pipeline_key == Some((format, blend)) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("dusk lighting composite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/composite.wgsl").into()),
        });

        let bind_group_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("dusk lighting composite bgl"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX),
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                sampler_entry(4),
            ],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("dusk lighting composite pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("dusk lighting composite pipeline"),
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
                    blend: blend.then_some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: strip_primitive(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("lighting | compiled composite pipeline for {format:?}");

        self.pipeline_key = Some((format, blend));
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
    }
}
