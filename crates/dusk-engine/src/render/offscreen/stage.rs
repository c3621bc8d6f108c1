use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::render::RenderCtx;
use crate::render::lighting::{MeshDraw, TargetSize};

use super::common::uniform_entry;

/// Draws region meshes into the three lighting targets in one pass.
///
/// Every target is cleared to its clear color first; meshes then overwrite
/// the pixels they cover.
#[derive(Default)]
pub(super) struct StageRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
}

/// Attachments of one stage pass.
pub(super) struct StageTargets<'t> {
    pub views: [&'t wgpu::TextureView; 3],
    pub format: wgpu::TextureFormat,
    pub size: TargetSize,
    pub clear: [wgpu::Color; 3],
}

impl StageRenderer {
    pub(super) fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        targets: &StageTargets<'_>,
        draws: &[MeshDraw],
    ) {
        self.ensure_pipeline(ctx, targets.format);

        let vertices: Vec<RegionVertex> = draws
            .iter()
            .flat_map(|draw| {
                let [level, daylight, darkness] = draw.colors.map(|c| c.to_array());
                draw.vertices.iter().map(move |p| RegionVertex {
                    pos: p.to_array(),
                    level,
                    daylight,
                    darkness,
                })
            })
            .collect();

        let resources = match (self.bind_group_layout.as_ref(), vertices.is_empty()) {
            (Some(bgl), false) => {
                let viewport = ViewportUniform { size: targets.size.to_array(), _pad: [0.0; 2] };
                let viewport_ubo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("dusk lighting stage viewport ubo"),
                    contents: bytemuck::bytes_of(&viewport),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("dusk lighting stage bind group"),
                    layout: bgl,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: viewport_ubo.as_entire_binding(),
                    }],
                });
                let vbo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("dusk lighting stage vbo"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                Some((bind_group, vbo))
            }
            _ => None,
        };

        let color_attachments = [0, 1, 2].map(|i| {
            Some(wgpu::RenderPassColorAttachment {
                view: targets.views[i],
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(targets.clear[i]),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })
        });

        // The pass clears all three targets even when nothing draws.
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("dusk lighting stage pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let Some((bind_group, vbo)) = resources.as_ref() else { return };
        let Some(pipeline) = self.pipeline.as_ref() else { return };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.draw(0..vertices.len() as u32, 0..1);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("dusk lighting region shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/region.wgsl").into()),
        });

        let bind_group_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("dusk lighting stage bgl"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("dusk lighting stage pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let target = Some(wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("dusk lighting stage pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[RegionVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[target.clone(), target.clone(), target],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
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

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    size: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct RegionVertex {
    pos: [f32; 2],
    level: [f32; 3],
    daylight: [f32; 3],
    darkness: [f32; 3],
}

impl RegionVertex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x3, // level
        2 => Float32x3, // daylight
        3 => Float32x3  // darkness
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RegionVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}
