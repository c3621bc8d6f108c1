//! Texture readback from GPU to CPU.

use std::sync::mpsc::channel;

use anyhow::{Context, Result, bail};

use crate::render::RenderCtx;
use crate::render::lighting::TargetSize;

const BYTES_PER_PIXEL: u32 = 4;
const ROW_ALIGN: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Copies the top-left `size` pixels of an RGBA8 `texture` into tightly
/// packed rows.
///
/// Blocks until the GPU has finished all submitted work.
pub(super) fn read_rgba8(
    ctx: &RenderCtx<'_>,
    texture: &wgpu::Texture,
    format: wgpu::TextureFormat,
    size: TargetSize,
) -> Result<Vec<u8>> {
    if format != wgpu::TextureFormat::Rgba8Unorm {
        bail!("readback supports Rgba8Unorm targets only, got {format:?}");
    }

    let row_bytes = size.width * BYTES_PER_PIXEL;
    let padded_bpr = row_bytes.div_ceil(ROW_ALIGN) * ROW_ALIGN;
    let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("dusk lighting readback"),
        size: u64::from(padded_bpr) * u64::from(size.height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("dusk lighting readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr),
                rows_per_image: Some(size.height),
            },
        },
        wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit([encoder.finish()]);

    let slice = buffer.slice(..);
    let (sender, receiver) = channel();
    slice.map_async(wgpu::MapMode::Read, move |res| {
        drop(sender.send(res));
    });
    ctx.device
        .poll(wgpu::PollType::Wait { submission_index: None, timeout: None })
        .context("waiting for readback")?;
    receiver
        .recv()
        .context("readback callback dropped")?
        .context("mapping readback buffer")?;

    let mapped = slice.get_mapped_range();
    let row = row_bytes as usize;
    let mut data = Vec::with_capacity(row * size.height as usize);
    for chunk in mapped.chunks(padded_bpr as usize).take(size.height as usize) {
        data.extend_from_slice(&chunk[..row]);
    }
    drop(mapped);
    buffer.unmap();

    Ok(data)
}
