use crate::render::lighting::{LightingError, TargetDesc, TargetSize};

use super::common::{TARGET_USAGE, texture_format};

/// A lighting render target on the GPU.
pub(super) struct GpuTarget {
    pub desc: TargetDesc,
    pub format: wgpu::TextureFormat,
    pub size: TargetSize,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTarget {
    pub(super) fn new(device: &wgpu::Device, desc: &TargetDesc, size: TargetSize) -> Self {
        let format = texture_format(desc);
        let size = TargetSize::new(size.width.max(1), size.height.max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: TARGET_USAGE,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { desc: *desc, format, size, texture, view }
    }
}

/// Power-of-two sized scratch textures shared by blur and composite.
///
/// Textures are bucketed by configuration and size; a returned texture is
/// reused by the next borrow of a matching bucket.
#[derive(Default)]
pub(super) struct TexturePool {
    free: Vec<GpuTarget>,
    borrowed: usize,
    limit: Option<usize>,
}

impl TexturePool {
    pub(super) fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit), ..Self::default() }
    }

    /// Bucket size for a request.
    pub(super) fn bucket(size: TargetSize) -> TargetSize {
        TargetSize::new(
            size.width.max(1).next_power_of_two(),
            size.height.max(1).next_power_of_two(),
        )
    }

    pub(super) fn borrow(
        &mut self,
        device: &wgpu::Device,
        desc: &TargetDesc,
        size: TargetSize,
    ) -> Result<GpuTarget, LightingError> {
        if self.limit.is_some_and(|limit| self.borrowed >= limit) {
            return Err(LightingError::TexturePoolExhausted {
                width: size.width,
                height: size.height,
            });
        }

        let bucket = Self::bucket(size);
        let target = match self.free.iter().position(|t| t.desc == *desc && t.size == bucket) {
            Some(i) => self.free.swap_remove(i),
            None => {
                log::debug!("lighting | pool texture {}x{}", bucket.width, bucket.height);
                GpuTarget::new(device, desc, bucket)
            }
        };

        self.borrowed += 1;
        Ok(target)
    }

    pub(super) fn give_back(&mut self, target: GpuTarget) {
        self.borrowed = self.borrowed.saturating_sub(1);
        self.free.push(target);
    }

    pub(super) fn borrowed(&self) -> usize {
        self.borrowed
    }

    #[cfg(test)]
    pub(super) fn idle(&self) -> usize {
        self.free.len()
    }

    /// Drops every idle texture.
    pub(super) fn clear(&mut self) {
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_round_up_to_powers_of_two() {
        assert_eq!(TexturePool::bucket(TargetSize::new(100, 50)), TargetSize::new(128, 64));
        assert_eq!(TexturePool::bucket(TargetSize::new(64, 1)), TargetSize::new(64, 1));
        assert_eq!(TexturePool::bucket(TargetSize::new(0, 0)), TargetSize::new(1, 1));
    }
}
