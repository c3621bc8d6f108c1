/// Renderer-facing context (device + queue).
///
/// This is intentionally small and stable. Offscreen renderers keep their
/// own cached GPU objects and receive a `RenderCtx` per frame.
#[derive(Copy, Clone)]
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { device, queue }
    }
}
