//! GPU rendering subsystem.
//!
//! `lighting` holds the backend-agnostic lighting pipeline: regions, meshes,
//! the render target set, blur and composite state, and the controller that
//! drives them each frame. `offscreen` implements the GPU abstraction the
//! pipeline talks to on top of wgpu.
//!
//! Convention:
//! - CPU geometry is in pixels (top-left origin, +Y down).
//! - Vertex shaders convert to NDC using the render target size.

mod ctx;
pub mod lighting;
pub mod offscreen;

pub use ctx::RenderCtx;
