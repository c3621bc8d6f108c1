//! Coordinate and geometry types shared by the lighting pipeline.
//!
//! Canonical CPU space:
//! - Pixels, origin top-left
//! - +X right, +Y down
//!
//! World-space geometry reaches screen space through an [`Affine2`]; shaders
//! convert screen pixels to NDC using the render target size.

mod affine;
mod rect;
mod vec2;
mod viewport;

pub use affine::Affine2;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
