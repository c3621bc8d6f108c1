//! Offscreen lighting pipeline.
//!
//! Regions are turned into meshes on `refresh`, drawn into three targets
//! (darkness level, daylight color, darkness color) on `update`, optionally
//! blurred, and composited into the daylight target. All GPU work goes
//! through [`LightingBackend`].

mod backend;
mod blur;
mod composite;
mod config;
mod error;
mod framebuffer;
mod mesh;
mod region;
mod stage;
mod targets;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    BlurDirection, BlurPass, CompositeInputs, LightingBackend, MeshDraw, PooledTarget,
    SampleType, ScaleMode, StagePass, TargetDesc, TargetFormat, TargetId, TargetSize,
};
pub use blur::{BlurFilterList, SharedBlur, TextureBlur, gaussian_kernel, MAX_HALF_KERNEL};
pub use composite::{
    CompositeUniforms, DrawState, LightingCompositeShader, composite_pixel, texture_coord_scale,
};
pub use config::{BlurConfig, PerformanceConfig};
pub use error::LightingError;
pub use framebuffer::{FrameOutcome, LightingFramebuffer, ScreenView};
pub use mesh::{LightingMesh, MeshGeometry, MeshUniforms};
pub use region::{Region, RegionColors, RegionSet, RegionSource, SCENE_REGION, SceneBaseline};
pub use stage::LightingStage;
pub use targets::{
    DARKNESS_COLOR, DARKNESS_LEVEL, DAYLIGHT_COLOR, LIGHTING_TARGET, RenderTargetSet,
    TARGET_COUNT,
};
