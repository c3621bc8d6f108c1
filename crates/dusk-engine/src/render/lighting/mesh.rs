use crate::coords::{Affine2, Rect, Vec2};
use crate::paint::Rgb;

use super::backend::MeshDraw;

/// Indexed triangle geometry in local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    pub vertices: Vec<Vec2>,
    /// Triangle list indices into `vertices`.
    pub indices: Vec<u16>,
}

impl MeshGeometry {
    /// Two triangles covering `rect`.
    pub fn quad(rect: Rect) -> Self {
        Self {
            vertices: rect.normalized().corners().to_vec(),
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// Fan triangulation of a convex polygon.
    ///
    /// Fewer than three points yields empty geometry.
    pub fn convex_polygon(points: &[Vec2]) -> Self {
        if points.len() < 3 || points.len() > usize::from(u16::MAX) {
            return Self::default();
        }

        let indices = (1..points.len() as u16 - 1)
            .flat_map(|i| [0, i, i + 1])
            .collect();

        Self { vertices: points.to_vec(), indices }
    }

    /// Local-space bounds, `None` without vertices.
    pub fn bounds(&self) -> Option<Rect> {
        Rect::from_points(self.vertices.iter().copied())
    }

    /// Triangles in index order; out-of-range indices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec2; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let a = *self.vertices.get(usize::from(tri[0]))?;
            let b = *self.vertices.get(usize::from(tri[1]))?;
            let c = *self.vertices.get(usize::from(tri[2]))?;
            Some([a, b, c])
        })
    }
}

/// Per-instance colors, one per lighting target.
///
/// - `colors[0]`: darkness level in the red channel
/// - `colors[1]`: daylight color
/// - `colors[2]`: darkness color
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct MeshUniforms {
    pub colors: [Rgb; 3],
}

/// Drawable bound to one lighting region.
#[derive(Debug, Clone, PartialEq)]
pub struct LightingMesh {
    pub geometry: MeshGeometry,
    pub transform: Affine2,
    pub uniforms: MeshUniforms,
    pub visible: bool,
    pub renderable: bool,
    pub alpha: f32,
    pub cullable: bool,

    /// Set for meshes outside the screen during the current pass.
    pub(crate) skip_this_pass: bool,

    world_transform: Affine2,
    world_alpha: f32,
}

impl LightingMesh {
    pub fn new(geometry: MeshGeometry, uniforms: MeshUniforms) -> Self {
        Self {
            geometry,
            transform: Affine2::IDENTITY,
            uniforms,
            visible: true,
            renderable: true,
            alpha: 1.0,
            cullable: true,
            skip_this_pass: false,
            world_transform: Affine2::IDENTITY,
            world_alpha: 1.0,
        }
    }

    #[inline]
    pub fn world_transform(&self) -> Affine2 {
        self.world_transform
    }

    #[inline]
    pub fn world_alpha(&self) -> f32 {
        self.world_alpha
    }

    #[inline]
    pub fn skips_this_pass(&self) -> bool {
        self.skip_this_pass
    }

    /// Visible, renderable and not fully transparent.
    #[inline]
    pub fn is_candidate(&self) -> bool {
        self.visible && self.renderable && self.world_alpha > 0.0
    }

    /// Bounds after the world transform; empty for empty geometry.
    pub fn screen_bounds(&self) -> Rect {
        self.geometry
            .bounds()
            .map(|b| self.world_transform.transform_bounds(b))
            .unwrap_or_default()
    }

    pub(crate) fn set_world(&mut self, parent: Affine2, parent_alpha: f32) {
        self.world_transform = parent * self.transform;
        self.world_alpha = parent_alpha * self.alpha;
    }

    pub(crate) fn restore_pass_overrides(&mut self) {
        self.skip_this_pass = false;
        self.cullable = true;
    }

    /// Screen-space triangle list for the stage pass.
    pub(crate) fn to_draw(&self) -> MeshDraw {
        let world = self.world_transform;
        let vertices = self
            .geometry
            .triangles()
            .flat_map(|tri| tri.map(|p| world.apply(p)))
            .collect();

        MeshDraw { vertices, colors: self.uniforms.colors }
    }
}
