use crate::coords::{Affine2, Rect};

use super::backend::MeshDraw;
use super::mesh::LightingMesh;

/// Flat container of lighting meshes, drawn in insertion order.
#[derive(Debug, Clone)]
pub struct LightingStage {
    pub renderable: bool,
    pub transform: Affine2,
    pub alpha: f32,
    meshes: Vec<LightingMesh>,
}

impl Default for LightingStage {
    fn default() -> Self {
        Self {
            renderable: true,
            transform: Affine2::IDENTITY,
            alpha: 1.0,
            meshes: Vec::new(),
        }
    }
}

impl LightingStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: LightingMesh) -> &mut LightingMesh {
        self.meshes.push(mesh);
        let last = self.meshes.len() - 1;
        &mut self.meshes[last]
    }

    pub fn clear(&mut self) {
        self.meshes.clear();
    }

    pub fn meshes(&self) -> &[LightingMesh] {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut [LightingMesh] {
        &mut self.meshes
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Recomputes world transforms relative to `parent`.
    ///
    /// The stage is not attached to `parent`; it is only used as the root of
    /// this computation.
    pub fn update_transforms(&mut self, parent: Affine2) {
        let world = parent * self.transform;
        let alpha = self.alpha;
        for mesh in &mut self.meshes {
            mesh.set_world(world, alpha);
        }
    }

    /// Meshes that draw this pass, as screen-space triangle lists.
    ///
    /// A non-renderable stage draws nothing. Cullable meshes outside `screen`
    /// are dropped.
    pub fn collect_draws(&self, screen: Rect) -> Vec<MeshDraw> {
        if !self.renderable {
            return Vec::new();
        }

        self.meshes
            .iter()
            .filter(|m| m.is_candidate() && !m.skips_this_pass())
            .filter(|m| !m.cullable || screen.intersects(m.screen_bounds()))
            .map(LightingMesh::to_draw)
            .collect()
    }

    /// Clears per-pass skip flags and re-enables culling.
    pub fn restore_pass_overrides(&mut self) {
        for mesh in &mut self.meshes {
            mesh.restore_pass_overrides();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::lighting::mesh::{MeshGeometry, MeshUniforms};

    fn quad_mesh(rect: Rect) -> LightingMesh {
        LightingMesh::new(MeshGeometry::quad(rect), MeshUniforms::default())
    }

    #[test]
    fn update_transforms_composes_parent_stage_and_mesh() {
        let mut stage = LightingStage::new();
        stage.transform = Affine2::translation(10.0, 0.0);
        stage.alpha = 0.5;
        stage.add_mesh(quad_mesh(Rect::new(0.0, 0.0, 1.0, 1.0))).transform =
            Affine2::scale(2.0, 2.0);

        stage.update_transforms(Affine2::translation(0.0, 7.0));

        let mesh = &stage.meshes()[0];
        assert_eq!(mesh.screen_bounds(), Rect::new(10.0, 7.0, 2.0, 2.0));
        assert_eq!(mesh.world_alpha(), 0.5);
    }

    #[test]
    fn non_renderable_stage_collects_nothing() {
        let mut stage = LightingStage::new();
        stage.add_mesh(quad_mesh(Rect::new(0.0, 0.0, 4.0, 4.0)));
        stage.update_transforms(Affine2::IDENTITY);
        stage.renderable = false;
        assert!(stage.collect_draws(Rect::new(0.0, 0.0, 8.0, 8.0)).is_empty());
    }

    #[test]
    fn collect_draws_honors_skip_and_cull_flags() {
        let screen = Rect::new(0.0, 0.0, 8.0, 8.0);
        let mut stage = LightingStage::new();
        stage.add_mesh(quad_mesh(Rect::new(0.0, 0.0, 4.0, 4.0)));
        stage.add_mesh(quad_mesh(Rect::new(20.0, 20.0, 4.0, 4.0)));
        stage.add_mesh(quad_mesh(Rect::new(2.0, 2.0, 4.0, 4.0))).skip_this_pass = true;
        stage.update_transforms(Affine2::IDENTITY);

        // Off-screen cullable mesh is dropped.
        assert_eq!(stage.collect_draws(screen).len(), 1);

        // With culling disabled it draws.
        stage.meshes_mut()[1].cullable = false;
        assert_eq!(stage.collect_draws(screen).len(), 2);

        stage.restore_pass_overrides();
        assert!(stage.meshes().iter().all(|m| m.cullable && !m.skips_this_pass()));
        assert_eq!(stage.collect_draws(screen).len(), 2);
    }
}
