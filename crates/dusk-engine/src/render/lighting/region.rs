use crate::coords::{Rect, Vec2};
use crate::paint::Rgb;

use super::mesh::{LightingMesh, MeshGeometry, MeshUniforms};

/// Name of the region every other region is compared against.
pub const SCENE_REGION: &str = "Scene";

/// Ambient colors of a region.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct RegionColors {
    pub background: Rgb,
    pub ambient_daylight: Rgb,
    pub ambient_darkness: Rgb,
}

/// A lighting region: a darkness level and ambient colors over an area.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    /// In `[0, 1]`; 0 is full daylight.
    pub darkness_level: f32,
    pub colors: RegionColors,
    /// World-space bounds.
    pub bounds: Rect,
    /// World-space shape.
    pub geometry: MeshGeometry,
    pub active: bool,
}

impl Region {
    /// Rectangular region covering `bounds`.
    pub fn new(name: impl Into<String>, bounds: Rect, darkness_level: f32, colors: RegionColors) -> Self {
        Self {
            name: name.into(),
            darkness_level: darkness_level.clamp(0.0, 1.0),
            colors,
            bounds,
            geometry: MeshGeometry::quad(bounds),
            active: true,
        }
    }

    /// Replaces the shape with a convex polygon; bounds follow the points.
    pub fn with_polygon(mut self, points: &[Vec2]) -> Self {
        self.geometry = MeshGeometry::convex_polygon(points);
        self.bounds = self.geometry.bounds().unwrap_or_default();
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Builds the mesh drawn into the lighting targets.
    ///
    /// The daylight slot carries the background color; callers that blur
    /// substitute the ambient daylight color.
    pub fn draw_mesh(&self) -> LightingMesh {
        LightingMesh::new(
            self.geometry.clone(),
            MeshUniforms {
                colors: [
                    Rgb::scalar(self.darkness_level),
                    self.colors.background,
                    self.colors.ambient_darkness,
                ],
            },
        )
    }

    /// True when this region changes something relative to `baseline`.
    ///
    /// Ambient daylight is not compared: it only matters once a region is
    /// drawn for another reason.
    pub fn differs_from(&self, baseline: &SceneBaseline) -> bool {
        self.darkness_level != baseline.darkness_level
            || self.colors.background != baseline.colors.background
            || self.colors.ambient_darkness != baseline.colors.ambient_darkness
    }
}

/// Uniform lighting of the whole scene, taken from [`SCENE_REGION`].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct SceneBaseline {
    pub darkness_level: f32,
    pub colors: RegionColors,
}

impl From<&Region> for SceneBaseline {
    fn from(region: &Region) -> Self {
        Self { darkness_level: region.darkness_level, colors: region.colors }
    }
}

/// Supplies lighting regions.
///
/// `active_regions` must return regions in a stable order: whether a region
/// is drawn can depend on regions listed before it.
pub trait RegionSource {
    fn active_regions(&self) -> Vec<&Region>;

    fn region(&self, name: &str) -> Option<&Region>;
}

/// In-memory region source, ordered by insertion.
#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, region: Region) {
        self.regions.push(region);
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl FromIterator<Region> for RegionSet {
    fn from_iter<I: IntoIterator<Item = Region>>(iter: I) -> Self {
        Self { regions: iter.into_iter().collect() }
    }
}

impl RegionSource for RegionSet {
    fn active_regions(&self) -> Vec<&Region> {
        self.regions.iter().filter(|r| r.active).collect()
    }

    fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }
}
