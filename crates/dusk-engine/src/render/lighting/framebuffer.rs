use crate::coords::{Affine2, Rect, Viewport};
use crate::paint::Rgb;

use super::backend::{LightingBackend, StagePass, TargetId, TargetSize};
use super::blur::{BlurFilterList, SharedBlur, TextureBlur};
use super::composite::LightingCompositeShader;
use super::config::PerformanceConfig;
use super::error::LightingError;
use super::region::{RegionSource, SCENE_REGION, SceneBaseline};
use super::stage::LightingStage;
use super::targets::{DARKNESS_COLOR, DARKNESS_LEVEL, DAYLIGHT_COLOR, RenderTargetSet, TARGET_COUNT};

/// Configured strength is halved for lighting.
const BLUR_STRENGTH_FACTOR: f32 = 0.5;
const BLUR_PASSES: u32 = 2;
/// Gaussian taps across the full kernel (pixi's `kernelSize`), so the
/// half-width is 2 samples either side of the center.
const BLUR_KERNEL_SIZE: u32 = 5;

/// What the renderer sees this frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenView {
    pub viewport: Viewport,
    /// World to screen pixels.
    pub transform: Affine2,
}

impl ScreenView {
    pub fn new(viewport: Viewport, transform: Affine2) -> Self {
        Self { viewport, transform }
    }
}

/// Result of [`LightingFramebuffer::update`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    /// Not invalidated; nothing was looked at.
    Idle,
    /// Nothing visible changed and the previous frame was already empty.
    Skipped,
    /// The targets were rendered, and composited when `composited`.
    Rendered { composited: bool },
}

/// Renders lighting regions into darkness level, daylight color and darkness
/// color targets, and composites them into the daylight target.
///
/// Driven per frame as `draw` (on setup or resize), `refresh` (when regions
/// change) and `update` (every tick; only works while invalidated).
#[derive(Debug)]
pub struct LightingFramebuffer {
    stage: LightingStage,
    targets: RenderTargetSet,
    composite: LightingCompositeShader,
    blur: Option<SharedBlur>,
    baseline: Option<SceneBaseline>,
    invalidated: bool,
}

impl Default for LightingFramebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LightingFramebuffer {
    pub const NAME: &'static str = "lighting";

    pub fn new() -> Self {
        Self {
            stage: LightingStage::new(),
            targets: RenderTargetSet::default(),
            composite: LightingCompositeShader::new(),
            blur: None,
            baseline: None,
            invalidated: false,
        }
    }

    #[inline]
    pub fn stage(&self) -> &LightingStage {
        &self.stage
    }

    /// Target handles and clear colors for downstream compositing.
    #[inline]
    pub fn targets(&self) -> &RenderTargetSet {
        &self.targets
    }

    /// The daylight target, which holds the composited lighting after a
    /// blurred frame.
    #[inline]
    pub fn output(&self) -> Option<TargetId> {
        self.targets.ids().map(|ids| ids[DAYLIGHT_COLOR])
    }

    #[inline]
    pub fn blur(&self) -> Option<&SharedBlur> {
        self.blur.as_ref()
    }

    #[inline]
    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Requests an update on the next tick.
    #[inline]
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    /// Sets up the stage and the blur for the current performance settings.
    pub fn draw(&mut self, config: &PerformanceConfig, filters: &mut BlurFilterList) {
        self.stage.renderable = true;

        if let Some(old) = self.blur.take() {
            filters.remove(&old);
        }

        if config.blur.enabled {
            let blur = TextureBlur::new(
                config.blur.strength * BLUR_STRENGTH_FACTOR,
                BLUR_PASSES,
                BLUR_KERNEL_SIZE,
            );
            self.blur = Some(filters.add(blur));
        }
    }

    /// Rebuilds the mesh list from `regions`.
    ///
    /// A region draws only when it differs from the scene baseline or
    /// overlaps a region drawn before it. Target creation is deferred to the
    /// next `update`, which knows the screen size.
    pub fn refresh<R: RegionSource + ?Sized>(&mut self, regions: &R) -> Result<(), LightingError> {
        let scene = regions
            .region(SCENE_REGION)
            .ok_or_else(|| LightingError::MissingSceneRegion { name: SCENE_REGION.to_owned() })?;
        let baseline = SceneBaseline::from(scene);
        let blur = self.blur.is_some();

        self.stage.clear();
        self.stage.renderable = true;

        self.targets.set_clear_color(DARKNESS_LEVEL, Rgb::scalar(baseline.darkness_level));
        self.targets.set_clear_color(
            DAYLIGHT_COLOR,
            if blur { baseline.colors.ambient_daylight } else { baseline.colors.background },
        );
        self.targets.set_clear_color(DARKNESS_COLOR, baseline.colors.ambient_darkness);

        let mut flagged: Vec<Rect> = Vec::new();

        for region in regions.active_regions() {
            let mesh = self.stage.add_mesh(region.draw_mesh());
            mesh.renderable = false;

            if region.differs_from(&baseline) || flagged.iter().any(|b| b.intersects(region.bounds)) {
                mesh.renderable = true;
                if blur {
                    mesh.uniforms.colors[DAYLIGHT_COLOR] = region.colors.ambient_daylight;
                }
                flagged.push(region.bounds);
            }
        }

        log::debug!(
            "{} | refreshed {} regions ({} drawn)",
            Self::NAME,
            self.stage.len(),
            flagged.len()
        );

        self.baseline = Some(baseline);
        self.invalidate();
        Ok(())
    }

    /// Creates the render targets if needed.
    pub fn acquire<B: LightingBackend + ?Sized>(&mut self, backend: &mut B, size: TargetSize) {
        self.targets.acquire(backend, size);
    }

    pub fn release<B: LightingBackend + ?Sized>(&mut self, backend: &mut B) {
        self.targets.release(backend);
    }

    /// Drops the meshes, unregisters the blur and releases the targets.
    pub fn tear_down<B: LightingBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        filters: &mut BlurFilterList,
    ) {
        self.stage.clear();
        if let Some(blur) = self.blur.take() {
            filters.remove(&blur);
        }
        self.release(backend);
        self.baseline = None;
        self.invalidated = false;
    }

    /// Renders, blurs and composites the lighting targets if invalidated.
    ///
    /// On error the frame stays invalidated so the next tick retries it.
    pub fn update<B: LightingBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        view: &ScreenView,
    ) -> Result<FrameOutcome, LightingError> {
        if !self.invalidated {
            return Ok(FrameOutcome::Idle);
        }
        let Some(baseline) = self.baseline else {
            self.invalidated = false;
            return Ok(FrameOutcome::Idle);
        };

        let screen = view.viewport.rect();
        self.stage.update_transforms(view.transform);

        let empty = self.scan_meshes(screen);
        let renderable = !empty.iter().all(|e| *e);

        if !renderable && !self.stage.renderable {
            self.stage.restore_pass_overrides();
            self.invalidated = false;
            log::debug!("{} | skipped", Self::NAME);
            return Ok(FrameOutcome::Skipped);
        }

        self.stage.renderable = renderable;
        let blur = self.blur.clone();

        if blur.is_some() && !renderable {
            self.targets.set_clear_color(DAYLIGHT_COLOR, baseline.colors.background);
        }

        let screen_size = TargetSize::from_viewport(view.viewport);
        let ids = self.targets.acquire(backend, screen_size);
        if renderable {
            self.targets.resize(backend, screen_size);
        }

        let draws = self.stage.collect_draws(screen);
        backend.render_stage(&StagePass {
            targets: ids,
            clear_colors: self.targets.clear_colors(),
            draws: &draws,
        });
        self.stage.restore_pass_overrides();

        let mut composited = false;
        if let Some(blur) = blur {
            let blur = blur.borrow();
            let desc = *self.targets.desc();
            let size = self.targets.size();
            for (i, id) in ids.into_iter().enumerate() {
                if !empty[i] {
                    blur.apply(backend, &desc, id, size)?;
                }
            }

            if renderable {
                self.composite.composite(backend, &self.targets, ids)?;
                composited = true;
            } else {
                self.targets.set_clear_color(DAYLIGHT_COLOR, baseline.colors.ambient_daylight);
            }
        }

        self.invalidated = false;
        log::debug!("{} | rendered", Self::NAME);
        Ok(FrameOutcome::Rendered { composited })
    }

    /// Marks off-screen candidates as skipped, disables culling for every
    /// candidate, and returns which targets would only see their clear color.
    fn scan_meshes(&mut self, screen: Rect) -> [bool; TARGET_COUNT] {
        let clear = self.targets.clear_colors();
        let mut empty = [true; TARGET_COUNT];

        for mesh in self.stage.meshes_mut() {
            if !mesh.is_candidate() {
                continue;
            }

            if screen.intersects(mesh.screen_bounds()) {
                for (i, is_empty) in empty.iter_mut().enumerate() {
                    if *is_empty {
                        *is_empty = mesh.uniforms.colors[i] == clear[i];
                    }
                }
            } else {
                mesh.skip_this_pass = true;
            }

            mesh.cullable = false;
        }

        empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::lighting::composite::composite_pixel;
    use crate::render::lighting::region::{Region, RegionColors, RegionSet};
    use crate::render::lighting::testing::{Call, RecordingBackend};

    fn colors() -> RegionColors {
        RegionColors {
            background: Rgb::from_hex(0x808080),
            ambient_daylight: Rgb::WHITE,
            ambient_darkness: Rgb::from_hex(0x20203a),
        }
    }

    fn view() -> ScreenView {
        ScreenView::new(Viewport::new(100.0, 50.0), Affine2::IDENTITY)
    }

    fn scene() -> Region {
        Region::new(SCENE_REGION, Rect::new(0.0, 0.0, 100.0, 50.0), 0.0, colors())
    }

    fn blur_on() -> PerformanceConfig {
        PerformanceConfig::default()
    }

    fn blur_off() -> PerformanceConfig {
        PerformanceConfig::low()
    }

    fn setup(config: PerformanceConfig) -> (LightingFramebuffer, BlurFilterList) {
        let mut fb = LightingFramebuffer::new();
        let mut filters = BlurFilterList::new();
        fb.draw(&config, &mut filters);
        (fb, filters)
    }

    fn renderable_flags(fb: &LightingFramebuffer) -> Vec<bool> {
        fb.stage().meshes().iter().map(|m| m.renderable).collect()
    }

    // ── draw ──────────────────────────────────────────────────────────────

    #[test]
    fn draw_registers_a_single_blur() {
        let (mut fb, mut filters) = setup(blur_on());
        assert_eq!(filters.len(), 1);
        assert_eq!(fb.blur().map(|b| b.borrow().strength), Some(4.0));

        fb.draw(&blur_on(), &mut filters);
        assert_eq!(filters.len(), 1);

        fb.draw(&blur_off(), &mut filters);
        assert!(filters.is_empty());
        assert!(fb.blur().is_none());
    }

    // ── refresh ───────────────────────────────────────────────────────────

    #[test]
    fn missing_scene_is_an_error_and_changes_nothing() {
        let (mut fb, _) = setup(blur_off());
        let regions: RegionSet = [Region::new("a", Rect::default(), 0.5, colors())].into_iter().collect();

        let err = fb.refresh(&regions);
        assert_eq!(err, Err(LightingError::MissingSceneRegion { name: "Scene".into() }));
        assert!(fb.stage().is_empty());
        assert!(!fb.is_invalidated());
    }

    #[test]
    fn refresh_sets_clear_colors_from_scene() {
        let regions: RegionSet = [Region::new(SCENE_REGION, Rect::default(), 0.25, colors())]
            .into_iter()
            .collect();

        let (mut fb, _) = setup(blur_off());
        fb.refresh(&regions).unwrap();
        assert_eq!(
            fb.targets().clear_colors(),
            [Rgb::scalar(0.25), colors().background, colors().ambient_darkness]
        );
        assert!(fb.is_invalidated());

        let (mut fb, _) = setup(blur_on());
        fb.refresh(&regions).unwrap();
        assert_eq!(fb.targets().clear_color(DAYLIGHT_COLOR), colors().ambient_daylight);
    }

    #[test]
    fn baseline_regions_draw_only_when_overlapping_a_drawn_region() {
        let mut changed = colors();
        changed.background = Rgb::BLACK;

        let regions: RegionSet = [
            scene(),
            Region::new("dark", Rect::new(0.0, 0.0, 10.0, 10.0), 0.0, changed),
            Region::new("over", Rect::new(5.0, 5.0, 10.0, 10.0), 0.0, colors()),
            Region::new("chain", Rect::new(12.0, 12.0, 10.0, 10.0), 0.0, colors()),
            Region::new("far", Rect::new(60.0, 30.0, 5.0, 5.0), 0.0, colors()),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_off());
        fb.refresh(&regions).unwrap();
        assert_eq!(renderable_flags(&fb), [false, true, true, true, false]);
    }

    #[test]
    fn flagging_follows_region_order() {
        let regions: RegionSet = [
            scene(),
            Region::new("before", Rect::new(5.0, 5.0, 10.0, 10.0), 0.0, colors()),
            Region::new("dark", Rect::new(0.0, 0.0, 10.0, 10.0), 0.5, colors()),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_off());
        fb.refresh(&regions).unwrap();
        assert_eq!(renderable_flags(&fb), [false, false, true]);
    }

    #[test]
    fn blur_substitutes_ambient_daylight_on_drawn_meshes() {
        let mut dusk = colors();
        dusk.ambient_daylight = Rgb::from_hex(0xffcc88);

        let regions: RegionSet = [
            scene(),
            Region::new("dusk", Rect::new(0.0, 0.0, 10.0, 10.0), 0.5, dusk),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_on());
        fb.refresh(&regions).unwrap();
        let meshes = fb.stage().meshes();
        assert_eq!(meshes[0].uniforms.colors[DAYLIGHT_COLOR], colors().background);
        assert_eq!(meshes[1].uniforms.colors[DAYLIGHT_COLOR], dusk.ambient_daylight);
    }

    // ── update ────────────────────────────────────────────────────────────

    #[test]
    fn update_without_invalidation_is_idle() {
        let (mut fb, _) = setup(blur_on());
        let mut backend = RecordingBackend::new();
        assert_eq!(fb.update(&mut backend, &view()), Ok(FrameOutcome::Idle));
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn baseline_region_off_screen_stops_rendering() {
        let regions: RegionSet = [
            scene(),
            Region::new("far", Rect::new(500.0, 500.0, 10.0, 10.0), 0.0, colors()),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_off());
        let mut backend = RecordingBackend::new();
        fb.refresh(&regions).unwrap();

        // The first frame after a refresh clears the targets once.
        assert_eq!(
            fb.update(&mut backend, &view()),
            Ok(FrameOutcome::Rendered { composited: false })
        );
        assert!(!fb.stage().renderable);
        let clear = fb.targets().clear_colors();

        backend.calls.clear();
        for _ in 0..2 {
            fb.invalidate();
            assert_eq!(fb.update(&mut backend, &view()), Ok(FrameOutcome::Skipped));
        }
        assert!(backend.calls.is_empty());
        assert_eq!(fb.targets().clear_colors(), clear);
        assert!(fb.stage().meshes().iter().all(|m| m.cullable && !m.skips_this_pass()));
    }

    #[test]
    fn dark_region_on_screen_is_drawn_and_composited() {
        let regions: RegionSet = [
            scene(),
            Region::new("cave", Rect::new(10.0, 10.0, 20.0, 20.0), 1.0, colors()),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_on());
        let mut backend = RecordingBackend::new();
        fb.refresh(&regions).unwrap();

        assert_eq!(
            fb.update(&mut backend, &view()),
            Ok(FrameOutcome::Rendered { composited: true })
        );
        assert!(fb.stage().renderable);
        assert!(!fb.is_invalidated());

        let Some(Call::RenderStage { targets, draws, .. }) = backend.stage_passes().first().copied().cloned()
        else {
            panic!("no stage pass");
        };
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].colors[DARKNESS_LEVEL], Rgb::scalar(1.0));

        // Only the level target saw content, so only it is blurred.
        let blurred: Vec<TargetId> = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::BlurPass { dst, .. } if targets.contains(dst) => Some(*dst),
                _ => None,
            })
            .collect();
        assert_eq!(blurred, [targets[DARKNESS_LEVEL]]);

        assert_eq!(backend.count(|c| matches!(c, Call::Composite { .. })), 1);
        assert_eq!(backend.borrowed, 0);

        let covered = composite_pixel(
            draws[0].colors[DARKNESS_LEVEL],
            colors().ambient_daylight,
            colors().ambient_darkness,
        );
        assert_eq!(covered, colors().ambient_darkness);
    }

    #[test]
    fn blur_with_nothing_visible_restores_ambient_daylight() {
        let mut regions: RegionSet = [
            scene(),
            Region::new("cave", Rect::new(10.0, 10.0, 20.0, 20.0), 1.0, colors()),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_on());
        let mut backend = RecordingBackend::new();
        fb.refresh(&regions).unwrap();
        fb.update(&mut backend, &view()).unwrap();

        if let Some(cave) = regions.get_mut("cave") {
            cave.darkness_level = 0.0;
        }
        fb.refresh(&regions).unwrap();
        backend.calls.clear();

        assert_eq!(
            fb.update(&mut backend, &view()),
            Ok(FrameOutcome::Rendered { composited: false })
        );

        match backend.stage_passes().first() {
            Some(Call::RenderStage { clear_colors, draws, .. }) => {
                assert_eq!(clear_colors[DAYLIGHT_COLOR], colors().background);
                assert!(draws.is_empty());
            }
            other => panic!("expected stage pass, got {other:?}"),
        }
        assert_eq!(backend.count(|c| matches!(c, Call::BlurPass { .. })), 0);
        assert_eq!(fb.targets().clear_color(DAYLIGHT_COLOR), colors().ambient_daylight);
    }

    #[test]
    fn without_blur_nothing_is_blurred_or_composited() {
        let regions: RegionSet = [
            scene(),
            Region::new("cave", Rect::new(10.0, 10.0, 20.0, 20.0), 1.0, colors()),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_off());
        let mut backend = RecordingBackend::new();
        fb.refresh(&regions).unwrap();

        assert_eq!(
            fb.update(&mut backend, &view()),
            Ok(FrameOutcome::Rendered { composited: false })
        );
        assert_eq!(backend.stage_passes().len(), 1);
        assert_eq!(
            backend.count(|c| matches!(c, Call::BlurPass { .. } | Call::Composite { .. })),
            0
        );
    }

    #[test]
    fn off_screen_changes_do_not_count() {
        let regions: RegionSet = [
            scene(),
            Region::new("far", Rect::new(-50.0, 0.0, 20.0, 20.0), 1.0, colors()),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_off());
        let mut backend = RecordingBackend::new();
        fb.refresh(&regions).unwrap();
        fb.update(&mut backend, &view()).unwrap();

        assert!(!fb.stage().renderable);
        match backend.stage_passes().first() {
            Some(Call::RenderStage { draws, .. }) => assert!(draws.is_empty()),
            other => panic!("expected stage pass, got {other:?}"),
        }
    }

    #[test]
    fn view_transform_moves_regions_on_screen() {
        let regions: RegionSet = [
            scene(),
            Region::new("far", Rect::new(-50.0, 0.0, 20.0, 20.0), 1.0, colors()),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_off());
        let mut backend = RecordingBackend::new();
        fb.refresh(&regions).unwrap();

        let panned = ScreenView::new(Viewport::new(100.0, 50.0), Affine2::translation(60.0, 0.0));
        fb.update(&mut backend, &panned).unwrap();
        assert!(fb.stage().renderable);
    }

    #[test]
    fn view_transform_does_not_replace_the_stage_transform() {
        let regions: RegionSet = [
            scene(),
            Region::new("cave", Rect::new(10.0, 10.0, 20.0, 20.0), 1.0, colors()),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_off());
        let mut backend = RecordingBackend::new();
        fb.refresh(&regions).unwrap();

        let stage_offset = Affine2::translation(500.0, 0.0);
        fb.stage.transform = stage_offset;
        fb.update(&mut backend, &view()).unwrap();

        assert_eq!(fb.stage().transform, stage_offset);
        // The stage offset still applies, pushing the cave off-screen.
        assert!(!fb.stage().renderable);
    }

    #[test]
    fn targets_follow_the_screen_when_rendering() {
        let regions: RegionSet = [
            scene(),
            Region::new("cave", Rect::new(0.0, 0.0, 20.0, 20.0), 1.0, colors()),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_off());
        let mut backend = RecordingBackend::new();
        fb.refresh(&regions).unwrap();
        fb.update(&mut backend, &view()).unwrap();
        assert_eq!(fb.targets().size(), TargetSize::new(100, 50));

        fb.invalidate();
        let wide = ScreenView::new(Viewport::new(200.5, 50.0), Affine2::IDENTITY);
        fb.update(&mut backend, &wide).unwrap();
        assert_eq!(fb.targets().size(), TargetSize::new(201, 50));
        assert_eq!(backend.count(|c| matches!(c, Call::Resize { .. })), TARGET_COUNT);
    }

    #[test]
    fn pool_exhaustion_keeps_the_frame_invalidated() {
        let regions: RegionSet = [
            scene(),
            Region::new("cave", Rect::new(10.0, 10.0, 20.0, 20.0), 1.0, colors()),
        ]
        .into_iter()
        .collect();

        let (mut fb, _) = setup(blur_on());
        let mut backend = RecordingBackend::new().with_pool_limit(0);
        fb.refresh(&regions).unwrap();

        let err = fb.update(&mut backend, &view());
        assert_eq!(err, Err(LightingError::TexturePoolExhausted { width: 50, height: 25 }));
        assert!(fb.is_invalidated());
        assert_eq!(backend.borrowed, 0);
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn tear_down_releases_everything() {
        let regions: RegionSet = [scene()].into_iter().collect();
        let (mut fb, mut filters) = setup(blur_on());
        let mut backend = RecordingBackend::new();
        fb.refresh(&regions).unwrap();
        fb.update(&mut backend, &view()).unwrap();
        assert!(fb.output().is_some());

        fb.tear_down(&mut backend, &mut filters);

        assert!(fb.stage().is_empty());
        assert!(fb.output().is_none());
        assert!(filters.is_empty());
        assert_eq!(backend.count(|c| matches!(c, Call::Destroy(_))), TARGET_COUNT);
        assert_eq!(fb.update(&mut backend, &view()), Ok(FrameOutcome::Idle));
    }
}
