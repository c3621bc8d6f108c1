//! Renders a sample lighting scene headlessly and writes the lighting buffer
//! as a PNG.
//!
//! ```text
//! dusk-studio [OUT.png] [--no-blur] [--size WxH]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use dusk_engine::coords::{Affine2, Rect, Vec2, Viewport};
use dusk_engine::device::{Gpu, GpuInit};
use dusk_engine::logging::{LoggingConfig, init_logging};
use dusk_engine::paint::Rgb;
use dusk_engine::render::lighting::{
    BlurFilterList, FrameOutcome, LightingFramebuffer, PerformanceConfig, Region, RegionColors,
    RegionSet, SCENE_REGION, ScreenView,
};
use dusk_engine::render::offscreen::WgpuLighting;

struct Args {
    out: PathBuf,
    blur: bool,
    width: u32,
    height: u32,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = Self { out: PathBuf::from("lighting.png"), blur: true, width: 640, height: 400 };

        let mut it = std::env::args().skip(1);
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--no-blur" => args.blur = false,
                "--size" => {
                    let value = it.next().context("--size needs a value like 640x400")?;
                    let (w, h) = value
                        .split_once('x')
                        .with_context(|| format!("invalid size '{value}'"))?;
                    args.width = w.parse().with_context(|| format!("invalid width '{w}'"))?;
                    args.height = h.parse().with_context(|| format!("invalid height '{h}'"))?;
                }
                flag if flag.starts_with("--") => bail!("unknown flag '{flag}'"),
                path => args.out = PathBuf::from(path),
            }
        }

        if args.width == 0 || args.height == 0 {
            bail!("size must be non-zero");
        }
        Ok(args)
    }
}

/// A dim scene with a dark cave, a dusky clearing overlapping it, and a
/// baseline patch that contributes nothing.
fn sample_regions(width: f32, height: f32) -> RegionSet {
    let scene_colors = RegionColors {
        background: Rgb::from_hex(0x9a9a90),
        ambient_daylight: Rgb::from_hex(0xfff4e0),
        ambient_darkness: Rgb::from_hex(0x1e2440),
    };

    let cave = Region::new("Cave", Rect::default(), 0.9, scene_colors).with_polygon(&[
        Vec2::new(width * 0.10, height * 0.20),
        Vec2::new(width * 0.45, height * 0.15),
        Vec2::new(width * 0.55, height * 0.60),
        Vec2::new(width * 0.30, height * 0.85),
        Vec2::new(width * 0.05, height * 0.55),
    ]);

    let clearing = Region::new(
        "Clearing",
        Rect::new(width * 0.40, height * 0.35, width * 0.45, height * 0.45),
        0.45,
        RegionColors {
            ambient_daylight: Rgb::from_hex(0xffc98a),
            ambient_darkness: Rgb::from_hex(0x402040),
            ..scene_colors
        },
    );

    let patch = Region::new(
        "Patch",
        Rect::new(width * 0.70, height * 0.05, width * 0.25, height * 0.20),
        0.1,
        scene_colors,
    );

    let unused = Region::new("Unused", Rect::new(0.0, 0.0, width, height), 1.0, scene_colors)
        .with_active(false);

    [
        Region::new(SCENE_REGION, Rect::new(0.0, 0.0, width, height), 0.1, scene_colors),
        cave,
        clearing,
        patch,
        unused,
    ]
    .into_iter()
    .collect()
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let args = Args::parse()?;

    let gpu = Gpu::new_blocking(GpuInit::default())?;
    let mut lighting = WgpuLighting::new(gpu.device());
    let mut filters = BlurFilterList::new();
    let mut framebuffer = LightingFramebuffer::new();

    let config = if args.blur { PerformanceConfig::default() } else { PerformanceConfig::low() };
    let regions = sample_regions(args.width as f32, args.height as f32);
    let view = ScreenView::new(
        Viewport::new(args.width as f32, args.height as f32),
        Affine2::IDENTITY,
    );

    framebuffer.draw(&config, &mut filters);
    framebuffer.refresh(&regions)?;

    let mut frame = lighting.begin_frame(gpu.render_ctx());
    let outcome = framebuffer.update(&mut frame, &view)?;
    frame.submit();

    match outcome {
        FrameOutcome::Rendered { composited: true } => log::info!("lighting composited"),
        FrameOutcome::Rendered { composited: false } => {
            log::info!("lighting rendered without composite (daylight target only)")
        }
        other => log::warn!("unexpected frame outcome: {other:?}"),
    }

    let id = framebuffer.output().context("lighting targets were not created")?;
    let size = lighting.target_size(id).context("lighting output target is missing")?;
    let pixels = lighting.read_target(gpu.render_ctx(), id)?;

    let image = image::RgbaImage::from_raw(size.width, size.height, pixels)
        .context("readback size does not match the target")?;
    image
        .save(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    log::info!("wrote {} ({}x{})", args.out.display(), size.width, size.height);

    let mut frame = lighting.begin_frame(gpu.render_ctx());
    framebuffer.tear_down(&mut frame, &mut filters);
    frame.submit();

    Ok(())
}
