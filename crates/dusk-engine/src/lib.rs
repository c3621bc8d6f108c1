//! Dusk engine crate.
//!
//! Offscreen lighting for a 2D tabletop renderer: darkness level, daylight
//! color and darkness color are rendered into three targets, optionally
//! blurred, and composited into a single lighting buffer.

pub mod device;
pub mod logging;
pub mod coords;
pub mod paint;
pub mod render;
