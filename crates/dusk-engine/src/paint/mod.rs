//! Color model for the lighting pipeline.
//!
//! Lighting colors are opaque linear RGB triples. Exact equality matters:
//! a render target is considered empty when every visible mesh wrote its
//! clear color, and that test compares channels bit for bit.

pub mod color;

pub use color::Rgb;
