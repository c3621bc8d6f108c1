use std::fmt;

/// Failure conditions of the lighting pipeline.
///
/// Both variants are fatal for the frame that hit them; the controller keeps
/// its previous state and can be driven again next frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightingError {
    /// The region source has no baseline region with the given name.
    ///
    /// Every other region is compared against the baseline, so nothing can be
    /// decided without it.
    MissingSceneRegion { name: String },

    /// The temporary texture pool could not hand out a target.
    TexturePoolExhausted { width: u32, height: u32 },
}

impl fmt::Display for LightingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSceneRegion { name } => {
                write!(f, "lighting: baseline region {name:?} is missing")
            }
            Self::TexturePoolExhausted { width, height } => {
                write!(f, "lighting: texture pool exhausted ({width}x{height} requested)")
            }
        }
    }
}

impl std::error::Error for LightingError {}
