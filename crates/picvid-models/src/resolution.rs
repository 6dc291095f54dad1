//! Output resolution definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pixel dimensions of an output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Create a new frame size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Available slideshow layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// 1080x1920 for phone screens
    #[default]
    Portrait,
    /// 1920x1080
    Landscape,
    /// 1080x1080
    Square,
}

impl Resolution {
    /// Frame dimensions for this layout.
    pub const fn frame_size(&self) -> FrameSize {
        match self {
            Resolution::Portrait => FrameSize::new(1080, 1920),
            Resolution::Landscape => FrameSize::new(1920, 1080),
            Resolution::Square => FrameSize::new(1080, 1080),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Portrait => "portrait",
            Resolution::Landscape => "landscape",
            Resolution::Square => "square",
        }
    }

    /// Parse a layout name, falling back to the default for unknown values.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = ResolutionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // exact names only
        match s {
            "portrait" => Ok(Resolution::Portrait),
            "landscape" => Ok(Resolution::Landscape),
            "square" => Ok(Resolution::Square),
            _ => Err(ResolutionParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown resolution: {0}")]
pub struct ResolutionParseError(pub String);
