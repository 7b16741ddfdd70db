//! Avatar style catalog.
//!
//! Each style maps to a descriptor fragment that slots into the synthesis
//! prompt template. Identifiers use the SCREAMING_SNAKE spelling clients and
//! storage share.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Rendering style chosen for a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvatarStyle {
    /// Exaggerated features, bright colours.
    Cartoonish,
    /// Claymation figure.
    Clay,
    /// Disney-inspired.
    Disney,
    /// Flat shapes and bold colours.
    Flat,
    /// Pencil sketch.
    HandDrawn,
    /// Detailed linework.
    Illustrated,
    /// Glowing outlines.
    Neon,
    /// 8-bit pixels.
    Pixelated,
    /// Low-poly geometry.
    Polygon,
    /// Comic book pop art.
    PopArt,
    /// Lifelike portrait.
    Realistic,
    /// 80s vintage look.
    Retro,
    /// Cut-out sticker.
    Sticker,
    /// Sculpted 3D render.
    ThreeDimensional,
}

/// Error raised when a style identifier is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown avatar style: {0}")]
pub struct UnknownStyleError(pub String);

impl AvatarStyle {
    /// Every style, in catalog order.
    pub const ALL: [Self; 14] = [
        Self::Cartoonish,
        Self::Clay,
        Self::Disney,
        Self::Flat,
        Self::HandDrawn,
        Self::Illustrated,
        Self::Neon,
        Self::Pixelated,
        Self::Polygon,
        Self::PopArt,
        Self::Realistic,
        Self::Retro,
        Self::Sticker,
        Self::ThreeDimensional,
    ];

    /// Stable identifier used on the wire and in storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cartoonish => "CARTOONISH",
            Self::Clay => "CLAY",
            Self::Disney => "DISNEY",
            Self::Flat => "FLAT",
            Self::HandDrawn => "HAND_DRAWN",
            Self::Illustrated => "ILLUSTRATED",
            Self::Neon => "NEON",
            Self::Pixelated => "PIXELATED",
            Self::Polygon => "POLYGON",
            Self::PopArt => "POP_ART",
            Self::Realistic => "REALISTIC",
            Self::Retro => "RETRO",
            Self::Sticker => "STICKER",
            Self::ThreeDimensional => "THREE_DIMENSIONAL",
        }
    }

    /// Descriptor fragment substituted for `[STYLE]` in the synthesis prompt.
    pub const fn descriptor(self) -> &'static str {
        match self {
            Self::Cartoonish => {
                "illustrated in a fun, cartoonish style with exaggerated features and bright colors"
            }
            Self::Clay => {
                "modeled in a claymation style, resembling a clay figure with a textured surface and soft, rounded shapes"
            }
            Self::Disney => {
                "designed in a Disney-inspired style, with large expressive eyes, smooth shading, and a whimsical, magical feel"
            }
            Self::Flat => {
                "illustrated in a flat style, using simple shapes, bold colors, and minimal shading"
            }
            Self::HandDrawn => {
                "illustrated in a hand-drawn style, featuring pencil lines, sketch details, and subtle shadings"
            }
            Self::Illustrated => {
                "illustrated in a detailed art style, with intricate linework and soft color gradients"
            }
            Self::Neon => {
                "designed in a neon style, with bright, glowing outlines and vibrant, electric colors"
            }
            Self::Pixelated => {
                "created in a pixelated style, using small, square pixels with an 8-bit retro video game look"
            }
            Self::Polygon => {
                "rendered in a polygon style, with angular, geometric shapes and a low-poly 3D appearance"
            }
            Self::PopArt => {
                "illustrated in a pop art style, with bold outlines, bright contrasting colors, and a comic book effect"
            }
            Self::Realistic => {
                "portrayed in a realistic style, with lifelike textures, detailed facial features, and natural lighting"
            }
            Self::Retro => {
                "designed in a retro style, with a vintage color palette, grainy texture, and 80s-inspired aesthetics"
            }
            Self::Sticker => {
                "illustrated in a sticker style, with clean outlines, simple colors, and a playful, cut-out appearance"
            }
            Self::ThreeDimensional => {
                "rendered in a 3D style, with realistic lighting, shadows, and a smooth, sculpted look"
            }
        }
    }
}

impl fmt::Display for AvatarStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvatarStyle {
    type Err = UnknownStyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| UnknownStyleError(s.to_owned()))
    }
}
