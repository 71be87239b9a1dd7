use ab_glyph::FontVec;
use anyhow::{bail, Context, Result};
use tracing::debug;

/// Environment override for the prompt font; any TTF/OTF path works.
pub const FONT_ENV: &str = "PERCEPT_FONT";

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load the face used for on-screen prompts: the environment override if
/// set, otherwise the first usable face from the well-known system paths.
pub fn load_default() -> Result<FontVec> {
    if let Ok(path) = std::env::var(FONT_ENV) {
        let bytes =
            std::fs::read(&path).with_context(|| format!("cannot read font {path}"))?;
        return FontVec::try_from_vec(bytes)
            .with_context(|| format!("{path} is not a usable font"));
    }
    for candidate in SYSTEM_FONTS {
        if let Ok(bytes) = std::fs::read(candidate) {
            if let Ok(font) = FontVec::try_from_vec(bytes) {
                debug!(font = candidate, "prompt font selected");
                return Ok(font);
            }
        }
    }
    bail!("no usable font found; set {FONT_ENV} to a TTF or OTF path");
}
