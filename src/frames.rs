//! Built-in spinner frame sets.

/// Braille dots.
pub const DOTS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Classic ASCII line.
pub const LINE: &[&str] = &["|", "/", "-", "\\"];

pub const ARROW: &[&str] = &["←", "↖", "↑", "↗", "→", "↘", "↓", "↙"];

/// Used whenever a caller supplies no usable frames.
pub const FALLBACK: &[&str] = &["-", "+"];

/// Owned copy of a static frame set.
pub fn to_owned(frames: &[&str]) -> Vec<String> {
    frames.iter().map(|f| f.to_string()).collect()
}

/// Drop empty glyphs; an empty result falls back to [`FALLBACK`].
pub fn normalize(frames: Vec<String>) -> Vec<String> {
    let frames: Vec<String> = frames.into_iter().filter(|f| !f.is_empty()).collect();
    if frames.is_empty() {
        to_owned(FALLBACK)
    } else {
        frames
    }
}
