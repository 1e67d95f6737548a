//! CSS resolution for the three style inputs.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::settings::StyleInput;

/// A colour unpacked from a packed 32-bit RGBA integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack a colour stored low byte first: byte 0 is red, byte 3 is alpha.
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            r: (packed & 0xff) as u8,
            g: ((packed >> 8) & 0xff) as u8,
            b: ((packed >> 16) & 0xff) as u8,
            a: ((packed >> 24) & 0xff) as u8,
        }
    }

    /// Inverse of [`Rgba::from_packed`].
    pub const fn to_packed(self) -> u32 {
        (self.r as u32) | ((self.g as u32) << 8) | ((self.b as u32) << 16) | ((self.a as u32) << 24)
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional). Six digits
    /// imply an opaque colour.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let component = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::new(component(0)?, component(2)?, component(4)?, 0xff)),
            8 => Some(Self::new(
                component(0)?,
                component(2)?,
                component(4)?,
                component(6)?,
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Font selection as stored in the settings `font` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontDescriptor {
    #[serde(default)]
    pub face: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub size: u32,
}

/// Produce the stylesheet for the current style input.
///
/// File-backed CSS resolves to whatever the watcher last delivered; nothing
/// is read from disk here.
pub fn resolve_css(input: &StyleInput) -> String {
    match input {
        StyleInput::Css(css) => css.clone(),
        StyleInput::CssFile { css, .. } => css.clone().unwrap_or_default(),
        StyleInput::Colors {
            background,
            foreground,
            font,
        } => generated_css(*background, *foreground, font.as_ref()),
    }
}

/// Body rule synthesised from colours and an optional font.
pub fn generated_css(background: Rgba, foreground: Rgba, font: Option<&FontDescriptor>) -> String {
    let mut css = String::from("body {\n");
    let _ = writeln!(css, "\tbackground-color: {background};");
    let _ = writeln!(css, "\tcolor: {foreground};");
    if let Some(font) = font {
        let _ = writeln!(css, "\tfont-family: \"{}\";", font.face);
        let _ = writeln!(css, "\tfont-style: \"{}\";", font.style);
        let _ = writeln!(css, "\tfont-size: {}px;", font.size);
    }
    css.push_str("\tmargin: 0px 0px;\n");
    css.push_str("\toverflow: hidden;\n");
    css.push('}');
    css
}
