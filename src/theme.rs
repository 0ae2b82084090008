//! Colours: btop-style theme files (`theme[key]="#hex"`) and block palettes.

use crate::Palette;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Distinct block colours a palette provides.
pub const BLOCK_COLORS: usize = 6;

const ONEDARK_BLOCKS: [&str; BLOCK_COLORS] =
    ["#E06C75", "#61AFEF", "#98C379", "#E5C07B", "#C678DD", "#56B6C2"];
const HIGH_CONTRAST_BLOCKS: [&str; BLOCK_COLORS] =
    ["#FF0000", "#0088FF", "#00FF00", "#FFFF00", "#FF00FF", "#00FFFF"];
/// Tol's bright scheme; no red/green pair relies on hue alone.
const COLORBLIND_BLOCKS: [&str; BLOCK_COLORS] =
    ["#EE7733", "#0077BB", "#009988", "#BBBB00", "#EE3377", "#33BBEE"];

/// Theme keys consulted for each block colour, first match wins.
const BLOCK_KEYS: [&[&str]; BLOCK_COLORS] = [
    &["cpu_end", "temp_end"],
    &["cpu_box"],
    &["mem_box", "cpu_start"],
    &["title", "cpu_mid"],
    &["net_box"],
    &["hi_fg", "proc_misc"],
];

#[derive(Debug, Clone)]
pub struct Theme {
    /// Block colours by colour index.
    pub blocks: [Color; BLOCK_COLORS],
    /// Board background.
    pub bg: Color,
    /// Border.
    pub div_line: Color,
    /// Sidebar text.
    pub main_fg: Color,
    /// Titles and the keyboard cursor.
    pub title: Color,
    /// Secondary text (hints).
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark()
    }
}

impl Theme {
    pub fn onedark() -> Self {
        Self {
            blocks: ONEDARK_BLOCKS.map(hex_or_gray),
            bg: Color::Rgb(0x28, 0x2C, 0x34),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
        }
    }

    /// Theme from a btop-style file, or One Dark when `path` is None or missing.
    /// The palette then overrides block colours.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?)),
            _ => Self::onedark(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => self.blocks = HIGH_CONTRAST_BLOCKS.map(hex_or_gray),
            Palette::Colorblind => self.blocks = COLORBLIND_BLOCKS.map(hex_or_gray),
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let fallback = Self::onedark();
        let mut blocks = fallback.blocks;
        for (slot, keys) in blocks.iter_mut().zip(BLOCK_KEYS) {
            if let Some(c) = keys.iter().find_map(|k| get(k)) {
                *slot = c;
            }
        }
        Self {
            blocks,
            bg: get("main_bg").or_else(|| get("meter_bg")).unwrap_or(fallback.bg),
            div_line: get("div_line").unwrap_or(fallback.div_line),
            main_fg: get("main_fg").unwrap_or(fallback.main_fg),
            title: get("title").unwrap_or(fallback.title),
            inactive_fg: get("inactive_fg").unwrap_or(fallback.inactive_fg),
        }
    }

    #[inline]
    pub fn block_color(&self, color: u8) -> Color {
        self.blocks[usize::from(color) % BLOCK_COLORS]
    }
}

fn hex_or_gray(s: &str) -> Color {
    parse_hex(s).unwrap_or(Color::Gray)
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(digits.to_string());
    let channel = |range: std::ops::Range<usize>| {
        digits
            .get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(bad)
    };
    match digits.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(bad()),
    }
}
