use crate::{cover::CoverGallery, extract::ColorExtractor};
use anyhow::{anyhow, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::{collections::HashMap, fmt};

pub const DEFAULT_FADE: Rgb = Rgb::new(0x0a, 0x0a, 0x0a);

pub const DYNAMIC_BG_ANGLE: u16 = 80;
pub const DYNAMIC_BG_ALPHA: f32 = 0.9;
pub const PLAYBACK_ANGLE: u16 = 95;
pub const PLAYBACK_ALPHA: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

// Renders as `linear-gradient(<angle>deg, rgba(r,g,b,<alpha>),#rrggbb)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearGradient {
    pub angle_deg: u16,
    pub color: Rgb,
    pub alpha: f32,
    pub fade_to: Rgb,
}

impl LinearGradient {
    pub fn to_css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LinearGradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Rgb { r, g, b } = self.color;
        let fade = self.fade_to;
        write!(
            f,
            "linear-gradient({}deg, rgba({r},{g},{b},{}),#{:02x}{:02x}{:02x})",
            self.angle_deg, self.alpha, fade.r, fade.g, fade.b
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSource {
    Cached,
    Extracted,
    Fallback,
    Recovered,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backdrop {
    pub color: Rgb,
    pub source: ColorSource,
    pub dynamic_bg: LinearGradient,
    pub playback: LinearGradient,
}

impl Backdrop {
    pub fn new(color: Rgb, source: ColorSource, fade_to: Rgb) -> Self {
        Self {
            color,
            source,
            dynamic_bg: LinearGradient {
                angle_deg: DYNAMIC_BG_ANGLE,
                color,
                alpha: DYNAMIC_BG_ALPHA,
                fade_to,
            },
            playback: LinearGradient {
                angle_deg: PLAYBACK_ANGLE,
                color,
                alpha: PLAYBACK_ALPHA,
                fade_to,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPalette {
    colors: Vec<Rgb>,
}

impl Default for FallbackPalette {
    fn default() -> Self {
        Self {
            colors: vec![
                Rgb::new(30, 215, 96),
                Rgb::new(75, 145, 239),
                Rgb::new(233, 69, 96),
                Rgb::new(255, 184, 0),
            ],
        }
    }
}

impl FallbackPalette {
    pub fn new(colors: Vec<Rgb>) -> Option<Self> {
        if colors.is_empty() {
            None
        } else {
            Some(Self { colors })
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> Rgb {
        self.colors[0]
    }

    /// `palette[index mod len]`, or the first entry when there is no index.
    pub fn pick(&self, index: Option<usize>) -> Rgb {
        match index {
            Some(index) => self.colors[index % self.colors.len()],
            None => self.first(),
        }
    }
}

/// Cache, then cover extraction, then fallback palette. Only extracted
/// colors are cached.
pub struct Colorizer {
    extractor: Box<dyn ColorExtractor>,
    palette: FallbackPalette,
    fade_to: Rgb,
    cache: HashMap<usize, Rgb>,
}

impl Colorizer {
    pub fn new(extractor: Box<dyn ColorExtractor>, palette: FallbackPalette, fade_to: Rgb) -> Self {
        Self {
            extractor,
            palette,
            fade_to,
            cache: HashMap::new(),
        }
    }

    pub fn palette(&self) -> &FallbackPalette {
        &self.palette
    }

    pub fn cached(&self, track_index: usize) -> Option<Rgb> {
        self.cache.get(&track_index).copied()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn apply_background(
        &mut self,
        track_index: Option<usize>,
        covers: &CoverGallery,
    ) -> Backdrop {
        let (color, source) = self.resolve(track_index, covers);
        Backdrop::new(color, source, self.fade_to)
    }

    fn resolve(&mut self, track_index: Option<usize>, covers: &CoverGallery) -> (Rgb, ColorSource) {
        let Some(index) = track_index else {
            let color = self.palette.first();
            debug!("Using fallback color {color} for unspecified track");
            return (color, ColorSource::Fallback);
        };

        if let Some(color) = self.cached(index) {
            debug!("Using cached color for track {index}: {color}");
            return (color, ColorSource::Cached);
        }

        match covers.get(index).filter(|cover| cover.is_ready()) {
            Some(cover) => match self.extractor.dominant_color(cover) {
                Ok(color) => {
                    self.cache.insert(index, color);
                    debug!(
                        "Extracted color from {}: {color}",
                        cover.source().display()
                    );
                    (color, ColorSource::Extracted)
                }
                Err(err) => {
                    warn!("Error applying colors for track {index}: {err}");
                    (self.palette.first(), ColorSource::Recovered)
                }
            },
            None => {
                let color = self.palette.pick(Some(index));
                debug!("Using fallback color for track {index}: {color}");
                (color, ColorSource::Fallback)
            }
        }
    }

    // Overwrites any existing entry.
    pub fn precache(&mut self, track_index: usize, covers: &CoverGallery) -> Option<Rgb> {
        let cover = covers.get(track_index).filter(|cover| cover.is_ready())?;
        match self.extractor.dominant_color(cover) {
            Ok(color) => {
                self.cache.insert(track_index, color);
                debug!("Pre-cached color for track {track_index}: {color}");
                Some(color)
            }
            Err(err) => {
                debug!("Could not pre-cache color for track {track_index}: {err}");
                None
            }
        }
    }
}

pub fn parse_color(value: &str) -> Result<Rgb> {
    let v = value.trim();
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex_color(hex);
    }
    if let Some(rest) = v.strip_prefix("rgb(") {
        return parse_rgb_components(rest.trim_end_matches(')'));
    }
    Err(anyhow!("Unsupported color format: {v}"))
}

fn parse_hex_color(hex: &str) -> Result<Rgb> {
    let value = hex.trim();
    let expanded = match value.len() {
        3 => value.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => value.to_string(),
        _ => return Err(anyhow!("Invalid hex color: #{value}")),
    };
    let bytes =
        u32::from_str_radix(&expanded, 16).map_err(|_| anyhow!("Invalid hex color: #{value}"))?;
    Ok(Rgb::new(
        ((bytes >> 16) & 0xFF) as u8,
        ((bytes >> 8) & 0xFF) as u8,
        (bytes & 0xFF) as u8,
    ))
}

fn parse_rgb_components(input: &str) -> Result<Rgb> {
    let parts: Vec<_> = input.split(',').map(|p| p.trim()).collect();
    if parts.len() != 3 {
        return Err(anyhow!("rgb expects 3 components"));
    }
    Ok(Rgb::new(
        parse_component(parts[0])?,
        parse_component(parts[1])?,
        parse_component(parts[2])?,
    ))
}

fn parse_component(src: &str) -> Result<u8> {
    let value: f32 = src
        .parse()
        .map_err(|_| anyhow!("Invalid color channel: {src}"))?;
    if !(0.0..=255.0).contains(&value) {
        return Err(anyhow!("Color channel out of range: {src}"));
    }
    Ok(value.round() as u8)
}
