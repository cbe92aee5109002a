//! Color Palette Generation
//!
//! Deterministic palettes parameterized by genre, sentiment and tone, with a
//! WCAG contrast rating for the text/background pair.

use crate::constants::design::{DEFAULT_HUE, PALETTE_VERSION};
use crate::types::{
    ColorPalette, ContentProfile, Genre, Harmony, PaletteMood, Result, TypecraftError, WcagLevel,
};

pub const DEFAULT_BACKGROUND: &str = "#FDFEFE";
pub const DEFAULT_TEXT: &str = "#1C1C1C";
pub const PURE_WHITE: &str = "#FFFFFF";
pub const PURE_BLACK: &str = "#000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    pub const WHITE: Self = Self { r: 255, g: 255, b: 255 };
    /// Default body text (#1C1C1C)
    pub const INK: Self = Self { r: 28, g: 28, b: 28 };
    /// Default page background (#FDFEFE)
    pub const PAPER: Self = Self { r: 253, g: 254, b: 254 };

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parse `#RRGGBB` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypecraftError::DesignFailed(format!(
                "Invalid color '{}' (expected #RRGGBB)",
                hex
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| TypecraftError::DesignFailed(format!("Invalid color '{}': {}", hex, e)))
        };
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// WCAG 2.x relative luminance
    pub fn relative_luminance(self) -> f64 {
        let linear = |c: u8| {
            let c = c as f64 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
    }
}

/// Hue in degrees, saturation and lightness in [0, 1]
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Rgb {
    let h = hue.rem_euclid(360.0) / 360.0;
    let (r, g, b) = if saturation == 0.0 {
        (lightness, lightness, lightness)
    } else {
        let q = if lightness < 0.5 {
            lightness * (1.0 + saturation)
        } else {
            lightness + saturation - lightness * saturation
        };
        let p = 2.0 * lightness - q;
        (
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
        )
    };
    let byte = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb {
        r: byte(r),
        g: byte(g),
        b: byte(b),
    }
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Contrast ratio between two colors, in [1, 21]
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let (la, lb) = (a.relative_luminance(), b.relative_luminance());
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

fn genre_hue(genre: Genre) -> f64 {
    match genre {
        Genre::Mystery => 270.0,
        Genre::Romance => 340.0,
        Genre::Scifi => 200.0,
        Genre::Fantasy => 280.0,
        Genre::Technical | Genre::Business => 210.0,
        Genre::Fiction | Genre::Academic | Genre::Unknown => DEFAULT_HUE,
    }
}

pub fn primary_hue(profile: &ContentProfile) -> f64 {
    let sentiment = profile.sentiment;
    let mut hue = genre_hue(profile.primary_genre);
    if sentiment > 0.3 {
        hue = 45.0;
    } else if sentiment < -0.3 {
        hue = 240.0;
    }
    match profile.primary_genre {
        Genre::Romance if sentiment > 0.0 => 350.0,
        Genre::Mystery if sentiment < 0.0 => 260.0,
        _ => hue,
    }
}

pub fn harmony(profile: &ContentProfile) -> Harmony {
    if profile.tone.academic > 0.7 {
        Harmony::Analogous
    } else if profile.tone.creative > 0.7 {
        Harmony::Triadic
    } else if profile.technical_density > 0.5 {
        Harmony::Complementary
    } else {
        Harmony::Analogous
    }
}

pub fn mood(profile: &ContentProfile) -> PaletteMood {
    if profile.sentiment > 0.3 {
        PaletteMood::Bright
    } else if profile.sentiment < -0.3 {
        PaletteMood::Dark
    } else if profile.formality > 0.7 {
        PaletteMood::Professional
    } else if profile.tone.creative > 0.7 {
        PaletteMood::Vibrant
    } else {
        PaletteMood::Balanced
    }
}

fn rationale(genre: Genre, mood: PaletteMood, harmony: Harmony) -> String {
    let curated = match (genre, mood) {
        (Genre::Fiction, PaletteMood::Bright) => "Warm, inviting colors for engaging storytelling",
        (Genre::Fiction, PaletteMood::Dark) => "Cool, subdued tones for contemplative narrative",
        (Genre::Fiction, PaletteMood::Professional) => "Restrained palette for serious literary work",
        (Genre::Fiction, PaletteMood::Vibrant) => "Dynamic colors for expressive storytelling",
        (Genre::Fiction, PaletteMood::Balanced) => "Harmonious colors for traditional fiction",
        (Genre::Mystery, PaletteMood::Dark) => "Deep, shadowed tones for a suspenseful atmosphere",
        (Genre::Mystery, PaletteMood::Professional) => "Sophisticated colors for detective stories",
        (Genre::Mystery, PaletteMood::Balanced) => "Intriguing palette for mystery novels",
        (Genre::Romance, PaletteMood::Bright) => "Soft, romantic colors for love stories",
        (Genre::Romance, PaletteMood::Vibrant) => "Passionate tones for contemporary romance",
        (Genre::Technical, PaletteMood::Professional) => {
            "Clean, professional palette for technical content"
        }
        (Genre::Technical, PaletteMood::Balanced) => "Clear colors for technical documentation",
        (Genre::Academic, PaletteMood::Professional) => "Scholarly palette for academic work",
        (Genre::Academic, PaletteMood::Balanced) => "Traditional colors for research publication",
        _ => "",
    };
    if curated.is_empty() {
        format!("{} {} palette for {} content", harmony, mood, genre)
    } else {
        curated.to_string()
    }
}

/// Generate the palette for a profile
pub fn generate_palette(profile: &ContentProfile) -> ColorPalette {
    let hue = primary_hue(profile);
    let harmony = harmony(profile);
    let mood = mood(profile);

    let saturation = if profile.formality > 0.7 {
        0.4
    } else if profile.formality < 0.3 {
        0.8
    } else {
        0.6
    };
    let lightness = if profile.complexity > 0.7 { 0.35 } else { 0.4 };
    let primary = hsl_to_rgb(hue, saturation, lightness);

    let (secondary_offset, accent_offset) = match harmony {
        Harmony::Analogous => (30.0, -30.0),
        Harmony::Complementary => (180.0, 200.0),
        Harmony::Triadic => (120.0, 240.0),
    };
    let secondary = hsl_to_rgb(hue + secondary_offset, 0.5, 0.5);
    let accent_saturation = if profile.tone.creative > 0.6 { 0.85 } else { 0.7 };
    let accent = hsl_to_rgb(hue + accent_offset, accent_saturation, 0.55);

    let (text, background) = if profile.tone.academic > 0.7 {
        (Rgb::BLACK, Rgb::WHITE)
    } else {
        (Rgb::INK, Rgb::PAPER)
    };
    let contrast = contrast_ratio(text, background);

    ColorPalette {
        primary: primary.to_hex(),
        secondary: secondary.to_hex(),
        accent: accent.to_hex(),
        background: background.to_hex(),
        text: text.to_hex(),
        harmony,
        primary_hue: hue,
        contrast_ratio: contrast,
        wcag_level: WcagLevel::from_ratio(contrast),
        mood,
        rationale: rationale(profile.primary_genre, mood, harmony),
        version: PALETTE_VERSION.to_string(),
    }
}
