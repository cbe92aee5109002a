//! Design Types
//!
//! Typographic system produced by the design synthesizer: a font pair, a
//! color palette rated for text contrast, and a page margin record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{Result, TypecraftError};

// =============================================================================
// Fonts
// =============================================================================

/// Mood tag attached to every font pair in the pairing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontMood {
    Classic,
    Modern,
    Technical,
    Academic,
    Romantic,
    Dark,
    Scholarly,
    Accessible,
    Clean,
    Delicate,
    Contemporary,
    Sophisticated,
    Epic,
    Mystical,
    Futuristic,
    Minimalist,
    Corporate,
    Confident,
}

impl fmt::Display for FontMood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_value(self).map_err(|_| fmt::Error)?;
        f.write_str(json.as_str().unwrap_or_default())
    }
}

/// Body/heading font combination with an optional code face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontPair {
    pub body: String,
    pub heading: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monospace: Option<String>,
    pub mood: FontMood,
    pub rationale: String,
}

/// A candidate pair with its profile score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFontPair {
    pub pair: FontPair,
    pub score: f64,
}

// =============================================================================
// Colors
// =============================================================================

/// Hue relationship between primary, secondary and accent colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Harmony {
    Analogous,
    Complementary,
    Triadic,
}

impl fmt::Display for Harmony {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analogous => write!(f, "analogous"),
            Self::Complementary => write!(f, "complementary"),
            Self::Triadic => write!(f, "triadic"),
        }
    }
}

/// WCAG legibility rating of the text/background pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WcagLevel {
    #[serde(rename = "AAA")]
    Aaa,
    #[serde(rename = "AA")]
    Aa,
    #[serde(rename = "AA Large")]
    AaLarge,
    #[serde(rename = "Fail")]
    Fail,
}

impl WcagLevel {
    /// Map a contrast ratio to its rating
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 7.0 {
            Self::Aaa
        } else if ratio >= 4.5 {
            Self::Aa
        } else if ratio >= 3.0 {
            Self::AaLarge
        } else {
            Self::Fail
        }
    }
}

impl fmt::Display for WcagLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aaa => write!(f, "AAA"),
            Self::Aa => write!(f, "AA"),
            Self::AaLarge => write!(f, "AA Large"),
            Self::Fail => write!(f, "Fail"),
        }
    }
}

/// Overall emotional register of a palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteMood {
    Bright,
    Dark,
    Professional,
    Vibrant,
    Balanced,
}

impl fmt::Display for PaletteMood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bright => write!(f, "bright"),
            Self::Dark => write!(f, "dark"),
            Self::Professional => write!(f, "professional"),
            Self::Vibrant => write!(f, "vibrant"),
            Self::Balanced => write!(f, "balanced"),
        }
    }
}

/// Colors are `#RRGGBB` uppercase hex strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
    pub harmony: Harmony,
    pub primary_hue: f64,
    pub contrast_ratio: f64,
    pub wcag_level: WcagLevel,
    pub mood: PaletteMood,
    pub rationale: String,
    pub version: String,
}

// =============================================================================
// Page Geometry
// =============================================================================

/// Margins in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    pub top: f64,
    pub bottom: f64,
    pub inner: f64,
    pub outer: f64,
}

/// Trim sizes the renderers know how to lay out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    A4,
    A5,
    Letter,
    #[default]
    #[serde(rename = "6x9")]
    SixByNine,
    #[serde(rename = "5x8")]
    FiveByEight,
}

impl PageFormat {
    /// Width and height in millimetres
    pub fn dimensions_mm(&self) -> (f64, f64) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::A5 => (148.0, 210.0),
            Self::Letter => (215.9, 279.4),
            Self::SixByNine => (152.4, 228.6),
            Self::FiveByEight => (127.0, 203.2),
        }
    }

    /// Margin base: the inner margin for the 2:3:4:6 canon
    pub fn margin_base_mm(&self) -> f64 {
        match self {
            Self::A4 | Self::Letter => 25.0,
            Self::SixByNine => 20.0,
            Self::A5 | Self::FiveByEight => 18.0,
        }
    }

    /// CSS `size` token
    pub fn css_size(&self) -> String {
        match self {
            Self::A4 => "A4".to_string(),
            Self::A5 => "A5".to_string(),
            Self::Letter => "letter".to_string(),
            _ => {
                let (w, h) = self.dimensions_mm();
                format!("{}mm {}mm", w, h)
            }
        }
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A4 => write!(f, "a4"),
            Self::A5 => write!(f, "a5"),
            Self::Letter => write!(f, "letter"),
            Self::SixByNine => write!(f, "6x9"),
            Self::FiveByEight => write!(f, "5x8"),
        }
    }
}

impl FromStr for PageFormat {
    type Err = TypecraftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "a4" => Ok(Self::A4),
            "a5" => Ok(Self::A5),
            "letter" => Ok(Self::Letter),
            "6x9" => Ok(Self::SixByNine),
            "5x8" => Ok(Self::FiveByEight),
            other => Err(TypecraftError::Config(format!(
                "Unknown page format '{}' (expected a4, a5, letter, 6x9, 5x8)",
                other
            ))),
        }
    }
}

// =============================================================================
// Grid
// =============================================================================

/// Column structure of the paged layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    /// Plain prose
    #[default]
    Single,
    /// Manuals and code-heavy text
    Two,
    Three,
    /// Mixed figures and tables
    Six,
    Twelve,
}

impl GridKind {
    pub fn columns(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Six => 6,
            Self::Twelve => 12,
        }
    }

    /// Space between columns in em
    pub fn gutter_em(self) -> f64 {
        match self {
            Self::Single => 0.0,
            Self::Two => 1.5,
            Self::Three => 1.0,
            Self::Six => 0.75,
            Self::Twelve => 0.5,
        }
    }

    /// Columns a figure occupies, so that figures can sit side by side
    pub fn figure_span(self) -> u8 {
        match self {
            Self::Single | Self::Two | Self::Three => 1,
            Self::Six => 3,
            Self::Twelve => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Two => "two",
            Self::Three => "three",
            Self::Six => "six",
            Self::Twelve => "twelve",
        }
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub kind: GridKind,
    pub columns: u8,
    pub gutter_em: f64,
    pub baseline_em: f64,
}

impl GridLayout {
    pub fn new(kind: GridKind) -> Self {
        Self {
            kind,
            columns: kind.columns(),
            gutter_em: kind.gutter_em(),
            baseline_em: crate::constants::design::GRID_BASELINE_EM,
        }
    }

    pub fn is_single(&self) -> bool {
        self.columns <= 1
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new(GridKind::Single)
    }
}

// =============================================================================
// Design Result
// =============================================================================

/// Complete typographic system for one manuscript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignResult {
    /// Chosen pair (first recommendation unless overridden)
    pub fonts: FontPair,
    /// Ranked recommendations, best first
    pub font_recommendations: Vec<ScoredFontPair>,
    pub palette: ColorPalette,
    pub margins: PageMargins,
    pub page_format: PageFormat,
    #[serde(default)]
    pub grid: GridLayout,
}

/// Caller-supplied palette overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteOverride {
    pub primary: Option<String>,
    pub text: Option<String>,
    pub background: Option<String>,
}

/// Caller-supplied design overrides; absent fields keep the synthesized value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomDesign {
    pub body_font: Option<String>,
    pub heading_font: Option<String>,
    pub palette: Option<PaletteOverride>,
    pub margins: Option<PageMargins>,
    pub page_format: Option<PageFormat>,
}

impl CustomDesign {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
