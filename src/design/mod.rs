//! Design Synthesizer Module
//!
//! Maps a content profile to a typographic system:
//! - Font pair selection from a genre-indexed pairing table
//! - Color palette generation with a WCAG contrast rating
//! - Van de Graaf page margins for the configured trim size
//! - A column grid for the paged layout, from the media mix
//!
//! ## Overrides
//!
//! A [`CustomDesign`] replaces individual pieces after synthesis. Overridden
//! text or background colors are re-rated; unless the caller supplied both,
//! the text color is pushed to black or white when contrast drops below 3:1.

pub mod color;
pub mod fonts;
pub mod grid;
pub mod margins;

pub use color::{Rgb, contrast_ratio, generate_palette, hsl_to_rgb};
pub use fonts::{FONT_DB, FontDatabase, FontMetadata, default_font_db, score_pair};
pub use grid::grid_for;
pub use margins::{canon_margins, text_block_mm};

use std::sync::Arc;
use tracing::debug;

use crate::constants::design::MIN_CONTRAST;
use crate::types::{
    ColorPalette, ContentProfile, CustomDesign, DesignResult, FontPair, PageFormat, PageMargins,
    PaletteOverride, Result, TypecraftError, WcagLevel,
};

#[derive(Debug, Clone)]
pub struct DesignSynthesizer {
    fonts: Arc<FontDatabase>,
    page_format: PageFormat,
}

impl Default for DesignSynthesizer {
    fn default() -> Self {
        Self::new(default_font_db(), PageFormat::default())
    }
}

impl DesignSynthesizer {
    pub fn new(fonts: Arc<FontDatabase>, page_format: PageFormat) -> Self {
        Self { fonts, page_format }
    }

    pub fn with_page_format(mut self, page_format: PageFormat) -> Self {
        self.page_format = page_format;
        self
    }

    pub fn font_db(&self) -> &FontDatabase {
        &self.fonts
    }

    /// Fonts, palette and margins for `profile`, then any overrides
    pub fn synthesize(
        &self,
        profile: &ContentProfile,
        custom: Option<&CustomDesign>,
    ) -> Result<DesignResult> {
        let recommendations = self.fonts.recommend(profile);
        let Some(best) = recommendations.first() else {
            return Err(TypecraftError::DesignFailed(format!(
                "No font pairs available for genre '{}'",
                profile.primary_genre
            )));
        };
        let mut fonts = best.pair.clone();
        let mut palette = generate_palette(profile);
        let mut page_format = self.page_format;
        let mut margins = None;

        if let Some(custom) = custom.filter(|c| !c.is_empty()) {
            apply_font_override(&mut fonts, custom);
            if let Some(overrides) = &custom.palette {
                apply_palette_override(&mut palette, overrides)?;
            }
            if let Some(format) = custom.page_format {
                page_format = format;
            }
            if let Some(custom_margins) = custom.margins {
                validate_margins(&custom_margins)?;
                margins = Some(custom_margins);
            }
        }

        let design = DesignResult {
            fonts,
            font_recommendations: recommendations,
            palette,
            margins: margins.unwrap_or_else(|| canon_margins(page_format)),
            page_format,
            grid: grid_for(profile),
        };
        debug!(
            body = %design.fonts.body,
            heading = %design.fonts.heading,
            mood = %design.palette.mood,
            wcag = %design.palette.wcag_level,
            grid = %design.grid.kind,
            "Design synthesized"
        );
        Ok(design)
    }
}

fn apply_font_override(fonts: &mut FontPair, custom: &CustomDesign) {
    let mut changed = false;
    if let Some(body) = custom.body_font.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        fonts.body = body.to_string();
        changed = true;
    }
    if let Some(heading) = custom
        .heading_font
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        fonts.heading = heading.to_string();
        changed = true;
    }
    if changed {
        fonts.rationale = "Custom font selection".to_string();
    }
}

/// Apply caller colors and re-rate contrast.
///
/// The text color falls back to black or white when the pair would drop
/// below the contrast floor, unless both text and background were given.
pub fn apply_palette_override(palette: &mut ColorPalette, overrides: &PaletteOverride) -> Result<()> {
    if let Some(primary) = &overrides.primary {
        palette.primary = Rgb::from_hex(primary)?.to_hex();
    }

    if overrides.text.is_none() && overrides.background.is_none() {
        return Ok(());
    }

    let mut text = match &overrides.text {
        Some(hex) => Rgb::from_hex(hex)?,
        None => Rgb::from_hex(&palette.text)?,
    };
    let background = match &overrides.background {
        Some(hex) => Rgb::from_hex(hex)?,
        None => Rgb::from_hex(&palette.background)?,
    };

    let both_overridden = overrides.text.is_some() && overrides.background.is_some();
    if !both_overridden && contrast_ratio(text, background) < MIN_CONTRAST {
        text = if contrast_ratio(Rgb::BLACK, background) >= contrast_ratio(Rgb::WHITE, background)
        {
            Rgb::BLACK
        } else {
            Rgb::WHITE
        };
        debug!(text = %text.to_hex(), "Text color adjusted to meet contrast floor");
    }

    let ratio = contrast_ratio(text, background);
    palette.text = text.to_hex();
    palette.background = background.to_hex();
    palette.contrast_ratio = ratio;
    palette.wcag_level = WcagLevel::from_ratio(ratio);
    Ok(())
}

fn validate_margins(margins: &PageMargins) -> Result<()> {
    let values = [margins.top, margins.bottom, margins.inner, margins.outer];
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(TypecraftError::DesignFailed(format!(
            "Margins must be finite and non-negative: {:?}",
            margins
        )));
    }
    Ok(())
}
