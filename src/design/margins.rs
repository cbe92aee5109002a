//! Page Margins
//!
//! Van de Graaf canon: inner, top, outer and bottom margins in the ratio
//! 2:3:4:6, scaled from the trim size's margin base.

use crate::types::{PageFormat, PageMargins};

/// Margins for a trim size; `margin_base_mm` is the inner margin
pub fn canon_margins(format: PageFormat) -> PageMargins {
    let unit = format.margin_base_mm() / 2.0;
    PageMargins {
        inner: 2.0 * unit,
        top: 3.0 * unit,
        outer: 4.0 * unit,
        bottom: 6.0 * unit,
    }
}

/// Text block left after margins, in millimetres
pub fn text_block_mm(format: PageFormat, margins: &PageMargins) -> (f64, f64) {
    let (width, height) = format.dimensions_mm();
    (
        width - margins.inner - margins.outer,
        height - margins.top - margins.bottom,
    )
}
