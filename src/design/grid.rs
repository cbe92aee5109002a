//! Column grid selection.

use crate::constants::design::GRID_COMPLEXITY_HIGH;
use crate::types::{ContentProfile, GridKind, GridLayout};

/// Grid for the manuscript's mix of figures, tables and code
pub fn grid_for(profile: &ContentProfile) -> GridLayout {
    let stats = &profile.stats;
    let images = stats.image_count > 0;
    let tables = stats.table_count > 0;
    let code = stats.code_block_count > 0;

    let kind = if !images && !tables && !code {
        GridKind::Single
    } else if code && profile.complexity > GRID_COMPLEXITY_HIGH {
        GridKind::Two
    } else if images && tables {
        GridKind::Six
    } else if images {
        GridKind::Three
    } else {
        GridKind::Two
    };
    GridLayout::new(kind)
}
