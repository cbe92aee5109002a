//! Global Constants
//!
//! Centralized constants for analysis, selection, design and rendering.
//! All magic numbers should be defined here with documentation.

/// Content analysis constants
pub mod analysis {
    /// Words per printed page used to estimate page counts
    pub const WORDS_PER_PAGE: f64 = 250.0;

    /// Default upper bound on characters handed to profile refinement
    pub const DEFAULT_SAMPLE_SIZE: usize = 5000;

    /// Minimum normalized genre score for a secondary genre
    pub const SECONDARY_GENRE_MIN: f64 = 0.3;

    /// Genre reported when every genre score is zero
    pub const UNKNOWN_GENRE: &str = "unknown";

    /// Neutral values used when the text has no words or no sentences
    pub const NEUTRAL_COMPLEXITY: f64 = 0.5;
    pub const NEUTRAL_FLESCH: f64 = 50.0;
    pub const NEUTRAL_FORMALITY: f64 = 0.5;

    /// Technical density multiplier (technical terms per word)
    pub const TECHNICAL_DENSITY_SCALE: f64 = 10.0;

    /// Derived flag thresholds
    pub mod derived {
        pub const ACADEMIC_TONE: f64 = 0.6;
        pub const ACADEMIC_FORMALITY: f64 = 0.7;
        pub const ACADEMIC_TECHNICAL: f64 = 0.5;
        pub const COMPLEX_MATH_EQUATIONS: usize = 10;
        pub const RICH_MEDIA_IMAGE_RATIO: f64 = 0.1;
    }
}

/// Academic detector constants
pub mod academic {
    /// Confidence above which a text is classified as academic
    pub const ACADEMIC_CONFIDENCE: f64 = 0.6;

    /// Keyword density contribution (per 1000 words)
    pub const KEYWORD_WEIGHT: f64 = 0.25;

    /// Citation count contribution
    pub const CITATION_WEIGHT: f64 = 0.25;

    pub const ABSTRACT_WEIGHT: f64 = 0.10;
    pub const BIBLIOGRAPHY_WEIGHT: f64 = 0.10;
    pub const STRUCTURE_WEIGHT: f64 = 0.15;
    pub const TONE_WEIGHT: f64 = 0.10;
    pub const FORMALITY_WEIGHT: f64 = 0.05;
}

/// Pipeline selector constants
pub mod selector {
    pub const DEFAULT_EQUATIONS_MIN: usize = 10;
    pub const DEFAULT_ACADEMIC_CONF_MIN: f64 = 0.7;
    pub const DEFAULT_COMPLEX_TABLES_MIN: usize = 5;
    pub const DEFAULT_IMAGE_RATIO_MIN: f64 = 0.1;
    pub const DEFAULT_NEUTRAL_ZONE: f64 = 0.2;

    /// Reason emitted when the scores fall inside the neutral zone
    pub const BALANCED_REASON: &str = "scores balanced; default to web for flexibility";

    /// Reasons used when a backend wins without any signal passing its threshold
    pub const VECTOR_FALLBACK_REASON: &str = "Vector typesetting features detected";
    pub const WEB_FALLBACK_REASON: &str = "Web-first format preferred";

    /// Vector-backend component weights (sum to 1.0)
    pub mod vector_weight {
        pub const EQUATIONS: f64 = 0.30;
        pub const ACADEMIC: f64 = 0.25;
        pub const TABLES: f64 = 0.15;
        pub const COMPLEXITY: f64 = 0.15;
        pub const EQUATION_DENSITY: f64 = 0.15;
    }

    /// Web-backend component weights (sum to 1.0)
    pub mod web_weight {
        pub const IMAGE_RATIO: f64 = 0.30;
        pub const IMAGE_COUNT: f64 = 0.20;
        pub const NON_ACADEMIC: f64 = 0.20;
        pub const ACCESSIBLE: f64 = 0.15;
        pub const CASUAL: f64 = 0.15;
    }

    /// Complexity band for the vector-backend complexity signal
    pub const COMPLEXITY_FLOOR: f64 = 0.5;
    pub const COMPLEXITY_HIGH: f64 = 0.7;

    /// Equations per page above which density favors the vector backend
    pub const EQUATION_DENSITY_MIN: f64 = 0.5;

    /// Image count band for the web-backend image signal
    pub const IMAGE_COUNT_FLOOR: usize = 5;
    pub const IMAGE_COUNT_CEILING: usize = 20;

    /// Complexity band for the web-backend accessibility signal
    pub const ACCESSIBLE_COMPLEXITY: f64 = 0.4;
    pub const ACCESSIBLE_CEILING: f64 = 0.6;

    /// Casual tone above which it counts as a web signal
    pub const CASUAL_MIN: f64 = 0.5;
}

/// Design synthesis constants
pub mod design {
    /// Palette version tag for the determinism law
    pub const PALETTE_VERSION: &str = "1";

    /// Default primary hue (blue)
    pub const DEFAULT_HUE: f64 = 220.0;

    /// Minimum text/background contrast unless both are overridden
    pub const MIN_CONTRAST: f64 = 3.0;

    /// Number of font recommendations returned
    pub const FONT_RECOMMENDATIONS: usize = 3;

    /// Base score every candidate pair starts from
    pub const FONT_BASE_SCORE: f64 = 1.0;

    /// Genre used when the primary genre has no pairs
    pub const FALLBACK_GENRE: &str = "fiction";

    /// Complexity above which code-heavy books get a two-column grid
    pub const GRID_COMPLEXITY_HIGH: f64 = 0.7;

    /// Baseline grid step shared by every column layout (em)
    pub const GRID_BASELINE_EM: f64 = 1.5;
}

/// Rendering constants
pub mod render {
    /// Default wall-clock budget per external renderer (milliseconds)
    pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

    /// Number of engine passes for cross references
    pub const DEFAULT_LATEX_RUNS: u32 = 2;

    /// Artifact file stem prefix
    pub const ARTIFACT_PREFIX: &str = "project_";

    pub const PDF_MAGIC: &[u8] = b"%PDF";
    pub const EPUB_MAGIC: &[u8] = b"PK\x03\x04";
}

/// HTTP/Network constants
pub mod network {
    /// Default refinement request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Maximum retries for refinement requests
    pub const MAX_NETWORK_RETRIES: usize = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;
}
