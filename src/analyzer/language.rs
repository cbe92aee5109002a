//! Stopword-based language guess for manuscripts without a declared language.

/// BCP 47 tag used when the text is too short or too ambiguous
pub const DEFAULT_LANGUAGE: &str = "en";

/// Fewer words than this are not worth guessing from
const MIN_WORDS: usize = 10;

/// Stopword hits the winner needs
const MIN_HITS: usize = 3;

/// Checked in order; ties go to the earlier language
const STOPWORDS: &[(&str, &[&str])] = &[
    ("en", &["the", "and", "is", "in", "to", "of", "a"]),
    ("pt", &["o", "a", "de", "e", "em", "os", "as", "da", "do"]),
    ("es", &["el", "la", "de", "y", "en", "los", "las", "del"]),
    ("fr", &["le", "la", "de", "et", "les", "des", "un", "une"]),
    ("de", &["der", "die", "das", "und", "in", "den", "dem"]),
    ("it", &["il", "la", "di", "e", "in", "i", "le", "del"]),
];

/// Most likely language of `text`, falling back to [`DEFAULT_LANGUAGE`]
pub fn detect_language(text: &str) -> &'static str {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();
    if words.len() < MIN_WORDS {
        return DEFAULT_LANGUAGE;
    }

    let mut best = (DEFAULT_LANGUAGE, 0);
    for (language, stopwords) in STOPWORDS {
        let hits = words
            .iter()
            .filter(|w| stopwords.contains(&w.as_str()))
            .count();
        if hits > best.1 {
            best = (*language, hits);
        }
    }
    if best.1 < MIN_HITS {
        return DEFAULT_LANGUAGE;
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_common_languages() {
        assert_eq!(
            detect_language("The cat sat in the garden and the dog ran to the end of a long road."),
            "en"
        );
        assert_eq!(
            detect_language("El perro corre en la calle y los niños juegan en el parque de la ciudad."),
            "es"
        );
        assert_eq!(
            detect_language("Der Hund und die Katze spielen in dem Garten, und das Kind lacht über den Ball."),
            "de"
        );
        assert_eq!(
            detect_language("Le chat et le chien dorment dans la maison, les enfants jouent avec des amis et une balle."),
            "fr"
        );
    }

    #[test]
    fn test_short_or_unclear_text_defaults() {
        assert_eq!(detect_language("Der Hund und die Katze."), DEFAULT_LANGUAGE);
        assert_eq!(detect_language(""), DEFAULT_LANGUAGE);
        assert_eq!(
            detect_language("Quantum chromodynamics lattice simulations require enormous compute budgets today across many clusters."),
            DEFAULT_LANGUAGE
        );
    }
}
