//! Word Lexicons
//!
//! Declarative keyword tables for genre, tone, polarity and academic signals.
//! The default table is embedded at build time and compiled once into
//! case-insensitive whole-word matchers shared read-only by every job.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use crate::types::{Genre, Result, TypecraftError};

const EMBEDDED_LEXICON: &str = include_str!("../../assets/lexicon.json");

/// Process-wide default lexicon
pub static LEXICON: LazyLock<Arc<Lexicon>> = LazyLock::new(|| {
    Arc::new(Lexicon::from_json(EMBEDDED_LEXICON).expect("embedded lexicon must parse"))
});

/// Shared handle to the default lexicon
pub fn default_lexicon() -> Arc<Lexicon> {
    Arc::clone(&LEXICON)
}

/// On-disk schema
#[derive(Debug, Deserialize)]
struct LexiconTable {
    version: String,
    genres: BTreeMap<Genre, Vec<String>>,
    technical_terms: Vec<String>,
    formal_words: Vec<String>,
    casual_words: Vec<String>,
    positive_words: Vec<String>,
    negative_words: Vec<String>,
    academic_keywords: Vec<String>,
    abstract_markers: Vec<String>,
    bibliography_markers: Vec<String>,
    structure_markers: Vec<String>,
}

/// A compiled word list
#[derive(Debug, Clone)]
pub struct WordMatcher {
    regex: Option<Regex>,
}

impl WordMatcher {
    /// Compile a list of words or phrases into one alternation.
    ///
    /// Longer entries come first so that phrases win over their prefixes.
    pub fn new<S: AsRef<str>>(words: &[S]) -> Result<Self> {
        let mut entries: Vec<String> = words
            .iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        entries.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        entries.dedup();

        if entries.is_empty() {
            return Ok(Self { regex: None });
        }

        let alternation = entries
            .iter()
            .map(|w| regex::escape(w).replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
            .map_err(|e| TypecraftError::Config(format!("Invalid lexicon pattern: {}", e)))?;
        Ok(Self { regex: Some(regex) })
    }

    /// Number of whole-word occurrences in `text`
    pub fn count(&self, text: &str) -> usize {
        self.regex
            .as_ref()
            .map(|re| re.find_iter(text).count())
            .unwrap_or(0)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }
}

/// Compiled lexicon
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub version: String,
    pub genres: Vec<(Genre, WordMatcher)>,
    pub technical: WordMatcher,
    pub formal: WordMatcher,
    pub casual: WordMatcher,
    pub positive: WordMatcher,
    pub negative: WordMatcher,
    pub academic: WordMatcher,
    pub abstract_markers: WordMatcher,
    pub bibliography_markers: WordMatcher,
    /// One matcher per marker so presence can be reported individually
    pub structure_markers: Vec<(String, WordMatcher)>,
}

impl Lexicon {
    /// Parse and compile a lexicon table
    pub fn from_json(json: &str) -> Result<Self> {
        let table: LexiconTable = serde_json::from_str(json)?;

        if table.genres.contains_key(&Genre::Unknown) {
            return Err(TypecraftError::Config(
                "Lexicon may not define keywords for the unknown genre".to_string(),
            ));
        }

        let genres = table
            .genres
            .iter()
            .map(|(genre, words)| Ok((*genre, WordMatcher::new(words)?)))
            .collect::<Result<Vec<_>>>()?;

        let structure_markers = table
            .structure_markers
            .iter()
            .map(|marker| Ok((marker.clone(), WordMatcher::new(&[marker])?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            version: table.version,
            genres,
            technical: WordMatcher::new(&table.technical_terms)?,
            formal: WordMatcher::new(&table.formal_words)?,
            casual: WordMatcher::new(&table.casual_words)?,
            positive: WordMatcher::new(&table.positive_words)?,
            negative: WordMatcher::new(&table.negative_words)?,
            academic: WordMatcher::new(&table.academic_keywords)?,
            abstract_markers: WordMatcher::new(&table.abstract_markers)?,
            bibliography_markers: WordMatcher::new(&table.bibliography_markers)?,
            structure_markers,
        })
    }
}
