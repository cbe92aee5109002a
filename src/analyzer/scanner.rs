//! Structural Scanner
//!
//! Tokenizes markdown-flavored text into sentences, words and paragraphs and
//! locates special elements (images, tables, math, fenced code, headings,
//! citations).
//!
//! ## Masking
//!
//! Fenced code, math spans and image references are markup rather than
//! prose. Each is replaced by same-length whitespace before the next pattern
//! runs, so byte offsets stay aligned with the input and readability counts
//! only see running text.
//!
//! Every pattern runs once over the input; the scan is linear in text length.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

use crate::types::{Result, StructuralStats, TypecraftError};

// =============================================================================
// Patterns
// =============================================================================

static RE_SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("sentence pattern"));

static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("word pattern"));

static RE_PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").expect("paragraph pattern"));

static RE_CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```[^\n]*$").expect("fence pattern"));

static RE_DISPLAY_MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$.+?\$\$").expect("display math pattern"));

static RE_INLINE_MATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$[^\s$](?:[^$\n]*[^\s$])?\$").expect("inline math pattern")
});

static RE_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]\n]*\]\([^)\n]*\)").expect("image pattern"));

static RE_TABLE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\|.*\|[ \t\r]*$").expect("table pattern"));

static RE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+\S[^\n]*").expect("heading pattern"));

static RE_CITATION_APA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\p{Lu}[\p{L}'-]+(?:\s+et\s+al\.)?,\s*\d{4}[a-z]?\)").expect("apa pattern")
});

static RE_CITATION_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("numeric citation pattern"));

static RE_CITATION_DOI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bdoi:\s*10\.\d+|https?://(?:dx\.)?doi\.org/").expect("doi pattern")
});

static RE_ET_AL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bet\s+al\.").expect("et al pattern"));

const VOWELS: &str = "aeiouáéíóúâêôãõy";

// =============================================================================
// Report
// =============================================================================

/// Kind of special element located by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    CodeBlock,
    DisplayMath,
    InlineMath,
    Image,
    TableRow,
    Heading,
    Citation,
}

/// Byte range in the scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ElementMatch {
    pub kind: ElementKind,
    pub span: Span,
}

/// Scanner output
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub stats: StructuralStats,
    /// Special elements in input order
    pub elements: Vec<ElementMatch>,
    /// Sentence ranges in input order
    pub sentences: Vec<Span>,
    /// Input with markup spans blanked; offsets match the input
    pub prose: String,
}

// =============================================================================
// Scanner
// =============================================================================

/// Pure, deterministic structural scanner
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralScanner;

impl StructuralScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan `text`; fails with `EmptyInput` when there is no content.
    pub fn scan(&self, text: &str) -> Result<ScanReport> {
        if text.trim().is_empty() {
            return Err(TypecraftError::empty_input("manuscript"));
        }

        let mut elements = Vec::new();

        // Fenced code first: nothing inside a fence is markup
        let code_spans = fenced_code_spans(text);
        let code_block_count = code_spans.len();
        elements.extend(tag(ElementKind::CodeBlock, &code_spans));
        let without_code = mask_spans(text, &code_spans);

        let display_spans = find_spans(&RE_DISPLAY_MATH, &without_code);
        elements.extend(tag(ElementKind::DisplayMath, &display_spans));
        let without_display = mask_spans(&without_code, &display_spans);

        let inline_spans: Vec<Span> = RE_INLINE_MATH
            .find_iter(&without_display)
            .filter(|m| {
                // "$5 and $10" style currency is not math
                !without_display[m.end()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit())
            })
            .map(|m| Span::new(m.start(), m.end()))
            .collect();
        elements.extend(tag(ElementKind::InlineMath, &inline_spans));
        let without_math = mask_spans(&without_display, &inline_spans);

        let image_spans = find_spans(&RE_IMAGE, &without_math);
        elements.extend(tag(ElementKind::Image, &image_spans));
        let prose = mask_spans(&without_math, &image_spans);

        let table_rows = find_spans(&RE_TABLE_ROW, &without_code);
        elements.extend(tag(ElementKind::TableRow, &table_rows));

        let headings = find_spans(&RE_HEADING, &without_code);
        elements.extend(tag(ElementKind::Heading, &headings));

        let citations = citation_spans(&without_code);
        elements.extend(tag(ElementKind::Citation, &citations));

        elements.sort_by_key(|e| (e.span.start, e.kind));

        let sentences = sentence_spans(&prose);
        let words: Vec<&str> = RE_WORD.find_iter(&prose).map(|m| m.as_str()).collect();
        let word_count = words.len();
        let syllable_count: usize = words.iter().map(|w| count_syllables(w)).sum();
        let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();

        let paragraph_count = RE_PARAGRAPH_BREAK
            .split(&prose)
            .filter(|p| !p.trim().is_empty())
            .count();

        let stats = StructuralStats {
            word_count,
            sentence_count: sentences.len(),
            paragraph_count,
            avg_sentence_len: ratio(word_count, sentences.len()),
            avg_word_len: ratio(total_chars, word_count),
            syllable_count,
            image_count: image_spans.len(),
            table_count: table_rows.len() / 3,
            equation_count: display_spans.len() + inline_spans.len(),
            code_block_count,
            citation_count: citations.len(),
            heading_count: headings.len(),
        };

        debug!(
            words = stats.word_count,
            sentences = stats.sentence_count,
            equations = stats.equation_count,
            images = stats.image_count,
            "Scanned manuscript"
        );

        Ok(ScanReport {
            stats,
            elements,
            sentences,
            prose,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Syllables by vowel runs with trailing-`e` correction, floored at 1
pub fn count_syllables(word: &str) -> usize {
    let lower = word.to_lowercase();
    let mut syllables = 0;
    let mut prev_vowel = false;
    for c in lower.chars() {
        let is_vowel = VOWELS.contains(c);
        if is_vowel && !prev_vowel {
            syllables += 1;
        }
        prev_vowel = is_vowel;
    }
    if lower.ends_with('e') && syllables > 1 {
        syllables -= 1;
    }
    syllables.max(1)
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn find_spans(re: &Regex, text: &str) -> Vec<Span> {
    re.find_iter(text)
        .map(|m| Span::new(m.start(), m.end()))
        .collect()
}

fn tag(kind: ElementKind, spans: &[Span]) -> impl Iterator<Item = ElementMatch> + '_ {
    spans.iter().map(move |span| ElementMatch { kind, span: *span })
}

/// Pair fences open/close; an unclosed fence runs to the end of the text
fn fenced_code_spans(text: &str) -> Vec<Span> {
    let fences: Vec<Span> = find_spans(&RE_CODE_FENCE, text);
    fences
        .chunks(2)
        .map(|pair| {
            let end = pair.get(1).map_or(text.len(), |close| close.end);
            Span::new(pair[0].start, end)
        })
        .collect()
}

/// Replace every character inside `spans` with spaces of equal byte length,
/// keeping newlines. `spans` must be sorted and non-overlapping.
fn mask_spans(text: &str, spans: &[Span]) -> String {
    if spans.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&text[cursor..span.start]);
        for c in text[span.start..span.end].chars() {
            if c == '\n' {
                out.push('\n');
            } else {
                out.extend(std::iter::repeat_n(' ', c.len_utf8()));
            }
        }
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Sentence fragments between terminators that contain at least one word
fn sentence_spans(prose: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut push = |from: usize, to: usize| {
        let fragment = &prose[from..to];
        if fragment.chars().any(char::is_alphanumeric) {
            let leading = fragment.len() - fragment.trim_start().len();
            let trailing = fragment.len() - fragment.trim_end().len();
            spans.push(Span::new(from + leading, to - trailing));
        }
    };
    for m in RE_SENTENCE_END.find_iter(prose) {
        push(start, m.start());
        start = m.end();
    }
    push(start, prose.len());
    spans
}

/// APA, numeric, DOI and standalone `et al.` markers
fn citation_spans(text: &str) -> Vec<Span> {
    let apa = find_spans(&RE_CITATION_APA, text);
    let mut spans = apa.clone();
    spans.extend(find_spans(&RE_CITATION_NUMERIC, text));
    spans.extend(find_spans(&RE_CITATION_DOI, text));

    // Skip `et al.` already counted inside an APA citation
    let mut apa_iter = apa.iter().peekable();
    for et_al in find_spans(&RE_ET_AL, text) {
        while apa_iter.peek().is_some_and(|a| a.end < et_al.end) {
            apa_iter.next();
        }
        if !apa_iter.peek().is_some_and(|a| a.contains(&et_al)) {
            spans.push(et_al);
        }
    }
    spans.sort_by_key(|s| s.start);
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> ScanReport {
        StructuralScanner::new().scan(text).unwrap()
    }

    #[test]
    fn test_empty_input() {
        let err = StructuralScanner::new().scan("").unwrap_err();
        assert!(matches!(err, TypecraftError::EmptyInput { .. }));
        assert!(StructuralScanner::new().scan("  \n\n ").is_err());
    }

    #[test]
    fn test_basic_counts() {
        let report = scan("The cat sat. The dog ran!\n\nA new paragraph? Yes.");
        assert_eq!(report.stats.word_count, 10);
        assert_eq!(report.stats.sentence_count, 4);
        assert_eq!(report.stats.paragraph_count, 2);
        assert!((report.stats.avg_sentence_len - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_sentence_spans_preserve_position() {
        let text = "First one. Second one.";
        let report = scan(text);
        let sentences: Vec<&str> = report
            .sentences
            .iter()
            .map(|s| &text[s.start..s.end])
            .collect();
        assert_eq!(sentences, vec!["First one", "Second one"]);
    }

    #[test]
    fn test_syllables() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("make"), 1);
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("beautiful"), 3);
        assert_eq!(count_syllables("rhythm"), 1);
        assert_eq!(count_syllables("2024"), 1);
        assert_eq!(count_syllables("análise"), 3);
    }

    #[test]
    fn test_special_elements() {
        let text = "# Title\n\n\
            ![a figure](fig.png) and ![another](b.png).\n\n\
            Energy is $E = mc^2$ and\n\n$$\n\\int_0^1 x\\,dx\n$$\n\n\
            | a | b |\n|---|---|\n| 1 | 2 |\n\n\
            ```rust\nlet price = \"$5\";\n```\n\n\
            As shown (Smith, 2020) and [3], see doi:10.1000/xyz. Jones et al. agree.\n";
        let stats = scan(text).stats;
        assert_eq!(stats.heading_count, 1);
        assert_eq!(stats.image_count, 2);
        assert_eq!(stats.equation_count, 2);
        assert_eq!(stats.table_count, 1);
        assert_eq!(stats.code_block_count, 1);
        assert_eq!(stats.citation_count, 4);
    }

    #[test]
    fn test_currency_is_not_math() {
        let stats = scan("It cost $5 and later $10 at the fair.").stats;
        assert_eq!(stats.equation_count, 0);
    }

    #[test]
    fn test_apa_et_al_counted_once() {
        let stats = scan("Prior work (Smith et al., 2019) disagrees.").stats;
        assert_eq!(stats.citation_count, 1);
    }

    #[test]
    fn test_math_excluded_from_words() {
        let report = scan("Consider $x + y$ carefully.");
        assert_eq!(report.stats.word_count, 2);
        assert_eq!(report.prose.len(), "Consider $x + y$ carefully.".len());
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let stats = scan("Intro text.\n\n```\ncode without end").stats;
        assert_eq!(stats.code_block_count, 1);
        assert_eq!(stats.word_count, 2);
    }

    #[test]
    fn test_elements_sorted_by_position() {
        let report = scan("[1] first. ![img](a.png) then $x$ end.");
        let starts: Vec<usize> = report.elements.iter().map(|e| e.span.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(report.elements[0].kind, ElementKind::Citation);
    }
}
