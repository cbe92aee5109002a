//! Metadata cleanup applied once the manuscript has been read.

use crate::analyzer::detect_language;
use crate::types::ProjectMetadata;

/// Tidy `metadata` for the book: whitespace in title and author is
/// collapsed, a blank author is dropped, a blank title falls back to the
/// project id and an empty language is detected from `text`.
///
/// Returns one line per change for the job trace.
pub fn enhance(metadata: &mut ProjectMetadata, text: &str) -> Vec<String> {
    let mut changes = Vec::new();

    let title = collapse_whitespace(&metadata.title);
    if title.is_empty() {
        changes.push(format!("title: blank, using project id {}", metadata.id));
        metadata.title = metadata.id.clone();
    } else if title != metadata.title {
        changes.push(format!("title: normalized to {:?}", title));
        metadata.title = title;
    }

    if let Some(author) = metadata.author.take() {
        let cleaned = collapse_whitespace(&author);
        if cleaned.is_empty() {
            changes.push("author: blank, dropped".to_string());
        } else {
            if cleaned != author {
                changes.push(format!("author: normalized to {:?}", cleaned));
            }
            metadata.author = Some(cleaned);
        }
    }

    let language = metadata.language.trim();
    if language.is_empty() {
        let detected = detect_language(text);
        changes.push(format!("language: detected {}", detected));
        metadata.language = detected.to_string();
    } else if language != metadata.language {
        metadata.language = language.to_string();
    }

    changes
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTUGUESE: &str = "O menino e a menina correm para o parque da cidade, \
        e os cães do vizinho seguem em silêncio as crianças de casa.";

    #[test]
    fn test_normalizes_title_and_author() {
        let mut metadata = ProjectMetadata::new("7", "  The   Long\tRoad ").with_author(" Ada  Lovelace ");
        let changes = enhance(&mut metadata, "");
        assert_eq!(metadata.title, "The Long Road");
        assert_eq!(metadata.author.as_deref(), Some("Ada Lovelace"));
        assert_eq!(metadata.language, "en");
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_blank_fields() {
        let mut metadata = ProjectMetadata::new("7", "   ").with_author("  ");
        let changes = enhance(&mut metadata, "");
        assert_eq!(metadata.title, "7");
        assert!(metadata.author.is_none());
        assert!(changes.iter().any(|c| c.starts_with("author: blank")));
    }

    #[test]
    fn test_detects_missing_language() {
        let mut metadata = ProjectMetadata::new("7", "Livro").with_language("");
        let changes = enhance(&mut metadata, PORTUGUESE);
        assert_eq!(metadata.language, "pt");
        assert_eq!(changes, vec!["language: detected pt".to_string()]);
    }

    #[test]
    fn test_declared_language_is_kept() {
        let mut metadata = ProjectMetadata::new("7", "Livro").with_language(" fr ");
        let changes = enhance(&mut metadata, PORTUGUESE);
        assert_eq!(metadata.language, "fr");
        assert!(changes.is_empty());
    }
}
