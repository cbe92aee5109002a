//! Typographic refinement of prose.
//!
//! Straight quotes become curly quotes, `...` an ellipsis, `--` and spaced
//! hyphens em dashes, and runs of spaces collapse. Inline code, math and
//! link targets pass through untouched, so the result is still valid
//! manuscript markup for the block renderers.

use super::markup::{Block, Inline, tokenize};

const LEFT_DOUBLE: char = '\u{201C}';
const RIGHT_DOUBLE: char = '\u{201D}';
const LEFT_SINGLE: char = '\u{2018}';
const RIGHT_SINGLE: char = '\u{2019}';
const ELLIPSIS: char = '\u{2026}';
const EM_DASH: char = '\u{2014}';

/// Apply [`refine`] to every prose-bearing block
pub fn refine_blocks(blocks: Vec<Block>) -> Vec<Block> {
    blocks
        .into_iter()
        .map(|block| match block {
            Block::Heading { level, text } => Block::Heading {
                level,
                text: refine(&text),
            },
            Block::Paragraph(text) => Block::Paragraph(refine(&text)),
            Block::Image { alt, src } => Block::Image {
                alt: refine(&alt),
                src,
            },
            Block::Table { rows } => Block::Table {
                rows: rows
                    .into_iter()
                    .map(|row| row.iter().map(|cell| refine(cell)).collect())
                    .collect(),
            },
            Block::List { ordered, items } => Block::List {
                ordered,
                items: items.iter().map(|item| refine(item)).collect(),
            },
            other @ (Block::Code { .. } | Block::DisplayMath(_)) => other,
        })
        .collect()
}

/// Refined copy of one line of inline markup
pub fn refine(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // last character of prose or verbatim content, ignoring markup delimiters
    let mut prev = None;
    for token in tokenize(text) {
        match token {
            Inline::Text(t) => prev = refine_prose(t, prev, &mut out),
            Inline::Strong(t) => {
                out.push_str("**");
                prev = refine_prose(t, prev, &mut out);
                out.push_str("**");
            }
            Inline::Emphasis(t) => {
                out.push('*');
                prev = refine_prose(t, prev, &mut out);
                out.push('*');
            }
            Inline::Code(t) => {
                out.push('`');
                out.push_str(t);
                out.push('`');
                prev = t.chars().next_back();
            }
            Inline::Math(t) => {
                out.push('$');
                out.push_str(t);
                out.push('$');
                prev = t.chars().next_back();
            }
            Inline::Link { text, url } => {
                out.push('[');
                prev = refine_prose(text, prev, &mut out);
                out.push_str("](");
                out.push_str(url);
                out.push(')');
            }
        }
    }
    out
}

/// Append refined `text` to `out` and return the last character written.
/// `prev` is the character before `text`, which decides quote direction.
fn refine_prose(text: &str, mut prev: Option<char>, out: &mut String) -> Option<char> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '"' => {
                let quote = if opens(prev) { LEFT_DOUBLE } else { RIGHT_DOUBLE };
                emit(out, &mut prev, quote);
            }
            '\'' => {
                let inside_word = prev.is_some_and(char::is_alphanumeric)
                    && next.is_some_and(char::is_alphanumeric);
                let quote = if !inside_word && opens(prev) {
                    LEFT_SINGLE
                } else {
                    RIGHT_SINGLE
                };
                emit(out, &mut prev, quote);
            }
            '.' if chars[i..].starts_with(&['.', '.', '.']) => {
                emit(out, &mut prev, ELLIPSIS);
                i += 3;
                continue;
            }
            '-' if next == Some('-') => {
                let run = chars[i..].iter().take_while(|&&d| d == '-').count();
                if run <= 3 {
                    emit(out, &mut prev, EM_DASH);
                } else {
                    // horizontal rules and ASCII art stay as written
                    out.extend(&chars[i..i + run]);
                    prev = Some('-');
                }
                i += run;
                continue;
            }
            '-' if prev == Some(' ') && next == Some(' ') => emit(out, &mut prev, EM_DASH),
            ' ' if prev == Some(' ') => {}
            _ => emit(out, &mut prev, c),
        }
        i += 1;
    }
    prev
}

fn emit(out: &mut String, prev: &mut Option<char>, c: char) {
    out.push(c);
    *prev = Some(c);
}

/// Whether a quote after `prev` opens rather than closes
fn opens(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '(' | '[' | '{' | EM_DASH | LEFT_DOUBLE | LEFT_SINGLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_quotes() {
        assert_eq!(refine(r#""Hello," she said."#), "\u{201C}Hello,\u{201D} she said.");
        assert_eq!(refine("'Tis the 'best' day"), "\u{2018}Tis the \u{2018}best\u{2019} day");
        assert_eq!(refine("don't stop"), "don\u{2019}t stop");
        assert_eq!(refine("the writers' room"), "the writers\u{2019} room");
        assert_eq!(refine(r#"He said "'no'""#), "He said \u{201C}\u{2018}no\u{2019}\u{201D}");
    }

    #[test]
    fn test_ellipsis_and_dashes() {
        assert_eq!(refine("Wait... what"), "Wait\u{2026} what");
        assert_eq!(refine("then--suddenly"), "then\u{2014}suddenly");
        assert_eq!(refine("then---suddenly"), "then\u{2014}suddenly");
        assert_eq!(refine("yes - no"), "yes \u{2014} no");
        assert_eq!(refine("well-known"), "well-known");
        assert_eq!(refine("a ----- b"), "a ----- b");
    }

    #[test]
    fn test_collapses_spaces() {
        assert_eq!(refine("one   two    three"), "one two three");
    }

    #[test]
    fn test_code_math_and_urls_untouched() {
        assert_eq!(
            refine(r#"Run `echo "hi" -- x...` now"#),
            r#"Run `echo "hi" -- x...` now"#
        );
        assert_eq!(refine("Let $a - b$ be"), "Let $a - b$ be");
        assert_eq!(
            refine("See [the \"guide\"](https://x.org/a--b...c)"),
            "See [the \u{201C}guide\u{201D}](https://x.org/a--b...c)"
        );
    }

    #[test]
    fn test_quotes_around_emphasis() {
        assert_eq!(refine(r#""*Really*" he asked"#), "\u{201C}*Really*\u{201D} he asked");
        assert_eq!(refine("**'Bold'**"), "**\u{2018}Bold\u{2019}**");
    }

    #[test]
    fn test_blocks_keep_code_and_math() {
        let blocks = vec![
            Block::Heading {
                level: 1,
                text: "\"Dawn\"".to_string(),
            },
            Block::Code {
                lang: None,
                body: "x -- \"y\"".to_string(),
            },
            Block::DisplayMath("a - b".to_string()),
            Block::List {
                ordered: false,
                items: vec!["it's".to_string()],
            },
            Block::Table {
                rows: vec![vec!["a...".to_string()]],
            },
        ];
        let refined = refine_blocks(blocks);
        assert_eq!(
            refined[0],
            Block::Heading {
                level: 1,
                text: "\u{201C}Dawn\u{201D}".to_string()
            }
        );
        assert_eq!(
            refined[1],
            Block::Code {
                lang: None,
                body: "x -- \"y\"".to_string()
            }
        );
        assert_eq!(refined[2], Block::DisplayMath("a - b".to_string()));
        assert_eq!(
            refined[3],
            Block::List {
                ordered: false,
                items: vec!["it\u{2019}s".to_string()]
            }
        );
        assert_eq!(
            refined[4],
            Block::Table {
                rows: vec![vec!["a\u{2026}".to_string()]]
            }
        );
    }
}
