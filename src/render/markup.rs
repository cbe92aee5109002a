//! Markup Conversion
//!
//! Lightweight block parser for the markdown-flavored manuscript format and
//! emitters for HTML (paged PDF and ePub) and LaTeX (vector PDF).
//!
//! ## Supported Syntax
//!
//! - Headings `#` through `######`; level 1 starts a new chapter
//! - Paragraphs, `*emphasis*`, `**strong**`, `` `code` ``, `[text](url)`
//! - Fenced code blocks, display math `$$...$$`, inline math `$...$`
//! - Standalone images `![alt](src)`, pipe tables, `-`/`*`/`1.` lists

use regex::Regex;
use std::sync::LazyLock;

static RE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})[ \t]+(.+?)[ \t#]*$").expect("heading pattern"));
static RE_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\[([^\]]*)\]\(([^)\s]+)[^)]*\)$").expect("image pattern"));
static RE_TABLE_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|?[\s:|-]+\|?$").expect("table rule pattern"));
static RE_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*+][ \t]+(.*)$").expect("bullet pattern"));
static RE_ORDERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)][ \t]+(.*)$").expect("ordered list pattern"));

// =============================================================================
// Block Model
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    Code { lang: Option<String>, body: String },
    DisplayMath(String),
    Image { alt: String, src: String },
    Table { rows: Vec<Vec<String>> },
    List { ordered: bool, items: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

impl Chapter {
    /// Title or a numbered placeholder
    pub fn display_title(&self, index: usize) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Chapter {}", index + 1))
    }
}

/// Parse manuscript text into blocks
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut i = 0;

    let flush = |paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>| {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    };

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.is_empty() {
            flush(&mut paragraph, &mut blocks);
            i += 1;
            continue;
        }

        if let Some(info) = trimmed.strip_prefix("```") {
            flush(&mut paragraph, &mut blocks);
            let lang = Some(info.trim().to_string()).filter(|l| !l.is_empty());
            let mut body = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].trim_start().starts_with("```") {
                body.push(lines[i]);
                i += 1;
            }
            blocks.push(Block::Code {
                lang,
                body: body.join("\n"),
            });
            i += 1;
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("$$") {
            flush(&mut paragraph, &mut blocks);
            if let Some(inner) = rest.strip_suffix("$$") {
                blocks.push(Block::DisplayMath(inner.trim().to_string()));
                i += 1;
                continue;
            }
            let mut body = vec![rest];
            i += 1;
            while i < lines.len() {
                let l = lines[i].trim();
                if let Some(last) = l.strip_suffix("$$") {
                    body.push(last);
                    break;
                }
                body.push(l);
                i += 1;
            }
            let math = body
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            blocks.push(Block::DisplayMath(math));
            i += 1;
            continue;
        }

        if let Some(caps) = RE_HEADING.captures(trimmed) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Heading {
                level: caps[1].len() as u8,
                text: caps[2].to_string(),
            });
            i += 1;
            continue;
        }

        if let Some(caps) = RE_IMAGE.captures(trimmed) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Image {
                alt: caps[1].to_string(),
                src: caps[2].to_string(),
            });
            i += 1;
            continue;
        }

        if trimmed.starts_with('|') {
            flush(&mut paragraph, &mut blocks);
            let mut rows = Vec::new();
            while i < lines.len() && lines[i].trim().starts_with('|') {
                let row = lines[i].trim();
                if !RE_TABLE_RULE.is_match(row) {
                    rows.push(split_row(row));
                }
                i += 1;
            }
            blocks.push(Block::Table { rows });
            continue;
        }

        let bullet = RE_BULLET.is_match(trimmed);
        if bullet || RE_ORDERED.is_match(trimmed) {
            flush(&mut paragraph, &mut blocks);
            let re: &Regex = if bullet { &RE_BULLET } else { &RE_ORDERED };
            let mut items = Vec::new();
            while i < lines.len() {
                let Some(caps) = re.captures(lines[i].trim()) else {
                    break;
                };
                items.push(caps[1].to_string());
                i += 1;
            }
            blocks.push(Block::List {
                ordered: !bullet,
                items,
            });
            continue;
        }

        paragraph.push(trimmed);
        i += 1;
    }
    flush(&mut paragraph, &mut blocks);
    blocks
}

fn split_row(row: &str) -> Vec<String> {
    row.trim_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Split blocks at level-1 headings. Text before the first heading becomes
/// an untitled chapter; with no headings the whole text is one chapter.
pub fn split_chapters(blocks: Vec<Block>) -> Vec<Chapter> {
    let mut chapters: Vec<Chapter> = Vec::new();
    let mut current = Chapter {
        title: None,
        blocks: Vec::new(),
    };
    for block in blocks {
        match block {
            Block::Heading { level: 1, text } => {
                if current.title.is_some() || !current.blocks.is_empty() {
                    chapters.push(current);
                }
                current = Chapter {
                    title: Some(text),
                    blocks: Vec::new(),
                };
            }
            other => current.blocks.push(other),
        }
    }
    if current.title.is_some() || !current.blocks.is_empty() || chapters.is_empty() {
        chapters.push(current);
    }
    chapters
}

/// Parse and split in one step
pub fn chapters(text: &str) -> Vec<Chapter> {
    split_chapters(parse_blocks(text))
}

// =============================================================================
// Inline Tokens
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inline<'a> {
    Text(&'a str),
    Strong(&'a str),
    Emphasis(&'a str),
    Code(&'a str),
    Math(&'a str),
    Link { text: &'a str, url: &'a str },
}

pub(crate) fn tokenize(text: &str) -> Vec<Inline<'_>> {
    let mut tokens = Vec::new();
    let mut plain_start = 0;
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        let found = if rest.starts_with("**") {
            delimited(rest, "**").map(|(inner, len)| (Inline::Strong(inner), len))
        } else if rest.starts_with('*') {
            delimited(rest, "*").map(|(inner, len)| (Inline::Emphasis(inner), len))
        } else if rest.starts_with('`') {
            delimited(rest, "`").map(|(inner, len)| (Inline::Code(inner), len))
        } else if rest.starts_with('$') && !rest[1..].starts_with(|c: char| c.is_ascii_digit()) {
            delimited(rest, "$").map(|(inner, len)| (Inline::Math(inner), len))
        } else if rest.starts_with('[') {
            link(rest)
        } else {
            None
        };

        match found {
            Some((token, len)) => {
                if plain_start < pos {
                    tokens.push(Inline::Text(&text[plain_start..pos]));
                }
                tokens.push(token);
                pos += len;
                plain_start = pos;
            }
            None => {
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }
    if plain_start < text.len() {
        tokens.push(Inline::Text(&text[plain_start..]));
    }
    tokens
}

/// `mark inner mark` at the start of `s`; inner must be non-empty and not
/// start or end with whitespace
fn delimited<'a>(s: &'a str, mark: &str) -> Option<(&'a str, usize)> {
    let body = &s[mark.len()..];
    let end = body.find(mark)?;
    let inner = &body[..end];
    if inner.is_empty() || inner.starts_with(char::is_whitespace) || inner.ends_with(char::is_whitespace)
    {
        return None;
    }
    Some((inner, mark.len() * 2 + end))
}

fn link(s: &str) -> Option<(Inline<'_>, usize)> {
    let close = s.find("](")?;
    let text = &s[1..close];
    if text.contains('[') {
        return None;
    }
    let url_start = close + 2;
    let url_len = s[url_start..].find(')')?;
    let url = &s[url_start..url_start + url_len];
    Some((Inline::Link { text, url }, url_start + url_len + 1))
}

// =============================================================================
// HTML
// =============================================================================

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn inline_html(text: &str) -> String {
    tokenize(text)
        .into_iter()
        .map(|token| match token {
            Inline::Text(t) => escape_html(t),
            Inline::Strong(t) => format!("<strong>{}</strong>", escape_html(t)),
            Inline::Emphasis(t) => format!("<em>{}</em>", escape_html(t)),
            Inline::Code(t) => format!("<code>{}</code>", escape_html(t)),
            Inline::Math(t) => format!(r#"<span class="math inline">\({}\)</span>"#, escape_html(t)),
            Inline::Link { text, url } => format!(
                r#"<a href="{}">{}</a>"#,
                escape_html(url),
                escape_html(text)
            ),
        })
        .collect()
}

/// XHTML-safe markup for a sequence of blocks
pub fn blocks_to_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                out.push_str(&format!("<h{0}>{1}</h{0}>\n", level, inline_html(text)));
            }
            Block::Paragraph(text) => {
                out.push_str(&format!("<p>{}</p>\n", inline_html(text)));
            }
            Block::Code { lang, body } => {
                let class = lang
                    .as_deref()
                    .map(|l| format!(r#" class="language-{}""#, escape_html(l)))
                    .unwrap_or_default();
                out.push_str(&format!("<pre><code{}>{}</code></pre>\n", class, escape_html(body)));
            }
            Block::DisplayMath(math) => {
                out.push_str(&format!(
                    "<div class=\"math display\">\\[{}\\]</div>\n",
                    escape_html(math)
                ));
            }
            Block::Image { alt, src } => {
                out.push_str(&format!(
                    "<figure><img src=\"{}\" alt=\"{}\" /><figcaption>{}</figcaption></figure>\n",
                    escape_html(src),
                    escape_html(alt),
                    escape_html(alt)
                ));
            }
            Block::Table { rows } => {
                out.push_str("<table>\n");
                for (i, row) in rows.iter().enumerate() {
                    let cell = if i == 0 { "th" } else { "td" };
                    out.push_str("<tr>");
                    for value in row {
                        out.push_str(&format!("<{0}>{1}</{0}>", cell, inline_html(value)));
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</table>\n");
            }
            Block::List { ordered, items } => {
                let tag = if *ordered { "ol" } else { "ul" };
                out.push_str(&format!("<{}>\n", tag));
                for item in items {
                    out.push_str(&format!("<li>{}</li>\n", inline_html(item)));
                }
                out.push_str(&format!("</{}>\n", tag));
            }
        }
    }
    out
}

// =============================================================================
// LaTeX
// =============================================================================

pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '{' => out.push_str(r"\{"),
            '}' => out.push_str(r"\}"),
            '$' => out.push_str(r"\$"),
            '&' => out.push_str(r"\&"),
            '#' => out.push_str(r"\#"),
            '%' => out.push_str(r"\%"),
            '_' => out.push_str(r"\_"),
            '^' => out.push_str(r"\^{}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            _ => out.push(c),
        }
    }
    out
}

pub fn inline_latex(text: &str) -> String {
    tokenize(text)
        .into_iter()
        .map(|token| match token {
            Inline::Text(t) => escape_latex(t),
            Inline::Strong(t) => format!(r"\textbf{{{}}}", escape_latex(t)),
            Inline::Emphasis(t) => format!(r"\emph{{{}}}", escape_latex(t)),
            Inline::Code(t) => format!(r"\texttt{{{}}}", escape_latex(t)),
            Inline::Math(t) => format!("${}$", t),
            Inline::Link { text, url } => {
                format!(r"\href{{{}}}{{{}}}", url.replace('%', r"\%").replace('#', r"\#"), escape_latex(text))
            }
        })
        .collect()
}

pub fn blocks_to_latex(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let command = match level {
                    1 => "chapter",
                    2 => "section",
                    3 => "subsection",
                    4 => "subsubsection",
                    _ => "paragraph",
                };
                out.push_str(&format!("\\{}{{{}}}\n\n", command, inline_latex(text)));
            }
            Block::Paragraph(text) => {
                out.push_str(&inline_latex(text));
                out.push_str("\n\n");
            }
            Block::Code { body, .. } => {
                out.push_str("\\begin{verbatim}\n");
                out.push_str(&body.replace(r"\end{verbatim}", r"\end {verbatim}"));
                out.push_str("\n\\end{verbatim}\n\n");
            }
            Block::DisplayMath(math) => {
                out.push_str(&format!("\\[\n{}\n\\]\n\n", math));
            }
            Block::Image { alt, src } => {
                out.push_str(&format!(
                    "\\begin{{figure}}[htbp]\n\\centering\n\\includegraphics[width=\\linewidth]{{{}}}\n\\caption{{{}}}\n\\end{{figure}}\n\n",
                    src,
                    escape_latex(alt)
                ));
            }
            Block::Table { rows } => {
                let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
                if columns == 0 {
                    continue;
                }
                out.push_str(&format!(
                    "\\begin{{center}}\n\\begin{{tabular}}{{{}}}\n\\hline\n",
                    "l".repeat(columns)
                ));
                for (i, row) in rows.iter().enumerate() {
                    let cells: Vec<String> = (0..columns)
                        .map(|c| row.get(c).map(|v| inline_latex(v)).unwrap_or_default())
                        .collect();
                    out.push_str(&cells.join(" & "));
                    out.push_str(" \\\\\n");
                    if i == 0 {
                        out.push_str("\\hline\n");
                    }
                }
                out.push_str("\\hline\n\\end{tabular}\n\\end{center}\n\n");
            }
            Block::List { ordered, items } => {
                let env = if *ordered { "enumerate" } else { "itemize" };
                out.push_str(&format!("\\begin{{{}}}\n", env));
                for item in items {
                    out.push_str(&format!("\\item {}\n", inline_latex(item)));
                }
                out.push_str(&format!("\\end{{{}}}\n\n", env));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Preface text.\n\n# One\n\nHello *world* and **bold**.\n\n\
                          ```rust\nfn main() {}\n```\n\n$$\nE = mc^2\n$$\n\n\
                          ![A cat](cat.png)\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n\
                          - first\n- second\n\n# Two\n\n## Section\n\n1. x\n2. y\n";

    #[test]
    fn test_parse_blocks() {
        let blocks = parse_blocks(SAMPLE);
        assert_eq!(blocks[0], Block::Paragraph("Preface text.".to_string()));
        assert!(blocks.contains(&Block::Code {
            lang: Some("rust".to_string()),
            body: "fn main() {}".to_string()
        }));
        assert!(blocks.contains(&Block::DisplayMath("E = mc^2".to_string())));
        assert!(blocks.contains(&Block::Image {
            alt: "A cat".to_string(),
            src: "cat.png".to_string()
        }));
        assert!(blocks.contains(&Block::Table {
            rows: vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["1".to_string(), "2".to_string()]
            ]
        }));
        assert!(blocks.contains(&Block::List {
            ordered: false,
            items: vec!["first".to_string(), "second".to_string()]
        }));
        assert!(blocks.contains(&Block::List {
            ordered: true,
            items: vec!["x".to_string(), "y".to_string()]
        }));
    }

    #[test]
    fn test_split_chapters() {
        let parsed = chapters(SAMPLE);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].title, None);
        assert_eq!(parsed[1].title.as_deref(), Some("One"));
        assert_eq!(parsed[2].title.as_deref(), Some("Two"));
        assert_eq!(parsed[0].display_title(0), "Chapter 1");
    }

    #[test]
    fn test_no_headings_is_one_chapter() {
        let parsed = chapters("Just a paragraph.\n\nAnd another.");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].blocks.len(), 2);
        assert_eq!(chapters("").len(), 1);
    }

    #[test]
    fn test_inline_html() {
        assert_eq!(
            inline_html("a *b* **c** `d<e>` $x^2$ [l](http://x.y)"),
            "a <em>b</em> <strong>c</strong> <code>d&lt;e&gt;</code> \
             <span class=\"math inline\">\\(x^2\\)</span> <a href=\"http://x.y\">l</a>"
        );
        assert_eq!(inline_html("costs $5 and $10"), "costs $5 and $10");
        assert_eq!(inline_html("2 * 3 * 4"), "2 * 3 * 4");
    }

    #[test]
    fn test_inline_latex_escapes() {
        assert_eq!(inline_latex("50% of #1 & co"), r"50\% of \#1 \& co");
        assert_eq!(inline_latex("the $\\alpha$ term"), r"the $\alpha$ term");
        assert_eq!(inline_latex("**bold**"), r"\textbf{bold}");
    }

    #[test]
    fn test_latex_blocks() {
        let tex = blocks_to_latex(&parse_blocks(SAMPLE));
        assert!(tex.contains(r"\chapter{One}"));
        assert!(tex.contains(r"\section{Section}"));
        assert!(tex.contains("\\begin{verbatim}\nfn main() {}\n\\end{verbatim}"));
        assert!(tex.contains("\\[\nE = mc^2\n\\]"));
        assert!(tex.contains(r"\includegraphics[width=\linewidth]{cat.png}"));
        assert!(tex.contains(r"\begin{tabular}{ll}"));
        assert!(tex.contains(r"\begin{enumerate}"));
    }

    #[test]
    fn test_html_is_well_formed_for_images() {
        let html = blocks_to_html(&parse_blocks("![x \"y\"](a.png)"));
        assert!(html.contains("<img src=\"a.png\" alt=\"x &quot;y&quot;\" />"));
    }

    #[test]
    fn test_unicode_text_survives() {
        assert_eq!(inline_html("coração é *lindo*"), "coração é <em>lindo</em>");
    }
}
