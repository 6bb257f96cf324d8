//! Line-oriented markdown block parser.
//!
//! Turns decoded text into a [`MarkdownAst`]: frontmatter (see
//! [`frontmatter`](crate::frontmatter)) plus an ordered sequence of
//! [`MarkdownElement`]s. The parser works at block granularity only; inline
//! markup (emphasis, links, code spans) is kept verbatim inside element text.
//!
//! # Block rules
//!
//! | Line shape | Element |
//! |------------|---------|
//! | `#`…`######` + whitespace | `Header` |
//! | ```` ``` ```` / `~~~` fence … matching fence | `CodeBlock` (verbatim, blank lines kept) |
//! | `-`, `*`, `+`, `1.`, `1)` + space | `List` |
//! | `>` | `Blockquote` |
//! | `\|` | `Table` |
//! | `<tag`, `</tag`, `<!` | `HtmlBlock` |
//! | anything else | `Paragraph` |
//!
//! Nested list items are not separate elements. Every line indented deeper
//! than the list's own items is folded into the text of the item above it,
//! so a whole top-level list is one chunking unit.
//!
//! The parser has no failure path: unclosed fences run to the end of the
//! document and unrecognised shapes fall through to `Paragraph`.

use std::borrow::Cow;

use tracing::debug;

use crate::frontmatter::extract_frontmatter;
use crate::models::{MarkdownAst, MarkdownElement};

/// Lines indented by this many columns or more are not block openers.
const MAX_BLOCK_INDENT: usize = 4;

/// Parse a markdown document.
///
/// ```rust
/// use mdchunk_core::models::MarkdownElement;
/// use mdchunk_core::parser::parse;
///
/// let ast = parse("---\ntitle: Doc\n---\n# Intro\n\nHello.\n");
/// assert_eq!(ast.frontmatter["title"], "Doc");
/// assert_eq!(ast.elements.len(), 2);
/// assert!(matches!(ast.elements[0], MarkdownElement::Header { level: 1, .. }));
/// ```
pub fn parse(text: &str) -> MarkdownAst {
    let text = normalize_newlines(text);
    let (frontmatter, body) = extract_frontmatter(&text);
    let elements = BlockScanner::new(body).scan();
    debug!(
        elements = elements.len(),
        frontmatter_keys = frontmatter.len(),
        "parsed markdown document"
    );
    MarkdownAst::new(frontmatter, elements)
}

fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

struct BlockScanner<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> BlockScanner<'a> {
    fn new(body: &'a str) -> Self {
        Self {
            lines: body.lines().collect(),
            pos: 0,
        }
    }

    fn scan(mut self) -> Vec<MarkdownElement> {
        let mut elements = Vec::new();

        while let Some(line) = self.current() {
            if is_blank(line) {
                self.pos += 1;
                continue;
            }

            let element = if let Some(fence) = open_fence(line) {
                self.code_block(fence)
            } else if let Some((level, text)) = header(line) {
                self.pos += 1;
                MarkdownElement::Header { level, text }
            } else if let Some(item) = list_item(line) {
                self.list(item)
            } else if is_blockquote(line) {
                self.blockquote()
            } else if is_table_row(line) {
                self.table()
            } else if is_html_start(line) {
                self.html_block()
            } else {
                self.paragraph()
            };
            elements.push(element);
        }

        elements
    }

    fn current(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn code_block(&mut self, fence: Fence) -> MarkdownElement {
        self.pos += 1;
        let mut body = Vec::new();
        while let Some(line) = self.current() {
            self.pos += 1;
            if fence.is_closed_by(line) {
                break;
            }
            body.push(line);
        }
        MarkdownElement::CodeBlock {
            language: fence.language,
            text: body.join("\n"),
        }
    }

    fn list(&mut self, first: ListItem<'a>) -> MarkdownElement {
        let ordered = first.ordered;
        let base = first.indent;
        let mut items = vec![first.content.to_string()];
        self.pos += 1;

        while let Some(line) = self.current() {
            if is_blank(line) {
                let Some(next) = self.next_non_blank(self.pos) else {
                    break;
                };
                let next_line = self.lines[next];
                let same_list = list_item(next_line)
                    .map(|item| item.indent <= base && item.ordered == ordered)
                    .unwrap_or(false);
                if indent_width(next_line) > base && !same_list {
                    if let Some(last) = items.last_mut() {
                        for _ in self.pos..next {
                            last.push('\n');
                        }
                    }
                } else if !same_list {
                    break;
                }
                self.pos = next;
                continue;
            }

            if let Some(item) = list_item(line) {
                if item.indent <= base {
                    if item.ordered != ordered {
                        break;
                    }
                    items.push(item.content.to_string());
                    self.pos += 1;
                    continue;
                }
            }

            let folded = if indent_width(line) > base {
                strip_indent(line, base).trim_end()
            } else if opens_block(line) {
                break;
            } else {
                // Lazy continuation of the item's paragraph.
                line.trim()
            };
            if let Some(last) = items.last_mut() {
                last.push('\n');
                last.push_str(folded);
            }
            self.pos += 1;
        }

        MarkdownElement::List { ordered, items }
    }

    fn blockquote(&mut self) -> MarkdownElement {
        let mut lines = Vec::new();
        while let Some(line) = self.current() {
            if !is_blockquote(line) {
                break;
            }
            let trimmed = line.trim_start();
            let rest = trimmed.strip_prefix('>').unwrap_or(trimmed);
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            lines.push(rest.trim_end());
            self.pos += 1;
        }
        MarkdownElement::Blockquote {
            text: lines.join("\n"),
        }
    }

    fn table(&mut self) -> MarkdownElement {
        let mut rows = Vec::new();
        let mut row_count = 0;
        while let Some(line) = self.current() {
            if !is_table_row(line) {
                break;
            }
            let cells = split_cells(line);
            // Only the line right after the header row is a delimiter row.
            let delimiter = rows.len() == 1 && row_count == 1 && is_alignment_row(&cells);
            if !delimiter {
                rows.push(cells);
            }
            row_count += 1;
            self.pos += 1;
        }
        MarkdownElement::Table { rows }
    }

    fn html_block(&mut self) -> MarkdownElement {
        let comment = block_content(self.lines[self.pos])
            .map(|l| l.starts_with("<!--"))
            .unwrap_or(false);
        let mut lines = Vec::new();

        while let Some(line) = self.current() {
            if !comment && is_blank(line) {
                break;
            }
            lines.push(line.trim_end());
            self.pos += 1;
            if comment && line.contains("-->") {
                break;
            }
        }

        MarkdownElement::HtmlBlock {
            text: lines.join("\n"),
        }
    }

    fn paragraph(&mut self) -> MarkdownElement {
        let mut lines = vec![self.lines[self.pos].trim()];
        self.pos += 1;
        while let Some(line) = self.current() {
            if is_blank(line) || opens_block(line) {
                break;
            }
            lines.push(line.trim());
            self.pos += 1;
        }
        MarkdownElement::Paragraph {
            text: lines.join("\n"),
        }
    }

    fn next_non_blank(&self, from: usize) -> Option<usize> {
        (from..self.lines.len()).find(|&i| !is_blank(self.lines[i]))
    }
}

struct Fence {
    marker: char,
    len: usize,
    language: Option<String>,
}

impl Fence {
    fn is_closed_by(&self, line: &str) -> bool {
        let Some(content) = block_content(line) else {
            return false;
        };
        let content = content.trim_end();
        let run = content.chars().take_while(|&c| c == self.marker).count();
        run >= self.len && run == content.chars().count()
    }
}

struct ListItem<'a> {
    ordered: bool,
    indent: usize,
    content: &'a str,
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Column width of leading whitespace, tabs counted as 4.
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Remove up to `width` columns of leading whitespace.
fn strip_indent(line: &str, width: usize) -> &str {
    let mut removed = 0;
    for (i, c) in line.char_indices() {
        if removed >= width || !(c == ' ' || c == '\t') {
            return &line[i..];
        }
        removed += if c == '\t' { 4 } else { 1 };
    }
    ""
}

/// The line without its leading whitespace, if it is shallow enough to
/// open a block.
fn block_content(line: &str) -> Option<&str> {
    if indent_width(line) < MAX_BLOCK_INDENT {
        Some(line.trim_start())
    } else {
        None
    }
}

fn open_fence(line: &str) -> Option<Fence> {
    let content = block_content(line)?;
    let marker = content.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = content.chars().take_while(|&c| c == marker).count();
    if len < 3 {
        return None;
    }
    let info = content[len..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    let language = info
        .split_whitespace()
        .next()
        .map(|lang| lang.to_string());
    Some(Fence {
        marker,
        len,
        language,
    })
}

fn header(line: &str) -> Option<(u8, String)> {
    let content = block_content(line)?;
    let level = content.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &content[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let mut text = rest.trim();
    let without_closing = text.trim_end_matches('#');
    if without_closing.is_empty() || without_closing.ends_with(char::is_whitespace) {
        text = without_closing.trim_end();
    }
    Some((level as u8, text.to_string()))
}

fn list_item(line: &str) -> Option<ListItem<'_>> {
    let indent = indent_width(line);
    let content = line.trim_start();
    let first = content.chars().next()?;

    let (ordered, marker_end) = if matches!(first, '-' | '*' | '+') {
        (false, first.len_utf8())
    } else if first.is_ascii_digit() {
        let digits = content.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 9 {
            return None;
        }
        match content[digits..].chars().next() {
            Some('.') | Some(')') => (true, digits + 1),
            _ => return None,
        }
    } else {
        return None;
    };

    let rest = &content[marker_end..];
    if rest.is_empty() {
        return Some(ListItem {
            ordered,
            indent,
            content: "",
        });
    }
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some(ListItem {
        ordered,
        indent,
        content: rest.trim(),
    })
}

fn is_blockquote(line: &str) -> bool {
    block_content(line)
        .map(|l| l.starts_with('>'))
        .unwrap_or(false)
}

fn is_table_row(line: &str) -> bool {
    block_content(line)
        .map(|l| l.starts_with('|'))
        .unwrap_or(false)
}

/// `<!…`, or an opening/closing tag whose name is followed by whitespace,
/// `>`, `/`, or the end of the line. Autolinks such as `<https://…>` and
/// `<me@example.com>` are not tags.
fn is_html_start(line: &str) -> bool {
    let Some(content) = block_content(line) else {
        return false;
    };
    let Some(rest) = content.strip_prefix('<') else {
        return false;
    };
    if rest.starts_with('!') {
        return true;
    }
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return false;
    }
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(rest.len());
    match rest[name_len..].chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || c == '>' || c == '/',
    }
}

/// Whether the line starts any block other than a paragraph.
fn opens_block(line: &str) -> bool {
    open_fence(line).is_some()
        || header(line).is_some()
        || list_item(line).is_some()
        || is_blockquote(line)
        || is_table_row(line)
        || is_html_start(line)
}

/// Split a `| a | b |` row into trimmed cells. `\|` stays inside a cell.
fn split_cells(line: &str) -> Vec<String> {
    let row = line.trim();
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = if row.ends_with('|') && !row.ends_with("\\|") {
        &row[..row.len() - 1]
    } else {
        row
    };

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut escaped = false;
    for c in row.chars() {
        if escaped {
            cell.push(c);
            escaped = false;
        } else if c == '\\' {
            cell.push(c);
            escaped = true;
        } else if c == '|' {
            cells.push(cell.trim().to_string());
            cell.clear();
        } else {
            cell.push(c);
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

fn is_alignment_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let inner = cell.trim_start_matches(':').trim_end_matches(':');
            !inner.is_empty() && inner.chars().all(|c| c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(ast: &MarkdownAst) -> Vec<&'static str> {
        ast.elements.iter().map(|e| e.kind()).collect()
    }

    #[test]
    fn test_empty_input() {
        let ast = parse("");
        assert!(ast.is_empty());
        assert!(ast.frontmatter.is_empty());
    }

    #[test]
    fn test_headers_and_paragraphs() {
        let ast = parse("# Title\n\nFirst line\nsecond line\n\n### Deep ###\n\nEnd.");
        assert_eq!(kinds(&ast), vec!["header", "paragraph", "header", "paragraph"]);
        assert_eq!(
            ast.elements[0],
            MarkdownElement::Header {
                level: 1,
                text: "Title".to_string()
            }
        );
        assert_eq!(
            ast.elements[1],
            MarkdownElement::Paragraph {
                text: "First line\nsecond line".to_string()
            }
        );
        assert_eq!(
            ast.elements[2],
            MarkdownElement::Header {
                level: 3,
                text: "Deep".to_string()
            }
        );
    }

    #[test]
    fn test_hash_without_space_is_not_header() {
        let ast = parse("#hashtag\n\n####### seven");
        assert_eq!(kinds(&ast), vec!["paragraph", "paragraph"]);
    }

    #[test]
    fn test_header_interrupts_paragraph() {
        let ast = parse("Some text\n## Next");
        assert_eq!(kinds(&ast), vec!["paragraph", "header"]);
    }

    #[test]
    fn test_code_block_keeps_blank_lines_and_language() {
        let ast = parse("```rust\nfn a() {}\n\n\nfn b() {}\n```\nafter");
        assert_eq!(
            ast.elements[0],
            MarkdownElement::CodeBlock {
                language: Some("rust".to_string()),
                text: "fn a() {}\n\n\nfn b() {}".to_string()
            }
        );
        assert_eq!(kinds(&ast), vec!["code_block", "paragraph"]);
    }

    #[test]
    fn test_code_block_content_is_not_parsed() {
        let ast = parse("```\n# not a header\n- not a list\n```");
        assert_eq!(kinds(&ast), vec!["code_block"]);
        assert_eq!(
            ast.elements[0],
            MarkdownElement::CodeBlock {
                language: None,
                text: "# not a header\n- not a list".to_string()
            }
        );
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let ast = parse("Intro\n\n```python\nprint(1)\n\nprint(2)");
        assert_eq!(kinds(&ast), vec!["paragraph", "code_block"]);
        assert_eq!(
            ast.elements[1],
            MarkdownElement::CodeBlock {
                language: Some("python".to_string()),
                text: "print(1)\n\nprint(2)".to_string()
            }
        );
    }

    #[test]
    fn test_tilde_fence_needs_matching_closer() {
        let ast = parse("~~~~\n```\ninner\n```\n~~~~");
        assert_eq!(
            ast.elements,
            vec![MarkdownElement::CodeBlock {
                language: None,
                text: "```\ninner\n```".to_string()
            }]
        );
    }

    #[test]
    fn test_list_items_in_order() {
        let ast = parse("- one\n- two\n* three\n+ four");
        assert_eq!(
            ast.elements,
            vec![MarkdownElement::List {
                ordered: false,
                items: vec![
                    "one".to_string(),
                    "two".to_string(),
                    "three".to_string(),
                    "four".to_string()
                ]
            }]
        );
    }

    #[test]
    fn test_ordered_list() {
        let ast = parse("1. first\n2. second\n10) tenth");
        assert_eq!(
            ast.elements,
            vec![MarkdownElement::List {
                ordered: true,
                items: vec![
                    "first".to_string(),
                    "second".to_string(),
                    "tenth".to_string()
                ]
            }]
        );
    }

    #[test]
    fn test_nested_items_fold_into_parent() {
        let ast = parse("- parent\n  - child\n    - grandchild\n- sibling");
        assert_eq!(
            ast.elements,
            vec![MarkdownElement::List {
                ordered: false,
                items: vec![
                    "parent\n  - child\n    - grandchild".to_string(),
                    "sibling".to_string()
                ]
            }]
        );
    }

    #[test]
    fn test_loose_list_stays_one_element() {
        let ast = parse("- a\n\n- b\n\n  continued\n\nAfter.");
        assert_eq!(kinds(&ast), vec!["list", "paragraph"]);
        assert_eq!(
            ast.elements[0],
            MarkdownElement::List {
                ordered: false,
                items: vec!["a".to_string(), "b\n\n  continued".to_string()]
            }
        );
    }

    #[test]
    fn test_switching_list_kind_starts_new_list() {
        let ast = parse("- bullet\n1. number");
        assert_eq!(kinds(&ast), vec!["list", "list"]);
    }

    #[test]
    fn test_thematic_break_is_not_list() {
        let ast = parse("***\n\n- real item");
        assert_eq!(kinds(&ast), vec!["paragraph", "list"]);
    }

    #[test]
    fn test_blockquote() {
        let ast = parse("> quoted\n> > nested\n>\n> end\n\nplain");
        assert_eq!(kinds(&ast), vec!["blockquote", "paragraph"]);
        assert_eq!(
            ast.elements[0],
            MarkdownElement::Blockquote {
                text: "quoted\n> nested\n\nend".to_string()
            }
        );
    }

    #[test]
    fn test_table_rows() {
        let ast = parse("| Name | Value |\n|:-----|------:|\n| a | 1 |\n| b \\| c | 2 |");
        assert_eq!(
            ast.elements,
            vec![MarkdownElement::Table {
                rows: vec![
                    vec!["Name".to_string(), "Value".to_string()],
                    vec!["a".to_string(), "1".to_string()],
                    vec!["b \\| c".to_string(), "2".to_string()],
                ]
            }]
        );
    }

    #[test]
    fn test_html_block_until_blank_line() {
        let ast = parse("<div class=\"note\">\n  <p>Hi</p>\n</div>\n\nText");
        assert_eq!(kinds(&ast), vec!["html_block", "paragraph"]);
        assert_eq!(
            ast.elements[0],
            MarkdownElement::HtmlBlock {
                text: "<div class=\"note\">\n  <p>Hi</p>\n</div>".to_string()
            }
        );
    }

    #[test]
    fn test_html_comment_spans_blank_lines() {
        let ast = parse("<!-- a\n\nb -->\nText");
        assert_eq!(kinds(&ast), vec!["html_block", "paragraph"]);
    }

    #[test]
    fn test_inline_angle_bracket_is_paragraph() {
        let ast = parse("< not html\n\n1 < 2");
        assert_eq!(kinds(&ast), vec!["paragraph", "paragraph"]);
    }

    #[test]
    fn test_autolink_line_is_paragraph() {
        let ast = parse("<https://example.com> is the homepage\nand more text\n\n<me@example.com> writes back");
        assert_eq!(kinds(&ast), vec!["paragraph", "paragraph"]);
        assert_eq!(
            ast.elements[0],
            MarkdownElement::Paragraph {
                text: "<https://example.com> is the homepage\nand more text".to_string()
            }
        );
    }

    #[test]
    fn test_tag_forms_open_html_blocks() {
        for line in ["<br/>", "<hr>", "</section>", "<custom-el data-x=\"1\">", "<details"] {
            assert_eq!(kinds(&parse(line)), vec!["html_block"], "{line}");
        }
    }

    #[test]
    fn test_dash_cells_in_body_rows_kept() {
        let ast = parse("| a | b |\n|---|---|\n| - | - |\n| x | - |");
        assert_eq!(
            ast.elements,
            vec![MarkdownElement::Table {
                rows: vec![
                    vec!["a".to_string(), "b".to_string()],
                    vec!["-".to_string(), "-".to_string()],
                    vec!["x".to_string(), "-".to_string()],
                ]
            }]
        );
        assert_eq!(
            ast.flattened_text(),
            "| a | b |\n| --- | --- |\n| - | - |\n| x | - |"
        );
    }

    #[test]
    fn test_delimiter_only_table_keeps_its_row() {
        let ast = parse("|---|");
        assert_eq!(
            ast.elements,
            vec![MarkdownElement::Table {
                rows: vec![vec!["---".to_string()]]
            }]
        );
        assert!(!ast.flattened_text().trim().is_empty());
    }

    #[test]
    fn test_nested_quote_marker_kept() {
        let ast = parse(">> deep quote\n> shallow\n>no space");
        assert_eq!(
            ast.elements,
            vec![MarkdownElement::Blockquote {
                text: "> deep quote\nshallow\nno space".to_string()
            }]
        );
    }

    #[test]
    fn test_crlf_input() {
        let ast = parse("---\r\ntitle: T\r\n---\r\n# H\r\n\r\nBody\r\n");
        assert_eq!(ast.frontmatter["title"], "T");
        assert_eq!(kinds(&ast), vec!["header", "paragraph"]);
    }

    #[test]
    fn test_malformed_frontmatter_parsed_as_body() {
        let ast = parse("---\nkey: [oops\n---\n# Title");
        assert!(ast.frontmatter.is_empty());
        assert_eq!(ast.elements.last().map(|e| e.kind()), Some("header"));
        assert_eq!(
            ast.elements[0],
            MarkdownElement::Paragraph {
                text: "---\nkey: [oops\n---".to_string()
            }
        );
    }

    #[test]
    fn test_non_ascii_content() {
        let ast = parse("# Überschrift 🎉\n\nTexte accentué — ça marche.");
        assert_eq!(kinds(&ast), vec!["header", "paragraph"]);
    }
}
