//! Core data models: the parsed document and the chunks produced from it.
//!
//! A [`MarkdownAst`] is produced once per document by
//! [`parse`](crate::parser::parse) and is never mutated afterwards.
//! [`DocumentChunk`]s are created fresh per chunking call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Range;

/// String-keyed metadata map. Ordered, so serialized output is stable.
pub type Metadata = BTreeMap<String, Value>;

/// Separator placed between element representations in the flattened text.
pub const ELEMENT_SEPARATOR: &str = "\n\n";

/// Length of [`ELEMENT_SEPARATOR`] in characters.
pub const ELEMENT_SEPARATOR_LEN: usize = 2;

/// A typed structural unit of a markdown document.
///
/// No chunking strategy splits an element's content across two chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarkdownElement {
    Header {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    CodeBlock {
        language: Option<String>,
        text: String,
    },
    /// Nested sub-items are flattened into their parent item's text.
    List {
        ordered: bool,
        items: Vec<String>,
    },
    /// Cell text per row. The alignment row is not stored.
    Table {
        rows: Vec<Vec<String>>,
    },
    Blockquote {
        text: String,
    },
    HtmlBlock {
        text: String,
    },
}

impl MarkdownElement {
    /// Stable lowercase name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            MarkdownElement::Header { .. } => "header",
            MarkdownElement::Paragraph { .. } => "paragraph",
            MarkdownElement::CodeBlock { .. } => "code_block",
            MarkdownElement::List { .. } => "list",
            MarkdownElement::Table { .. } => "table",
            MarkdownElement::Blockquote { .. } => "blockquote",
            MarkdownElement::HtmlBlock { .. } => "html_block",
        }
    }

    /// Whether the element must be kept whole even when it alone exceeds
    /// the target chunk size.
    pub fn is_atomic(&self) -> bool {
        match self {
            MarkdownElement::CodeBlock { .. }
            | MarkdownElement::List { .. }
            | MarkdownElement::Table { .. }
            | MarkdownElement::HtmlBlock { .. } => true,
            MarkdownElement::Header { .. }
            | MarkdownElement::Paragraph { .. }
            | MarkdownElement::Blockquote { .. } => false,
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self, MarkdownElement::Header { .. })
    }

    /// Render the element back to markdown. This is the text that chunk
    /// content and the flattened view are built from.
    pub fn to_markdown(&self) -> String {
        match self {
            MarkdownElement::Header { level, text } => {
                format!("{} {}", "#".repeat(*level as usize), text)
            }
            MarkdownElement::Paragraph { text } | MarkdownElement::HtmlBlock { text } => {
                text.clone()
            }
            MarkdownElement::CodeBlock { language, text } => {
                let fence = "`".repeat(fence_len(text));
                let lang = language.as_deref().unwrap_or("");
                if text.is_empty() {
                    format!("{fence}{lang}\n{fence}")
                } else {
                    format!("{fence}{lang}\n{text}\n{fence}")
                }
            }
            MarkdownElement::List { ordered, items } => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    if *ordered {
                        format!("{}. {}", i + 1, item)
                    } else {
                        format!("- {}", item)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
            MarkdownElement::Table { rows } => render_table(rows),
            MarkdownElement::Blockquote { text } => text
                .split('\n')
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {}", line)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Length of [`to_markdown`](Self::to_markdown) in characters.
    pub fn char_len(&self) -> usize {
        self.to_markdown().chars().count()
    }
}

/// A fence must be longer than any backtick run inside the code.
fn fence_len(code: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    (longest + 1).max(3)
}

fn render_table(rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(format!("| {} |", row.join(" | ")));
        if i == 0 {
            let columns = row.len().max(1);
            lines.push(format!("|{}", " --- |".repeat(columns)));
        }
    }
    lines.join("\n")
}

/// Parsed markdown document: frontmatter plus elements in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkdownAst {
    pub frontmatter: Metadata,
    pub elements: Vec<MarkdownElement>,
}

impl MarkdownAst {
    pub fn new(frontmatter: Metadata, elements: Vec<MarkdownElement>) -> Self {
        Self {
            frontmatter,
            elements,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Document title: frontmatter `title` if it is a string, else the
    /// first level-1 header.
    pub fn title(&self) -> Option<String> {
        if let Some(Value::String(title)) = self.frontmatter.get("title") {
            return Some(title.clone());
        }
        self.elements.iter().find_map(|el| match el {
            MarkdownElement::Header { level: 1, text } => Some(text.clone()),
            _ => None,
        })
    }

    /// Element representations joined by [`ELEMENT_SEPARATOR`].
    pub fn flattened_text(&self) -> String {
        self.flatten().text
    }

    /// Flattened text together with the character span of every element.
    pub fn flatten(&self) -> FlattenedText {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(self.elements.len());
        let mut offset = 0;

        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                text.push_str(ELEMENT_SEPARATOR);
                offset += ELEMENT_SEPARATOR_LEN;
            }
            let rendered = element.to_markdown();
            let len = rendered.chars().count();
            text.push_str(&rendered);
            spans.push(offset..offset + len);
            offset += len;
        }

        FlattenedText {
            text,
            spans,
            char_len: offset,
        }
    }
}

/// The coordinate space of chunk positions.
///
/// `spans[i]` is the character range of `elements[i]` inside `text`.
#[derive(Debug, Clone)]
pub struct FlattenedText {
    pub text: String,
    pub spans: Vec<Range<usize>>,
    pub char_len: usize,
}

impl FlattenedText {
    /// Byte offset of every char boundary, including the end of the text.
    pub fn char_boundaries(&self) -> Vec<usize> {
        self.text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(self.text.len()))
            .collect()
    }
}

/// A bounded unit of output content with its position and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    /// Character offset of the chunk start in the flattened text.
    pub start_position: usize,
    /// Character offset one past the chunk end in the flattened text.
    pub end_position: usize,
}

impl DocumentChunk {
    /// A chunk without id; the engine assigns ids after strategy output.
    pub fn unassigned(
        content: String,
        start_position: usize,
        end_position: usize,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: String::new(),
            content,
            metadata,
            start_position,
            end_position,
        }
    }

    pub fn chunk_index(&self) -> Option<u64> {
        self.metadata.get("chunk_index").and_then(Value::as_u64)
    }

    pub fn total_chunks(&self) -> Option<u64> {
        self.metadata.get("total_chunks").and_then(Value::as_u64)
    }
}
