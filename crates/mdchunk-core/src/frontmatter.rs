//! YAML frontmatter extraction.
//!
//! A document has frontmatter when its first line is exactly `---` and a
//! later line is exactly `---`. The block between them is parsed as YAML
//! and must be a mapping.
//!
//! Failure is contained here: a missing closing delimiter, invalid YAML, or
//! a non-mapping document all yield an empty map and the original text,
//! delimiters included. Callers never see an error.

use tracing::debug;

use crate::models::Metadata;

const DELIMITER: &str = "---";

/// Split `text` into its frontmatter mapping and the remaining body.
///
/// ```rust
/// use mdchunk_core::frontmatter::extract_frontmatter;
///
/// let (fm, body) = extract_frontmatter("---\ntitle: Hello\n---\n# Body\n");
/// assert_eq!(fm["title"], "Hello");
/// assert_eq!(body, "# Body\n");
///
/// let (fm, body) = extract_frontmatter("---\n: [broken\n---\nText");
/// assert!(fm.is_empty());
/// assert_eq!(body, "---\n: [broken\n---\nText");
/// ```
pub fn extract_frontmatter(text: &str) -> (Metadata, &str) {
    let Some((block, body)) = split_block(text) else {
        return (Metadata::new(), text);
    };

    match parse_block(block) {
        Some(map) => (map, body),
        None => {
            debug!("frontmatter is not a valid YAML mapping; treating it as body text");
            (Metadata::new(), text)
        }
    }
}

/// Locate the delimited block. Returns `(block, body_after_closing_line)`.
fn split_block(text: &str) -> Option<(&str, &str)> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != DELIMITER {
        return None;
    }

    let block_start = first.len();
    let mut offset = block_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            let block = &text[block_start..offset];
            let body = &text[offset + line.len()..];
            return Some((block, body));
        }
        offset += line.len();
    }
    None
}

fn parse_block(block: &str) -> Option<Metadata> {
    if block.trim().is_empty() {
        return Some(Metadata::new());
    }
    let value: serde_yaml::Value = serde_yaml::from_str(block).ok()?;
    match value {
        serde_yaml::Value::Null => Some(Metadata::new()),
        serde_yaml::Value::Mapping(_) => serde_yaml::from_value::<Metadata>(value).ok(),
        _ => None,
    }
}
