// ABOUTME: Heading style downgrade for document bodies.
// ABOUTME: Pure transform that rewrites disallowed text block styles and records an audit line per change.

use std::collections::BTreeSet;
use std::fmt;

use crate::blocks::Block;

/// One rewritten block style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleChange {
    pub index: usize,
    pub key: Option<String>,
    pub from: String,
    pub to: String,
}

impl fmt::Display for StyleChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {} [{}]: {} -> {}",
            self.index,
            self.key.as_deref().unwrap_or("-"),
            self.from,
            self.to
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingDowngrade {
    pub blocks: Vec<Block>,
    pub changes: Vec<StyleChange>,
}

impl HeadingDowngrade {
    pub fn count(&self) -> usize {
        self.changes.len()
    }

    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Replace every disallowed text block style with `replacement`.
pub fn downgrade_headings(
    body: &[Block],
    disallowed: &BTreeSet<String>,
    replacement: &str,
) -> HeadingDowngrade {
    let mut changes = Vec::new();
    let blocks = body
        .iter()
        .enumerate()
        .map(|(index, block)| match block {
            Block::Text(text) if disallowed.contains(&text.style) && text.style != replacement => {
                changes.push(StyleChange {
                    index,
                    key: text.key.clone(),
                    from: text.style.clone(),
                    to: replacement.to_string(),
                });
                let mut text = text.clone();
                text.style = replacement.to_string();
                Block::Text(text)
            }
            other => other.clone(),
        })
        .collect();
    HeadingDowngrade { blocks, changes }
}
