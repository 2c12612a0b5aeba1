// ABOUTME: Report-only scanner for boilerplate text left over from the previous publishing platform.
// ABOUTME: Matches trimmed block text against equals/prefix/suffix/contains/regex pattern rules.

//! Boilerplate detection.
//!
//! Literal patterns compare case-insensitively against the trimmed,
//! concatenated span text of each text block. Regex patterns run as written
//! (use `(?i)` for case-insensitive regexes). Every pattern is applied
//! independently, so one block can produce several matches.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::blocks::Block;
use crate::error::MigrateError;

/// One boilerplate rule, as written in a pattern file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Pattern {
    Equals(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Regex(String),
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Equals(s) => write!(f, "equals {:?}", s),
            Pattern::Prefix(s) => write!(f, "prefix {:?}", s),
            Pattern::Suffix(s) => write!(f, "suffix {:?}", s),
            Pattern::Contains(s) => write!(f, "contains {:?}", s),
            Pattern::Regex(s) => write!(f, "regex /{}/", s),
        }
    }
}

/// Default rules for copyright lines, share widgets and post footers.
pub fn default_patterns() -> Vec<Pattern> {
    vec![
        Pattern::Prefix("©".to_string()),
        Pattern::Prefix("copyright".to_string()),
        Pattern::Suffix("all rights reserved".to_string()),
        Pattern::Suffix("all rights reserved.".to_string()),
        Pattern::Equals("share this:".to_string()),
        Pattern::Equals("like this:".to_string()),
        Pattern::Prefix("like loading".to_string()),
        Pattern::Equals("loading...".to_string()),
        Pattern::Equals("read more".to_string()),
        Pattern::Prefix("continue reading".to_string()),
        Pattern::Prefix("posted in".to_string()),
        Pattern::Prefix("filed under".to_string()),
        Pattern::Prefix("tags:".to_string()),
        Pattern::Prefix("this entry was posted".to_string()),
        Pattern::Prefix("related posts".to_string()),
        Pattern::Regex(r"(?i)^(previous|next) (post|article)\b".to_string()),
    ]
}

#[derive(Debug, Clone)]
enum Rule {
    Literal { pattern: Pattern, needle: String },
    Regex { pattern: Pattern, re: Regex },
}

/// Patterns compiled for scanning.
#[derive(Debug, Clone)]
pub struct PatternSet {
    rules: Vec<Rule>,
}

impl PatternSet {
    pub fn compile(patterns: Vec<Pattern>) -> Result<Self, MigrateError> {
        let rules = patterns
            .into_iter()
            .map(|pattern| match &pattern {
                Pattern::Regex(src) => {
                    let re = Regex::new(src).map_err(|e| {
                        MigrateError::input(src.clone(), "CompilePattern", Some(e.into()))
                    })?;
                    Ok(Rule::Regex { pattern, re })
                }
                Pattern::Equals(s)
                | Pattern::Prefix(s)
                | Pattern::Suffix(s)
                | Pattern::Contains(s) => {
                    let needle = s.trim().to_lowercase();
                    Ok(Rule::Literal { pattern, needle })
                }
            })
            .collect::<Result<Vec<_>, MigrateError>>()?;
        Ok(Self { rules })
    }

    /// Parse a JSON array of `{"kind": ..., "value": ...}` objects.
    pub fn from_json(json: &str) -> Result<Self, MigrateError> {
        let patterns: Vec<Pattern> = serde_json::from_str(json)
            .map_err(|e| MigrateError::input("", "ParsePatterns", Some(e.into())))?;
        Self::compile(patterns)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        // The built-in regexes are known to compile.
        Self::compile(default_patterns()).unwrap_or(Self { rules: Vec::new() })
    }
}

impl Rule {
    fn pattern(&self) -> &Pattern {
        match self {
            Rule::Literal { pattern, .. } | Rule::Regex { pattern, .. } => pattern,
        }
    }

    fn matches(&self, text: &str, lowered: &str) -> bool {
        match self {
            Rule::Regex { re, .. } => re.is_match(text),
            Rule::Literal { pattern, needle } => match pattern {
                Pattern::Equals(_) => lowered == needle,
                Pattern::Prefix(_) => lowered.starts_with(needle.as_str()),
                Pattern::Suffix(_) => lowered.ends_with(needle.as_str()),
                Pattern::Contains(_) => lowered.contains(needle.as_str()),
                Pattern::Regex(_) => false,
            },
        }
    }
}

/// A block whose text matched one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    /// Index of the block within the scanned body.
    pub block_index: usize,
    pub matched_text: String,
    pub pattern: Pattern,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {}: {:?} ({})",
            self.block_index, self.matched_text, self.pattern
        )
    }
}

/// Report every (block, pattern) pair that matches. Non-text blocks and blocks
/// with empty text are skipped but keep their index.
pub fn scan(blocks: &[Block], patterns: &PatternSet) -> Vec<Match> {
    let mut matches = Vec::new();
    for (block_index, block) in blocks.iter().enumerate() {
        let Some(text_block) = block.as_text() else {
            continue;
        };
        let joined = text_block.plain_text();
        let text = joined.trim();
        if text.is_empty() {
            continue;
        }
        let lowered = text.to_lowercase();
        for rule in &patterns.rules {
            if rule.matches(text, &lowered) {
                matches.push(Match {
                    block_index,
                    matched_text: text.to_string(),
                    pattern: rule.pattern().clone(),
                });
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{ImageBlock, Span, TextBlock};
    use pretty_assertions::assert_eq;

    fn para(parts: &[&str]) -> Block {
        Block::Text(TextBlock::new(
            "normal",
            parts.iter().map(|p| Span::new(*p)).collect(),
        ))
    }

    #[test]
    fn concatenates_spans_and_trims() {
        let blocks = vec![para(&["  © 2021 ", "Studio", " Ltd.  "])];
        let found = scan(&blocks, &PatternSet::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched_text, "© 2021 Studio Ltd.");
        assert_eq!(found[0].pattern, Pattern::Prefix("©".to_string()));
    }

    #[test]
    fn one_block_can_match_several_patterns() {
        let set = PatternSet::compile(vec![
            Pattern::Prefix("copyright".to_string()),
            Pattern::Suffix("all rights reserved.".to_string()),
            Pattern::Contains("studio".to_string()),
        ])
        .unwrap();
        let blocks = vec![para(&["Copyright Studio. All rights reserved."])];
        let found = scan(&blocks, &set);
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|m| m.block_index == 0));
    }

    #[test]
    fn indexes_refer_to_body_positions() {
        let blocks = vec![
            para(&["A real paragraph."]),
            Block::Image(ImageBlock::default()),
            para(&["   "]),
            para(&["Share this:"]),
        ];
        let found = scan(&blocks, &PatternSet::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].block_index, 3);
    }

    #[test]
    fn equals_requires_whole_text() {
        let blocks = vec![para(&["Read more about our process"]), para(&["READ MORE"])];
        let found = scan(&blocks, &PatternSet::default());
        let indexes: Vec<usize> = found.iter().map(|m| m.block_index).collect();
        assert_eq!(indexes, vec![1]);
    }

    #[test]
    fn regex_patterns_apply() {
        let blocks = vec![para(&["Next post: Moving to the new studio"])];
        let found = scan(&blocks, &PatternSet::default());
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0].pattern, Pattern::Regex(_)));
    }

    #[test]
    fn scanning_leaves_blocks_unchanged() {
        let blocks = vec![para(&["© 2020"]), para(&["Tags: design"])];
        let snapshot = blocks.clone();
        let found = scan(&blocks, &PatternSet::default());
        assert_eq!(found.len(), 2);
        assert_eq!(blocks, snapshot);
    }

    #[test]
    fn pattern_file_round_trips_through_json() {
        let set = PatternSet::from_json(
            r#"[{"kind": "prefix", "value": "Sponsored"}, {"kind": "regex", "value": "^Ad:"}]"#,
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        let found = scan(&[para(&["sponsored content"])], &set);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn invalid_regex_is_an_input_error() {
        let err = PatternSet::from_json(r#"[{"kind": "regex", "value": "("}]"#).unwrap_err();
        assert!(err.is_input());
    }
}
