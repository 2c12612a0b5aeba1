// ABOUTME: Image un-nesting pass for migrated article HTML.
// ABOUTME: Hoists images out of inline wrappers by splitting each wrapper into before/after copies.

use std::collections::BTreeSet;

use tracing::debug;

use super::{replace_child, DomNode, Element};

/// Wrapper tags split around an image by default.
pub const DEFAULT_WRAPPER_TAGS: &[&str] = &["p", "div", "figure", "span", "a"];

/// Maximum number of wrapper ancestors between an image and the container.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Embedded media that keep an otherwise text-empty split half alive.
const MEDIA_TAGS: &[&str] = &["img", "picture", "video", "iframe", "audio", "embed", "object"];

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub wrapper_tags: BTreeSet<String>,
    pub max_depth: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            wrapper_tags: DEFAULT_WRAPPER_TAGS.iter().map(|t| t.to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl NormalizeOptions {
    pub fn wrapper_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.wrapper_tags = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn is_wrapper(&self, tag: &str) -> bool {
        self.wrapper_tags.contains(tag)
    }
}

/// Counters from one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub images: usize,
    /// Images moved out of at least one wrapper.
    pub hoisted: usize,
    pub splits: usize,
    /// Images under more wrappers than the bound, left in place.
    pub too_deep: usize,
}

/// Normalize with the default wrapper set and depth bound.
pub fn normalize(root: DomNode) -> DomNode {
    normalize_with(root, &NormalizeOptions::default()).0
}

/// Hoist every image under `root` out of its wrapper ancestors.
///
/// `root` is the content container and is never split itself. Splitting keeps
/// the number and document order of images, so the k-th image found now is the
/// k-th image of the snapshot taken before the first mutation.
pub fn normalize_with(mut root: DomNode, opts: &NormalizeOptions) -> (DomNode, NormalizeReport) {
    let total = root.count_descendants("img");
    let mut report = NormalizeReport {
        images: total,
        ..Default::default()
    };

    for ordinal in 0..total {
        let Some(path) = image_path(&root, ordinal) else {
            break;
        };
        let wrappers = wrapper_ancestors(&root, &path, opts);
        if wrappers > opts.max_depth {
            debug!(ordinal, wrappers, "image nested too deep, left in place");
            report.too_deep += 1;
            continue;
        }
        let splits = hoist(&mut root, path, opts);
        if splits > 0 {
            report.hoisted += 1;
            report.splits += splits;
        }
    }

    (root, report)
}

/// Walk up from the node at `cursor`, splitting wrapper ancestors around it.
///
/// `cursor` always points at the node being hoisted: the image, or the
/// transparent ancestor the walk has passed through. Returns the split count.
fn hoist(root: &mut DomNode, mut cursor: Vec<usize>, opts: &NormalizeOptions) -> usize {
    let mut depth = 0;
    let mut splits = 0;

    // A cursor of length one is a direct child of the container.
    while cursor.len() > 1 {
        let (&child_index, parent_path) = match cursor.split_last() {
            Some(parts) => parts,
            None => break,
        };
        let is_wrapper = root
            .node_at(parent_path)
            .and_then(DomNode::tag)
            .is_some_and(|tag| opts.is_wrapper(tag));
        if !is_wrapper {
            cursor.pop();
            continue;
        }

        // Only wrappers count toward the bound; transparent ancestors are free.
        depth += 1;
        if depth > opts.max_depth {
            break;
        }

        let (&ancestor_index, grand_path) = match parent_path.split_last() {
            Some(parts) => parts,
            None => break,
        };
        let grand_path = grand_path.to_vec();
        let Some(grand) = root.node_at_mut(&grand_path) else {
            break;
        };

        let owned = std::mem::replace(grand, DomNode::Fragment(Vec::new()));
        let Some(DomNode::Element(ancestor)) = owned.children().get(ancestor_index) else {
            *grand = owned;
            break;
        };
        let (sequence, hoisted_at) = split_around(ancestor, child_index);
        *grand = replace_child(owned, ancestor_index, sequence);
        splits += 1;

        cursor = grand_path;
        cursor.push(ancestor_index + hoisted_at);
    }

    splits
}

/// Build `[before?, child, after?]` from `ancestor` split at `index`.
///
/// Returns the sequence and the position of the hoisted child within it.
fn split_around(ancestor: &Element, index: usize) -> (Vec<DomNode>, usize) {
    let before = Element {
        tag: ancestor.tag.clone(),
        attrs: ancestor.attrs.clone(),
        children: ancestor.children[..index].to_vec(),
    };
    let keep_before = !is_blank(&before);

    // The id stays with whichever copy comes first.
    let after_attrs = if keep_before {
        ancestor
            .attrs
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case("id"))
            .cloned()
            .collect()
    } else {
        ancestor.attrs.clone()
    };
    let after = Element {
        tag: ancestor.tag.clone(),
        attrs: after_attrs,
        children: ancestor.children[index + 1..].to_vec(),
    };

    let mut sequence = Vec::with_capacity(3);
    if keep_before {
        sequence.push(DomNode::Element(before));
    }
    let hoisted_at = sequence.len();
    sequence.push(ancestor.children[index].clone());
    if !is_blank(&after) {
        sequence.push(DomNode::Element(after));
    }
    (sequence, hoisted_at)
}

fn is_blank(el: &Element) -> bool {
    el.children
        .iter()
        .all(|c| c.text_content().trim().is_empty() && !c.contains_any(MEDIA_TAGS))
}

/// Wrapper elements strictly between `root` and the node at `path`.
fn wrapper_ancestors(root: &DomNode, path: &[usize], opts: &NormalizeOptions) -> usize {
    (1..path.len())
        .filter_map(|len| root.node_at(&path[..len]).and_then(DomNode::tag))
        .filter(|tag| opts.is_wrapper(tag))
        .count()
}

/// Index path (from `root`) of the `ordinal`-th descendant image in document order.
fn image_path(root: &DomNode, ordinal: usize) -> Option<Vec<usize>> {
    fn visit(node: &DomNode, seen: &mut usize, ordinal: usize, path: &mut Vec<usize>) -> bool {
        for (i, child) in node.children().iter().enumerate() {
            path.push(i);
            if child.tag() == Some("img") {
                if *seen == ordinal {
                    return true;
                }
                *seen += 1;
            } else if visit(child, seen, ordinal, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    let mut path = Vec::new();
    let mut seen = 0;
    visit(root, &mut seen, ordinal, &mut path).then_some(path)
}
