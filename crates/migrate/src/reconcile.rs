// ABOUTME: Draft/publish reconciliation: pairs drafts with published documents by base id.
// ABOUTME: Classifies each draft as a duplicate (safe to delete) or an orphan (needs review).

use std::collections::BTreeMap;

use crate::document::ContentDocument;

/// State of one base identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairStatus {
    /// A draft exists next to a published version.
    Duplicate,
    /// A draft exists with no published version.
    Orphan,
    /// Only the published version exists.
    PublishedOnly,
}

/// Published and draft versions sharing one base identifier.
#[derive(Debug, Clone, Copy)]
pub struct DraftPublishPair<'a> {
    pub base_id: &'a str,
    pub published: Option<&'a ContentDocument>,
    pub draft: Option<&'a ContentDocument>,
}

impl DraftPublishPair<'_> {
    pub fn status(&self) -> PairStatus {
        match (self.published, self.draft) {
            (Some(_), Some(_)) => PairStatus::Duplicate,
            (None, Some(_)) => PairStatus::Orphan,
            _ => PairStatus::PublishedOnly,
        }
    }
}

/// Group documents by base identifier, ordered by base id.
pub fn pairs(documents: &[ContentDocument]) -> Vec<DraftPublishPair<'_>> {
    let mut by_base: BTreeMap<&str, DraftPublishPair<'_>> = BTreeMap::new();
    for doc in documents {
        let base_id = doc.base_id();
        let entry = by_base.entry(base_id).or_insert(DraftPublishPair {
            base_id,
            published: None,
            draft: None,
        });
        if doc.is_draft() {
            entry.draft = Some(doc);
        } else {
            entry.published = Some(doc);
        }
    }
    by_base.into_values().collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Drafts superseded by a published version; deletion candidates.
    pub duplicates: Vec<ContentDocument>,
    /// Drafts with no published version; never deleted automatically.
    pub orphans: Vec<ContentDocument>,
    /// Base ids that have only a published version.
    pub published_only: usize,
}

/// Classify every draft as exactly one of duplicate or orphan.
pub fn reconcile(documents: &[ContentDocument]) -> Reconciliation {
    let mut out = Reconciliation::default();
    for pair in pairs(documents) {
        match (pair.status(), pair.draft) {
            (PairStatus::Duplicate, Some(draft)) => out.duplicates.push(draft.clone()),
            (PairStatus::Orphan, Some(draft)) => out.orphans.push(draft.clone()),
            _ => out.published_only += 1,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn doc(id: &str) -> ContentDocument {
        ContentDocument::new(id, "post")
    }

    fn ids(docs: &[ContentDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn classifies_duplicate_and_orphan() {
        let docs = vec![doc("a"), doc("drafts.a"), doc("drafts.b")];
        let result = reconcile(&docs);
        assert_eq!(ids(&result.duplicates), vec!["drafts.a"]);
        assert_eq!(ids(&result.orphans), vec!["drafts.b"]);
        assert_eq!(result.published_only, 0);
    }

    #[test]
    fn published_only_is_counted_not_classified() {
        let docs = vec![doc("a"), doc("c"), doc("drafts.c")];
        let result = reconcile(&docs);
        assert_eq!(ids(&result.duplicates), vec!["drafts.c"]);
        assert!(result.orphans.is_empty());
        assert_eq!(result.published_only, 1);
    }

    #[test]
    fn order_of_input_does_not_matter() {
        let docs = vec![doc("drafts.x"), doc("y"), doc("x"), doc("drafts.z")];
        let result = reconcile(&docs);
        assert_eq!(ids(&result.duplicates), vec!["drafts.x"]);
        assert_eq!(ids(&result.orphans), vec!["drafts.z"]);
    }

    #[test]
    fn every_draft_lands_in_exactly_one_set() {
        let docs: Vec<ContentDocument> = [
            "p1", "drafts.p1", "drafts.p2", "p3", "drafts.p4", "p5", "drafts.p5", "drafts.p6",
        ]
        .iter()
        .map(|id| doc(id))
        .collect();
        let result = reconcile(&docs);

        let dup: HashSet<&str> = ids(&result.duplicates).into_iter().collect();
        let orph: HashSet<&str> = ids(&result.orphans).into_iter().collect();
        let drafts: HashSet<&str> = docs
            .iter()
            .filter(|d| d.is_draft())
            .map(|d| d.id.as_str())
            .collect();

        assert!(dup.is_disjoint(&orph));
        let union: HashSet<&str> = dup.union(&orph).copied().collect();
        assert_eq!(union, drafts);
    }

    #[test]
    fn pairs_group_by_base_id() {
        let docs = vec![doc("drafts.b"), doc("a"), doc("drafts.a")];
        let statuses: Vec<(&str, PairStatus)> =
            pairs(&docs).iter().map(|p| (p.base_id, p.status())).collect();
        assert_eq!(
            statuses,
            vec![("a", PairStatus::Duplicate), ("b", PairStatus::Orphan)]
        );
    }
}
