// ABOUTME: Author backfill: attaches a default person reference to documents missing one.
// ABOUTME: The default is picked by a caller-supplied predicate; no match means no patches at all.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::blocks::Reference;
use crate::document::{is_draft_id, ContentDocument};
use crate::keys::new_key;
use crate::store::Mutation;

/// A document that may be referenced as the default (usually a `person`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

/// Case-insensitive substring match on the candidate's name.
pub fn name_contains(needle: &str) -> impl Fn(&Candidate) -> bool + '_ {
    move |candidate: &Candidate| {
        candidate
            .name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(&needle.to_lowercase()))
    }
}

/// Set `field` on one document to a single reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePatch {
    pub document_id: String,
    pub field: String,
    pub reference: Reference,
}

impl ReferencePatch {
    pub fn to_mutation(&self) -> Mutation {
        let mut set = Map::new();
        set.insert(
            self.field.clone(),
            Value::Array(vec![serde_json::to_value(&self.reference).unwrap_or(Value::Null)]),
        );
        Mutation::patch(self.document_id.clone(), set)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackfillOutcome {
    /// No candidate matched; nothing is patched.
    NoDefault { candidates: usize },
    Planned {
        default: Candidate,
        patches: Vec<ReferencePatch>,
    },
}

impl BackfillOutcome {
    pub fn patches(&self) -> &[ReferencePatch] {
        match self {
            BackfillOutcome::NoDefault { .. } => &[],
            BackfillOutcome::Planned { patches, .. } => patches,
        }
    }

    /// Number of documents that get (or would get) the reference.
    pub fn updated(&self) -> usize {
        self.patches().len()
    }
}

/// True when `field` is absent, null, an empty array or an empty string.
pub fn reference_missing(doc: &ContentDocument, field: &str) -> bool {
    match doc.fields.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Plan a reference patch for every document missing `field`.
///
/// The first published candidate accepted by `matcher` is the default. Draft
/// candidates are never chosen: a reference must target a published id.
pub fn backfill<F>(
    documents: &[ContentDocument],
    field: &str,
    candidates: &[Candidate],
    matcher: F,
) -> BackfillOutcome
where
    F: Fn(&Candidate) -> bool,
{
    let Some(default) = candidates
        .iter()
        .filter(|c| !is_draft_id(&c.id))
        .find(|c| matcher(*c))
    else {
        return BackfillOutcome::NoDefault {
            candidates: candidates.len(),
        };
    };

    let patches = documents
        .iter()
        .filter(|doc| reference_missing(doc, field))
        .map(|doc| ReferencePatch {
            document_id: doc.id.clone(),
            field: field.to_string(),
            reference: Reference::new(default.id.clone()).with_key(new_key()),
        })
        .collect();

    BackfillOutcome::Planned {
        default: default.clone(),
        patches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn people() -> Vec<Candidate> {
        vec![
            Candidate::new("person-jo", "Jo Rivera"),
            Candidate::new("person-studio", "NextMedal Studio"),
        ]
    }

    #[test]
    fn patches_only_documents_missing_the_field() {
        let docs = vec![
            ContentDocument::new("p1", "post"),
            ContentDocument::new("p2", "post").with_field("authors", json!([])),
            ContentDocument::new("p3", "post")
                .with_field("authors", json!([{"_type": "reference", "_ref": "person-jo"}])),
            ContentDocument::new("p4", "post").with_field("authors", Value::Null),
        ];
        let outcome = backfill(&docs, "authors", &people(), name_contains("studio"));

        let BackfillOutcome::Planned { default, patches } = &outcome else {
            panic!("expected a default candidate");
        };
        assert_eq!(default.id, "person-studio");
        let ids: Vec<&str> = patches.iter().map(|p| p.document_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p4"]);
        assert!(patches.iter().all(|p| p.reference.target == "person-studio"));
        assert_eq!(outcome.updated(), 3);
    }

    #[test]
    fn every_patch_gets_its_own_key() {
        let docs = vec![ContentDocument::new("a", "post"), ContentDocument::new("b", "post")];
        let outcome = backfill(&docs, "authors", &people(), name_contains("jo"));
        let keys: Vec<&str> = outcome
            .patches()
            .iter()
            .map(|p| p.reference.key.as_deref().unwrap())
            .collect();
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
    }

    #[test]
    fn no_matching_candidate_produces_no_patches() {
        let docs = vec![ContentDocument::new("a", "post")];
        let outcome = backfill(&docs, "authors", &people(), name_contains("nobody"));
        assert_eq!(outcome, BackfillOutcome::NoDefault { candidates: 2 });
        assert!(outcome.patches().is_empty());
        assert_eq!(outcome.updated(), 0);
    }

    #[test]
    fn first_matching_candidate_wins() {
        let docs = vec![ContentDocument::new("a", "post")];
        let outcome = backfill(&docs, "authors", &people(), |_: &Candidate| true);
        match outcome {
            BackfillOutcome::Planned { default, .. } => assert_eq!(default.id, "person-jo"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn draft_candidates_are_never_the_default() {
        let candidates = vec![
            Candidate::new("drafts.person-studio", "NextMedal Studio"),
            Candidate::new("person-studio", "NextMedal Studio"),
        ];
        let docs = vec![ContentDocument::new("p1", "post")];
        let outcome = backfill(&docs, "authors", &candidates, name_contains("nextmedal"));

        let BackfillOutcome::Planned { default, patches } = &outcome else {
            panic!("expected a default candidate");
        };
        assert_eq!(default.id, "person-studio");
        assert_eq!(patches[0].reference.target, "person-studio");
    }

    #[test]
    fn only_draft_matches_means_no_default() {
        let candidates = vec![Candidate::new("drafts.person-studio", "NextMedal Studio")];
        let docs = vec![ContentDocument::new("p1", "post")];
        let outcome = backfill(&docs, "authors", &candidates, name_contains("nextmedal"));
        assert_eq!(outcome, BackfillOutcome::NoDefault { candidates: 1 });
    }

    #[test]
    fn mutation_sets_a_reference_array() {
        let patch = ReferencePatch {
            document_id: "p1".to_string(),
            field: "authors".to_string(),
            reference: Reference::new("person-jo").with_key("k1"),
        };
        assert_eq!(
            serde_json::to_value(patch.to_mutation()).unwrap(),
            json!({"patch": {"id": "p1", "set": {"authors": [
                {"_type": "reference", "_ref": "person-jo", "_key": "k1"}
            ]}}})
        );
    }
}
