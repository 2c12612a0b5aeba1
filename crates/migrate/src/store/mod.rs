// ABOUTME: Content store seam: fetch-by-query and mutation primitives plus per-document batch writes.
// ABOUTME: Any store offering fetch/patch/delete can implement ContentStore; SanityClient is the bundled one.

//! Content store access.
//!
//! [`ContentStore`] is the only way utilities touch the external store. Calls
//! are awaited one at a time; [`apply_each`] isolates per-document failures
//! and returns a tally instead of aborting the batch.

pub mod sanity;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::MigrateError;

pub use sanity::SanityClient;

/// One write, serialized in the store's mutation format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutation {
    Patch { id: String, set: Map<String, Value> },
    Delete { id: String },
}

impl Mutation {
    pub fn patch(id: impl Into<String>, set: Map<String, Value>) -> Self {
        Mutation::Patch { id: id.into(), set }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Mutation::Delete { id: id.into() }
    }

    pub fn id(&self) -> &str {
        match self {
            Mutation::Patch { id, .. } | Mutation::Delete { id } => id,
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Patch { id, set } => {
                let fields: Vec<&str> = set.keys().map(String::as_str).collect();
                write!(f, "patch {} set [{}]", id, fields.join(", "))
            }
            Mutation::Delete { id } => write!(f, "delete {}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MutationResult {
    pub id: String,
    #[serde(default)]
    pub operation: Option<String>,
}

/// Store response to one mutation request (one transaction).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MutationOutcome {
    #[serde(rename = "transactionId", default)]
    pub transaction_id: String,
    #[serde(default)]
    pub results: Vec<MutationResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing had that id; deleting is idempotent so this is not a failure.
    AlreadyGone,
}

/// Fetch and mutate primitives of an external content store.
#[allow(async_fn_in_trait)]
pub trait ContentStore {
    /// Run a query with `$name` parameters; returns the result documents.
    async fn fetch(&self, query: &str, params: &[(&str, Value)]) -> Result<Vec<Value>, MigrateError>;

    /// Apply `mutations` as one transaction.
    async fn mutate(&self, mutations: &[Mutation]) -> Result<MutationOutcome, MigrateError>;

    async fn patch(&self, id: &str, set: Map<String, Value>) -> Result<MutationOutcome, MigrateError> {
        self.mutate(&[Mutation::patch(id, set)]).await
    }

    async fn delete(&self, id: &str) -> Result<DeleteOutcome, MigrateError> {
        let outcome = self.mutate(&[Mutation::delete(id)]).await?;
        if outcome.results.iter().any(|r| r.id == id) {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyGone)
        }
    }

    async fn transaction(&self, mutations: &[Mutation]) -> Result<MutationOutcome, MigrateError> {
        self.mutate(mutations).await
    }
}

/// Tally of a per-document write batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, MigrateError)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }
}

/// Apply each mutation on its own, continuing past failures.
pub async fn apply_each<S: ContentStore>(store: &S, mutations: &[Mutation]) -> BatchReport {
    let mut report = BatchReport::default();
    for mutation in mutations {
        let id = mutation.id().to_string();
        let result = match mutation {
            Mutation::Delete { id } => store.delete(id).await.map(|outcome| {
                if outcome == DeleteOutcome::AlreadyGone {
                    info!(id = %id, "already deleted");
                }
            }),
            other => store.mutate(std::slice::from_ref(other)).await.map(|_| ()),
        };
        match result {
            Ok(()) => {
                info!(id = %id, "applied {}", mutation);
                report.succeeded.push(id);
            }
            Err(err) => {
                warn!(id = %id, error = %err, "write failed");
                report.failed.push((id, err));
            }
        }
    }
    report
}
