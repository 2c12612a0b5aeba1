// ABOUTME: CLI binary that attaches a default author to documents with no author reference.
// ABOUTME: The default is the first candidate whose name contains --match; no match means no writes.

use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use medal_migrate::{
    apply_each, backfill, name_contains, BackfillOutcome, Candidate, ContentStore, MigrateError,
    Mutation,
};
use medal_migrate_cli::{connect, fetch_documents, finish, init_tracing, verb};
use serde_json::{json, Value};
use tracing::warn;

// Drafts cannot be referenced, so only published candidates are fetched.
const CANDIDATE_QUERY: &str = "*[_type == $type && !(_id in path(\"drafts.**\"))]{_id, name}";

/// Projection of the fields backfill reads; the body is left out so a bad
/// block never keeps a document from getting its author.
fn document_query(field: &str) -> String {
    format!("*[_type == $type]{{_id, _type, title, {}}}", field)
}

fn is_field_name(field: &str) -> bool {
    let mut chars = field.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Parser, Debug)]
#[command(name = "backfill-authors")]
#[command(about = "Attach a default author reference to documents missing one")]
struct Args {
    /// Document type to backfill
    #[arg(long = "type", default_value = "post")]
    doc_type: String,

    /// Reference array field to fill
    #[arg(long = "field", default_value = "authors")]
    field: String,

    /// Document type of the candidate authors
    #[arg(long = "candidate-type", default_value = "person")]
    candidate_type: String,

    /// Case-insensitive name fragment selecting the default author
    #[arg(long = "match", default_value = "nextmedal")]
    matcher: String,

    /// Patch the documents instead of only listing them
    #[arg(long = "apply")]
    apply: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    finish(run(Args::parse()).await)
}

async fn run(args: Args) -> Result<()> {
    if !is_field_name(&args.field) {
        bail!("--field must be a plain field name, got {:?}", args.field);
    }
    let store = connect(args.apply)?;

    let raw_candidates = store
        .fetch(CANDIDATE_QUERY, &[("type", json!(args.candidate_type))])
        .await?;
    let candidates: Vec<Candidate> = raw_candidates
        .into_iter()
        .filter_map(|value: Value| match serde_json::from_value(value) {
            Ok(candidate) => Some(candidate),
            Err(err) => {
                warn!(error = %err, "skipping malformed candidate");
                None
            }
        })
        .collect();

    let documents = fetch_documents(
        &store,
        &document_query(&args.field),
        &[("type", json!(args.doc_type))],
    )
    .await?;
    let outcome = backfill(
        &documents,
        &args.field,
        &candidates,
        name_contains(&args.matcher),
    );

    let patches = match &outcome {
        BackfillOutcome::NoDefault { candidates } => {
            let err = MigrateError::lookup(
                &args.matcher,
                "FindDefaultAuthor",
                Some(anyhow::anyhow!(
                    "no {} among {} candidate(s) matches",
                    args.candidate_type,
                    candidates
                )),
            );
            eprintln!("{}", err);
            println!("0 document(s) updated");
            return Ok(());
        }
        BackfillOutcome::Planned { default, patches } => {
            println!(
                "default author: {} ({})",
                default.name.as_deref().unwrap_or("-"),
                default.id
            );
            patches
        }
    };

    for patch in patches {
        println!(
            "{} {} -> {}",
            verb(args.apply, "would set", "setting"),
            patch.document_id,
            patch.field
        );
    }
    println!(
        "{} document(s) {}",
        outcome.updated(),
        verb(args.apply, "would be updated", "to update")
    );

    if !args.apply || patches.is_empty() {
        return Ok(());
    }

    let mutations: Vec<Mutation> = patches.iter().map(|p| p.to_mutation()).collect();
    let report = apply_each(&store, &mutations).await;
    for (id, err) in &report.failed {
        eprintln!("failed to patch {}: {}", id, err);
    }
    println!("updated: {}", report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_query_projects_only_the_field() {
        assert_eq!(
            document_query("authors"),
            "*[_type == $type]{_id, _type, title, authors}"
        );
    }

    #[test]
    fn field_names_are_plain_identifiers() {
        assert!(is_field_name("authors"));
        assert!(is_field_name("_legacyAuthors2"));
        assert!(!is_field_name(""));
        assert!(!is_field_name("2authors"));
        assert!(!is_field_name("authors}, body"));
    }
}
