// ABOUTME: CLI binary that finds drafts made redundant by a published version.
// ABOUTME: Lists duplicates and orphans; with --apply deletes duplicates one document at a time.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use medal_migrate::{apply_each, reconcile, Mutation};
use medal_migrate_cli::{connect, fetch_documents, finish, init_tracing, verb};
use serde_json::json;

const QUERY: &str = "*[_type == $type]{_id, _type, _updatedAt, title}";

#[derive(Parser, Debug)]
#[command(name = "reconcile-drafts")]
#[command(about = "Report duplicate and orphan drafts, optionally deleting the duplicates")]
struct Args {
    /// Document type to reconcile
    #[arg(long = "type", default_value = "post")]
    doc_type: String,

    /// Delete duplicate drafts instead of only listing them
    #[arg(long = "apply")]
    apply: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    finish(run(Args::parse()).await)
}

async fn run(args: Args) -> Result<()> {
    let store = connect(args.apply)?;
    let documents = fetch_documents(&store, QUERY, &[("type", json!(args.doc_type))]).await?;
    let result = reconcile(&documents);

    for draft in &result.duplicates {
        println!("{} {}", verb(args.apply, "would delete", "deleting"), draft.label());
    }
    for draft in &result.orphans {
        println!("orphan (kept) {}", draft.label());
    }

    println!(
        "{} duplicate(s), {} orphan(s), {} published without draft",
        result.duplicates.len(),
        result.orphans.len(),
        result.published_only
    );

    if !args.apply || result.duplicates.is_empty() {
        return Ok(());
    }

    let mutations: Vec<Mutation> = result
        .duplicates
        .iter()
        .map(|d| Mutation::delete(d.id.clone()))
        .collect();
    let report = apply_each(&store, &mutations).await;
    for (id, err) in &report.failed {
        eprintln!("failed to delete {}: {}", id, err);
    }
    println!("deleted: {}", report);
    Ok(())
}
