// ABOUTME: CLI binary that rewrites unsupported heading levels in document bodies.
// ABOUTME: Prints an audit line per changed block; with --apply patches each changed body.

use std::collections::BTreeSet;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use medal_migrate::{apply_each, downgrade_headings, Mutation};
use medal_migrate_cli::{connect, fetch_documents, finish, init_tracing, split_list, verb};
use serde_json::{json, Map};

const QUERY: &str =
    "*[_type == $type && defined(body)]{_id, _type, _updatedAt, title, language, body}";

#[derive(Parser, Debug)]
#[command(name = "downgrade-headings")]
#[command(about = "Replace disallowed heading styles in document bodies")]
struct Args {
    /// Document type to process
    #[arg(long = "type", default_value = "post")]
    doc_type: String,

    /// Comma-separated styles to replace
    #[arg(long = "disallow", default_value = "h5,h6")]
    disallow: String,

    /// Style written in place of a disallowed one
    #[arg(long = "replacement", default_value = "h4")]
    replacement: String,

    /// Patch the documents instead of only listing the changes
    #[arg(long = "apply")]
    apply: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    finish(run(Args::parse()).await)
}

async fn run(args: Args) -> Result<()> {
    let disallowed: BTreeSet<String> = split_list(&args.disallow).into_iter().collect();
    if disallowed.is_empty() {
        bail!("--disallow needs at least one style");
    }

    let store = connect(args.apply)?;
    let documents = fetch_documents(&store, QUERY, &[("type", json!(args.doc_type))]).await?;

    let mut mutations = Vec::new();
    let mut changed_blocks = 0;
    for doc in &documents {
        let result = downgrade_headings(doc.blocks(), &disallowed, &args.replacement);
        if result.is_unchanged() {
            continue;
        }
        for change in &result.changes {
            println!("{}: {}", doc.label(), change);
        }
        changed_blocks += result.count();

        let mut set = Map::new();
        set.insert("body".to_string(), serde_json::to_value(&result.blocks)?);
        mutations.push(Mutation::patch(doc.id.clone(), set));
    }

    println!(
        "{} block(s) in {} document(s) {}",
        changed_blocks,
        mutations.len(),
        verb(args.apply, "would change", "to change")
    );

    if !args.apply || mutations.is_empty() {
        return Ok(());
    }

    let report = apply_each(&store, &mutations).await;
    for (id, err) in &report.failed {
        eprintln!("failed to patch {}: {}", id, err);
    }
    println!("patched: {}", report);
    Ok(())
}
