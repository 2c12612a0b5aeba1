// ABOUTME: CLI binary that reports leftover platform boilerplate in document bodies.
// ABOUTME: Report-only; prints one line per matched block and a per-run summary.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use medal_migrate::{scan, PatternSet};
use medal_migrate_cli::{connect, fetch_documents, finish, init_tracing};
use serde_json::json;

const QUERY: &str =
    "*[_type == $type && defined(body)]{_id, _type, _updatedAt, title, language, body}";

#[derive(Parser, Debug)]
#[command(name = "scan-boilerplate")]
#[command(about = "Find boilerplate blocks left over from the previous platform")]
struct Args {
    /// Document type to scan
    #[arg(long = "type", default_value = "post")]
    doc_type: String,

    /// JSON pattern file replacing the built-in patterns
    #[arg(long = "patterns")]
    patterns: Option<PathBuf>,

    /// Print matches as JSON lines
    #[arg(long = "json")]
    json_output: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    finish(run(Args::parse()).await)
}

async fn run(args: Args) -> Result<()> {
    let patterns = match &args.patterns {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            PatternSet::from_json(&raw)?
        }
        None => PatternSet::default(),
    };

    let store = connect(false)?;
    let documents = fetch_documents(&store, QUERY, &[("type", json!(args.doc_type))]).await?;

    let mut total = 0;
    let mut affected = 0;
    for doc in &documents {
        let found = scan(doc.blocks(), &patterns);
        if found.is_empty() {
            continue;
        }
        affected += 1;
        total += found.len();
        for m in &found {
            if args.json_output {
                println!(
                    "{}",
                    json!({
                        "document": doc.id,
                        "block": m.block_index,
                        "text": m.matched_text,
                        "pattern": m.pattern.to_string(),
                    })
                );
            } else {
                println!("{}: {}", doc.label(), m);
            }
        }
    }

    println!(
        "{} match(es) in {} of {} document(s)",
        total,
        affected,
        documents.len()
    );
    Ok(())
}
