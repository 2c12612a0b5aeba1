// ABOUTME: CLI binary that hoists images out of inline wrappers in migrated article HTML.
// ABOUTME: Prints normalized HTML or Portable Text blocks, and can patch a document body with --apply.

use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use medal_migrate::{
    html_to_blocks, normalize_with, parse_container, ContentStore, NormalizeOptions,
};
use medal_migrate_cli::{connect, finish, init_tracing, load_html, split_list};
use serde_json::Map;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Html,
    Blocks,
}

#[derive(Parser, Debug)]
#[command(name = "normalize-html")]
#[command(about = "Hoist images out of paragraph and inline wrappers in article HTML")]
struct Args {
    /// HTML file path, http(s) URL, or "-" for stdin
    input: String,

    /// CSS selector of the content container
    #[arg(long = "container", default_value = "body")]
    container: String,

    /// Comma-separated tags that may be split around an image
    #[arg(long = "wrapper-tags")]
    wrapper_tags: Option<String>,

    /// Maximum number of ancestors between an image and the container
    #[arg(long = "max-depth", default_value_t = medal_migrate::dom::normalize::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "html")]
    format: Format,

    /// Document whose body receives the converted blocks
    #[arg(long = "document")]
    document: Option<String>,

    /// Write the converted blocks to --document instead of only printing them
    #[arg(long = "apply")]
    apply: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    finish(run(Args::parse()).await)
}

async fn run(args: Args) -> Result<()> {
    if args.apply && args.document.is_none() {
        bail!("--apply requires --document <id>");
    }
    // Checked before reading input so a missing token fails fast.
    let store = match &args.document {
        Some(_) if args.apply => Some(connect(true)?),
        _ => None,
    };

    let mut opts = NormalizeOptions::default().max_depth(args.max_depth);
    if let Some(raw) = &args.wrapper_tags {
        opts = opts.wrapper_tags(split_list(raw));
    }

    let html = load_html(&args.input).await?;
    let container = parse_container(&html, &args.container)?;
    let (normalized, report) = normalize_with(container, &opts);
    info!(?report, "normalized");

    let blocks = html_to_blocks(&normalized);
    match args.format {
        Format::Html => println!("{}", normalized.inner_html()),
        Format::Blocks => println!("{}", serde_json::to_string_pretty(&blocks)?),
    }

    eprintln!(
        "{} image(s): {} hoisted with {} split(s), {} left in place (too deep)",
        report.images, report.hoisted, report.splits, report.too_deep
    );

    if let Some(id) = &args.document {
        let Some(store) = store else {
            println!("would patch {} body with {} block(s)", id, blocks.len());
            return Ok(());
        };
        let mut set = Map::new();
        set.insert("body".to_string(), serde_json::to_value(&blocks)?);
        store.patch(id, set).await?;
        println!("patched {} body with {} block(s)", id, blocks.len());
    }

    Ok(())
}
