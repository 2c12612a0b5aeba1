// ABOUTME: Shared plumbing for the migration binaries: logging setup, exit mapping, store and input loading.
// ABOUTME: Each binary stays a thin clap front end over one medal-migrate utility.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use medal_migrate::{decode_documents, ContentDocument, ContentStore, SanityClient, StoreConfig};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

/// Map a run result to the process exit code, printing setup errors.
pub fn finish(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

/// Build a store client from the environment.
///
/// With `apply` set the write token is checked up front, so a run never
/// fetches and plans only to fail at its first write.
pub fn connect(apply: bool) -> Result<SanityClient> {
    let config = StoreConfig::from_env()?;
    if apply {
        config.require_token()?;
    }
    info!(project = %config.project_id, dataset = %config.dataset, apply, "connecting");
    Ok(SanityClient::new(config)?)
}

/// Fetch and decode documents; quarantined ones are counted on stderr.
pub async fn fetch_documents<S: ContentStore>(
    store: &S,
    query: &str,
    params: &[(&str, Value)],
) -> Result<Vec<ContentDocument>> {
    let raw = store.fetch(query, params).await?;
    let decoded = decode_documents(raw);
    if !decoded.quarantined.is_empty() {
        warn!(count = decoded.quarantined.len(), "documents skipped");
        eprintln!(
            "skipped {} document(s) that could not be decoded",
            decoded.quarantined.len()
        );
    }
    Ok(decoded.documents)
}

/// Read HTML from a file path, `-` for stdin, or an http(s) URL.
pub async fn load_html(target: &str) -> Result<String> {
    if target == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        return Ok(buf);
    }

    if target.starts_with("http://") || target.starts_with("https://") {
        let resp = reqwest::get(target)
            .await
            .with_context(|| format!("fetching {}", target))?
            .error_for_status()?;
        return Ok(resp.text().await?);
    }

    let path = PathBuf::from(target);
    if !path.exists() {
        return Err(anyhow!("file not found: {}", target));
    }
    fs::read_to_string(&path).with_context(|| format!("reading {}", target))
}

/// Split a comma-separated flag value into trimmed, non-empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Prefix for plan lines: what would happen in a dry run, what happens with `--apply`.
pub fn verb(apply: bool, dry: &'static str, wet: &'static str) -> &'static str {
    if apply {
        wet
    } else {
        dry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(split_list(" h5, h6 ,,"), vec!["h5", "h6"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn finish_maps_errors_to_failure() {
        assert_eq!(finish(Ok(())), ExitCode::SUCCESS);
        assert_eq!(finish(Err(anyhow!("boom"))), ExitCode::from(1));
    }

    #[tokio::test]
    async fn load_html_reports_missing_files() {
        let err = load_html("/definitely/not/here.html").await.unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
