// ABOUTME: Main library entry point for the NextMedal content-migration toolkit.
// ABOUTME: Re-exports the block model, DOM normalizer, scanners, reconcilers and the content store client.

//! medal-migrate - utilities for moving legacy article content into the CMS.
//!
//! Each utility is a small, pure core over data fetched from the content store:
//!
//! - [`dom::normalize`] hoists images out of inline wrappers in migrated HTML,
//!   and [`dom::convert`] turns the result into Portable Text blocks.
//! - [`boilerplate::scan`] reports leftover platform boilerplate.
//! - [`reconcile::reconcile`] sorts drafts into duplicates and orphans.
//! - [`styles::downgrade_headings`] rewrites unsupported heading levels.
//! - [`backfill::backfill`] attaches a default author reference.
//!
//! # Example
//!
//! ```no_run
//! use medal_migrate::{ContentStore, SanityClient, StoreConfig, decode_documents, reconcile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), medal_migrate::MigrateError> {
//!     let store = SanityClient::new(StoreConfig::from_env()?)?;
//!     let raw = store.fetch("*[_type == $type]{_id, _type}", &[("type", "post".into())]).await?;
//!     let result = reconcile(&decode_documents(raw).documents);
//!     println!("{} duplicates, {} orphans", result.duplicates.len(), result.orphans.len());
//!     Ok(())
//! }
//! ```

pub mod backfill;
pub mod blocks;
pub mod boilerplate;
pub mod config;
pub mod document;
pub mod dom;
pub mod error;
pub mod keys;
pub mod reconcile;
pub mod store;
pub mod styles;

pub use crate::backfill::{backfill, name_contains, BackfillOutcome, Candidate, ReferencePatch};
pub use crate::blocks::{Block, CodeBlock, ImageBlock, Reference, Span, TextBlock, VideoBlock};
pub use crate::boilerplate::{scan, Match, Pattern, PatternSet};
pub use crate::config::StoreConfig;
pub use crate::document::{decode_documents, ContentDocument, Decoded, DRAFT_PREFIX};
pub use crate::dom::convert::html_to_blocks;
pub use crate::dom::normalize::{normalize, normalize_with, NormalizeOptions, NormalizeReport};
pub use crate::dom::{parse_container, parse_fragment, replace_child, DomNode, Element};
pub use crate::error::{ErrorCode, MigrateError};
pub use crate::reconcile::{reconcile, Reconciliation};
pub use crate::store::{
    apply_each, BatchReport, ContentStore, DeleteOutcome, Mutation, MutationOutcome, SanityClient,
};
pub use crate::styles::{downgrade_headings, HeadingDowngrade, StyleChange};
