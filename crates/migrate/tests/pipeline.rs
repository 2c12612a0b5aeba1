// ABOUTME: Integration tests running the library utilities end to end.
// ABOUTME: Covers HTML normalization into blocks and store-backed reconcile/downgrade flows via httpmock.

use std::collections::BTreeSet;

use httpmock::prelude::*;
use medal_migrate::{
    apply_each, decode_documents, downgrade_headings, html_to_blocks, normalize, parse_container,
    reconcile, Block, ContentStore, Mutation, SanityClient, StoreConfig,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const ARTICLE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Studio notes</title></head>
<body>
<header><nav><a href="/">Home</a></nav></header>
<div class="post-content">
  <h2>Our new space</h2>
  <p>We moved <span>into <a href="/studio"><img src="/img/studio.jpg" alt="Studio"></a> the</span> old mill.</p>
  <figure><img src="/img/desk.jpg"><figcaption>The desk</figcaption></figure>
  <p>© 2019 NextMedal. All rights reserved.</p>
</div>
</body>
</html>"#;

fn client(server: &MockServer) -> SanityClient {
    SanityClient::new(
        StoreConfig::new("proj")
            .api_host(server.base_url())
            .token("secret"),
    )
    .unwrap()
}

#[test]
fn migrated_article_becomes_flat_blocks() {
    let container = parse_container(ARTICLE, ".post-content").unwrap();
    let images_before = container.count_descendants("img");
    let normalized = normalize(container);
    assert_eq!(normalized.count_descendants("img"), images_before);

    let blocks = html_to_blocks(&normalized);
    let kinds: Vec<&str> = blocks.iter().map(Block::kind).collect();
    assert_eq!(
        kinds,
        vec!["block", "block", "image", "block", "image", "block", "block"]
    );

    let texts: Vec<String> = blocks
        .iter()
        .filter_map(Block::as_text)
        .map(|t| t.plain_text())
        .collect();
    assert_eq!(
        texts,
        vec![
            "Our new space",
            "We moved into",
            "the old mill.",
            "The desk",
            "© 2019 NextMedal. All rights reserved.",
        ]
    );

    let found = medal_migrate::scan(&blocks, &Default::default());
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|m| m.block_index == 6));
}

#[tokio::test]
async fn reconcile_and_delete_duplicates_against_store() {
    let server = MockServer::start();
    let fetch = server.mock(|when, then| {
        when.method(GET).path("/v2024-10-01/data/query/production");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"result": [
                {"_id": "a", "_type": "post"},
                {"_id": "drafts.a", "_type": "post"},
                {"_id": "drafts.b", "_type": "post"}
            ]}));
    });
    let delete = server.mock(|when, then| {
        when.method(POST)
            .path("/v2024-10-01/data/mutate/production")
            .json_body(json!({"mutations": [{"delete": {"id": "drafts.a"}}]}));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"transactionId": "t", "results": [{"id": "drafts.a", "operation": "delete"}]}));
    });

    let store = client(&server);
    let raw = store
        .fetch("*[_type == $type]{_id, _type}", &[("type", json!("post"))])
        .await
        .unwrap();
    let result = reconcile(&decode_documents(raw).documents);
    assert_eq!(result.orphans.len(), 1);
    assert_eq!(result.orphans[0].id, "drafts.b");

    let mutations: Vec<Mutation> = result
        .duplicates
        .iter()
        .map(|d| Mutation::delete(d.id.clone()))
        .collect();
    let report = apply_each(&store, &mutations).await;

    fetch.assert();
    delete.assert();
    assert_eq!(report.succeeded, vec!["drafts.a"]);
    assert!(report.is_clean());
}

#[tokio::test]
async fn downgrade_patches_only_changed_documents() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v2024-10-01/data/query/production");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"result": [
                {"_id": "p1", "_type": "post", "body": [
                    {"_type": "block", "_key": "k1", "style": "h5", "children": [{"_type": "span", "text": "Small"}]}
                ]},
                {"_id": "p2", "_type": "post", "body": [
                    {"_type": "block", "_key": "k2", "style": "normal", "children": [{"_type": "span", "text": "Fine"}]}
                ]}
            ]}));
    });
    let patch = server.mock(|when, then| {
        when.method(POST)
            .path("/v2024-10-01/data/mutate/production")
            .body_includes("\"p1\"")
            .body_includes("\"h4\"");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"transactionId": "t", "results": [{"id": "p1", "operation": "update"}]}));
    });

    let store = client(&server);
    let docs = decode_documents(store.fetch("*[_type == \"post\"]", &[]).await.unwrap()).documents;
    let disallowed: BTreeSet<String> = ["h5", "h6"].iter().map(|s| s.to_string()).collect();

    let mut mutations = Vec::new();
    for doc in &docs {
        let result = downgrade_headings(doc.blocks(), &disallowed, "h4");
        if result.is_unchanged() {
            continue;
        }
        let mut set = serde_json::Map::new();
        set.insert("body".to_string(), serde_json::to_value(&result.blocks).unwrap());
        mutations.push(Mutation::patch(doc.id.clone(), set));
    }
    assert_eq!(mutations.len(), 1);

    let report = apply_each(&store, &mutations).await;
    patch.assert_hits(1);
    assert_eq!(report.succeeded, vec!["p1"]);
}
