// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use domainminer::config::settings::UploaderSettings;
use domainminer::domain::models::domain_entry::{DomainEntry, KeywordHits};
use domainminer::infrastructure::uploader::{SupabaseUploader, UploadError};

fn entry(domain: &str, score: f64, keyword: &str, content_hits: u64, url_hits: u64) -> DomainEntry {
    let mut entry = DomainEntry::new(domain);
    entry.score = score;
    entry.matches.insert(
        keyword.to_string(),
        KeywordHits {
            content_hits,
            url_hits,
        },
    );
    entry
}

fn settings(server: &MockServer, batch_size: usize) -> UploaderSettings {
    UploaderSettings {
        url: Some(server.uri()),
        api_key: Some("service-role-key".to_string()),
        table: "domains".to_string(),
        batch_size,
    }
}

#[tokio::test]
async fn test_upload_upserts_with_merge_semantics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/domains"))
        .and(header("apikey", "service-role-key"))
        .and(header("Prefer", "resolution=merge-duplicates"))
        .and(body_partial_json(serde_json::json!([
            {"domain": "relief.org", "score": 5.0, "matches": {"gaza": 3}}
        ])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let uploader = SupabaseUploader::from_settings(&settings(&server, 10)).unwrap();
    let stats = uploader
        .upload(&[entry("relief.org", 5.0, "gaza", 1, 2)])
        .await
        .unwrap();

    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.batches, 1);
}

#[tokio::test]
async fn test_upload_splits_into_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/domains"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;

    let uploader = SupabaseUploader::from_settings(&settings(&server, 2)).unwrap();
    let entries = vec![
        entry("a.org", 1.0, "gaza", 1, 0),
        entry("b.org", 2.0, "gaza", 2, 0),
        entry("c.org", 3.0, "gaza", 3, 0),
    ];
    let stats = uploader.upload(&entries).await.unwrap();

    assert_eq!(stats.uploaded, 3);
    assert_eq!(stats.batches, 2);
}

#[tokio::test]
async fn test_rejected_batch_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/domains"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad api key"))
        .mount(&server)
        .await;

    let uploader = SupabaseUploader::from_settings(&settings(&server, 10)).unwrap();
    let err = uploader
        .upload(&[entry("a.org", 1.0, "gaza", 1, 0)])
        .await
        .unwrap_err();

    match err {
        UploadError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad api key");
        }
        other => panic!("unexpected error: {other}"),
    }
}
