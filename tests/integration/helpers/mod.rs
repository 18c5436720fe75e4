// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::io::Write;
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use domainminer::config::settings::ExtractionSettings;
use domainminer::domain::models::keyword_set::KeywordSet;
use domainminer::domain::services::extraction_service::ExtractionService;
use domainminer::infrastructure::storage::HttpArchiveStore;

pub const TEST_CRAWL_ID: &str = "CC-TEST-2025-01";

pub fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// 拼一个text-extract格式条目
pub fn wet_entry(url: &str, body: &str) -> String {
    format!("WARC/1.0\r\nWARC-Target-URI: {}\r\n\r\n{}\r\n", url, body)
}

/// 拼一个metadata格式条目
pub fn wat_entry(url: &str, title: &str) -> String {
    format!(
        "WARC/1.0\r\nWARC-Target-URI: {url}\r\n\r\n{{\"Envelope\":{{\"Payload-Metadata\":{{\"HTTP-Response-Metadata\":{{\"HTML-Metadata\":{{\"Head\":{{\"Title\":\"{title}\"}}}}}}}}}}}}\r\n"
    )
}

/// 挂载一个gzip路径列表
pub async fn mount_listing(server: &MockServer, paths_file: &str, entries: &[&str]) {
    let listing: String = entries.iter().map(|p| format!("{}\n", p)).collect();
    Mock::given(method("GET"))
        .and(path(format!(
            "/crawl-data/{}/{}",
            TEST_CRAWL_ID, paths_file
        )))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(&listing)))
        .mount(server)
        .await;
}

/// 挂载一个gzip归档对象
pub async fn mount_archive(server: &MockServer, object_path: &str, content: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}", object_path)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(content)))
        .mount(server)
        .await;
}

pub fn test_settings() -> ExtractionSettings {
    ExtractionSettings {
        max_files: 10,
        concurrency: 2,
        max_retries: 0,
        min_score: 0.0,
        content_match_weight: 1.0,
        url_match_weight: 2.0,
        record_channel_capacity: 32,
    }
}

/// 指向mock网关的提取服务
pub fn service_against(
    server: &MockServer,
    keywords: &[&str],
    settings: ExtractionSettings,
) -> ExtractionService {
    let store = Arc::new(HttpArchiveStore::new(server.uri()).unwrap());
    let keywords = KeywordSet::new(keywords.iter().map(|s| s.to_string()));
    ExtractionService::new(store, keywords, settings).unwrap()
}
