// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use domainminer::domain::models::archive::ArchiveFormat;
use domainminer::domain::services::extraction_service::ExtractionOptions;

use super::helpers::*;

fn options() -> ExtractionOptions {
    ExtractionOptions {
        crawl_id: TEST_CRAWL_ID.to_string(),
        format: ArchiveFormat::TextExtract,
        file_limit: 10,
        output_limit: None,
        min_score: 0.0,
        use_query_backend: false,
        buffered: false,
    }
}

#[tokio::test]
async fn test_pre_cancelled_run_returns_empty_incomplete_report() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "wet.paths.gz",
        &["crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz"],
    )
    .await;
    mount_archive(
        &server,
        "crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz",
        &wet_entry("https://ok.org/gaza", "relief"),
    )
    .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let service = service_against(&server, &["gaza"], test_settings());
    let report = service.run(options(), cancel).await.unwrap();

    assert!(!report.complete);
    assert_eq!(report.processed_files, 0);
    assert!(report.domains.is_empty());
    assert!(report.failed_files.is_empty());
}

#[tokio::test]
async fn test_mid_run_cancellation_keeps_completed_files_only() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "wet.paths.gz",
        &[
            "crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz",
            "crawl-data/CC-TEST-2025-01/wet/file-00001.warc.wet.gz",
        ],
    )
    .await;
    // 第一个文件立即可用
    mount_archive(
        &server,
        "crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz",
        &wet_entry("https://fast.org/gaza", "relief"),
    )
    .await;
    // 第二个文件响应极慢，运行中途会被取消
    Mock::given(method("GET"))
        .and(path(
            "/crawl-data/CC-TEST-2025-01/wet/file-00001.warc.wet.gz",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(30))
                .set_body_bytes(gzip(&wet_entry("https://slow.org/gaza", "relief"))),
        )
        .mount(&server)
        .await;

    let service = service_against(&server, &["gaza"], test_settings());
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        canceller.cancel();
    });

    let report = service.run(options(), cancel).await.unwrap();

    // 完整处理过的文件保留，在途文件整体丢弃
    assert!(!report.complete);
    assert_eq!(report.processed_files, 1);
    assert_eq!(report.domains.len(), 1);
    assert_eq!(report.domains[0].domain, "fast.org");
    assert!(report
        .domains
        .iter()
        .all(|d| d.domain != "slow.org"));
    // 取消不是失败
    assert!(report.failed_files.is_empty());
}
