// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use domainminer::domain::models::archive::ArchiveFormat;
use domainminer::domain::services::extraction_service::ExtractionOptions;
use domainminer::utils::errors::ExtractError;

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
async fn test_unknown_crawl_id_fails_fast_with_not_found() {
    let server = MockServer::start().await;
    // 没有挂载任何路径列表，网关对一切返回404
    let service = service_against(&server, &["gaza"], test_settings());

    let err = service
        .run(options(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::NotFound(_)));
}

#[tokio::test]
async fn test_failed_file_reported_once_with_zero_contribution() {
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
    mount_archive(
        &server,
        "crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz",
        &wet_entry("https://ok.org/gaza", "relief work"),
    )
    .await;
    // file-00001 持续500，重试预算耗尽后进失败列表
    Mock::given(method("GET"))
        .and(path(
            "/crawl-data/CC-TEST-2025-01/wet/file-00001.warc.wet.gz",
        ))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut settings = test_settings();
    settings.max_retries = 1;
    let service = service_against(&server, &["gaza"], settings);

    let report = service
        .run(options(), CancellationToken::new())
        .await
        .unwrap();

    assert!(report.complete);
    assert_eq!(report.processed_files, 1);
    assert_eq!(report.failed_files.len(), 1);
    assert_eq!(report.failed_files[0].kind, "fetch");
    assert!(report.failed_files[0].path.contains("file-00001"));
    // 失败文件零贡献
    assert_eq!(report.domains.len(), 1);
    assert_eq!(report.domains[0].domain, "ok.org");
}

#[tokio::test]
async fn test_transient_failure_recovers_on_retry() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "wet.paths.gz",
        &["crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz"],
    )
    .await;
    // 第一次503，之后200
    Mock::given(method("GET"))
        .and(path(
            "/crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz",
        ))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(
            "/crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(gzip(&wet_entry("https://ok.org/gaza", "relief"))),
        )
        .mount(&server)
        .await;

    let mut settings = test_settings();
    settings.max_retries = 2;
    let service = service_against(&server, &["gaza"], settings);

    let report = service
        .run(options(), CancellationToken::new())
        .await
        .unwrap();
    assert!(report.complete);
    assert_eq!(report.processed_files, 1);
    assert!(report.failed_files.is_empty());
    assert_eq!(report.domains[0].domain, "ok.org");
}

#[tokio::test]
async fn test_all_files_failed_aborts_run() {
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
    // 两个归档对象都不存在

    let service = service_against(&server, &["gaza"], test_settings());
    let err = service
        .run(options(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::AllFilesFailed));
}

#[tokio::test]
async fn test_corrupt_archive_counts_as_file_failure() {
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
    mount_archive(
        &server,
        "crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz",
        &wet_entry("https://ok.org/gaza", "relief"),
    )
    .await;
    // 不是合法gzip的响应体
    Mock::given(method("GET"))
        .and(path(
            "/crawl-data/CC-TEST-2025-01/wet/file-00001.warc.wet.gz",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"definitely not gzip".to_vec()))
        .mount(&server)
        .await;

    let service = service_against(&server, &["gaza"], test_settings());
    let report = service
        .run(options(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed_files, 1);
    assert_eq!(report.failed_files.len(), 1);
    assert_eq!(report.failed_files[0].kind, "io");
    assert_eq!(report.domains.len(), 1);
}
