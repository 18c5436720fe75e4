// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

use domainminer::domain::models::archive::ArchiveFormat;
use domainminer::domain::services::extraction_service::ExtractionOptions;

use super::helpers::*;

fn options(format: ArchiveFormat) -> ExtractionOptions {
    ExtractionOptions {
        crawl_id: TEST_CRAWL_ID.to_string(),
        format,
        file_limit: 10,
        output_limit: None,
        min_score: 0.0,
        use_query_backend: false,
        buffered: false,
    }
}

#[tokio::test]
async fn test_text_extract_end_to_end() {
    let server = MockServer::start().await;
    let file_a = format!(
        "{}{}",
        wet_entry("https://www.relief.org/gaza-aid", "the war displaced thousands"),
        wet_entry("https://news.example.com/world", "war war war")
    );
    let file_b = wet_entry("https://relief.org/stories", "gaza aid gaza aid");

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
        &file_a,
    )
    .await;
    mount_archive(
        &server,
        "crawl-data/CC-TEST-2025-01/wet/file-00001.warc.wet.gz",
        &file_b,
    )
    .await;

    let service = service_against(&server, &["gaza", "war"], test_settings());
    let report = service
        .run(options(ArchiveFormat::TextExtract), CancellationToken::new())
        .await
        .unwrap();

    assert!(report.complete);
    assert_eq!(report.processed_files, 2);
    assert_eq!(report.records_seen, 3);
    assert!(report.failed_files.is_empty());

    // relief.org跨两个文件累计：URL里1次gaza(2.0) + 正文1次war(1.0)
    // + 第二个文件正文2次gaza(2.0)，两条记录URL各无war
    let relief = report
        .domains
        .iter()
        .find(|d| d.domain == "relief.org")
        .unwrap();
    assert_eq!(relief.score, 5.0);
    let gaza_hits = relief.matches.get("gaza").unwrap();
    assert_eq!(gaza_hits.url_hits, 1);
    assert_eq!(gaza_hits.content_hits, 2);

    // 排序：relief.org(5.0) 在 news.example.com(3.0) 之前
    assert_eq!(report.domains[0].domain, "relief.org");
    assert_eq!(report.domains[1].domain, "news.example.com");
}

#[tokio::test]
async fn test_metadata_format_matches_title_signal() {
    let server = MockServer::start().await;
    let file = wat_entry("https://www.crisiswatch.org/reports", "Gaza Crisis Tracker");

    mount_listing(
        &server,
        "wat.paths.gz",
        &["crawl-data/CC-TEST-2025-01/wat/file-00000.warc.wat.gz"],
    )
    .await;
    mount_archive(
        &server,
        "crawl-data/CC-TEST-2025-01/wat/file-00000.warc.wat.gz",
        &file,
    )
    .await;

    let service = service_against(&server, &["gaza"], test_settings());
    let report = service
        .run(options(ArchiveFormat::Metadata), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.domains.len(), 1);
    let entry = &report.domains[0];
    assert_eq!(entry.domain, "crisiswatch.org");
    // 标题里的命中算正文命中
    assert_eq!(entry.matches.get("gaza").unwrap().content_hits, 1);
}

#[tokio::test]
async fn test_url_index_format_never_matches_body_text() {
    let server = MockServer::start().await;
    // 同一页面：关键词只在正文出现，不在URL里
    let cdx_file = "com,example)/page 20250101000000 {\"url\": \"https://example.com/page\", \"status\": \"200\"}\n\
org,gazarelief)/donate 20250101000000 {\"url\": \"https://gazarelief.org/donate\", \"status\": \"200\"}\n";

    mount_listing(
        &server,
        "cc-index.paths.gz",
        &["cc-index/collections/CC-TEST-2025-01/indexes/cdx-00000.gz"],
    )
    .await;
    mount_archive(
        &server,
        "cc-index/collections/CC-TEST-2025-01/indexes/cdx-00000.gz",
        cdx_file,
    )
    .await;

    let service = service_against(&server, &["gaza"], test_settings());
    let report = service
        .run(options(ArchiveFormat::UrlIndex), CancellationToken::new())
        .await
        .unwrap();

    // example.com正文里可能有gaza，但url-index不携带正文，零命中
    assert_eq!(report.domains.len(), 1);
    let entry = &report.domains[0];
    assert_eq!(entry.domain, "gazarelief.org");
    let hits = entry.matches.get("gaza").unwrap();
    assert_eq!(hits.content_hits, 0);
    assert_eq!(hits.url_hits, 1);
}

#[tokio::test]
async fn test_output_limit_and_min_score() {
    let server = MockServer::start().await;
    let file = format!(
        "{}{}{}",
        wet_entry("https://strong.org/", "gaza gaza gaza gaza"),
        wet_entry("https://middle.org/", "gaza gaza"),
        wet_entry("https://weak.org/", "gaza")
    );
    mount_listing(
        &server,
        "wet.paths.gz",
        &["crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz"],
    )
    .await;
    mount_archive(
        &server,
        "crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz",
        &file,
    )
    .await;

    let service = service_against(&server, &["gaza"], test_settings());
    let mut opts = options(ArchiveFormat::TextExtract);
    opts.min_score = 2.0;
    opts.output_limit = Some(1);

    let report = service.run(opts, CancellationToken::new()).await.unwrap();
    // weak.org(1.0)被分数下限过滤，limit截断到最强的一条
    assert_eq!(report.domains.len(), 1);
    assert_eq!(report.domains[0].domain, "strong.org");
}

#[tokio::test]
async fn test_buffered_mode_matches_streaming_result() {
    let server = MockServer::start().await;
    let file = wet_entry("https://relief.org/gaza", "war war");
    mount_listing(
        &server,
        "wet.paths.gz",
        &["crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz"],
    )
    .await;
    mount_archive(
        &server,
        "crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz",
        &file,
    )
    .await;

    let service = service_against(&server, &["gaza", "war"], test_settings());

    let streaming = service
        .run(options(ArchiveFormat::TextExtract), CancellationToken::new())
        .await
        .unwrap();
    let mut opts = options(ArchiveFormat::TextExtract);
    opts.buffered = true;
    let buffered = service.run(opts, CancellationToken::new()).await.unwrap();

    assert_eq!(streaming.domains.len(), buffered.domains.len());
    assert_eq!(streaming.domains[0].domain, buffered.domains[0].domain);
    assert_eq!(streaming.domains[0].score, buffered.domains[0].score);
}

#[tokio::test]
async fn test_file_limit_truncates_listing() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "wet.paths.gz",
        &[
            "crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz",
            "crawl-data/CC-TEST-2025-01/wet/file-00001.warc.wet.gz",
            "crawl-data/CC-TEST-2025-01/wet/file-00002.warc.wet.gz",
        ],
    )
    .await;
    mount_archive(
        &server,
        "crawl-data/CC-TEST-2025-01/wet/file-00000.warc.wet.gz",
        &wet_entry("https://a.org/gaza", "x"),
    )
    .await;

    let service = service_against(&server, &["gaza"], test_settings());
    let mut opts = options(ArchiveFormat::TextExtract);
    opts.file_limit = 1;

    let report = service.run(opts, CancellationToken::new()).await.unwrap();
    // 只取列表前1个文件，其余两个从未被请求
    assert!(report.complete);
    assert_eq!(report.processed_files, 1);
    assert!(report.failed_files.is_empty());
}
