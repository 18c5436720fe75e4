// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use domainminer::config::settings::Settings;
use domainminer::domain::models::archive::ArchiveFormat;
use domainminer::domain::models::domain_entry::DomainEntry;
use domainminer::domain::models::keyword_set::KeywordSet;
use domainminer::domain::repositories::archive_store::ArchiveStore;
use domainminer::domain::services::extraction_service::{ExtractionOptions, ExtractionService};
use domainminer::infrastructure::athena::AthenaIndexBackend;
use domainminer::infrastructure::search::google::DorkSearcher;
use domainminer::infrastructure::storage::{HttpArchiveStore, S3ArchiveStore};
use domainminer::infrastructure::uploader::SupabaseUploader;
use domainminer::utils::telemetry;

/// 从公开爬取语料与搜索通道挖掘主题相关域名
#[derive(Parser)]
#[command(name = "domainminer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 从归档语料提取并评分相关域名
    Extract {
        /// 关键词JSON文件（数组或带all_keywords字段的对象）
        #[arg(long)]
        keywords: PathBuf,
        /// 输出JSON文件
        #[arg(long, default_value = "domains.json")]
        output: PathBuf,
        /// 归档格式: text-extract | metadata | url-index
        #[arg(long, default_value = "text-extract")]
        format: ArchiveFormat,
        /// 爬取标识，缺省用配置里的默认值
        #[arg(long)]
        crawl_id: Option<String>,
        /// 处理的归档文件数上限，缺省用配置里的安全上限
        #[arg(long)]
        file_limit: Option<usize>,
        /// 输出域名条数上限
        #[arg(long)]
        top: Option<usize>,
        /// 域名入选的最低分数
        #[arg(long)]
        min_score: Option<f64>,
        /// url-index格式下使用加速查询后端
        #[arg(long)]
        accelerated: bool,
        /// 整体缓冲模式（仅适合小文件调试；默认流式）
        #[arg(long)]
        buffered: bool,
    },
    /// 通过搜索引擎dork通道收集候选域名
    Search {
        /// 关键词JSON文件
        #[arg(long)]
        keywords: PathBuf,
        /// 输出JSON文件
        #[arg(long, default_value = "search_hits.json")]
        output: PathBuf,
    },
    /// 把提取结果上传到远程数据存储
    Upload {
        /// extract产出的域名JSON文件
        #[arg(long)]
        input: PathBuf,
    },
}

/// 主函数
///
/// 应用程序入口点，负责初始化组件并分发子命令
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    telemetry::init_telemetry();

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    match cli.command {
        Command::Extract {
            keywords,
            output,
            format,
            crawl_id,
            file_limit,
            top,
            min_score,
            accelerated,
            buffered,
        } => {
            run_extract(
                settings, keywords, output, format, crawl_id, file_limit, top, min_score,
                accelerated, buffered,
            )
            .await
        }
        Command::Search { keywords, output } => run_search(settings, keywords, output).await,
        Command::Upload { input } => run_upload(settings, input).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_extract(
    settings: Settings,
    keywords_path: PathBuf,
    output: PathBuf,
    format: ArchiveFormat,
    crawl_id: Option<String>,
    file_limit: Option<usize>,
    top: Option<usize>,
    min_score: Option<f64>,
    accelerated: bool,
    buffered: bool,
) -> anyhow::Result<()> {
    let keywords = load_keywords(&keywords_path)?;
    info!(keywords = keywords.len(), "Keyword set loaded");

    let store: Arc<dyn ArchiveStore> = match &settings.crawl.s3_bucket {
        Some(bucket) => Arc::new(
            S3ArchiveStore::new(
                bucket.clone(),
                settings.crawl.s3_region.clone(),
                settings.crawl.s3_endpoint.clone(),
            )
            .await,
        ),
        None => Arc::new(HttpArchiveStore::new(settings.crawl.data_url.clone())?),
    };

    let mut extraction = settings.extraction.clone();
    if let Some(min) = min_score {
        extraction.min_score = min;
    }
    let effective_min_score = extraction.min_score;
    let default_file_limit = extraction.max_files;

    let mut service = ExtractionService::new(store, keywords, extraction)?;

    if accelerated {
        anyhow::ensure!(
            format == ArchiveFormat::UrlIndex,
            "accelerated query is only available for the url-index format"
        );
        let (Some(database), Some(output_location)) = (
            settings.crawl.athena_database.clone(),
            settings.crawl.athena_output_location.clone(),
        ) else {
            anyhow::bail!(
                "accelerated query requires crawl.athena_database and crawl.athena_output_location"
            );
        };
        let backend = AthenaIndexBackend::new(
            database,
            output_location,
            settings.crawl.s3_region.clone(),
        )
        .await;
        service = service.with_query_backend(Arc::new(backend));
    }

    let options = ExtractionOptions {
        crawl_id: crawl_id.unwrap_or_else(|| settings.crawl.default_crawl_id.clone()),
        format,
        file_limit: file_limit.unwrap_or(default_file_limit),
        output_limit: top,
        min_score: effective_min_score,
        use_query_backend: accelerated,
        buffered,
    };

    // Ctrl-C 触发取消：停止文件进件，返回显式标记不完整的部分结果
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Cancellation requested");
            signal_token.cancel();
        }
    });

    let report = service.run(options, cancel).await?;
    write_json(&output, &report)?;
    info!(
        output = %output.display(),
        domains = report.domains.len(),
        failed_files = report.failed_files.len(),
        complete = report.complete,
        "Extraction artifact written"
    );
    Ok(())
}

async fn run_search(
    settings: Settings,
    keywords_path: PathBuf,
    output: PathBuf,
) -> anyhow::Result<()> {
    let keywords = load_keywords(&keywords_path)?;
    let searcher = DorkSearcher::new(settings.search.clone())?;
    let report = searcher.search(&keywords).await?;
    write_json(&output, &report)?;
    info!(
        output = %output.display(),
        hits = report.hits.len(),
        "Search artifact written"
    );
    Ok(())
}

async fn run_upload(settings: Settings, input: PathBuf) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    // 兼容完整报告和裸域名数组两种形状
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let payload = match value {
        serde_json::Value::Object(mut report) => match report.remove("domains") {
            Some(domains) => domains,
            None => serde_json::Value::Object(report),
        },
        other => other,
    };
    let entries: Vec<DomainEntry> = serde_json::from_value(payload)?;
    anyhow::ensure!(!entries.is_empty(), "{} contains no domains", input.display());

    let uploader = SupabaseUploader::from_settings(&settings.uploader)?;
    let stats = uploader.upload(&entries).await?;
    info!(
        uploaded = stats.uploaded,
        batches = stats.batches,
        "Upload finished"
    );
    Ok(())
}

fn load_keywords(path: &Path) -> anyhow::Result<KeywordSet> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read keywords file {}", path.display()))?;
    let set = KeywordSet::from_json_str(&raw)
        .with_context(|| format!("invalid keywords file {}", path.display()))?;
    anyhow::ensure!(
        !set.is_empty(),
        "keywords file {} contains no usable keywords",
        path.display()
    );
    Ok(set)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}
