// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::settings::ExtractionSettings;
use crate::domain::models::archive::{ArchiveFileRef, ArchiveFormat};
use crate::domain::models::domain_entry::DomainEntry;
use crate::domain::models::keyword_set::KeywordSet;
use crate::domain::repositories::archive_store::ArchiveStore;
use crate::domain::repositories::index_query::IndexQueryBackend;
use crate::domain::services::domain_aggregator::{DomainAggregator, ScoreWeights};
use crate::domain::services::keyword_matcher::KeywordMatcher;
use crate::infrastructure::archive::stream::spawn_decode_task;
use crate::infrastructure::archive::DecodeError;
use crate::infrastructure::locator::ArchiveLocator;
use crate::utils::errors::ExtractError;
use crate::utils::retry_policy::RetryPolicy;

/// 加速查询路径的默认候选行上限
const DEFAULT_QUERY_LIMIT: usize = 1000;

/// 提取运行参数
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// 爬取标识
    pub crawl_id: String,
    /// 归档格式
    pub format: ArchiveFormat,
    /// 本次运行处理的归档文件数上限
    pub file_limit: usize,
    /// 最终输出的域名条数上限
    pub output_limit: Option<usize>,
    /// 域名入选的最低分数
    pub min_score: f64,
    /// url-index格式下启用加速查询后端
    pub use_query_backend: bool,
    /// 整体缓冲模式：先把归档完整读入内存再解码。
    /// 仅适合小文件调试，大文件必须用默认的流式模式
    pub buffered: bool,
}

/// 运行状态机
///
/// `Streaming` 对每个文件循环；单文件失败回到下一个文件继续，
/// 不会中止运行。终态是 `Completed`（可能带非空失败列表）
/// 或 `Aborted`（定位失败或全部文件失败）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Locating,
    Streaming,
    Aggregating,
    Completed,
    Aborted,
}

/// 重试耗尽后仍不可恢复的单文件失败
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub kind: String,
    pub message: String,
}

/// 提取运行的最终报告
#[derive(Debug, Serialize)]
pub struct ExtractionReport {
    pub crawl_id: String,
    pub format: ArchiveFormat,
    /// 分数降序、同分按域名升序的最终域名列表
    pub domains: Vec<DomainEntry>,
    pub processed_files: usize,
    /// 失败文件列表，绝不静默丢弃，每个文件至多出现一次
    pub failed_files: Vec<FileFailure>,
    pub records_seen: u64,
    pub decode_errors: u64,
    /// 被取消的运行标记为false：分数只含完整处理过的文件
    pub complete: bool,
}

/// 单文件处理产出
struct FileStats {
    aggregator: DomainAggregator,
    records: u64,
    decode_errors: u64,
}

/// 提取服务（取回/流式控制器）
///
/// 驱动整个提取运行：定位归档文件、按小并发逐个流式解码、
/// 匹配关键词、把每个文件的私有聚合结果并入运行聚合器。
/// 聚合表的生命周期严格限定在一次运行内，重复运行互不共享状态
pub struct ExtractionService {
    store: Arc<dyn ArchiveStore>,
    locator: ArchiveLocator,
    query_backend: Option<Arc<dyn IndexQueryBackend>>,
    keywords: KeywordSet,
    matcher: Arc<KeywordMatcher>,
    settings: ExtractionSettings,
}

impl ExtractionService {
    pub fn new(
        store: Arc<dyn ArchiveStore>,
        keywords: KeywordSet,
        settings: ExtractionSettings,
    ) -> Result<Self, regex::Error> {
        let matcher = Arc::new(KeywordMatcher::new(&keywords)?);
        let locator = ArchiveLocator::new(store.clone());
        Ok(Self {
            store,
            locator,
            query_backend: None,
            keywords,
            matcher,
            settings,
        })
    }

    pub fn with_query_backend(mut self, backend: Arc<dyn IndexQueryBackend>) -> Self {
        self.query_backend = Some(backend);
        self
    }

    /// 执行一次提取运行
    ///
    /// 总是返回完整或显式标记不完整的结果加失败报告；
    /// 只有定位失败、查询后端失败或全部文件失败才作为错误返回。
    /// 取消信号会立即停止文件进件，在途文件被整体放弃
    pub async fn run(
        &self,
        options: ExtractionOptions,
        cancel: CancellationToken,
    ) -> Result<ExtractionReport, ExtractError> {
        let mut state = RunState::Idle;
        transition(&mut state, RunState::Locating);

        if options.use_query_backend && options.format == ArchiveFormat::UrlIndex {
            if let Some(backend) = self.query_backend.clone() {
                return self.run_accelerated(backend.as_ref(), &options, &mut state).await;
            }
            warn!("accelerated query requested but no backend configured, using file streaming");
        }

        let files = match self
            .locator
            .locate(&options.crawl_id, options.format, options.file_limit)
            .await
        {
            Ok(files) => files,
            Err(e) => {
                transition(&mut state, RunState::Aborted);
                return Err(e);
            }
        };
        let total_files = files.len();

        transition(&mut state, RunState::Streaming);
        let weights = ScoreWeights::from(&self.settings);
        let retry = RetryPolicy {
            max_retries: self.settings.max_retries,
            ..RetryPolicy::standard()
        };
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut tasks: JoinSet<(String, Result<FileStats, ExtractError>)> = JoinSet::new();
        let mut cancelled = false;

        for file in files {
            // 取消时立即停止进件；biased保证取消优先于取permit
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let store = self.store.clone();
            let matcher = self.matcher.clone();
            let retry = retry.clone();
            let cancel = cancel.clone();
            let capacity = self.settings.record_channel_capacity;
            let buffered = options.buffered;
            tasks.spawn(async move {
                let _permit = permit;
                let result = process_file_with_retry(
                    store, matcher, weights, &file, capacity, buffered, &retry, &cancel,
                )
                .await;
                (file.path, result)
            });
        }

        let mut run_aggregator = DomainAggregator::new(weights);
        let mut failures: Vec<FileFailure> = Vec::new();
        let mut processed_files = 0usize;
        let mut records_seen = 0u64;
        let mut decode_errors = 0u64;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((path, Ok(stats))) => {
                    processed_files += 1;
                    records_seen += stats.records;
                    decode_errors += stats.decode_errors;
                    run_aggregator.merge(stats.aggregator);
                    info!(path, "archive file processed");
                }
                Ok((path, Err(ExtractError::Cancelled))) => {
                    // 在途文件被放弃：不产生贡献，也不算作失败
                    cancelled = true;
                    info!(path, "in-flight file abandoned on cancellation");
                }
                Ok((path, Err(e))) => {
                    warn!(path, error = %e, "archive file failed irrecoverably");
                    failures.push(FileFailure {
                        path,
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    });
                }
                Err(join_error) => {
                    error!(error = %join_error, "file task aborted unexpectedly");
                }
            }
        }
        if cancel.is_cancelled() {
            cancelled = true;
        }

        transition(&mut state, RunState::Aggregating);

        if !cancelled && processed_files == 0 && total_files > 0 {
            transition(&mut state, RunState::Aborted);
            return Err(ExtractError::AllFilesFailed);
        }

        let domains = run_aggregator.finish(options.min_score, options.output_limit);
        transition(&mut state, RunState::Completed);
        info!(
            domains = domains.len(),
            processed_files,
            failed_files = failures.len(),
            records_seen,
            complete = !cancelled,
            "extraction run finished"
        );

        Ok(ExtractionReport {
            crawl_id: options.crawl_id,
            format: options.format,
            domains,
            processed_files,
            failed_files: failures,
            records_seen,
            decode_errors,
            complete: !cancelled,
        })
    }

    /// 加速路径：查询后端直接返回url-index候选记录
    ///
    /// 返回行仍经过与默认路径相同的匹配与聚合
    async fn run_accelerated(
        &self,
        backend: &dyn IndexQueryBackend,
        options: &ExtractionOptions,
        state: &mut RunState,
    ) -> Result<ExtractionReport, ExtractError> {
        let query_limit = options.output_limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        let records = match backend
            .query_candidates(&options.crawl_id, &self.keywords, query_limit)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                transition(state, RunState::Aborted);
                return Err(e);
            }
        };

        transition(state, RunState::Aggregating);
        let weights = ScoreWeights::from(&self.settings);
        let mut aggregator = DomainAggregator::new(weights);
        for record in &records {
            let matches = self.matcher.match_record(record);
            aggregator.fold(&record.domain, &matches);
        }

        let domains = aggregator.finish(options.min_score, options.output_limit);
        transition(state, RunState::Completed);
        info!(
            domains = domains.len(),
            candidates = records.len(),
            "accelerated extraction run finished"
        );

        Ok(ExtractionReport {
            crawl_id: options.crawl_id.clone(),
            format: options.format,
            domains,
            processed_files: 0,
            failed_files: Vec::new(),
            records_seen: records.len() as u64,
            decode_errors: 0,
            complete: true,
        })
    }
}

fn transition(state: &mut RunState, next: RunState) {
    let from = *state;
    debug!(?from, to = ?next, "run state transition");
    *state = next;
}

#[allow(clippy::too_many_arguments)]
async fn process_file_with_retry(
    store: Arc<dyn ArchiveStore>,
    matcher: Arc<KeywordMatcher>,
    weights: ScoreWeights,
    file: &ArchiveFileRef,
    capacity: usize,
    buffered: bool,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<FileStats, ExtractError> {
    let mut attempt = 0u32;
    loop {
        match process_file(
            store.clone(),
            matcher.clone(),
            weights,
            file,
            capacity,
            buffered,
            cancel,
        )
        .await
        {
            Ok(stats) => return Ok(stats),
            Err(ExtractError::Cancelled) => return Err(ExtractError::Cancelled),
            Err(e) => {
                attempt += 1;
                if !retry.should_retry_with_error(attempt, &e) {
                    return Err(e);
                }
                let backoff = retry.calculate_backoff(attempt);
                warn!(
                    path = %file.path,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "retrying archive file"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ExtractError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }
}

/// 流式处理单个归档文件
///
/// 文件折叠进私有聚合器：要么整体并入运行结果，要么整体丢弃，
/// 取消或流错误都不会把半个文件留在聚合表里
async fn process_file(
    store: Arc<dyn ArchiveStore>,
    matcher: Arc<KeywordMatcher>,
    weights: ScoreWeights,
    file: &ArchiveFileRef,
    capacity: usize,
    buffered: bool,
    cancel: &CancellationToken,
) -> Result<FileStats, ExtractError> {
    if cancel.is_cancelled() {
        return Err(ExtractError::Cancelled);
    }

    // 拉取等待本身也是可取消的挂起点
    let reader: Box<dyn tokio::io::AsyncRead + Send + Unpin> = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ExtractError::Cancelled),
        opened = open_archive(store.as_ref(), &file.path, buffered) => opened?,
    };
    let (mut rx, decode_handle) = spawn_decode_task(reader, file.format, capacity);

    let mut aggregator = DomainAggregator::new(weights);
    let mut records = 0u64;
    let mut decode_errors = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // 丢弃接收端后解码任务在下一次发送时自行终止
                drop(rx);
                return Err(ExtractError::Cancelled);
            }
            item = rx.recv() => match item {
                None => break,
                Some(Ok(record)) => {
                    records += 1;
                    let matches = matcher.match_record(&record);
                    aggregator.fold(&record.domain, &matches);
                }
                Some(Err(e)) if e.is_fatal() => {
                    drop(rx);
                    return Err(match e {
                        DecodeError::Stream(io) => ExtractError::Io(io),
                        other => ExtractError::Decode(other.to_string()),
                    });
                }
                Some(Err(e)) => {
                    decode_errors += 1;
                    debug!(path = %file.path, error = %e, "skipping malformed entry");
                }
            }
        }
    }

    if let Err(e) = decode_handle.await {
        return Err(ExtractError::Decode(format!("decoder task failed: {e}")));
    }

    Ok(FileStats {
        aggregator,
        records,
        decode_errors,
    })
}

/// 按模式打开归档：默认流式，缓冲模式整体读入后从内存解码
async fn open_archive(
    store: &dyn ArchiveStore,
    path: &str,
    buffered: bool,
) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>, ExtractError> {
    if buffered {
        let bytes = store.get(path).await?;
        Ok(Box::new(std::io::Cursor::new(bytes)))
    } else {
        store.open(path).await
    }
}
