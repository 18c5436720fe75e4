// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 提取流程错误类型
///
/// 分层传播：单条记录错误在解码器消费侧消化，单文件错误在控制器
/// 文件循环内消化，只有运行级错误才会抛给调用方
#[derive(Error, Debug)]
pub enum ExtractError {
    /// 爬取标识无法解析为有效的文件列表（致命，不重试）
    #[error("crawl listing not found: {0}")]
    NotFound(String),

    /// 网络请求失败（瞬时，可重试）
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// 归档流读取/解压失败（整个文件视为失败）
    #[error("archive stream error: {0}")]
    Io(#[from] std::io::Error),

    /// 对象存储访问失败（瞬时，可重试）
    #[error("storage access failed: {0}")]
    Storage(String),

    /// 单条记录解码失败（跳过并计数）
    #[error("record decode failed: {0}")]
    Decode(String),

    /// 加速查询后端失败
    #[error("index query failed: {0}")]
    Query(String),

    /// 文件列表内所有文件都处理失败
    #[error("all archive files failed")]
    AllFilesFailed,

    /// 运行被外部取消（仅用于文件任务内部信令，公共API返回部分结果）
    #[error("run cancelled")]
    Cancelled,
}

impl ExtractError {
    /// 判断错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractError::Fetch(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            // 解压中途断流表现为IO错误，重新拉取可能成功
            ExtractError::Io(_) => true,
            ExtractError::Storage(_) => true,
            _ => false,
        }
    }

    /// 失败报告中使用的错误类别标签
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::NotFound(_) => "not_found",
            ExtractError::Fetch(_) => "fetch",
            ExtractError::Io(_) => "io",
            ExtractError::Storage(_) => "storage",
            ExtractError::Decode(_) => "decode",
            ExtractError::Query(_) => "query",
            ExtractError::AllFilesFailed => "all_files_failed",
            ExtractError::Cancelled => "cancelled",
        }
    }
}
