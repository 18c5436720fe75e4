// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::utils::errors::ExtractError;

/// 归档对象存储接口
///
/// 屏蔽爬取数据集的访问方式（公共HTTP网关或S3存储桶）。
/// 对象不存在时返回 `ExtractError::NotFound`，网络失败返回 `ExtractError::Fetch`
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// 以流式方式打开一个归档对象，调用方负责解压
    ///
    /// 返回的读取器是前向单遍的；重新读取需要重新打开
    async fn open(&self, path: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>, ExtractError>;

    /// 完整读取一个小对象（如路径列表），大归档文件必须走 `open`
    async fn get(&self, path: &str) -> Result<Vec<u8>, ExtractError>;
}
