// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;

use crate::domain::models::archive::ArchiveRecord;
use crate::domain::models::keyword_set::KeywordSet;
use crate::utils::errors::ExtractError;

/// 加速查询后端接口
///
/// url-index格式的替代快速路径：直接向分析型查询服务下发SQL式查询，
/// 返回的行被当作已解码的url-index记录，绕过逐文件流式处理。
/// 这是可选能力，默认路径始终解析为具体文件
#[async_trait]
pub trait IndexQueryBackend: Send + Sync {
    /// 查询URL中包含任一关键词的候选记录
    async fn query_candidates(
        &self,
        crawl_id: &str,
        keywords: &KeywordSet,
        limit: usize,
    ) -> Result<Vec<ArchiveRecord>, ExtractError>;
}
