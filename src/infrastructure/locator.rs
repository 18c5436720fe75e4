// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::io::Read;
use std::sync::Arc;

use flate2::read::GzDecoder;
use tracing::info;

use crate::domain::models::archive::{ArchiveFileRef, ArchiveFormat};
use crate::domain::repositories::archive_store::ArchiveStore;
use crate::utils::errors::ExtractError;

/// 归档定位器
///
/// 把爬取标识与格式标签解析为有序的归档文件引用列表。
/// 路径列表本身是一个小的gzip文件，允许整体读入；
/// 列表不存在或不可解析时立即以NotFound终止运行，不做重试
pub struct ArchiveLocator {
    store: Arc<dyn ArchiveStore>,
}

impl ArchiveLocator {
    pub fn new(store: Arc<dyn ArchiveStore>) -> Self {
        Self { store }
    }

    pub async fn locate(
        &self,
        crawl_id: &str,
        format: ArchiveFormat,
        limit: usize,
    ) -> Result<Vec<ArchiveFileRef>, ExtractError> {
        let listing_path = format!("crawl-data/{}/{}", crawl_id, format.paths_file());
        info!(crawl_id, %format, path = %listing_path, "fetching archive paths listing");

        let compressed = self.store.get(&listing_path).await.map_err(|e| match e {
            ExtractError::NotFound(_) => {
                ExtractError::NotFound(format!("crawl '{}' has no {} listing", crawl_id, format))
            }
            other => other,
        })?;

        let mut listing = String::new();
        GzDecoder::new(&compressed[..])
            .read_to_string(&mut listing)
            .map_err(|_| {
                ExtractError::NotFound(format!(
                    "paths listing for crawl '{}' is not valid gzip",
                    crawl_id
                ))
            })?;

        // url-index列表还包含cluster.idx等非归档条目，只保留压缩归档
        let refs: Vec<ArchiveFileRef> = listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && line.ends_with(".gz"))
            .take(limit)
            .map(|path| ArchiveFileRef {
                path: path.to_string(),
                format,
                size_hint: None,
            })
            .collect();

        if refs.is_empty() {
            return Err(ExtractError::NotFound(format!(
                "crawl '{}' resolved to an empty {} listing",
                crawl_id, format
            )));
        }

        info!(count = refs.len(), "resolved archive files");
        Ok(refs)
    }
}
