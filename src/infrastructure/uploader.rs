// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::settings::UploaderSettings;
use crate::domain::models::domain_entry::DomainEntry;

/// 上传器错误类型
#[derive(Error, Debug)]
pub enum UploadError {
    /// 未配置项目地址或API密钥
    #[error("uploader url and api key must be configured")]
    MissingCredentials,
    /// 请求失败
    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 服务端拒绝写入
    #[error("upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// 数据存储中的域名行
///
/// `matches` 扁平化为关键词 -> 总命中数，下游消费的就是这个形状
#[derive(Debug, Serialize)]
struct DomainRow<'a> {
    domain: &'a str,
    score: f64,
    matches: BTreeMap<&'a str, u64>,
    last_seen: String,
    source: &'static str,
}

/// 上传统计
#[derive(Debug)]
pub struct UploadStats {
    pub uploaded: usize,
    pub batches: usize,
}

/// 远程数据存储上传器
///
/// 把最终域名列表批量upsert到Supabase式REST端点；
/// 按域名冲突合并，重复运行不会产生重复行
#[derive(Debug)]
pub struct SupabaseUploader {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
    batch_size: usize,
}

impl SupabaseUploader {
    pub fn from_settings(settings: &UploaderSettings) -> Result<Self, UploadError> {
        let (Some(url), Some(api_key)) = (&settings.url, &settings.api_key) else {
            return Err(UploadError::MissingCredentials);
        };
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.clone(),
            table: settings.table.clone(),
            batch_size: settings.batch_size.max(1),
        })
    }

    pub async fn upload(&self, entries: &[DomainEntry]) -> Result<UploadStats, UploadError> {
        let endpoint = format!(
            "{}/rest/v1/{}?on_conflict=domain",
            self.base_url, self.table
        );
        let last_seen = Utc::now().to_rfc3339();

        let mut uploaded = 0usize;
        let mut batches = 0usize;
        for chunk in entries.chunks(self.batch_size) {
            let rows: Vec<DomainRow<'_>> = chunk
                .iter()
                .map(|entry| DomainRow {
                    domain: &entry.domain,
                    score: entry.score,
                    matches: entry
                        .matches
                        .iter()
                        .map(|(kw, hits)| (kw.as_str(), hits.total()))
                        .collect(),
                    last_seen: last_seen.clone(),
                    source: "archive-mining",
                })
                .collect();

            let response = self
                .client
                .post(&endpoint)
                .header("apikey", &self.api_key)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Prefer", "resolution=merge-duplicates")
                .json(&rows)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), "upload batch rejected");
                return Err(UploadError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }

            uploaded += chunk.len();
            batches += 1;
            info!(uploaded, batches, "upload batch accepted");
        }

        Ok(UploadStats { uploaded, batches })
    }
}
