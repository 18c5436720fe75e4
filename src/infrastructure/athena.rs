// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use tracing::{debug, info};

use crate::domain::models::archive::ArchiveRecord;
use crate::domain::models::keyword_set::KeywordSet;
use crate::domain::repositories::index_query::IndexQueryBackend;
use crate::utils::errors::ExtractError;
use crate::utils::url_utils::{extract_domain, normalize_host};

/// 查询状态轮询间隔
const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// 轮询次数上限，超过视为查询失败
const MAX_POLLS: u32 = 150;

/// Athena加速查询后端
///
/// url-index格式的快速路径：对爬取索引表下发SQL查询，
/// 返回URL中含关键词的候选行。返回的行被当作url-index记录，
/// 仍经过与默认路径相同的匹配与聚合，保证两条路径分数一致
pub struct AthenaIndexBackend {
    client: aws_sdk_athena::Client,
    database: String,
    output_location: String,
}

impl AthenaIndexBackend {
    pub async fn new(database: String, output_location: String, region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let shared_config = loader.load().await;
        Self {
            client: aws_sdk_athena::Client::new(&shared_config),
            database,
            output_location,
        }
    }

    fn build_query(&self, crawl_id: &str, keywords: &KeywordSet, limit: usize) -> String {
        let clause = keywords
            .iter()
            .map(|kw| format!("url LIKE '%{}%'", kw.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!(
            "SELECT url, url_host_name FROM \"{}\".\"ccindex\" \
             WHERE crawl = '{}' AND subset = 'warc' AND ({}) LIMIT {}",
            self.database,
            crawl_id.replace('\'', "''"),
            clause,
            limit
        )
    }

    async fn wait_for_completion(&self, execution_id: &str) -> Result<(), ExtractError> {
        for _ in 0..MAX_POLLS {
            let status = self
                .client
                .get_query_execution()
                .query_execution_id(execution_id)
                .send()
                .await
                .map_err(|e| ExtractError::Query(e.to_string()))?;

            let state = status
                .query_execution()
                .and_then(|q| q.status())
                .and_then(|s| s.state())
                .cloned();

            match state {
                Some(QueryExecutionState::Succeeded) => return Ok(()),
                Some(QueryExecutionState::Failed) | Some(QueryExecutionState::Cancelled) => {
                    return Err(ExtractError::Query(format!(
                        "index query ended in state {:?}",
                        state
                    )));
                }
                other => {
                    debug!(?other, "index query still running");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
        Err(ExtractError::Query("index query timed out".to_string()))
    }
}

#[async_trait]
impl IndexQueryBackend for AthenaIndexBackend {
    async fn query_candidates(
        &self,
        crawl_id: &str,
        keywords: &KeywordSet,
        limit: usize,
    ) -> Result<Vec<ArchiveRecord>, ExtractError> {
        let query = self.build_query(crawl_id, keywords, limit);
        info!(crawl_id, "starting accelerated index query");

        let start = self
            .client
            .start_query_execution()
            .query_string(&query)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&self.database)
                    .build(),
            )
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&self.output_location)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| ExtractError::Query(e.to_string()))?;

        let execution_id = start
            .query_execution_id()
            .ok_or_else(|| ExtractError::Query("missing query execution id".to_string()))?
            .to_string();

        self.wait_for_completion(&execution_id).await?;

        let mut records = Vec::new();
        let mut next_token: Option<String> = None;
        let mut first_page = true;
        loop {
            let mut request = self
                .client
                .get_query_results()
                .query_execution_id(&execution_id);
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let response = request
                .send()
                .await
                .map_err(|e| ExtractError::Query(e.to_string()))?;

            if let Some(result_set) = response.result_set() {
                let rows = result_set.rows();
                // 首页第一行是列名表头
                let data_rows = if first_page {
                    rows.get(1..).unwrap_or(&[])
                } else {
                    rows
                };
                for row in data_rows {
                    let data = row.data();
                    let url = data.first().and_then(|d| d.var_char_value());
                    let host = data.get(1).and_then(|d| d.var_char_value());
                    if let Some(url) = url {
                        let domain = match host {
                            Some(h) => Some(normalize_host(h)).filter(|d| !d.is_empty()),
                            None => extract_domain(url),
                        };
                        if let Some(domain) = domain {
                            records.push(ArchiveRecord {
                                url: url.to_string(),
                                domain,
                                content: None,
                            });
                        }
                    }
                }
            }

            first_page = false;
            next_token = response.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        info!(candidates = records.len(), "accelerated index query finished");
        Ok(records)
    }
}
