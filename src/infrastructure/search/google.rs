// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashSet;
use std::time::Duration;

use scraper::{Html, Selector};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::settings::SearchSettings;
use crate::domain::models::keyword_set::KeywordSet;
use crate::infrastructure::search::dork::expand_dorks;
use crate::utils::url_utils::extract_domain;

/// 轮换使用的浏览器UA
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

/// 搜索通道错误类型
#[derive(Error, Debug)]
pub enum SearchError {
    /// 请求失败
    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// 单条搜索命中
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub domain: String,
    pub url: String,
    /// 产生该命中的dork查询
    pub query: String,
}

/// 搜索通道产出
#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub queries_run: usize,
    pub hits: Vec<SearchHit>,
}

/// dork搜索器
///
/// 把关键词展开为dork查询逐个下发，从结果页提取候选域名。
/// 单个查询失败只记录日志继续下一个；查询间隔带随机抖动。
/// 浏览器自动化与反检测不在范围内，这里只是普通HTTP请求
pub struct DorkSearcher {
    client: reqwest::Client,
    settings: SearchSettings,
}

impl DorkSearcher {
    pub fn new(settings: SearchSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, settings })
    }

    pub async fn search(&self, keywords: &KeywordSet) -> Result<SearchReport, SearchError> {
        let queries = expand_dorks(keywords, self.settings.max_dorks_per_keyword);
        info!(queries = queries.len(), "starting dork search sweep");

        let mut seen: HashSet<String> = HashSet::new();
        let mut hits = Vec::new();
        let mut queries_run = 0usize;

        for (i, query) in queries.iter().enumerate() {
            match self.run_query(query).await {
                Ok(urls) => {
                    queries_run += 1;
                    for url in urls {
                        let Some(domain) = extract_domain(&url) else {
                            continue;
                        };
                        if is_search_infrastructure(&domain) {
                            continue;
                        }
                        if seen.insert(domain.clone()) {
                            hits.push(SearchHit {
                                domain,
                                url,
                                query: query.clone(),
                            });
                        }
                    }
                }
                Err(e) => {
                    warn!(query, error = %e, "dork query failed, continuing");
                }
            }

            if i + 1 < queries.len() {
                // 查询间隔带抖动，避免固定节奏
                let jitter = rand::random_range(0..1000u64);
                tokio::time::sleep(Duration::from_millis(
                    self.settings.query_delay_secs * 1000 + jitter,
                ))
                .await;
            }
        }

        info!(hits = hits.len(), queries_run, "dork search sweep finished");
        Ok(SearchReport { queries_run, hits })
    }

    async fn run_query(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let user_agent = USER_AGENTS[rand::random_range(0..USER_AGENTS.len())];
        let url = format!(
            "{}?q={}&num={}",
            self.settings.base_url,
            urlencoding::encode(query),
            self.settings.results_per_query
        );
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await?
            .error_for_status()?;
        let html = response.text().await?;
        // Html不是Send，解析必须在await点之外完成
        Ok(parse_result_links(&html))
    }
}

/// 从结果页提取出站链接
///
/// 兼容两种形态：`/url?q=...` 跳转链接和直接的绝对链接
fn parse_result_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]").unwrap();

    let mut urls = Vec::new();
    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(stripped) = href.strip_prefix("/url?q=") {
            let target = stripped.split('&').next().unwrap_or(stripped);
            if let Ok(decoded) = urlencoding::decode(target) {
                urls.push(decoded.into_owned());
            }
        } else if href.starts_with("http://") || href.starts_with("https://") {
            urls.push(href.to_string());
        }
    }
    urls
}

/// 搜索引擎自身的域名不作为候选
fn is_search_infrastructure(domain: &str) -> bool {
    const EXCLUDED: &[&str] = &[
        "google.com",
        "googleusercontent.com",
        "gstatic.com",
        "youtube.com",
    ];
    EXCLUDED
        .iter()
        .any(|excluded| domain == *excluded || domain.ends_with(&format!(".{}", excluded)))
}
