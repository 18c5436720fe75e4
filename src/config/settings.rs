// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含爬取数据源、提取流程、搜索通道和上传器等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 爬取数据源配置
    pub crawl: CrawlSettings,
    /// 提取流程配置
    pub extraction: ExtractionSettings,
    /// 搜索通道配置
    pub search: SearchSettings,
    /// 上传器配置
    pub uploader: UploaderSettings,
}

/// 爬取数据源配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// 归档数据HTTP基础地址
    pub data_url: String,
    /// 默认爬取标识
    pub default_crawl_id: String,
    /// S3 存储桶名称（配置后走S3拉取而非HTTP）
    pub s3_bucket: Option<String>,
    /// S3 区域
    pub s3_region: Option<String>,
    /// S3 端点 (可选，用于兼容服务)
    pub s3_endpoint: Option<String>,
    /// Athena 数据库（加速查询后端）
    pub athena_database: Option<String>,
    /// Athena 查询结果输出位置 (s3://...)
    pub athena_output_location: Option<String>,
}

/// 提取流程配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionSettings {
    /// 单次运行处理的归档文件数上限（安全上限，防止意外全量扫描）
    pub max_files: usize,
    /// 并发处理的归档文件数
    pub concurrency: usize,
    /// 每个文件的最大重试次数
    pub max_retries: u32,
    /// 域名入选的最低分数
    pub min_score: f64,
    /// 正文命中的分数权重
    pub content_match_weight: f64,
    /// URL/域名命中的分数权重（URL相关性是更强的信号）
    pub url_match_weight: f64,
    /// 记录通道容量（解码侧与匹配侧之间的背压）
    pub record_channel_capacity: usize,
}

/// 搜索通道配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// 搜索引擎地址
    pub base_url: String,
    /// 每个关键词展开的dork查询数上限
    pub max_dorks_per_keyword: usize,
    /// 每个查询抓取的结果数
    pub results_per_query: usize,
    /// 查询间隔基数（秒），实际间隔带随机抖动
    pub query_delay_secs: u64,
}

/// 上传器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct UploaderSettings {
    /// Supabase 项目地址
    pub url: Option<String>,
    /// Supabase API密钥
    pub api_key: Option<String>,
    /// 目标表名
    pub table: String,
    /// 批量上传大小
    pub batch_size: usize,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件和环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Default crawl source settings
            .set_default("crawl.data_url", "https://data.commoncrawl.org")?
            .set_default("crawl.default_crawl_id", "CC-MAIN-2023-50")?
            // Default extraction settings
            .set_default("extraction.max_files", 5)?
            .set_default("extraction.concurrency", 2)?
            .set_default("extraction.max_retries", 3)?
            .set_default("extraction.min_score", 1.0)?
            .set_default("extraction.content_match_weight", 1.0)?
            .set_default("extraction.url_match_weight", 2.0)?
            .set_default("extraction.record_channel_capacity", 256)?
            // Default search settings
            .set_default("search.base_url", "https://www.google.com/search")?
            .set_default("search.max_dorks_per_keyword", 3)?
            .set_default("search.results_per_query", 10)?
            .set_default("search.query_delay_secs", 5)?
            // Default uploader settings
            .set_default("uploader.table", "domains")?
            .set_default("uploader.batch_size", 100)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("DOMAINMINER").separator("__"));

        builder.build()?.try_deserialize()
    }
}
