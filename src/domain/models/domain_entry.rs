// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单个关键词的累计命中计数
///
/// 正文命中与URL命中分开记录，两者分数权重不同；
/// 分数必须能仅凭匹配表重算出来，所以这里不能合并成单一计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordHits {
    /// 正文内的命中次数
    pub content_hits: u64,
    /// URL/域名内的命中次数
    pub url_hits: u64,
}

impl KeywordHits {
    pub fn total(&self) -> u64 {
        self.content_hits + self.url_hits
    }

    pub fn add(&mut self, other: KeywordHits) {
        self.content_hits += other.content_hits;
        self.url_hits += other.url_hits;
    }
}

/// 域名聚合条目
///
/// 每个规范化域名唯一一条；`score` 随匹配折叠单调不减，
/// 是匹配表的确定性加权和，无任何隐藏状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEntry {
    pub domain: String,
    pub score: f64,
    /// 关键词 -> 跨全部已处理记录的累计命中
    pub matches: BTreeMap<String, KeywordHits>,
}

impl DomainEntry {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            score: 0.0,
            matches: BTreeMap::new(),
        }
    }
}
