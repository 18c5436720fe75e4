// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashMap;

use crate::config::settings::ExtractionSettings;
use crate::domain::models::domain_entry::{DomainEntry, KeywordHits};
use crate::domain::services::keyword_matcher::MatchResult;

/// 分数权重
///
/// URL命中权重高于正文命中：关键词出现在主机名或路径里
/// 比正文里的顺带共现是更强的相关性信号
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub content: f64,
    pub url: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            content: 1.0,
            url: 2.0,
        }
    }
}

impl From<&ExtractionSettings> for ScoreWeights {
    fn from(settings: &ExtractionSettings) -> Self {
        Self {
            content: settings.content_match_weight,
            url: settings.url_match_weight,
        }
    }
}

/// 域名聚合器
///
/// 一次提取运行内唯一的共享可变状态，生命周期严格限定在运行内。
/// 所有写入经由单一的 `fold` 入口；并发处理时每个文件折叠进
/// 自己的私有聚合器，完成后整体 `merge` 进运行聚合器，
/// 因此合并可交换，最终结果与文件处理顺序无关
#[derive(Debug)]
pub struct DomainAggregator {
    weights: ScoreWeights,
    entries: HashMap<String, DomainEntry>,
}

impl DomainAggregator {
    pub fn new(weights: ScoreWeights) -> Self {
        Self {
            weights,
            entries: HashMap::new(),
        }
    }

    /// 把一条记录的匹配结果折叠进对应域名
    ///
    /// 空结果是无操作，不会产生零分条目
    pub fn fold(&mut self, domain: &str, matches: &MatchResult) {
        if matches.is_empty() {
            return;
        }
        let entry = self
            .entries
            .entry(domain.to_string())
            .or_insert_with(|| DomainEntry::new(domain));
        for (keyword, hits) in matches.iter() {
            entry
                .matches
                .entry(keyword.to_string())
                .or_default()
                .add(*hits);
        }
        entry.score = Self::score_of(&entry.matches, self.weights);
    }

    /// 合并另一个聚合器（按文件产出的部分结果）
    pub fn merge(&mut self, other: DomainAggregator) {
        for (domain, partial) in other.entries {
            let entry = self
                .entries
                .entry(domain.clone())
                .or_insert_with(|| DomainEntry::new(domain));
            for (keyword, hits) in partial.matches {
                entry.matches.entry(keyword).or_default().add(hits);
            }
            entry.score = Self::score_of(&entry.matches, self.weights);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 产出最终排序结果
    ///
    /// 分数降序，同分按域名字典序升序保证确定性；
    /// 低于 `min_score` 的条目被丢弃，`limit` 截断到前N条
    pub fn finish(self, min_score: f64, limit: Option<usize>) -> Vec<DomainEntry> {
        let mut entries: Vec<DomainEntry> = self
            .entries
            .into_values()
            .filter(|e| e.score >= min_score)
            .collect();
        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.domain.cmp(&b.domain))
        });
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        entries
    }

    fn score_of(
        matches: &std::collections::BTreeMap<String, KeywordHits>,
        weights: ScoreWeights,
    ) -> f64 {
        matches
            .values()
            .map(|hits| {
                hits.content_hits as f64 * weights.content + hits.url_hits as f64 * weights.url
            })
            .sum()
    }
}
