// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use regex::Regex;
use std::collections::BTreeMap;

use crate::domain::models::archive::ArchiveRecord;
use crate::domain::models::domain_entry::KeywordHits;
use crate::domain::models::keyword_set::KeywordSet;

/// 单条记录的匹配结果
///
/// 关键词 -> 本条记录内的命中计数；只保存非零条目，
/// 全空的结果折叠进聚合器时必须是无操作
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    hits: BTreeMap<String, KeywordHits>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeywordHits)> {
        self.hits.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn insert(&mut self, keyword: String, hits: KeywordHits) {
        debug_assert!(hits.total() > 0);
        self.hits.insert(keyword, hits);
    }

    #[cfg(test)]
    pub fn get(&self, keyword: &str) -> Option<&KeywordHits> {
        self.hits.get(keyword)
    }
}

/// 关键词匹配器
///
/// 每个关键词预编译一个大小写不敏感的字面量模式；
/// 匹配是非重叠子串计数，同一记录内的多次出现全部累计。
/// 正文命中与URL命中分开计数，URL匹配覆盖主机名与路径
pub struct KeywordMatcher {
    patterns: Vec<(String, Regex)>,
}

impl KeywordMatcher {
    pub fn new(keywords: &KeywordSet) -> Result<Self, regex::Error> {
        let patterns = keywords
            .iter()
            .map(|kw| {
                Regex::new(&format!("(?i){}", regex::escape(kw))).map(|re| (kw.to_string(), re))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// 对一条记录计算匹配结果
    ///
    /// url-index记录没有正文（`content` 为None），只会产生URL命中
    pub fn match_record(&self, record: &ArchiveRecord) -> MatchResult {
        let mut result = MatchResult::default();
        for (keyword, pattern) in &self.patterns {
            let content_hits = record
                .content
                .as_deref()
                .map_or(0, |text| pattern.find_iter(text).count() as u64);
            let url_hits = pattern.find_iter(&record.url).count() as u64;

            if content_hits + url_hits > 0 {
                result.insert(
                    keyword.clone(),
                    KeywordHits {
                        content_hits,
                        url_hits,
                    },
                );
            }
        }
        result
    }
}
