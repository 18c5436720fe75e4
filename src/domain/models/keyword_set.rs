// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;
use std::collections::HashSet;

/// 关键词输入形态
///
/// 兼容两种JSON形态：平铺数组，或携带 `all_keywords` 超集字段的结构化对象
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KeywordInput {
    /// 平铺的关键词数组
    Flat(Vec<String>),
    /// 结构化对象，`all_keywords` 为规范字段
    Structured { all_keywords: Vec<String> },
}

/// 关键词集合
///
/// 有序、去重、全小写的关键词序列（允许短语）；运行期间不可变
#[derive(Debug, Clone)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    /// 从原始关键词列表构建集合
    ///
    /// 统一转小写并去除首尾空白，保持首次出现的顺序去重，丢弃空串
    pub fn new(raw: impl IntoIterator<Item = String>) -> Self {
        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for kw in raw {
            let normalized = kw.trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }
            if seen.insert(normalized.clone()) {
                keywords.push(normalized);
            }
        }
        Self { keywords }
    }

    /// 从JSON文本解析关键词集合
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let input: KeywordInput = serde_json::from_str(json)?;
        Ok(Self::from(input))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }
}

impl From<KeywordInput> for KeywordSet {
    fn from(input: KeywordInput) -> Self {
        match input {
            KeywordInput::Flat(list) => Self::new(list),
            KeywordInput::Structured { all_keywords } => Self::new(all_keywords),
        }
    }
}
