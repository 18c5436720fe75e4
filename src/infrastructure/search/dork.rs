// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::keyword_set::KeywordSet;

/// dork查询模板
///
/// `{keyword}` 占位符按关键词替换；模板顺序即优先级，
/// `max_dorks_per_keyword` 截取前N个
const DORK_TEMPLATES: &[&str] = &[
    "\"{keyword}\"",
    "intitle:\"{keyword}\"",
    "inurl:\"{keyword}\"",
    "intext:\"{keyword}\"",
    "\"{keyword}\" -site:wikipedia.org",
    "site:.org \"{keyword}\"",
];

/// 把关键词集合展开为dork查询列表
pub fn expand_dorks(keywords: &KeywordSet, per_keyword: usize) -> Vec<String> {
    let mut queries = Vec::new();
    for keyword in keywords.iter() {
        for template in DORK_TEMPLATES.iter().take(per_keyword) {
            queries.push(template.replace("{keyword}", keyword));
        }
    }
    queries
}
