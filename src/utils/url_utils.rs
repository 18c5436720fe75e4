// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::Url;

/// 从绝对URL中提取规范化域名
///
/// 规范化规则：主机名转小写、去掉 `www.` 前缀、去掉尾部的点。
/// 无法解析或没有主机名（如 data: URI）时返回None
pub fn extract_domain(url_str: &str) -> Option<String> {
    let parsed = Url::parse(url_str).ok()?;
    let host = parsed.host_str()?;
    let normalized = normalize_host(host);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// 规范化主机名
pub fn normalize_host(host: &str) -> String {
    let lower = host.to_lowercase();
    let trimmed = lower.trim_end_matches('.');
    trimmed.strip_prefix("www.").unwrap_or(trimmed).to_string()
}
