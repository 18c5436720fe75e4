// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::io::BufRead;

use serde_json::Value;

use crate::domain::models::archive::ArchiveRecord;
use crate::infrastructure::archive::DecodeError;
use crate::utils::url_utils::extract_domain;

const TARGET_URI: &str = "WARC-Target-URI:";

/// metadata格式解码器
///
/// 归档同样是WARC信封，每个条目的负载是一行JSON元数据。
/// 解码出URL与扁平化的文本替身（标题、meta描述、锚文本），
/// 该格式正文少，但URL/标题关键词信号更密
pub struct WatDecoder<R> {
    reader: R,
    line: String,
    current_url: Option<String>,
    done: bool,
}

impl<R: BufRead> WatDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            current_url: None,
            done: false,
        }
    }

    /// 从元数据负载提取扁平化文本替身
    ///
    /// 取 HTML-Metadata 下的标题、meta标签内容和链接锚文本，
    /// 用空格拼接成单个可匹配的文本
    fn flatten_metadata(payload: &Value) -> String {
        let mut parts: Vec<String> = Vec::new();
        let html_meta = payload
            .pointer("/Envelope/Payload-Metadata/HTTP-Response-Metadata/HTML-Metadata");

        if let Some(meta) = html_meta {
            if let Some(title) = meta.pointer("/Head/Title").and_then(Value::as_str) {
                parts.push(title.to_string());
            }
            if let Some(metas) = meta.pointer("/Head/Metas").and_then(Value::as_array) {
                for tag in metas {
                    if let Some(content) = tag.get("content").and_then(Value::as_str) {
                        parts.push(content.to_string());
                    }
                }
            }
            if let Some(links) = meta.pointer("/Links").and_then(Value::as_array) {
                for link in links {
                    if let Some(text) = link.get("text").and_then(Value::as_str) {
                        parts.push(text.to_string());
                    }
                }
            }
        }
        parts.join(" ")
    }

    fn build_record(&mut self, payload_line: &str) -> Result<ArchiveRecord, DecodeError> {
        // 无论成功与否，本条目到此消费完毕
        let url = self.current_url.take().unwrap_or_default();
        let payload: Value = serde_json::from_str(payload_line)
            .map_err(|e| DecodeError::BadPayload(e.to_string()))?;

        let domain = extract_domain(&url).ok_or(DecodeError::MissingUri)?;
        let content = Self::flatten_metadata(&payload);
        Ok(ArchiveRecord {
            url,
            domain,
            content: Some(content),
        })
    }
}

impl<R: BufRead> Iterator for WatDecoder<R> {
    type Item = Result<ArchiveRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Err(e) => {
                    self.done = true;
                    return Some(Err(DecodeError::Stream(e)));
                }
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {
                    let trimmed = self.line.trim();
                    if let Some(uri) = trimmed.strip_prefix(TARGET_URI) {
                        self.current_url = Some(uri.trim().to_string());
                    } else if self.current_url.is_some()
                        && trimmed.starts_with('{')
                        && trimmed.ends_with('}')
                    {
                        let payload_line = trimmed.to_string();
                        return Some(self.build_record(&payload_line));
                    }
                }
            }
        }
    }
}
