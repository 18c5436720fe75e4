// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::io::BufRead;

use serde_json::Value;

use crate::domain::models::archive::ArchiveRecord;
use crate::infrastructure::archive::DecodeError;
use crate::utils::url_utils::extract_domain;

/// url-index格式解码器
///
/// 每行一条紧凑记录：`SURT键 时间戳 {JSON元数据}`。
/// 没有正文文本，`content` 为None —— 该格式只支持URL文本匹配，
/// 对只出现在页面正文里的关键词会系统性漏计
pub struct CdxDecoder<R> {
    reader: R,
    line: String,
    done: bool,
}

impl<R: BufRead> CdxDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            done: false,
        }
    }

    fn parse_line(line: &str) -> Result<ArchiveRecord, DecodeError> {
        // SURT键和时间戳都可能含空格以外的任意字符，JSON负载从首个'{'开始
        let json_start = line
            .find('{')
            .ok_or_else(|| DecodeError::BadLine("no JSON payload".to_string()))?;
        let payload: Value = serde_json::from_str(&line[json_start..])
            .map_err(|e| DecodeError::BadLine(e.to_string()))?;

        let url = payload
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::BadLine("missing url field".to_string()))?
            .to_string();
        let domain = extract_domain(&url).ok_or(DecodeError::MissingUri)?;

        Ok(ArchiveRecord {
            url,
            domain,
            content: None,
        })
    }
}

impl<R: BufRead> Iterator for CdxDecoder<R> {
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
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(Self::parse_line(trimmed));
                }
            }
        }
    }
}
