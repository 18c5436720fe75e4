// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::io::BufRead;

use crate::domain::models::archive::ArchiveRecord;
use crate::infrastructure::archive::DecodeError;
use crate::utils::url_utils::extract_domain;

/// WARC条目边界标记
const BOUNDARY: &str = "WARC/1.0";
/// 头部中携带来源URL的字段
const TARGET_URI: &str = "WARC-Target-URI:";

/// text-extract格式解码器
///
/// 归档是串接的条目：边界标记开头，头部块携带来源URL，
/// 空行之后直到下一个边界是正文文本。逐行推进，
/// 任何时刻只缓冲当前条目的正文。
/// 没有目标URL的条目（如文件头部的warcinfo块）静默跳过
pub struct WetDecoder<R> {
    reader: R,
    line: String,
    current_url: Option<String>,
    in_body: bool,
    body: String,
    done: bool,
}

impl<R: BufRead> WetDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            current_url: None,
            in_body: false,
            body: String::new(),
            done: false,
        }
    }

    /// 取出当前缓冲的条目并重置状态
    fn take_entry(&mut self) -> Option<Result<ArchiveRecord, DecodeError>> {
        let url = self.current_url.take();
        let body = std::mem::take(&mut self.body);
        self.in_body = false;

        let url = url?;
        match extract_domain(&url) {
            Some(domain) => Some(Ok(ArchiveRecord {
                url,
                domain,
                content: Some(body.trim().to_string()),
            })),
            None => Some(Err(DecodeError::MissingUri)),
        }
    }
}

impl<R: BufRead> Iterator for WetDecoder<R> {
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
                    // EOF：产出最后一个缓冲中的条目
                    self.done = true;
                    return self.take_entry();
                }
                Ok(_) => {
                    let trimmed = self.line.trim_end();
                    if trimmed == BOUNDARY {
                        if let Some(entry) = self.take_entry() {
                            return Some(entry);
                        }
                        continue;
                    }
                    if !self.in_body {
                        if let Some(uri) = trimmed.strip_prefix(TARGET_URI) {
                            self.current_url = Some(uri.trim().to_string());
                        } else if trimmed.is_empty() {
                            // 头部结束，空行之后是正文
                            self.in_body = true;
                        }
                    } else if self.current_url.is_some() {
                        self.body.push_str(&self.line);
                    }
                }
            }
        }
    }
}
