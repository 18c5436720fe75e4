// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 归档格式标签
///
/// 三种爬取快照格式，各自对应一个解码器：
/// - `text-extract`：带正文文本的条目（信号最全，体积最大）
/// - `metadata`：结构化页面元数据（正文少，URL/标题信号密度高）
/// - `url-index`：紧凑的URL索引行（无正文，只支持URL文本匹配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
    TextExtract,
    Metadata,
    UrlIndex,
}

impl ArchiveFormat {
    /// 该格式在爬取数据集中的路径列表文件名
    pub fn paths_file(&self) -> &'static str {
        match self {
            ArchiveFormat::TextExtract => "wet.paths.gz",
            ArchiveFormat::Metadata => "wat.paths.gz",
            ArchiveFormat::UrlIndex => "cc-index.paths.gz",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::TextExtract => "text-extract",
            ArchiveFormat::Metadata => "metadata",
            ArchiveFormat::UrlIndex => "url-index",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text-extract" => Ok(ArchiveFormat::TextExtract),
            "metadata" => Ok(ArchiveFormat::Metadata),
            "url-index" => Ok(ArchiveFormat::UrlIndex),
            other => Err(format!(
                "unknown archive format '{}', expected text-extract | metadata | url-index",
                other
            )),
        }
    }
}

/// 远程归档文件引用
///
/// 由定位器产出，此后只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveFileRef {
    /// 数据集内的对象路径
    pub path: String,
    /// 归档格式
    pub format: ArchiveFormat,
    /// 压缩后的近似大小（字节），路径列表不携带时为None
    pub size_hint: Option<u64>,
}

/// 归档中解码出的单条记录
///
/// 流式产生、用完即弃，绝不落盘。`content` 在url-index格式下为None，
/// 该格式不携带正文，只能做URL文本匹配
#[derive(Debug, Clone)]
pub struct ArchiveRecord {
    /// 绝对URL
    pub url: String,
    /// 规范化域名（小写、去 `www.`）
    pub domain: String,
    /// 纯文本内容
    pub content: Option<String>,
}
