// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 归档解码模块
///
/// 三种归档格式各有一个解码器，统一契约：给定解压后的字节流，
/// 产出惰性、前向单遍的记录序列。任何时刻内存中至多持有一条
/// 记录的原始负载，绝不物化整个文件
pub mod cdx;
pub mod stream;
pub mod wat;
pub mod wet;

use std::io::BufRead;
use thiserror::Error;

use crate::domain::models::archive::{ArchiveFormat, ArchiveRecord};
use cdx::CdxDecoder;
use wat::WatDecoder;
use wet::WetDecoder;

/// 解码错误
///
/// 单条目错误（跳过计数）与流级错误（整个文件失败）区分开
#[derive(Error, Debug)]
pub enum DecodeError {
    /// 条目的目标URL缺失或无法解析出域名
    #[error("entry has no usable target URI")]
    MissingUri,
    /// 元数据负载无法解析
    #[error("malformed metadata payload: {0}")]
    BadPayload(String),
    /// 索引行格式错误
    #[error("malformed index line: {0}")]
    BadLine(String),
    /// 底层流读取/解压失败，文件不可继续
    #[error("stream error: {0}")]
    Stream(#[from] std::io::Error),
}

impl DecodeError {
    /// 流级错误导致整个文件失败；其余错误逐条跳过
    pub fn is_fatal(&self) -> bool {
        matches!(self, DecodeError::Stream(_))
    }
}

/// 格式分派的解码器
///
/// 按格式标签选择具体解码器的带标签变体，避免深继承，
/// 各解码器可独立测试
pub enum Decoder<R: BufRead> {
    TextExtract(WetDecoder<R>),
    Metadata(WatDecoder<R>),
    UrlIndex(CdxDecoder<R>),
}

impl<R: BufRead> Decoder<R> {
    pub fn new(format: ArchiveFormat, reader: R) -> Self {
        match format {
            ArchiveFormat::TextExtract => Decoder::TextExtract(WetDecoder::new(reader)),
            ArchiveFormat::Metadata => Decoder::Metadata(WatDecoder::new(reader)),
            ArchiveFormat::UrlIndex => Decoder::UrlIndex(CdxDecoder::new(reader)),
        }
    }
}

impl<R: BufRead> Iterator for Decoder<R> {
    type Item = Result<ArchiveRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Decoder::TextExtract(d) => d.next(),
            Decoder::Metadata(d) => d.next(),
            Decoder::UrlIndex(d) => d.next(),
        }
    }
}
