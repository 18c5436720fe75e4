// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::io::BufReader;

use flate2::read::GzDecoder;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::io::SyncIoBridge;

use crate::domain::models::archive::{ArchiveFormat, ArchiveRecord};
use crate::infrastructure::archive::{DecodeError, Decoder};

/// 把异步归档字节流桥接到阻塞解码线程
///
/// 解压与解码是同步的逐行处理，放在阻塞线程池上执行；
/// 记录经有界通道流回异步侧，通道容量即背压上限。
/// 接收端被丢弃时（取消）阻塞侧的发送失败，解码随即终止
pub fn spawn_decode_task(
    reader: Box<dyn AsyncRead + Send + Unpin>,
    format: ArchiveFormat,
    capacity: usize,
) -> (
    mpsc::Receiver<Result<ArchiveRecord, DecodeError>>,
    JoinHandle<()>,
) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::task::spawn_blocking(move || {
        let gz = GzDecoder::new(SyncIoBridge::new(reader));
        let decoder = Decoder::new(format, BufReader::new(gz));
        for item in decoder {
            if tx.blocking_send(item).is_err() {
                break;
            }
        }
    });
    (rx, handle)
}
