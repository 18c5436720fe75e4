// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::domain::repositories::archive_store::ArchiveStore;
use crate::utils::errors::ExtractError;

/// 公共HTTP网关存储实现
///
/// 爬取数据集的默认访问方式，无需凭证
pub struct HttpArchiveStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpArchiveStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("domainminer/0.1")
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    async fn request(&self, path: &str) -> Result<reqwest::Response, ExtractError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ExtractError::NotFound(path.to_string()));
        }
        Ok(response.error_for_status()?)
    }
}

#[async_trait]
impl ArchiveStore for HttpArchiveStore {
    async fn open(&self, path: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>, ExtractError> {
        let response = self.request(path).await?;
        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(stream))))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, ExtractError> {
        let response = self.request(path).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// S3 对象存储实现
///
/// 配置了存储桶时使用，凭证与区域走标准AWS配置链
pub struct S3ArchiveStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ArchiveStore {
    pub async fn new(bucket: String, region: Option<String>, endpoint: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let shared_config = loader.load().await;

        let mut config_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(ep) = endpoint {
            config_builder = config_builder.endpoint_url(ep).force_path_style(true);
        }
        let client = aws_sdk_s3::Client::from_conf(config_builder.build());

        Self { client, bucket }
    }
}

#[async_trait]
impl ArchiveStore for S3ArchiveStore {
    async fn open(&self, path: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>, ExtractError> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(output) => Ok(Box::new(Box::pin(output.body.into_async_read()))),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    Err(ExtractError::NotFound(path.to_string()))
                } else {
                    Err(ExtractError::Storage(service_error.to_string()))
                }
            }
        }
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, ExtractError> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(output) => {
                let data = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| ExtractError::Storage(e.to_string()))?
                    .into_bytes();
                Ok(data.to_vec())
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    Err(ExtractError::NotFound(path.to_string()))
                } else {
                    Err(ExtractError::Storage(service_error.to_string()))
                }
            }
        }
    }
}
