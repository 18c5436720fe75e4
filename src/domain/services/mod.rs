// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含系统的核心业务逻辑服务：
/// - 关键词匹配器（keyword_matcher）：对单条记录计算关键词命中
/// - 域名聚合器（domain_aggregator）：跨记录与文件累计域名相关性分数
/// - 提取服务（extraction_service）：驱动整个提取运行的取回/流式控制器
pub mod domain_aggregator;
pub mod extraction_service;
pub mod keyword_matcher;
