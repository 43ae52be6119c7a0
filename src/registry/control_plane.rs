//! # ECR 控制面
//!
//! 两个只读操作：列出 pull-through cache 规则、获取授权令牌。
//! 通过 trait 隔离 AWS SDK，便于在测试中替换。

use async_trait::async_trait;
use aws_sdk_ecr::Client;
use aws_sdk_ecr::error::DisplayErrorContext;

use super::types::{AuthorizationEntry, CacheRule, CacheRulePage};
use crate::config::RegistryConfig;
use crate::error::{ProxyError, Result};
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};

/// 镜像仓库控制面
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistryControlPlane: Send + Sync {
    /// 读取一页 pull-through cache 规则
    async fn describe_cache_rules(&self, next_token: Option<String>) -> Result<CacheRulePage>;

    /// 获取账号级授权令牌
    async fn authorization_data(&self) -> Result<Vec<AuthorizationEntry>>;
}

/// 基于 `aws-sdk-ecr` 的控制面实现
#[derive(Debug, Clone)]
pub struct EcrControlPlane {
    client: Client,
}

impl EcrControlPlane {
    /// 使用已有的 SDK 客户端
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// 通过 SDK 默认链加载凭据与区域（包含 EC2 实例元数据）
    pub async fn from_config(registry: &RegistryConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &registry.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &registry.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let sdk_config = loader.load().await;
        let Some(region) = sdk_config.region() else {
            return Err(ProxyError::config(
                "无法确定 AWS 区域，请设置 AWS_REGION 或 registry.region",
            ));
        };

        tracing::info!(region = %region, "ECR 客户端初始化完成");
        Ok(Self::new(Client::new(&sdk_config)))
    }
}

#[async_trait]
impl RegistryControlPlane for EcrControlPlane {
    async fn describe_cache_rules(&self, next_token: Option<String>) -> Result<CacheRulePage> {
        let output = self
            .client
            .describe_pull_through_cache_rules()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| {
                ProxyError::upstream_query_with_source(
                    format!("DescribePullThroughCacheRules 失败: {}", DisplayErrorContext(&e)),
                    e,
                )
            })?;

        let mut rules = Vec::with_capacity(output.pull_through_cache_rules().len());
        for rule in output.pull_through_cache_rules() {
            match (rule.upstream_registry_url(), rule.ecr_repository_prefix()) {
                (Some(upstream), Some(prefix)) => rules.push(CacheRule::new(upstream, prefix)),
                _ => {
                    ldebug!(
                        "system",
                        LogStage::Configuration,
                        LogComponent::ControlPlane,
                        "skip_incomplete_rule",
                        "跳过缺少上游地址或前缀的规则",
                        rule = ?rule
                    );
                }
            }
        }

        Ok(CacheRulePage {
            rules,
            next_token: output.next_token().map(ToString::to_string),
        })
    }

    async fn authorization_data(&self) -> Result<Vec<AuthorizationEntry>> {
        let output = self
            .client
            .get_authorization_token()
            .send()
            .await
            .map_err(|e| {
                ProxyError::upstream_query_with_source(
                    format!("GetAuthorizationToken 失败: {}", DisplayErrorContext(&e)),
                    e,
                )
            })?;

        Ok(output
            .authorization_data()
            .iter()
            .map(|data| AuthorizationEntry {
                token: data.authorization_token().map(ToString::to_string),
                proxy_endpoint: data.proxy_endpoint().map(ToString::to_string),
            })
            .collect())
    }
}
