//! # 启动流程
//!
//! 配置 → ECR 客户端 → 前缀表（只构建一次）→ 代理服务器

use std::sync::Arc;

use crate::config::{AppConfig, RegistryConfig};
use crate::error::{Context, ProxyError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::proxy::{ProxyService, RequestServer};
use crate::registry::{CacheRuleResolver, CredentialProvider, EcrControlPlane, RegistryControlPlane};
use crate::rewrite::PrefixTable;
use crate::{linfo, lwarn};

/// 解析启动时的前缀表
///
/// 控制面调用失败是致命错误；过滤后没有规则或缺少默认镜像规则只告警，
/// 服务照常启动并透传请求。
pub async fn resolve_prefix_table(
    resolver: &CacheRuleResolver,
    registry: &RegistryConfig,
) -> Result<PrefixTable> {
    match resolver
        .prefix_table(&registry.prefix_filter, &registry.default_upstream)
        .await
    {
        Ok(table) => {
            if table.default_prefix().is_none() {
                lwarn!(
                    "system",
                    LogStage::Startup,
                    LogComponent::RuleResolver,
                    "default_rule_missing",
                    "没有默认镜像的 pull-through cache 规则，未带前缀的请求将原样透传",
                    default_upstream = %registry.default_upstream
                );
            }
            Ok(table)
        }
        Err(e @ ProxyError::NoRulesFound { .. }) => {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::RuleResolver,
                "no_rules_found",
                "前缀表为空，所有请求将原样透传",
                error = %e
            );
            Ok(PrefixTable::empty(registry.default_upstream.clone()))
        }
        Err(e) => Err(e),
    }
}

/// 用给定的控制面组装服务器
pub async fn prepare_server(
    config: &AppConfig,
    control_plane: Arc<dyn RegistryControlPlane>,
) -> Result<RequestServer> {
    let resolver = CacheRuleResolver::new(Arc::clone(&control_plane));
    let table = resolve_prefix_table(&resolver, &config.registry).await?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::ServerSetup,
        "prefix_table_ready",
        "前缀表构建完成",
        rules = table.len(),
        default_prefix = ?table.default_prefix()
    );

    let service = ProxyService::new(CredentialProvider::new(control_plane), Arc::new(table));
    RequestServer::new(config, service)
}

/// 连接 ECR 并运行代理，直到进程退出
pub async fn run(config: AppConfig) -> Result<()> {
    config.validate()?;

    let control_plane: Arc<dyn RegistryControlPlane> =
        Arc::new(
            EcrControlPlane::from_config(&config.registry)
                .await
                .context("初始化 ECR 客户端失败")?,
        );
    let server = prepare_server(&config, control_plane).await?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动",
        address = %server.listen_addr()
    );
    server.start().await
}
