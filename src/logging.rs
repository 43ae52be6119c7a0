//! # 日志配置模块
//!
//! 提供 tracing 初始化以及带阶段/组件标签的结构化日志宏

use std::env;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 请求处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    /// 进程启动
    Startup,
    /// 进程关闭
    Shutdown,
    /// 配置加载
    Configuration,
    /// 请求进入
    RequestStart,
    /// 获取授权令牌
    Credential,
    /// 路径改写
    Rewrite,
    /// 转发到上游
    Upstream,
    /// 上游响应
    Response,
    /// 请求失败
    Error,
}

impl LogStage {
    /// 日志中使用的标签
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Configuration => "configuration",
            Self::RequestStart => "request_start",
            Self::Credential => "credential",
            Self::Rewrite => "rewrite",
            Self::Upstream => "upstream",
            Self::Response => "response",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 产生日志的组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    /// 主程序
    Main,
    /// 配置
    Config,
    /// ECR 控制面客户端
    ControlPlane,
    /// 缓存规则解析
    RuleResolver,
    /// 授权令牌
    CredentialProvider,
    /// 路径改写
    PathRewriter,
    /// 请求转发
    Forwarder,
    /// Pingora 代理服务
    ProxyService,
    /// 服务器装配
    ServerSetup,
}

impl LogComponent {
    /// 日志中使用的标签
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Config => "config",
            Self::ControlPlane => "control_plane",
            Self::RuleResolver => "rule_resolver",
            Self::CredentialProvider => "credential_provider",
            Self::PathRewriter => "path_rewriter",
            Self::Forwarder => "forwarder",
            Self::ProxyService => "proxy_service",
            Self::ServerSetup => "server_setup",
        }
    }
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 结构化 info 日志
#[macro_export]
macro_rules! linfo {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::info!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr, $($field:tt)+) => {
        ::tracing::info!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($field)+,
            "{}",
            $message
        )
    };
}

/// 结构化 warn 日志
#[macro_export]
macro_rules! lwarn {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::warn!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr, $($field:tt)+) => {
        ::tracing::warn!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($field)+,
            "{}",
            $message
        )
    };
}

/// 结构化 error 日志
#[macro_export]
macro_rules! lerror {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::error!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr, $($field:tt)+) => {
        ::tracing::error!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($field)+,
            "{}",
            $message
        )
    };
}

/// 结构化 debug 日志
#[macro_export]
macro_rules! ldebug {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::debug!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr, $($field:tt)+) => {
        ::tracing::debug!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($field)+,
            "{}",
            $message
        )
    };
}

/// 默认过滤规则：本 crate 使用配置级别，AWS SDK 与 Pingora 只保留告警
fn default_filter(level: &str) -> String {
    format!("{level},aws_image_proxy={level},aws_config=warn,aws_smithy_runtime=warn,pingora_core=warn,pingora_proxy=warn")
}

/// 初始化日志系统
///
/// `RUST_LOG` 存在时优先生效。重复调用不会 panic（测试中常见）。
pub fn init_logging(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| default_filter(level));

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(
            tracing_fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_silences_sdk_noise() {
        let filter = default_filter("debug");
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("aws_image_proxy=debug"));
        assert!(filter.contains("aws_smithy_runtime=warn"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(LogStage::Rewrite.to_string(), "rewrite");
        assert_eq!(LogComponent::CredentialProvider.to_string(), "credential_provider");
    }

    #[test]
    fn test_macros_accept_extra_fields() {
        init_logging(Some("debug"));
        let path = "/v2/library/busybox/manifests/latest";
        linfo!("test", LogStage::Rewrite, LogComponent::PathRewriter, "rewrite", "ok", path = %path);
        ldebug!("test", LogStage::Rewrite, LogComponent::PathRewriter, "rewrite", "ok");
    }
}
