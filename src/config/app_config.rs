//! # 应用配置结构定义

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

use crate::error::{Context, ProxyError, Result};

/// Docker Hub 在 ECR pull-through cache 中登记的上游地址
pub const DEFAULT_UPSTREAM_REGISTRY: &str = "registry-1.docker.io";

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 432;

/// 应用主配置结构
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 监听配置
    pub server: ServerConfig,
    /// 镜像仓库与控制面配置
    pub registry: RegistryConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 监听配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址，必须是回环地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 工作线程数
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            workers: num_cpus::get(),
        }
    }
}

/// 镜像仓库配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 只使用 `ecrRepositoryPrefix` 以此开头的规则，空串表示全部
    pub prefix_filter: String,
    /// 客户端未显式带前缀时使用的上游仓库
    pub default_upstream: String,
    /// AWS 区域；为空时使用 SDK 默认链（环境变量、配置文件、IMDS）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// 控制面地址覆盖（测试或 VPC endpoint）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            prefix_filter: String::new(),
            default_upstream: DEFAULT_UPSTREAM_REGISTRY.to_string(),
            region: None,
            endpoint_url: None,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// 监听地址
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.server.host.parse().map_err(|e| {
            ProxyError::config_with_source(format!("无效的监听地址: {}", self.server.host), e)
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        let addr = self.listen_addr()?;
        if !addr.ip().is_loopback() {
            return Err(ProxyError::config(format!(
                "监听地址必须是回环地址: {}",
                self.server.host
            )));
        }
        if self.server.port == 0 {
            return Err(ProxyError::config("无效的服务器端口: 0"));
        }
        if self.server.workers == 0 {
            return Err(ProxyError::config("工作线程数必须大于0"));
        }
        if self.registry.default_upstream.trim().is_empty() {
            return Err(ProxyError::config("默认上游仓库不能为空"));
        }
        if let Some(endpoint) = &self.registry.endpoint_url {
            url::Url::parse(endpoint).context(format!("无效的控制面地址: {endpoint}"))?;
        }
        Ok(())
    }
}
