//! # 控制面数据类型

use std::fmt;
use url::Url;

/// 一条 pull-through cache 规则：上游仓库 → ECR 仓库前缀
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheRule {
    /// 上游仓库主机，例如 `registry-1.docker.io`
    pub upstream_host: String,
    /// ECR 中的仓库前缀，例如 `dockerhub`
    pub repository_prefix: String,
}

impl CacheRule {
    /// 创建规则
    pub fn new(upstream_host: impl Into<String>, repository_prefix: impl Into<String>) -> Self {
        Self {
            upstream_host: upstream_host.into(),
            repository_prefix: repository_prefix.into(),
        }
    }
}

/// `DescribePullThroughCacheRules` 的一页结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheRulePage {
    /// 本页规则
    pub rules: Vec<CacheRule>,
    /// 下一页令牌
    pub next_token: Option<String>,
}

/// `GetAuthorizationToken` 返回的一个条目，字段与 SDK 一样可能缺失
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthorizationEntry {
    /// base64 编码的 `AWS:<password>`
    pub token: Option<String>,
    /// 注册表地址，例如 `https://123456789012.dkr.ecr.eu-central-1.amazonaws.com`
    pub proxy_endpoint: Option<String>,
}

impl fmt::Debug for AuthorizationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationEntry")
            .field("token", &self.token.as_ref().map(|t| redact(t)))
            .field("proxy_endpoint", &self.proxy_endpoint)
            .finish()
    }
}

/// 单次请求使用的授权信息，用完即弃
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    endpoint: Url,
}

impl Credential {
    /// 创建授权信息
    #[must_use]
    pub const fn new(token: String, endpoint: Url) -> Self {
        Self { token, endpoint }
    }

    /// 已编码的 Basic 令牌，原样放入 `Authorization` 头
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// 上游注册表地址
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &redact(&self.token))
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// 令牌脱敏，只保留长度信息
fn redact(token: &str) -> String {
    format!("<redacted {} bytes>", token.len())
}
