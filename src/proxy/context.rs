//! # 单个请求的上下文

use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

use super::forwarder::UpstreamTarget;
use crate::registry::Credential;
use crate::rewrite::ProxyDecision;

/// 请求生命周期内的状态，请求结束即丢弃
#[derive(Debug)]
pub struct RequestContext {
    /// 请求ID
    pub request_id: String,
    /// 开始时间
    pub start_time: Instant,
    /// 客户端原始路径
    pub original_path: String,
    /// 改写决策
    pub decision: Option<ProxyDecision>,
    /// 本次请求的授权信息
    pub credential: Option<Credential>,
    /// 上游地址
    pub target: Option<UpstreamTarget>,
    /// 已解析的上游地址
    pub upstream_addr: Option<SocketAddr>,
    /// 上游响应状态码
    pub upstream_status: Option<u16>,
}

impl RequestContext {
    /// 新请求
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            start_time: Instant::now(),
            original_path: String::new(),
            decision: None,
            credential: None,
            target: None,
            upstream_addr: None,
            upstream_status: None,
        }
    }

    /// 发往上游的路径；尚未决策时为原始路径
    #[must_use]
    pub fn rewritten_path(&self) -> &str {
        self.decision
            .as_ref()
            .map_or(self.original_path.as_str(), |d| d.target_path.as_str())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
