//! # Pingora 代理服务
//!
//! 每个请求：获取令牌 → 改写路径 → 转发 → 原样回传响应。
//! 所有请求级错误都在本请求内转换成 HTTP 状态码和纯文本响应。

use async_trait::async_trait;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::{Error, ErrorType};
use pingora_http::{RequestHeader, ResponseHeader};
use pingora_proxy::{FailToProxy, ProxyHttp, Session};
use std::sync::Arc;

use super::context::RequestContext;
use super::forwarder::{
    UpstreamTarget, error_status, observe_response, rewrite_request, to_pingora_error,
};
use super::response::write_text_error;
use crate::logging::{LogComponent, LogStage};
use crate::registry::CredentialProvider;
use crate::rewrite::{self, PrefixTable};
use crate::{ldebug, lerror, linfo, lwarn};

/// ECR 凭据代理服务
///
/// 持有注入的依赖，不依赖任何全局状态。前缀表只读，并发请求无需加锁。
#[derive(Clone)]
pub struct ProxyService {
    credentials: CredentialProvider,
    table: Arc<PrefixTable>,
}

impl ProxyService {
    /// 创建代理服务
    #[must_use]
    pub const fn new(credentials: CredentialProvider, table: Arc<PrefixTable>) -> Self {
        Self { credentials, table }
    }

    /// 获取令牌并计算改写决策，结果写入上下文
    async fn prepare(&self, path: &str, ctx: &mut RequestContext) -> crate::error::Result<()> {
        let credential = self.credentials.fetch_credential().await?;
        let target = UpstreamTarget::from_endpoint(credential.endpoint())?;
        let upstream_addr = target.resolve().await?;

        ldebug!(
            ctx.request_id,
            LogStage::Credential,
            LogComponent::CredentialProvider,
            "credential_fetched",
            "已获取授权令牌",
            endpoint = %credential.endpoint(),
            upstream_addr = %upstream_addr
        );

        let decision = rewrite::decide(path, &self.table);
        if !decision.should_rewrite && self.table.default_prefix().is_none() {
            lwarn!(
                ctx.request_id,
                LogStage::Rewrite,
                LogComponent::PathRewriter,
                "default_rule_missing",
                "没有默认镜像规则，路径原样透传",
                default_upstream = %self.table.default_upstream()
            );
        }

        ctx.decision = Some(decision);
        ctx.credential = Some(credential);
        ctx.target = Some(target);
        ctx.upstream_addr = Some(upstream_addr);
        Ok(())
    }
}

#[async_trait]
impl ProxyHttp for ProxyService {
    type CTX = RequestContext;

    fn new_ctx(&self) -> Self::CTX {
        RequestContext::new()
    }

    async fn request_filter(
        &self,
        session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> pingora_core::Result<bool> {
        let path = session.req_header().uri.path().to_string();
        ctx.original_path.clone_from(&path);

        ldebug!(
            ctx.request_id,
            LogStage::RequestStart,
            LogComponent::ProxyService,
            "request_received",
            "收到镜像拉取请求",
            method = %session.req_header().method,
            path = %path
        );

        match self.prepare(&path, ctx).await {
            Ok(()) => Ok(false),
            Err(e) => {
                lerror!(
                    ctx.request_id,
                    LogStage::Credential,
                    LogComponent::ProxyService,
                    "prepare_failed",
                    "请求准备失败",
                    error = %e
                );
                Err(to_pingora_error(&e))
            }
        }
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> pingora_core::Result<Box<HttpPeer>> {
        match (ctx.target.as_ref(), ctx.upstream_addr) {
            (Some(target), Some(addr)) => Ok(Box::new(target.peer(addr))),
            _ => Err(Error::explain(
                ErrorType::InternalError,
                "upstream target missing from request context",
            )),
        }
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut RequestHeader,
        ctx: &mut Self::CTX,
    ) -> pingora_core::Result<()> {
        rewrite_request(upstream_request, ctx).map_err(|e| to_pingora_error(&e))
    }

    async fn response_filter(
        &self,
        _session: &mut Session,
        upstream_response: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> pingora_core::Result<()> {
        observe_response(upstream_response, ctx);
        Ok(())
    }

    fn fail_to_connect(
        &self,
        _session: &mut Session,
        peer: &HttpPeer,
        ctx: &mut Self::CTX,
        mut e: Box<Error>,
    ) -> Box<Error> {
        lwarn!(
            ctx.request_id,
            LogStage::Upstream,
            LogComponent::Forwarder,
            "connect_failed",
            "连接上游失败",
            peer = %peer,
            error = %e
        );
        e.set_retry(false);
        e
    }

    async fn fail_to_proxy(
        &self,
        session: &mut Session,
        e: &Error,
        ctx: &mut Self::CTX,
    ) -> FailToProxy {
        let code = error_status(e);

        if code > 0 && session.response_written().is_none() {
            let message = e
                .context
                .as_ref()
                .map_or_else(|| e.etype().as_str().to_string(), ToString::to_string);
            if let Err(write_err) = write_text_error(session, code, &message).await {
                lwarn!(
                    ctx.request_id,
                    LogStage::Error,
                    LogComponent::ProxyService,
                    "write_error_response_failed",
                    "写出错误响应失败",
                    error = %write_err
                );
            }
        }

        FailToProxy {
            error_code: code,
            can_reuse_downstream: false,
        }
    }

    async fn logging(&self, session: &mut Session, e: Option<&Error>, ctx: &mut Self::CTX) {
        let duration = ctx.start_time.elapsed();
        let status = session
            .response_written()
            .map_or(0, |resp| resp.status.as_u16());

        if let Some(error) = e {
            lerror!(
                ctx.request_id,
                LogStage::Error,
                LogComponent::ProxyService,
                "request_failed",
                "代理请求失败",
                original_path = %ctx.original_path,
                rewritten_path = %ctx.rewritten_path(),
                status = status,
                error = %error,
                duration_ms = duration.as_millis()
            );
        } else {
            linfo!(
                ctx.request_id,
                LogStage::Response,
                LogComponent::ProxyService,
                "request_completed",
                "代理请求完成",
                original_path = %ctx.original_path,
                rewritten_path = %ctx.rewritten_path(),
                status = status,
                duration_ms = duration.as_millis()
            );
        }
    }
}
