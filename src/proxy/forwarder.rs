//! # 请求转发
//!
//! 转发本身（头部、请求体、状态行的逐字节传输）交给 Pingora 完成，
//! 这里只有两个纯函数：改写上游请求、观察上游响应。

use http::Uri;
use http::header::{AUTHORIZATION, HOST};
use std::net::SocketAddr;
use tokio::net::lookup_host;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::{Error, ErrorSource, ErrorType};
use pingora_http::{RequestHeader, ResponseHeader};
use url::Url;

use super::context::RequestContext;
use crate::error::{ProxyError, Result};
use crate::linfo;
use crate::logging::{LogComponent, LogStage};

/// 上游注册表地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// 主机名
    pub host: String,
    /// 端口
    pub port: u16,
    /// 是否使用 TLS
    pub tls: bool,
}

impl UpstreamTarget {
    /// 从 `proxyEndpoint` 解析上游地址
    pub fn from_endpoint(endpoint: &Url) -> Result<Self> {
        let tls = match endpoint.scheme() {
            "https" => true,
            "http" => false,
            other => {
                return Err(ProxyError::bad_gateway(format!(
                    "不支持的上游协议: {other}"
                )));
            }
        };
        let host = endpoint
            .host_str()
            .ok_or_else(|| ProxyError::bad_gateway(format!("上游地址缺少主机: {endpoint}")))?
            .to_string();
        let port = endpoint
            .port_or_known_default()
            .ok_or_else(|| ProxyError::bad_gateway(format!("上游地址缺少端口: {endpoint}")))?;

        Ok(Self { host, port, tls })
    }

    /// 连接地址
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `Host` 头的值；默认端口不写出
    #[must_use]
    pub fn authority(&self) -> String {
        let default_port = if self.tls { 443 } else { 80 };
        if self.port == default_port {
            self.host.clone()
        } else {
            self.address()
        }
    }

    /// 异步解析上游地址，取第一个结果
    ///
    /// 解析失败或没有结果都按网关错误处理。
    pub async fn resolve(&self) -> Result<SocketAddr> {
        let address = self.address();
        let mut addrs = lookup_host(address.as_str()).await.map_err(|e| {
            ProxyError::bad_gateway_with_source(format!("无法解析上游地址: {address}"), e)
        })?;
        addrs
            .next()
            .ok_or_else(|| ProxyError::bad_gateway(format!("上游地址没有可用的 IP: {address}")))
    }

    /// 用已解析的地址创建 Pingora 上游对等体
    #[must_use]
    pub fn peer(&self, addr: SocketAddr) -> HttpPeer {
        HttpPeer::new(addr, self.tls, self.host.clone())
    }
}

/// 改写发往上游的请求：路径、`Host`、`Authorization`
///
/// 令牌已经是最终编码形式，原样写入。查询串保持不变。
pub fn rewrite_request(req: &mut RequestHeader, ctx: &RequestContext) -> Result<()> {
    let credential = ctx
        .credential
        .as_ref()
        .ok_or_else(|| ProxyError::internal("请求上下文缺少授权信息"))?;
    let target = ctx
        .target
        .as_ref()
        .ok_or_else(|| ProxyError::internal("请求上下文缺少上游地址"))?;

    let path = ctx.rewritten_path();
    let path_and_query = match req.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let uri: Uri = path_and_query.parse().map_err(|e| {
        ProxyError::bad_gateway_with_source(format!("改写后的路径无效: {path_and_query}"), e)
    })?;
    req.set_uri(uri);

    req.insert_header(HOST, target.authority())
        .map_err(|e| ProxyError::bad_gateway_with_source("设置 Host 头失败", e))?;
    req.insert_header(AUTHORIZATION, format!("Basic {}", credential.token()))
        .map_err(|e| ProxyError::bad_gateway_with_source("设置 Authorization 头失败", e))?;

    Ok(())
}

/// 记录上游响应：原始路径、改写路径、状态码。不修改响应。
pub fn observe_response(resp: &ResponseHeader, ctx: &mut RequestContext) {
    let status = resp.status.as_u16();
    ctx.upstream_status = Some(status);

    linfo!(
        ctx.request_id,
        LogStage::Response,
        LogComponent::Forwarder,
        "upstream_response",
        "上游响应",
        original_path = %ctx.original_path,
        rewritten_path = %ctx.rewritten_path(),
        status = status
    );
}

/// Pingora 错误对应的下游状态码；0 表示客户端已断开，不再写响应
#[must_use]
pub fn error_status(e: &Error) -> u16 {
    match e.etype() {
        ErrorType::HTTPStatus(code) => *code,
        _ => match e.esource() {
            ErrorSource::Upstream => 502,
            ErrorSource::Downstream => match e.etype() {
                ErrorType::WriteError | ErrorType::ReadError | ErrorType::ConnectionClosed => 0,
                _ => 400,
            },
            ErrorSource::Internal | ErrorSource::Unset => 500,
        },
    }
}

/// 把请求级错误转换为带状态码的 Pingora 错误
#[must_use]
pub fn to_pingora_error(err: &ProxyError) -> Box<Error> {
    Error::explain(
        ErrorType::HTTPStatus(err.status_code().as_u16()),
        err.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Credential;
    use crate::rewrite::{PrefixTable, decide};
    use crate::registry::CacheRule;
    use pretty_assertions::assert_eq;

    fn context_for(path: &str, endpoint: &str) -> RequestContext {
        let table = PrefixTable::from_rules(
            vec![CacheRule::new("registry-1.docker.io", "dockerhub")],
            "registry-1.docker.io",
        );
        let endpoint = Url::parse(endpoint).unwrap();
        let mut ctx = RequestContext::new();
        ctx.original_path = path.to_string();
        ctx.decision = Some(decide(path, &table));
        ctx.target = Some(UpstreamTarget::from_endpoint(&endpoint).unwrap());
        ctx.credential = Some(Credential::new("QVdTOnRva2Vu".to_string(), endpoint));
        ctx
    }

    #[test]
    fn test_target_from_https_endpoint() {
        let url = Url::parse("https://123456789012.dkr.ecr.eu-central-1.amazonaws.com").unwrap();
        let target = UpstreamTarget::from_endpoint(&url).unwrap();
        assert_eq!(target.host, "123456789012.dkr.ecr.eu-central-1.amazonaws.com");
        assert_eq!(target.port, 443);
        assert!(target.tls);
        assert_eq!(target.authority(), "123456789012.dkr.ecr.eu-central-1.amazonaws.com");
    }

    #[test]
    fn test_target_from_http_endpoint_with_port() {
        let url = Url::parse("http://127.0.0.1:5000").unwrap();
        let target = UpstreamTarget::from_endpoint(&url).unwrap();
        assert!(!target.tls);
        assert_eq!(target.address(), "127.0.0.1:5000");
        assert_eq!(target.authority(), "127.0.0.1:5000");
    }

    #[test]
    fn test_target_rejects_unknown_scheme() {
        let url = Url::parse("ftp://example.com").unwrap();
        assert!(matches!(
            UpstreamTarget::from_endpoint(&url),
            Err(ProxyError::BadGateway { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_ip_literal_and_build_peer() {
        let url = Url::parse("http://127.0.0.1:5000").unwrap();
        let target = UpstreamTarget::from_endpoint(&url).unwrap();
        let addr = target.resolve().await.unwrap();
        assert_eq!(addr, "127.0.0.1:5000".parse::<SocketAddr>().unwrap());

        let peer = target.peer(addr);
        assert_eq!(peer.sni, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_resolve_unknown_host_is_bad_gateway() {
        let url = Url::parse("https://no-such-host.invalid").unwrap();
        let target = UpstreamTarget::from_endpoint(&url).unwrap();
        let err = target.resolve().await.unwrap_err();
        assert!(matches!(err, ProxyError::BadGateway { .. }));
        assert_eq!(err.status_code().as_u16(), 502);
    }

    #[test]
    fn test_rewrite_request_sets_path_host_and_auth() {
        let ctx = context_for(
            "/v2/library/busybox/manifests/latest",
            "https://123456789012.dkr.ecr.eu-central-1.amazonaws.com",
        );
        let mut req =
            RequestHeader::build("GET", b"/v2/library/busybox/manifests/latest", None).unwrap();
        req.insert_header("Host", "localhost:432").unwrap();

        rewrite_request(&mut req, &ctx).unwrap();

        assert_eq!(req.uri.path(), "/v2/dockerhub/library/busybox/manifests/latest");
        assert_eq!(
            req.headers.get("host").unwrap(),
            "123456789012.dkr.ecr.eu-central-1.amazonaws.com"
        );
        assert_eq!(req.headers.get("authorization").unwrap(), "Basic QVdTOnRva2Vu");
    }

    #[test]
    fn test_rewrite_request_keeps_query_and_replaces_client_auth() {
        let ctx = context_for("/v2/library/busybox/tags/list", "http://127.0.0.1:5000");
        let mut req =
            RequestHeader::build("GET", b"/v2/library/busybox/tags/list?n=10&last=1.36", None)
                .unwrap();
        req.insert_header("Authorization", "Bearer client-supplied").unwrap();

        rewrite_request(&mut req, &ctx).unwrap();

        assert_eq!(req.uri.path(), "/v2/dockerhub/library/busybox/tags/list");
        assert_eq!(req.uri.query(), Some("n=10&last=1.36"));
        assert_eq!(req.headers.get_all("authorization").iter().count(), 1);
        assert_eq!(req.headers.get("authorization").unwrap(), "Basic QVdTOnRva2Vu");
    }

    #[test]
    fn test_rewrite_request_requires_credential() {
        let mut ctx = context_for("/v2/library/busybox/tags/list", "http://127.0.0.1:5000");
        ctx.credential = None;
        let mut req = RequestHeader::build("GET", b"/v2/library/busybox/tags/list", None).unwrap();
        assert!(rewrite_request(&mut req, &ctx).is_err());
    }

    #[test]
    fn test_observe_response_records_status() {
        let mut ctx = context_for("/v2/library/busybox/tags/list", "http://127.0.0.1:5000");
        let resp = ResponseHeader::build(404, None).unwrap();
        observe_response(&resp, &mut ctx);
        assert_eq!(ctx.upstream_status, Some(404));
    }

    #[test]
    fn test_error_status_mapping() {
        let refused = Error::new_up(ErrorType::ConnectRefused);
        assert_eq!(error_status(&refused), 502);

        let explicit = Error::explain(ErrorType::HTTPStatus(502), "no auth data");
        assert_eq!(error_status(&explicit), 502);

        let gone = Error::new_down(ErrorType::ConnectionClosed);
        assert_eq!(error_status(&gone), 0);

        let internal = Error::new(ErrorType::InternalError);
        assert_eq!(error_status(&internal), 500);
    }

    #[test]
    fn test_to_pingora_error_carries_status_and_message() {
        let err = to_pingora_error(&ProxyError::no_auth_data("authorizationData 为空"));
        assert_eq!(error_status(&err), 502);
        assert!(err.context.as_ref().unwrap().to_string().contains("authorizationData"));
    }
}
