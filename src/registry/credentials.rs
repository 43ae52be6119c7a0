//! # 授权令牌获取
//!
//! 每个请求都重新获取令牌，不做任何缓存

use std::sync::Arc;
use url::Url;

use super::control_plane::RegistryControlPlane;
use super::types::Credential;
use crate::error::{ProxyError, Result};

/// 授权令牌提供者
#[derive(Clone)]
pub struct CredentialProvider {
    control_plane: Arc<dyn RegistryControlPlane>,
}

impl CredentialProvider {
    /// 创建提供者
    #[must_use]
    pub fn new(control_plane: Arc<dyn RegistryControlPlane>) -> Self {
        Self { control_plane }
    }

    /// 获取一次性的令牌与注册表地址
    ///
    /// 两个值都取自第一个授权条目，不会跨条目拼凑。失败不重试。
    pub async fn fetch_credential(&self) -> Result<Credential> {
        let entries = self.control_plane.authorization_data().await?;
        let Some(entry) = entries.into_iter().next() else {
            return Err(ProxyError::no_auth_data("authorizationData 为空"));
        };

        let token = entry
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ProxyError::no_auth_data("授权条目缺少 authorizationToken"))?;
        let endpoint = entry
            .proxy_endpoint
            .ok_or_else(|| ProxyError::no_auth_data("授权条目缺少 proxyEndpoint"))?;

        let endpoint = Url::parse(&endpoint).map_err(|e| {
            ProxyError::upstream_query_with_source(format!("无法解析 proxyEndpoint: {endpoint}"), e)
        })?;

        Ok(Credential::new(token, endpoint))
    }
}
