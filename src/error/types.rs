//! # 错误类型定义

use http::StatusCode;
use thiserror::Error;

use super::ErrorCategory;

/// 应用主要错误类型
#[derive(Debug, Error)]
pub enum ProxyError {
    /// 配置相关错误（无法确定端口、区域或 AWS 凭据）
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// ECR 控制面调用失败
    #[error("控制面查询失败: {message}")]
    UpstreamQuery {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 过滤后没有任何 pull-through cache 规则
    #[error("未找到匹配前缀 '{prefix_filter}' 的 pull-through cache 规则")]
    NoRulesFound { prefix_filter: String },

    /// 授权令牌响应中没有可用条目
    #[error("未返回授权数据: {message}")]
    NoAuthData { message: String },

    /// 上游连接或传输失败
    #[error("网关错误: {message}")]
    BadGateway {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 服务器初始化错误
    #[error("服务器初始化错误: {message}")]
    ServerInit {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 系统内部错误
    #[error("内部错误: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// IO相关错误
    #[error("IO错误: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// 附加了上下文的错误
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ProxyError>,
    },
}

impl ProxyError {
    /// 将错误转换为HTTP状态码和错误代码
    #[must_use]
    pub fn to_http_response_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Config { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Self::UpstreamQuery { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_QUERY_ERROR"),
            Self::NoRulesFound { .. } => (StatusCode::BAD_GATEWAY, "NO_RULES_FOUND"),
            Self::NoAuthData { .. } => (StatusCode::BAD_GATEWAY, "NO_AUTH_DATA"),
            Self::BadGateway { .. } => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY_ERROR"),
            Self::ServerInit { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_INIT_ERROR"),
            Self::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Self::Context { source, .. } => source.to_http_response_parts(),
        }
    }

    /// 返回给本地调用方的状态码
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.to_http_response_parts().0
    }

    /// 错误分类
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. } | Self::ServerInit { .. } | Self::Io { .. } => {
                ErrorCategory::Startup
            }
            Self::Context { source, .. } => source.category(),
            _ => ErrorCategory::Request,
        }
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建控制面查询错误
    pub fn upstream_query<T: Into<String>>(message: T) -> Self {
        Self::UpstreamQuery {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的控制面查询错误
    pub fn upstream_query_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::UpstreamQuery {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建规则缺失错误
    pub fn no_rules_found<T: Into<String>>(prefix_filter: T) -> Self {
        Self::NoRulesFound {
            prefix_filter: prefix_filter.into(),
        }
    }

    /// 创建授权数据缺失错误
    pub fn no_auth_data<T: Into<String>>(message: T) -> Self {
        Self::NoAuthData {
            message: message.into(),
        }
    }

    /// 创建网关错误
    pub fn bad_gateway<T: Into<String>>(message: T) -> Self {
        Self::BadGateway {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的网关错误
    pub fn bad_gateway_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::BadGateway {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建带来源的服务器初始化错误
    pub fn server_init_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::ServerInit {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建内部错误
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "文件操作失败".to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for ProxyError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML解析失败", err)
    }
}

impl From<url::ParseError> for ProxyError {
    fn from(err: url::ParseError) -> Self {
        Self::config_with_source("URL解析失败", err)
    }
}
