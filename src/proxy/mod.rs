//! # Pingora 代理服务模块
//!
//! 凭据注入、路径改写后转发到 ECR pull-through cache

pub mod context;
pub mod forwarder;
pub mod response;
pub mod server;
pub mod service;

pub use context::RequestContext;
pub use forwarder::{UpstreamTarget, observe_response, rewrite_request};
pub use server::RequestServer;
pub use service::ProxyService;
