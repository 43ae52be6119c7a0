//! # AWS Image Proxy Library
//!
//! 运行在本机回环地址上的 ECR pull-through cache 凭据代理核心库

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod registry;
pub mod rewrite;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{ProxyError, Result};
