//! # 配置管理模块
//!
//! 处理应用配置加载、环境变量覆盖和验证

mod app_config;
mod manager;

pub use app_config::{
    AppConfig, DEFAULT_PORT, DEFAULT_UPSTREAM_REGISTRY, LoggingConfig, RegistryConfig,
    ServerConfig,
};
pub use manager::{CONFIG_PATH_ENV, ConfigManager, ENV_PREFIX};
