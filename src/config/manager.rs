//! # 配置管理器
//!
//! 依次合并：默认值 → TOML 配置文件 → 环境变量覆盖

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use super::AppConfig;
use crate::error::{ProxyError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{linfo, lwarn};

/// 环境变量前缀，例如 `AWS_IMAGE_PROXY_SERVER_PORT` -> `server.port`
pub const ENV_PREFIX: &str = "AWS_IMAGE_PROXY_";

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "AWS_IMAGE_PROXY_CONFIG";

/// 配置管理器
///
/// 加载发生在日志初始化之前，加载过程只记录结果，由 [`ConfigManager::log_summary`] 统一输出。
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: AppConfig,
    config_file: Option<PathBuf>,
    applied_overrides: usize,
    ignored_overrides: Vec<String>,
}

impl ConfigManager {
    /// 加载配置；`config_path` 为空时回退到 `AWS_IMAGE_PROXY_CONFIG`，都没有则只用默认值
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = config_path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match &config_file {
            Some(path) => Self::load_config_file(path)?,
            None => AppConfig::default(),
        };

        let overrides = Self::build_env_overrides(env::vars());
        let ignored_overrides = Self::apply_env_overrides(&mut config, &overrides)?;

        Ok(Self {
            config,
            config_file,
            applied_overrides: overrides.len() - ignored_overrides.len(),
            ignored_overrides,
        })
    }

    /// 当前配置
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 取出配置，用于后续的命令行覆盖
    #[must_use]
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// 日志初始化后输出加载结果
    pub fn log_summary(&self) {
        for path in &self.ignored_overrides {
            lwarn!(
                "system",
                LogStage::Configuration,
                LogComponent::Config,
                "unknown_env_override",
                "未知的配置路径，忽略环境变量覆盖",
                path = %path
            );
        }
        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "config_loaded",
            "配置加载完成",
            config_file = ?self.config_file,
            env_overrides = self.applied_overrides
        );
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(ProxyError::config(format!("配置文件不存在: {}", path.display())));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config_with_source(format!("读取配置文件失败: {}", path.display()), e)
        })?;

        toml::from_str(&content).map_err(|e| {
            ProxyError::config_with_source(format!("TOML解析失败 - 配置文件: {}", path.display()), e)
        })
    }

    /// 构建环境变量覆盖映射
    pub(crate) fn build_env_overrides<I>(vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter(|(key, _)| key != CONFIG_PATH_ENV)
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|rest| (rest.to_lowercase().replace('_', "."), value))
            })
            .collect()
    }

    /// 应用环境变量覆盖，返回无法识别的配置路径
    pub(crate) fn apply_env_overrides(
        config: &mut AppConfig,
        overrides: &HashMap<String, String>,
    ) -> Result<Vec<String>> {
        let mut ignored = Vec::new();
        for (path, value) in overrides {
            if !Self::apply_override_to_config(config, path, value)? {
                ignored.push(path.clone());
            }
        }
        ignored.sort();
        Ok(ignored)
    }

    /// 将单个覆盖写入配置对象；路径未知时返回 `false`
    fn apply_override_to_config(config: &mut AppConfig, path: &str, value: &str) -> Result<bool> {
        let parts: Vec<&str> = path.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => config.server.host = value.to_string(),
            ["server", "port"] => {
                config.server.port = value.parse().map_err(|e| {
                    ProxyError::config_with_source(format!("无效的端口号: {value}"), e)
                })?;
            }
            ["server", "workers"] => {
                config.server.workers = value.parse().map_err(|e| {
                    ProxyError::config_with_source(format!("无效的工作线程数: {value}"), e)
                })?;
            }
            ["registry", "prefix", "filter"] | ["registry", "prefixfilter"] => {
                config.registry.prefix_filter = value.to_string();
            }
            ["registry", "default", "upstream"] | ["registry", "defaultupstream"] => {
                config.registry.default_upstream = value.to_string();
            }
            ["registry", "region"] => config.registry.region = Some(value.to_string()),
            ["registry", "endpoint", "url"] | ["registry", "endpointurl"] => {
                config.registry.endpoint_url = Some(value.to_string());
            }
            ["logging", "level"] => config.logging.level = value.to_string(),
            _ => return Ok(false),
        }

        Ok(true)
    }
}
