//! # Pingora 代理服务器
//!
//! 在回环地址上监听，每个连接一个协作式任务，连接之间没有共享的可变状态

use pingora_core::server::{Server, configuration::Opt};
use pingora_proxy::http_proxy_service;
use std::net::SocketAddr;

use super::service::ProxyService;
use crate::config::AppConfig;
use crate::error::{ProxyError, Result};
use crate::linfo;
use crate::logging::{LogComponent, LogStage};

/// 请求服务器
pub struct RequestServer {
    listen_addr: SocketAddr,
    workers: usize,
    service: ProxyService,
}

impl RequestServer {
    /// 根据配置创建服务器
    pub fn new(config: &AppConfig, service: ProxyService) -> Result<Self> {
        let listen_addr = config.listen_addr()?;
        if !listen_addr.ip().is_loopback() {
            return Err(ProxyError::config(format!(
                "监听地址必须是回环地址: {listen_addr}"
            )));
        }
        Ok(Self {
            listen_addr,
            workers: config.server.workers.max(1),
            service,
        })
    }

    /// 监听地址
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// 创建Pingora服务器选项（基本配置）
    fn create_pingora_options() -> Opt {
        Opt {
            daemon: false,   // 在前台运行
            upgrade: false,  // 不支持在线升级
            nocapture: true, // 不捕获标准输出/错误
            ..Opt::default()
        }
    }

    /// 组装 Pingora 服务器，但不运行
    pub fn build(self) -> Result<Server> {
        let mut server = Server::new(Some(Self::create_pingora_options())).map_err(|err| {
            ProxyError::server_init_with_source("Failed to create Pingora server", err)
        })?;
        server.bootstrap();

        let mut http_service = http_proxy_service(&server.configuration, self.service);
        http_service.threads = Some(self.workers);
        let address = self.listen_addr.to_string();
        http_service.add_tcp(&address);
        server.add_service(http_service);

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "server_built",
            "代理服务器装配完成",
            address = %address,
            workers = self.workers
        );
        Ok(server)
    }

    /// 启动服务器，直到收到退出信号
    pub async fn start(self) -> Result<()> {
        let server = self.build()?;

        let handle = tokio::task::spawn_blocking(move || {
            server.run_forever();
        });

        handle
            .await
            .map_err(|err| ProxyError::server_init_with_source("Pingora server task failed", err))
    }
}
