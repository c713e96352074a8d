// SSH会话管理：直连或经由跳板机
use crate::config::Endpoint;
use crate::ssh::client::{ClientConfig, SshClient};
use crate::ssh::dial::{DirectDialer, Dialer};
use crate::utils::error::{Hop, TransferError};
use std::time::Duration;

/// The session files are transferred over, plus the proxy session carrying
/// it when a jump host is used.
pub struct SshSession {
    // 字段按声明顺序释放：先关闭目标会话，再关闭代理
    target: SshClient,
    proxy: Option<SshClient>,
}

impl SshSession {
    pub fn connect(
        target: &Endpoint,
        proxy: Option<&Endpoint>,
        dial_timeout: Option<Duration>,
    ) -> Result<Self, TransferError> {
        Self::connect_with(&DirectDialer, target, proxy, dial_timeout)
    }

    /// Like [`connect`](Self::connect), with `dialer` opening the first hop.
    /// When a proxy is given, the target is only ever reached through the
    /// authenticated proxy session.
    pub fn connect_with(
        dialer: &dyn Dialer,
        target: &Endpoint,
        proxy: Option<&Endpoint>,
        dial_timeout: Option<Duration>,
    ) -> Result<Self, TransferError> {
        let Some(proxy) = proxy else {
            log::info!("Connecting to {}", target.address());
            let target = connect_target(dialer, target, dial_timeout)?;
            return Ok(SshSession { target, proxy: None });
        };

        log::info!("Connecting to {} via proxy {}", target.address(), proxy.address());
        let proxy_config = ClientConfig::for_endpoint(Hop::Proxy, proxy, dial_timeout);
        let conduit = dialer.dial(Hop::Proxy, &proxy.host, proxy.port, dial_timeout)?;
        let proxy_client = SshClient::handshake(conduit, &proxy.host, &proxy_config)?;

        let target = connect_target(&proxy_client, target, dial_timeout)?;

        Ok(SshSession {
            target,
            proxy: Some(proxy_client),
        })
    }

    pub fn client(&self) -> &SshClient {
        &self.target
    }

    pub fn is_proxied(&self) -> bool {
        self.proxy.is_some()
    }
}

// 通过 `via` 打开到目标的连接并完成握手
fn connect_target(
    via: &dyn Dialer,
    target: &Endpoint,
    dial_timeout: Option<Duration>,
) -> Result<SshClient, TransferError> {
    let config = ClientConfig::for_endpoint(Hop::Target, target, dial_timeout);
    let conduit = via.dial(Hop::Target, &target.host, target.port, dial_timeout)?;
    SshClient::handshake(conduit, &target.host, &config)
}
