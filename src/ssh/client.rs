// SSH客户端封装
use crate::config::Endpoint;
use crate::ssh::credential::PrivateKey;
use crate::ssh::dial::{Conduit, Dialer};
use crate::ssh::tunnel::Tunnel;
use crate::ssh::verify::{verify_fingerprint, HostKeyCallback};
use crate::utils::error::{Hop, TransferError};
use ssh2::Session;
use std::io;
use std::time::Duration;

/// Everything needed to authenticate to one endpoint.
pub struct ClientConfig {
    pub hop: Hop,
    pub username: String,
    pub key: PrivateKey,
    pub host_key_callback: HostKeyCallback,
    /// Bounds every blocking libssh2 call during handshake and authentication.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn for_endpoint(hop: Hop, endpoint: &Endpoint, timeout: Option<Duration>) -> Self {
        Self {
            hop,
            username: endpoint.username.clone(),
            key: endpoint.key.clone(),
            host_key_callback: verify_fingerprint(endpoint.fingerprint.clone()),
            timeout,
        }
    }
}

/// An authenticated SSH session. Dropping it disconnects.
pub struct SshClient {
    hop: Hop,
    session: Session,
    // 经由代理时，隧道必须在会话之后释放
    _tunnel: Option<Tunnel>,
}

impl SshClient {
    /// Runs the SSH handshake over `conduit`, pins the host key and
    /// authenticates with the configured private key. The host key is checked
    /// before any credential is sent.
    pub fn handshake(
        conduit: Conduit,
        host: &str,
        config: &ClientConfig,
    ) -> Result<Self, TransferError> {
        let hop = config.hop;
        let Conduit { stream, peer, tunnel } = conduit;

        let mut session =
            Session::new().map_err(|source| TransferError::Handshake { hop, source })?;
        session.set_timeout(timeout_millis(config.timeout));
        session.set_tcp_stream(stream);
        session
            .handshake()
            .map_err(|source| TransferError::Handshake { hop, source })?;

        check_host_key(config, host, &peer, session.host_key().map(|(key, _)| key))?;

        session
            .userauth_pubkey_memory(&config.username, None, config.key.pem(), None)
            .map_err(|source| TransferError::Authentication {
                hop,
                user: config.username.clone(),
                source,
            })?;
        if !session.authenticated() {
            return Err(TransferError::Authentication {
                hop,
                user: config.username.clone(),
                source: ssh2::Error::new(
                    ssh2::ErrorCode::Session(-18),
                    "server did not accept the public key",
                ),
            });
        }
        session.set_timeout(0);

        log::info!("Authenticated to {} {} as {}", hop, host, config.username);
        Ok(SshClient {
            hop,
            session,
            _tunnel: tunnel,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl Dialer for SshClient {
    /// Asks this session's server to connect to `host:port` and relays that
    /// connection locally. Nothing is dialed from this machine.
    fn dial(
        &self,
        hop: Hop,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Conduit, TransferError> {
        let addr = format!("{}:{}", host, port);
        log::debug!("Opening tunnel to {} {} through {}", hop, addr, self.hop);

        self.session.set_timeout(timeout_millis(timeout));
        let channel = self
            .session
            .channel_direct_tcpip(host, port, None)
            .map_err(|e| TransferError::Tunnel {
                addr: addr.clone(),
                source: io::Error::from(e),
            })?;
        self.session.set_timeout(0);

        let (stream, tunnel) = Tunnel::start(self.session.clone(), channel)
            .map_err(|source| TransferError::Tunnel { addr: addr.clone(), source })?;

        Ok(Conduit {
            stream,
            peer: format!("{} via {}", addr, self.hop),
            tunnel: Some(tunnel),
        })
    }
}

impl Drop for SshClient {
    fn drop(&mut self) {
        self.session.set_blocking(true);
        self.session.set_timeout(5_000);
        if let Err(e) = self.session.disconnect(None, "transfer finished", None) {
            log::debug!("Disconnect from {} failed: {}", self.hop, e);
        }
        log::debug!("Closed {} session", self.hop);
    }
}

// 在发送任何凭据之前校验主机密钥
fn check_host_key(
    config: &ClientConfig,
    host: &str,
    peer: &str,
    host_key: Option<&[u8]>,
) -> Result<(), TransferError> {
    let hop = config.hop;
    let host_key = host_key.ok_or(TransferError::MissingHostKey { hop })?;
    (config.host_key_callback)(host, peer, host_key).map_err(|source| TransferError::Identity {
        hop,
        host: host.to_string(),
        source,
    })?;
    log::debug!("{} host key verified for {} ({})", hop, host, peer);
    Ok(())
}

fn timeout_millis(timeout: Option<Duration>) -> u32 {
    timeout
        .map(|t| u32::try_from(t.as_millis()).unwrap_or(u32::MAX).max(1))
        .unwrap_or(0)
}
