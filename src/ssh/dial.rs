// 建立底层连接：直连或经由代理会话
use crate::ssh::tunnel::Tunnel;
use crate::utils::error::{Hop, TransferError};
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// A raw byte stream to an SSH server, ready for a handshake.
pub struct Conduit {
    pub stream: TcpStream,
    /// Where the bytes really come from, for diagnostics.
    pub peer: String,
    /// Present when the stream is relayed through a proxy session. It has to
    /// outlive the SSH session running over `stream`.
    pub tunnel: Option<Tunnel>,
}

/// Opens raw connections to `host:port`.
///
/// Implemented by [`DirectDialer`] for plain TCP and by an authenticated
/// [`SshClient`](crate::ssh::SshClient), which relays the connection from the
/// proxy's side of the network.
pub trait Dialer {
    fn dial(
        &self,
        hop: Hop,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Conduit, TransferError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DirectDialer;

impl Dialer for DirectDialer {
    fn dial(
        &self,
        hop: Hop,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Conduit, TransferError> {
        let addr = format!("{}:{}", host, port);
        log::debug!("Dialing {} {}", hop, addr);

        let stream = connect_tcp(host, port, timeout).map_err(|source| TransferError::Connect {
            hop,
            addr: addr.clone(),
            source,
        })?;
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| addr.clone());

        Ok(Conduit {
            stream,
            peer,
            tunnel: None,
        })
    }
}

fn connect_tcp(host: &str, port: u16, timeout: Option<Duration>) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("no addresses found for {}", host))
    }))
}
