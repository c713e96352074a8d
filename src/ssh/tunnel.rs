//! Relays a `direct-tcpip` channel of the proxy session onto a loopback
//! socket.
//!
//! libssh2 can only run a session over a real socket, so the target session
//! gets one end of a loopback TCP pair while a pump thread copies bytes
//! between the other end and the proxy channel. The proxy session is switched
//! to non-blocking mode and is used by nothing but the pump from then on.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const BUFFER_SIZE: usize = 32 * 1024;
const IDLE_SLEEP: Duration = Duration::from_millis(1);

pub struct Tunnel {
    stop: Arc<AtomicBool>,
    pump: Option<thread::JoinHandle<()>>,
}

/// The far side of the relay.
pub(crate) trait RemoteEnd: Read + Write + Send + 'static {
    /// Whether a zero-length read means the peer is done sending.
    fn at_eof(&self) -> bool;
    fn close(&mut self);
}

impl RemoteEnd for ssh2::Channel {
    fn at_eof(&self) -> bool {
        self.eof()
    }

    fn close(&mut self) {
        let _ = ssh2::Channel::close(self);
    }
}

impl Tunnel {
    /// Starts relaying `channel`. Returns the socket end the target session
    /// should read from and write to.
    pub fn start(
        session: ssh2::Session,
        channel: ssh2::Channel,
    ) -> io::Result<(TcpStream, Tunnel)> {
        Self::spawn(channel, move |blocking| session.set_blocking(blocking))
    }

    /// `set_blocking(false)` is called on the pump thread before relaying
    /// starts and `set_blocking(true)` after it stops.
    pub(crate) fn spawn<R, F>(remote: R, set_blocking: F) -> io::Result<(TcpStream, Tunnel)>
    where
        R: RemoteEnd,
        F: Fn(bool) + Send + 'static,
    {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        let outer = TcpStream::connect(listener.local_addr()?)?;
        let (inner, _) = listener.accept()?;
        outer.set_nodelay(true)?;
        inner.set_nodelay(true)?;
        inner.set_nonblocking(true)?;

        let stop = Arc::new(AtomicBool::new(false));
        let pump = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("ssh-tunnel".into())
                .spawn(move || {
                    set_blocking(false);
                    if let Err(e) = pump(remote, inner, &stop) {
                        log::debug!("Tunnel closed: {}", e);
                    }
                    set_blocking(true);
                })?
        };

        Ok((
            outer,
            Tunnel {
                stop,
                pump: Some(pump),
            },
        ))
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.pump.as_ref().is_some_and(|pump| !pump.is_finished())
    }
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

fn would_block(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted)
}

// 双向转发，直到任一方向结束或收到停止信号
fn pump<R: RemoteEnd>(mut channel: R, mut local: TcpStream, stop: &AtomicBool) -> io::Result<()> {
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut to_remote: Vec<u8> = Vec::new();
    let mut to_local: Vec<u8> = Vec::new();
    let mut local_eof = false;
    let mut remote_eof = false;

    let result = loop {
        if stop.load(Ordering::Relaxed) {
            break Ok(());
        }
        let mut progressed = false;

        if to_remote.is_empty() && !local_eof {
            match local.read(&mut buf) {
                Ok(0) => local_eof = true,
                Ok(n) => {
                    to_remote.extend_from_slice(&buf[..n]);
                    progressed = true;
                }
                Err(e) if would_block(&e) => {}
                Err(e) => break Err(e),
            }
        }
        if !to_remote.is_empty() {
            match channel.write(&to_remote) {
                Ok(n) => {
                    to_remote.drain(..n);
                    progressed |= n > 0;
                }
                Err(e) if would_block(&e) => {}
                Err(e) => break Err(e),
            }
        }

        if to_local.is_empty() && !remote_eof {
            match channel.read(&mut buf) {
                Ok(0) => remote_eof = channel.at_eof(),
                Ok(n) => {
                    to_local.extend_from_slice(&buf[..n]);
                    progressed = true;
                }
                Err(e) if would_block(&e) => {}
                Err(e) => break Err(e),
            }
        }
        if !to_local.is_empty() {
            match local.write(&to_local) {
                Ok(n) => {
                    to_local.drain(..n);
                    progressed |= n > 0;
                }
                Err(e) if would_block(&e) => {}
                Err(e) => break Err(e),
            }
        }

        if (local_eof && to_remote.is_empty()) || (remote_eof && to_local.is_empty()) {
            break Ok(());
        }
        if !progressed {
            thread::sleep(IDLE_SLEEP);
        }
    };

    let _ = local.shutdown(std::net::Shutdown::Both);
    channel.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Shutdown;
    use std::time::Instant;

    impl RemoteEnd for TcpStream {
        fn at_eof(&self) -> bool {
            true
        }

        fn close(&mut self) {
            let _ = self.shutdown(Shutdown::Both);
        }
    }

    // 用一对本地 TCP 连接代替 SSH 通道
    fn relay() -> (TcpStream, TcpStream, Tunnel) {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let remote = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (far, _) = listener.accept().unwrap();
        remote.set_nonblocking(true).unwrap();
        let (local, tunnel) = Tunnel::spawn(remote, |_| {}).unwrap();
        (local, far, tunnel)
    }

    fn payload() -> Vec<u8> {
        (0..BUFFER_SIZE * 4 + 17).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn relays_large_payload_towards_remote() {
        let (mut local, mut far, _tunnel) = relay();
        let data = payload();

        let writer = {
            let data = data.clone();
            thread::spawn(move || local.write_all(&data).map(|_| local))
        };
        let mut received = vec![0u8; data.len()];
        far.read_exact(&mut received).unwrap();
        let _local = writer.join().unwrap().unwrap();

        assert_eq!(received, data);
    }

    #[test]
    fn relays_large_payload_towards_local() {
        let (mut local, mut far, _tunnel) = relay();
        let data = payload();

        let writer = {
            let data = data.clone();
            thread::spawn(move || far.write_all(&data).map(|_| far))
        };
        let mut received = vec![0u8; data.len()];
        local.read_exact(&mut received).unwrap();
        let _far = writer.join().unwrap().unwrap();

        assert_eq!(received, data);
    }

    #[test]
    fn local_eof_ends_the_pump() {
        let (mut local, mut far, tunnel) = relay();
        local.write_all(b"last words").unwrap();
        local.shutdown(Shutdown::Write).unwrap();

        // 远端在数据之后看到连接关闭
        let mut received = Vec::new();
        far.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"last words");

        let started = Instant::now();
        while tunnel.is_running() && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!tunnel.is_running());
    }

    #[test]
    fn remote_eof_closes_the_local_socket() {
        let (mut local, far, _tunnel) = relay();
        far.shutdown(Shutdown::Write).unwrap();

        let mut received = Vec::new();
        local.read_to_end(&mut received).unwrap();
        assert!(received.is_empty());
    }

    #[test]
    fn drop_stops_and_joins_the_pump() {
        let (_local, _far, tunnel) = relay();
        assert!(tunnel.is_running());

        let started = Instant::now();
        drop(tunnel);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
