#![allow(dead_code)]

use scp_jump::config::Endpoint;
use scp_jump::ssh::credential::PrivateKey;
use scp_jump::ssh::{Conduit, Dialer, DirectDialer};
use scp_jump::utils::error::{Hop, TransferError};
use ssh_key::rand_core::OsRng;
use ssh_key::{Algorithm, LineEnding};
use std::io::Write;
use std::net::TcpListener;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

pub fn endpoint(host: &str, port: u16, fingerprint: &str) -> Endpoint {
    let pem = ssh_key::PrivateKey::random(&mut OsRng, Algorithm::Ed25519)
        .unwrap()
        .to_openssh(LineEnding::LF)
        .unwrap();
    Endpoint {
        host: host.to_string(),
        port,
        username: "deploy".to_string(),
        key: PrivateKey::parse(&pem).unwrap(),
        fingerprint: fingerprint.to_string(),
    }
}

/// A port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Accepts connections, answers with something that is not SSH and hangs up.
pub fn not_ssh_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for mut stream in listener.incoming().flatten() {
            let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n");
        }
    });
    port
}

/// Accepts connections and never says a word, like a host behind a
/// blackholing firewall that still completes the TCP handshake.
pub fn silent_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    port
}

/// Dials directly, remembering every address it was asked for.
#[derive(Default)]
pub struct RecordingDialer {
    pub calls: Mutex<Vec<(Hop, String)>>,
}

impl RecordingDialer {
    pub fn calls(&self) -> Vec<(Hop, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Dialer for RecordingDialer {
    fn dial(
        &self,
        hop: Hop,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Conduit, TransferError> {
        self.calls.lock().unwrap().push((hop, format!("{}:{}", host, port)));
        DirectDialer.dial(hop, host, port, timeout)
    }
}
