// SSH模块入口
pub mod client;
pub mod credential;
pub mod dial;
pub mod session;
pub mod tunnel;
pub mod verify;

pub use client::{ClientConfig, SshClient};
pub use dial::{Conduit, Dialer, DirectDialer};
pub use session::SshSession;
pub use verify::{fingerprint_sha256, verify_fingerprint, FingerprintMismatch, HostKeyCallback};
