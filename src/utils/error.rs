use crate::config::Direction;
use crate::ssh::verify::FingerprintMismatch;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which leg of the connection an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    Proxy,
    Target,
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hop::Proxy => f.write_str("proxy"),
            Hop::Target => f.write_str("target"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse {hop} key: {reason}")]
    Credential { hop: Hop, reason: String },

    #[error("Failed to connect to {hop} {addr}: {source}")]
    Connect {
        hop: Hop,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to dial to target {addr} through proxy: {source}")]
    Tunnel {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SSH handshake with {hop} failed: {source}")]
    Handshake {
        hop: Hop,
        #[source]
        source: ssh2::Error,
    },

    #[error("{hop} presented no host key")]
    MissingHostKey { hop: Hop },

    #[error("Host key verification failed for {hop} {host}: {source}")]
    Identity {
        hop: Hop,
        host: String,
        #[source]
        source: FingerprintMismatch,
    },

    #[error("Authentication to {hop} as {user} failed: {source}")]
    Authentication {
        hop: Hop,
        user: String,
        #[source]
        source: ssh2::Error,
    },

    #[error("Failed to {direction} {path} ({transferred} files transferred): {source:#}")]
    Transfer {
        direction: Direction,
        path: String,
        transferred: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("Action timed out after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Transfer cancelled after {transferred} files")]
    Cancelled { transferred: u64 },

    #[error("Thread join error")]
    ThreadJoinError,
}

impl TransferError {
    /// The hop a connection-phase error refers to, if any.
    pub fn hop(&self) -> Option<Hop> {
        match self {
            TransferError::Credential { hop, .. }
            | TransferError::Connect { hop, .. }
            | TransferError::Handshake { hop, .. }
            | TransferError::MissingHostKey { hop }
            | TransferError::Identity { hop, .. }
            | TransferError::Authentication { hop, .. } => Some(*hop),
            TransferError::Tunnel { .. } => Some(Hop::Target),
            _ => None,
        }
    }

    /// Short name of the phase that failed, used as the prefix of the final
    /// diagnostic line.
    pub fn phase(&self) -> &'static str {
        match self {
            TransferError::Config(_) => "configuration",
            TransferError::Credential { .. } => "credential",
            TransferError::Connect { .. } | TransferError::Tunnel { .. } => "connectivity",
            TransferError::Handshake { .. } | TransferError::Authentication { .. } => "handshake",
            TransferError::MissingHostKey { .. } | TransferError::Identity { .. } => "identity",
            TransferError::Transfer { .. } => "transfer",
            TransferError::DeadlineExceeded(_) | TransferError::Cancelled { .. } => "deadline",
            TransferError::ThreadJoinError => "internal",
        }
    }

    /// Files completed before a transfer failure or cancellation.
    pub fn transferred(&self) -> Option<u64> {
        match self {
            TransferError::Transfer { transferred, .. }
            | TransferError::Cancelled { transferred } => Some(*transferred),
            _ => None,
        }
    }
}
