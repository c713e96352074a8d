// 库文件，导出模块
pub mod cli;
pub mod config;
pub mod ssh;
pub mod transfer;
pub mod utils;
pub mod watchdog;

use config::Config;
use ssh::SshSession;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use transfer::{Orchestrator, TransferResult};
use utils::error::TransferError;
use watchdog::Watchdog;

/// Connects (through the proxy when configured) and copies every source.
/// Blocks the calling thread; both sessions are closed before it returns.
/// No further file is started once `cancel` is set.
pub fn run_transfer(config: &Config, cancel: &AtomicBool) -> Result<TransferResult, TransferError> {
    let session = SshSession::connect(&config.target, config.proxy.as_ref(), config.dial_timeout)?;
    log::debug!(
        "Session to {} ready ({})",
        config.target.address(),
        if session.is_proxied() { "via proxy" } else { "direct" }
    );
    Orchestrator::new(session.client())
        .with_cancel(cancel)
        .run(&config.request)
}

/// Runs [`run_transfer`] on a blocking thread under the action deadline.
///
/// On [`TransferError::DeadlineExceeded`] the worker is told to stop before
/// its next file, but a dial or copy already in progress keeps its thread
/// busy until it returns on its own. Callers that need it gone must exit the
/// process.
pub async fn run(config: Config) -> Result<TransferResult, TransferError> {
    let cancel = Arc::new(AtomicBool::new(false));
    let watchdog = Watchdog::arm(config.action_timeout);
    let worker = {
        let cancel = Arc::clone(&cancel);
        tokio::task::spawn_blocking(move || run_transfer(&config, &cancel))
    };
    let result = watchdog
        .guard(async move { worker.await.map_err(|_| TransferError::ThreadJoinError)? })
        .await;
    cancel.store(true, Ordering::SeqCst);
    result
}
