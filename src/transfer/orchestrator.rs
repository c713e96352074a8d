// 按顺序逐个传输文件，遇到第一个错误即中止
use crate::config::{Direction, TransferRequest};
use crate::transfer::scp::FileCopier;
use crate::utils::error::TransferError;
use crate::utils::file::destination_for;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferResult {
    pub count: u64,
}

pub struct Orchestrator<'a, C: FileCopier + ?Sized> {
    copier: &'a C,
    cancel: Option<&'a AtomicBool>,
    state: TransferState,
    transferred: u64,
}

impl<'a, C: FileCopier + ?Sized> Orchestrator<'a, C> {
    pub fn new(copier: &'a C) -> Self {
        Self {
            copier,
            cancel: None,
            state: TransferState::Idle,
            transferred: 0,
        }
    }

    /// Stops the run before the next file once `cancel` is set.
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn run(&mut self, request: &TransferRequest) -> Result<TransferResult, TransferError> {
        self.state = TransferState::Running;
        match request.direction {
            Direction::Upload => log::info!("🔼 Uploading ..."),
            Direction::Download => log::info!("🔽 Downloading ..."),
        }

        for source in &request.sources {
            if self.cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                self.state = TransferState::Aborted;
                log::warn!("Cancelled before {}", source);
                return Err(TransferError::Cancelled {
                    transferred: self.transferred,
                });
            }
            let destination = destination_for(source, &request.destination);
            let copied = match request.direction {
                Direction::Upload => self.copier.copy_to(source, &destination),
                Direction::Download => self.copier.copy_from(source, &destination),
            };

            match copied {
                Ok(bytes) => {
                    self.transferred += 1;
                    log::info!("{} >> {}", source, destination);
                    log::debug!("{} bytes written to {}", bytes, destination);
                }
                Err(source_err) => {
                    self.state = TransferState::Aborted;
                    return Err(TransferError::Transfer {
                        direction: request.direction,
                        path: source.clone(),
                        transferred: self.transferred,
                        source: source_err,
                    });
                }
            }
        }

        self.state = TransferState::Completed;
        Ok(TransferResult {
            count: self.transferred,
        })
    }
}

/// Copies every source of `request` through `copier`, in order.
pub fn run<C: FileCopier + ?Sized>(
    copier: &C,
    request: &TransferRequest,
) -> Result<TransferResult, TransferError> {
    Orchestrator::new(copier).run(request)
}
