// 传输模块入口
pub mod orchestrator;
pub mod progress;
pub mod scp;

pub use orchestrator::{run, Orchestrator, TransferResult, TransferState};
pub use scp::FileCopier;
