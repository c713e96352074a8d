// 工具模块
pub mod error;
pub mod file;
