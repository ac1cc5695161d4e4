/// WireBus - 公共库
/// 
/// 提供 Client 和 Hub 共享的帧格式、错误处理、工具函数等

pub mod errors;
pub mod models;
pub mod utils;
pub mod wire;

// 重新导出常用类型
pub use errors::{Error, Result};
pub use wire::{Delimiter, FrameCodec, Payload, WireError, WireErrorCode, WireMessage};
