/// WireBus - 客户端
/// 
/// 在一条 WebSocket 上收发带名称的消息：结构化数据走 JSON 文本帧，二进制数据走带名称头的二进制帧

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod target;
pub mod transport;

pub use config::Config;
pub use connection::{Connection, ConnectionStats, Emitter};
pub use dispatch::{Dispatch, DispatchRegistry, Handler};
pub use target::Target;
pub use transport::MessageTransport;

// 重新导出协议类型
pub use common::models::ConnectionState;
pub use common::wire::{CloseInfo, CLOSE_EVENT};
pub use common::{Delimiter, FrameCodec, Payload, WireError, WireErrorCode, WireMessage};
