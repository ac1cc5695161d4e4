/// WebSocket 帧协议模块
/// 
/// 在单条 WebSocket 连接上复用带名称的消息：结构化数据走文本帧，二进制数据走带名称头的二进制帧

pub mod codec;
pub mod error;
pub mod message;
pub mod types;

pub use codec::{Delimiter, FrameCodec};
pub use error::{WireError, WireErrorCode};
pub use message::{Envelope, Payload, WireMessage};
pub use types::{CloseInfo, CLOSE_EVENT};
