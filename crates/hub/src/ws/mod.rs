/// WebSocket 模块
/// 
/// 管理客户端连接，并在同一个应用房间内转发帧

pub mod handler;
pub mod manager;

pub use handler::{handle_app_websocket, handle_root_websocket};
pub use manager::{HubManager, PeerConnection};
