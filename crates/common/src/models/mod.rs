/// 共享数据模型
/// 
/// 定义 Client 和 Hub 共享的数据结构

use serde::{Deserialize, Serialize};
use std::fmt;

/// 连接状态
///
/// 生命周期只向前推进：Idle -> Connecting -> Open -> Closed，关闭后不可复用
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 常量定义
pub mod constants {
    /// 默认 Hub 端口
    pub const DEFAULT_HUB_PORT: u16 = 3000;

    /// 默认页面地址（用于推导 WebSocket 目标）
    pub const DEFAULT_PAGE_URL: &str = "http://localhost:3000/console";

    /// 默认连接超时（秒）
    pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;
}
