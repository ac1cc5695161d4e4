/// 帧协议错误定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 帧协议错误码
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WireErrorCode {
    /// 消息名为空或不合法
    InvalidName,
    /// 连接尚未建立
    NotConnected,
    ConnectionClosed,
    AlreadyOpened,
    ConnectFailed,
    InvalidTarget,
    /// 部署配置不合法
    InvalidConfig,
    /// 收到的帧无法解析
    MalformedFrame,
    SerializationError,
}

impl WireErrorCode {
    /// 转换为字符串码
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidName => "INVALID_NAME",
            Self::NotConnected => "NOT_CONNECTED",
            Self::ConnectionClosed => "CONNECTION_CLOSED",
            Self::AlreadyOpened => "ALREADY_OPENED",
            Self::ConnectFailed => "CONNECT_FAILED",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::MalformedFrame => "MALFORMED_FRAME",
            Self::SerializationError => "SERIALIZATION_ERROR",
        }
    }
}

impl fmt::Display for WireErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 帧协议错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireError {
    pub code: WireErrorCode,
    pub message: String,
}

impl WireError {
    /// 创建新的错误
    pub fn new(code: WireErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// 消息名不合法
    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::new(WireErrorCode::InvalidName, message)
    }

    /// 连接未建立
    pub fn not_connected() -> Self {
        Self::new(WireErrorCode::NotConnected, "连接尚未建立")
    }

    /// 连接已关闭
    pub fn connection_closed() -> Self {
        Self::new(WireErrorCode::ConnectionClosed, "连接已关闭")
    }

    /// 重复打开
    pub fn already_opened() -> Self {
        Self::new(WireErrorCode::AlreadyOpened, "连接已打开过，不可复用")
    }

    /// 连接失败
    pub fn connect_failed(err: impl fmt::Display) -> Self {
        Self::new(WireErrorCode::ConnectFailed, format!("连接失败: {}", err))
    }

    /// 目标地址不合法
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::new(WireErrorCode::InvalidTarget, message)
    }

    /// 配置不合法
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(WireErrorCode::InvalidConfig, message)
    }

    /// 帧格式错误
    pub fn malformed_frame(message: impl Into<String>) -> Self {
        Self::new(WireErrorCode::MalformedFrame, message)
    }

    /// 序列化错误
    pub fn serialization_error(err: impl fmt::Display) -> Self {
        Self::new(
            WireErrorCode::SerializationError,
            format!("序列化错误: {}", err),
        )
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for WireError {}

impl From<serde_json::Error> for WireError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_error(err)
    }
}

impl From<WireError> for crate::Error {
    fn from(err: WireError) -> Self {
        match err.code {
            WireErrorCode::NotConnected
            | WireErrorCode::ConnectionClosed
            | WireErrorCode::AlreadyOpened
            | WireErrorCode::ConnectFailed => crate::Error::Connection(err.to_string()),
            WireErrorCode::InvalidName | WireErrorCode::InvalidTarget => {
                crate::Error::InvalidArgument(err.to_string())
            }
            WireErrorCode::InvalidConfig => crate::Error::Config(err.to_string()),
            WireErrorCode::MalformedFrame | WireErrorCode::SerializationError => {
                crate::Error::Protocol(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = WireError::invalid_name("消息名不能为空");
        assert_eq!(err.to_string(), "[INVALID_NAME] 消息名不能为空");
    }

    #[test]
    fn test_into_crate_error() {
        let err: crate::Error = WireError::connection_closed().into();
        assert!(matches!(err, crate::Error::Connection(_)));

        let err: crate::Error = WireError::malformed_frame("缺少分隔符").into();
        assert!(matches!(err, crate::Error::Protocol(_)));

        let err: crate::Error = WireError::invalid_config("未知的分隔符").into();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
