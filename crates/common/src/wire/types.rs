/// 帧协议保留名称与元数据类型

use serde::{Deserialize, Serialize};

/// 保留消息名：连接意外断开时派发
pub const CLOSE_EVENT: &str = "close";

/// 关闭元数据
///
/// 作为保留消息 `close` 的结构化负载
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloseInfo {
    /// 对端给出的关闭码（如有）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,

    pub reason: String,

    /// 对端是否发送了关闭帧
    pub was_clean: bool,

    /// Unix 毫秒时间戳
    pub timestamp: i64,
}

impl CloseInfo {
    /// 对端发送了关闭帧
    pub fn clean(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean: true,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// 流结束或出错，没有关闭握手
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: None,
            reason: reason.into(),
            was_clean: false,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_info_serialization() {
        let info = CloseInfo::clean(Some(1000), "bye");
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["code"], 1000);
        assert_eq!(value["was_clean"], true);

        let info = CloseInfo::abnormal("reset");
        let value = serde_json::to_value(&info).unwrap();
        assert!(value.get("code").is_none());
        assert_eq!(value["was_clean"], false);
    }
}
