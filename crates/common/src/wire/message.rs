/// 帧协议消息定义

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::WireError;

/// 消息负载
///
/// 同一条连接上可以混合传输结构化数据和原始二进制数据
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// 结构化数据（文本帧）
    Json(serde_json::Value),
    /// 原始字节（二进制帧）
    Binary(Vec<u8>),
}

impl Payload {
    /// 从任意可序列化的值构造结构化负载
    pub fn json<T: Serialize>(value: &T) -> Result<Self, WireError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// 将结构化负载反序列化为具体类型
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, WireError> {
        match self {
            Self::Json(value) => Ok(T::deserialize(value)?),
            Self::Binary(_) => Err(WireError::serialization_error("二进制负载不能按结构化数据解析")),
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Json(_) => None,
            Self::Binary(bytes) => Some(bytes.as_slice()),
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

/// 文本帧信封
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// 消息名（路由键）
    pub name: String,

    /// 消息数据，缺省为 null
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    /// 从 JSON 字符串反序列化
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// 一条逻辑消息：(name, payload)
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub name: String,
    pub payload: Payload,
}

impl WireMessage {
    pub fn new(name: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }
}
