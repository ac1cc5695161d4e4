/// 帧编解码
///
/// 文本帧：`{"name": ..., "data": ...}` JSON 信封
///
/// 二进制帧：`name`（ASCII，每字符一字节）+ 一个分隔字节 + 原始负载。
/// 分隔字节在部署内固定，两种取值对应历史上的两个协议版本：
///
/// | 版本 | 分隔字节 |
/// |------|----------|
/// | A    | `0x00`   |
/// | B    | `'|'` (`0x7C`) |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::{Envelope, Payload, WireError, WireMessage};

/// 二进制帧名称分隔符
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// 版本 A：`0x00`
    #[default]
    Null,
    /// 版本 B：`'|'`
    Pipe,
}

impl Delimiter {
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Null => 0x00,
            Self::Pipe => b'|',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Pipe => "pipe",
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Delimiter {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "null" | "a" | "0" => Ok(Self::Null),
            "pipe" | "b" | "|" => Ok(Self::Pipe),
            other => Err(WireError::invalid_config(format!(
                "未知的分隔符: {}",
                other
            ))),
        }
    }
}

/// 帧编解码器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCodec {
    delimiter: Delimiter,
}

impl FrameCodec {
    pub fn new(delimiter: Delimiter) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    /// 编码逻辑消息为 WebSocket 帧
    pub fn encode(&self, msg: &WireMessage) -> Result<WsMessage, WireError> {
        match &msg.payload {
            Payload::Json(data) => Ok(WsMessage::Text(self.encode_text(&msg.name, data)?)),
            Payload::Binary(bytes) => Ok(WsMessage::Binary(self.encode_binary(&msg.name, bytes)?)),
        }
    }

    /// 解码 WebSocket 帧为逻辑消息
    ///
    /// 控制帧（ping/pong/close）返回 `Ok(None)`
    pub fn decode(&self, ws_msg: WsMessage) -> Result<Option<WireMessage>, WireError> {
        match ws_msg {
            WsMessage::Text(text) => {
                let envelope = self.decode_text(&text)?;
                Ok(Some(WireMessage::new(envelope.name, envelope.data)))
            }
            WsMessage::Binary(data) => {
                let (name, payload) = self.decode_binary(&data)?;
                Ok(Some(WireMessage::new(name, payload)))
            }
            _ => Ok(None),
        }
    }

    /// 编码文本帧
    pub fn encode_text(&self, name: &str, data: &serde_json::Value) -> Result<String, WireError> {
        if name.is_empty() {
            return Err(WireError::invalid_name("消息名不能为空"));
        }
        Ok(serde_json::to_string(&EnvelopeRef { name, data })?)
    }

    /// 解码文本帧
    pub fn decode_text(&self, text: &str) -> Result<Envelope, WireError> {
        let envelope = Envelope::from_json(text)
            .map_err(|e| WireError::malformed_frame(format!("文本帧解析失败: {}", e)))?;
        if envelope.name.is_empty() {
            return Err(WireError::malformed_frame("文本帧缺少消息名"));
        }
        Ok(envelope)
    }

    /// 编码二进制帧
    pub fn encode_binary(&self, name: &str, payload: &[u8]) -> Result<Vec<u8>, WireError> {
        self.validate_binary_name(name)?;

        let mut frame = Vec::with_capacity(name.len() + 1 + payload.len());
        frame.extend_from_slice(name.as_bytes());
        frame.push(self.delimiter.as_byte());
        frame.extend_from_slice(payload);
        Ok(frame)
    }

    /// 解码二进制帧，返回 (name, payload)
    pub fn decode_binary(&self, frame: &[u8]) -> Result<(String, Vec<u8>), WireError> {
        let name = self.binary_name(frame)?;
        Ok((name.to_string(), frame[name.len() + 1..].to_vec()))
    }

    /// 只校验二进制帧的名称头，返回借用的消息名，不复制负载
    pub fn binary_name<'a>(&self, frame: &'a [u8]) -> Result<&'a str, WireError> {
        let delimiter = self.delimiter.as_byte();
        let split = frame
            .iter()
            .position(|&b| b == delimiter)
            .ok_or_else(|| WireError::malformed_frame("二进制帧缺少分隔符"))?;

        let name_bytes = &frame[..split];
        if name_bytes.is_empty() {
            return Err(WireError::malformed_frame("二进制帧缺少消息名"));
        }
        if !name_bytes.is_ascii() {
            return Err(WireError::malformed_frame("二进制帧消息名包含非 ASCII 字节"));
        }

        std::str::from_utf8(name_bytes)
            .map_err(|e| WireError::malformed_frame(format!("二进制帧消息名无效: {}", e)))
    }

    fn validate_binary_name(&self, name: &str) -> Result<(), WireError> {
        if name.is_empty() {
            return Err(WireError::invalid_name("消息名不能为空"));
        }
        if !name.is_ascii() {
            return Err(WireError::invalid_name(format!(
                "二进制帧消息名只能包含 ASCII 字符: {}",
                name
            )));
        }
        if name.as_bytes().contains(&self.delimiter.as_byte()) {
            return Err(WireError::invalid_name(format!(
                "消息名包含分隔符 {}: {:?}",
                self.delimiter, name
            )));
        }
        Ok(())
    }
}

/// 编码时借用的信封，避免复制负载
#[derive(Serialize)]
struct EnvelopeRef<'a> {
    name: &'a str,
    data: &'a serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WireErrorCode;
    use serde_json::json;

    fn roundtrip(codec: &FrameCodec, msg: WireMessage) -> WireMessage {
        let frame = codec.encode(&msg).unwrap();
        codec.decode(frame).unwrap().unwrap()
    }

    #[test]
    fn test_text_frame_roundtrip_nested() {
        let codec = FrameCodec::default();
        let data = json!({
            "layers": [{"id": 1, "points": [[0, 0], [3.5, -2]]}, {}],
            "meta": {"empty": {}, "list": [], "flag": null}
        });
        let msg = WireMessage::new("scene", data.clone());

        let decoded = roundtrip(&codec, msg);
        assert_eq!(decoded.name, "scene");
        assert_eq!(decoded.payload, Payload::Json(data));
    }

    #[test]
    fn test_text_frame_empty_object() {
        let codec = FrameCodec::default();
        let decoded = roundtrip(&codec, WireMessage::new("noop", json!({})));
        assert_eq!(decoded.payload, Payload::Json(json!({})));
    }

    #[test]
    fn test_binary_frame_layout_null() {
        let codec = FrameCodec::new(Delimiter::Null);
        let frame = codec.encode_binary("ping", &[0x01, 0x02]).unwrap();
        assert_eq!(frame, b"ping\x00\x01\x02");
    }

    #[test]
    fn test_binary_frame_layout_pipe() {
        let codec = FrameCodec::new(Delimiter::Pipe);
        let frame = codec.encode_binary("img", b"\x00\xff").unwrap();
        assert_eq!(frame, b"img|\x00\xff");
    }

    #[test]
    fn test_binary_payload_may_contain_delimiter() {
        let codec = FrameCodec::new(Delimiter::Null);
        let payload = vec![0x00, 0x00, 0x7c, 0x00];
        let decoded = roundtrip(&codec, WireMessage::new("raw", payload.clone()));
        assert_eq!(decoded.name, "raw");
        assert_eq!(decoded.payload, Payload::Binary(payload));
    }

    #[test]
    fn test_binary_zero_length_payload() {
        for delimiter in [Delimiter::Null, Delimiter::Pipe] {
            let codec = FrameCodec::new(delimiter);
            let decoded = roundtrip(&codec, WireMessage::new("frame_end", Vec::new()));
            assert_eq!(decoded.name, "frame_end");
            assert_eq!(decoded.payload, Payload::Binary(Vec::new()));
        }
    }

    #[test]
    fn test_decode_scenario_frame() {
        let codec = FrameCodec::new(Delimiter::Null);
        let msg = codec
            .decode(WsMessage::Binary(b"ping\x00\x01\x02".to_vec()))
            .unwrap()
            .unwrap();
        assert_eq!(msg.name, "ping");
        assert_eq!(msg.payload, Payload::Binary(vec![0x01, 0x02]));
    }

    #[test]
    fn test_encode_rejects_bad_names() {
        let codec = FrameCodec::new(Delimiter::Pipe);
        assert_eq!(
            codec.encode_binary("", b"x").unwrap_err().code,
            WireErrorCode::InvalidName
        );
        assert!(codec.encode_binary("a|b", b"x").is_err());
        assert!(codec.encode_binary("名字", b"x").is_err());
        assert!(codec.encode_text("", &json!(1)).is_err());

        // 管道分隔模式下 0x00 不是分隔符
        assert!(FrameCodec::new(Delimiter::Null).encode_binary("a|b", b"x").is_ok());
    }

    #[test]
    fn test_decode_malformed_frames() {
        let codec = FrameCodec::new(Delimiter::Null);
        let cases: Vec<WsMessage> = vec![
            WsMessage::Binary(b"no-delimiter".to_vec()),
            WsMessage::Binary(b"\x00payload".to_vec()),
            WsMessage::Binary(vec![0xe4, 0xb8, 0xad, 0x00, 0x01]),
            WsMessage::Text("not json".to_string()),
            WsMessage::Text(r#"{"data": 1}"#.to_string()),
            WsMessage::Text(r#"{"name": "", "data": 1}"#.to_string()),
        ];

        for frame in cases {
            let err = codec.decode(frame).unwrap_err();
            assert_eq!(err.code, WireErrorCode::MalformedFrame);
        }
    }

    #[test]
    fn test_decode_ignores_control_frames() {
        let codec = FrameCodec::default();
        assert!(codec.decode(WsMessage::Ping(vec![1])).unwrap().is_none());
        assert!(codec.decode(WsMessage::Pong(vec![])).unwrap().is_none());
        assert!(codec.decode(WsMessage::Close(None)).unwrap().is_none());
    }

    #[test]
    fn test_delimiter_from_str() {
        assert_eq!("null".parse::<Delimiter>().unwrap(), Delimiter::Null);
        assert_eq!("A".parse::<Delimiter>().unwrap(), Delimiter::Null);
        assert_eq!(" pipe ".parse::<Delimiter>().unwrap(), Delimiter::Pipe);
        assert_eq!("|".parse::<Delimiter>().unwrap(), Delimiter::Pipe);
        assert_eq!(
            "comma".parse::<Delimiter>().unwrap_err().code,
            WireErrorCode::InvalidConfig
        );
    }

    #[test]
    fn test_binary_name_borrows_header() {
        let codec = FrameCodec::new(Delimiter::Pipe);
        assert_eq!(codec.binary_name(b"blob|\x00\x01|").unwrap(), "blob");
        assert_eq!(
            codec.binary_name(b"|payload").unwrap_err().code,
            WireErrorCode::MalformedFrame
        );
        assert!(codec.binary_name(b"no-delimiter").is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// 任意 JSON 值（有限深度）
        fn json_value() -> impl Strategy<Value = serde_json::Value> {
            let leaf = prop_oneof![
                Just(serde_json::Value::Null),
                any::<bool>().prop_map(serde_json::Value::from),
                any::<i64>().prop_map(serde_json::Value::from),
                // 四分之一步长的浮点数可以精确往返
                (-1_000_000i32..1_000_000).prop_map(|n| serde_json::Value::from(f64::from(n) / 4.0)),
                ".*".prop_map(serde_json::Value::from),
            ];
            leaf.prop_recursive(4, 64, 8, |inner| {
                prop_oneof![
                    proptest::collection::vec(inner.clone(), 0..8)
                        .prop_map(serde_json::Value::Array),
                    proptest::collection::btree_map(".*", inner, 0..8).prop_map(|map| {
                        serde_json::Value::Object(map.into_iter().collect())
                    }),
                ]
            })
        }

        proptest! {
            #[test]
            fn text_frame_roundtrip(name in ".+", data in json_value()) {
                let codec = FrameCodec::default();
                let decoded = roundtrip(&codec, WireMessage::new(name.clone(), data.clone()));
                prop_assert_eq!(decoded.name, name);
                prop_assert_eq!(decoded.payload, Payload::Json(data));
            }

            #[test]
            fn binary_frame_roundtrip(
                pipe in any::<bool>(),
                name in "[\\x00-\\x7f]{1,32}",
                payload in proptest::collection::vec(any::<u8>(), 0..256),
            ) {
                let delimiter = if pipe { Delimiter::Pipe } else { Delimiter::Null };
                let name: String = name
                    .chars()
                    .filter(|c| *c != char::from(delimiter.as_byte()))
                    .collect();
                prop_assume!(!name.is_empty());

                let codec = FrameCodec::new(delimiter);
                let decoded = roundtrip(&codec, WireMessage::new(name.clone(), payload.clone()));
                prop_assert_eq!(decoded.name, name);
                prop_assert_eq!(decoded.payload, Payload::Binary(payload));
            }
        }
    }
}
