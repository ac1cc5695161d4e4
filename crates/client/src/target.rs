/// 连接目标地址
/// 
/// 默认从页面地址推导（http -> ws，https -> wss，保留第一段路径），也可以显式指定

use common::WireError;
use url::Url;

/// WebSocket 连接目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// 从页面地址推导
    Page(Url),

    /// 显式指定的 (scheme, host, port)
    Explicit {
        scheme: String,
        host: String,
        port: u16,
    },
}

impl Target {
    /// 从页面地址构造目标
    pub fn from_page(page_url: &str) -> Result<Self, WireError> {
        let url = Url::parse(page_url)
            .map_err(|e| WireError::invalid_target(format!("页面地址无效 {}: {}", page_url, e)))?;
        Ok(Self::Page(url))
    }

    /// 显式指定协议、主机和端口
    pub fn explicit(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self::Explicit {
            scheme: scheme.into(),
            host: host.into(),
            port,
        }
    }

    /// 计算最终的 WebSocket 地址
    pub fn to_ws_url(&self) -> Result<Url, WireError> {
        match self {
            Self::Page(page) => {
                let scheme = ws_scheme(page.scheme())?;
                if page.host_str().is_none() {
                    return Err(WireError::invalid_target(format!("页面地址缺少主机: {}", page)));
                }

                let first_segment = page
                    .path_segments()
                    .and_then(|mut segments| segments.find(|s| !s.is_empty()))
                    .unwrap_or("")
                    .to_string();

                let mut url = page.clone();
                url.set_scheme(scheme)
                    .map_err(|_| WireError::invalid_target(format!("无法切换协议: {}", page)))?;
                url.set_path(&format!("/{}", first_segment));
                url.set_query(None);
                url.set_fragment(None);
                Ok(url)
            }
            Self::Explicit { scheme, host, port } => {
                let scheme = ws_scheme(scheme)?;
                Url::parse(&format!("{}://{}:{}/", scheme, host, port)).map_err(|e| {
                    WireError::invalid_target(format!("目标地址无效 {}:{}: {}", host, port, e))
                })
            }
        }
    }
}

/// 页面协议映射为 WebSocket 协议
fn ws_scheme(scheme: &str) -> Result<&'static str, WireError> {
    match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => Ok("ws"),
        "https" | "wss" => Ok("wss"),
        other => Err(WireError::invalid_target(format!("不支持的协议: {}", other))),
    }
}
