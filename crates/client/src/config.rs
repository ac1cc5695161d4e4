/// 配置管理

use common::models::constants::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_PAGE_URL};
use common::{Delimiter, Error, Result};
use std::time::Duration;

use crate::target::Target;

#[derive(Debug, Clone)]
pub struct Config {
    pub target: Target,
    pub delimiter: Delimiter,
    pub connect_timeout: Duration,
    pub log_level: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 设置了 `WS_HOST` 时使用显式的 (WS_SCHEME, WS_HOST, WS_PORT)，否则从 `PAGE_URL` 推导
    pub fn from_env() -> Result<Self> {
        let target = match std::env::var("WS_HOST") {
            Ok(host) => {
                let scheme = std::env::var("WS_SCHEME").unwrap_or_else(|_| "ws".to_string());
                let port = std::env::var("WS_PORT")
                    .unwrap_or_else(|_| "80".to_string())
                    .parse()
                    .map_err(|e| Error::Config(format!("WS_PORT 无效: {}", e)))?;
                Target::explicit(scheme, host, port)
            }
            Err(_) => {
                let page_url =
                    std::env::var("PAGE_URL").unwrap_or_else(|_| DEFAULT_PAGE_URL.to_string());
                Target::from_page(&page_url)?
            }
        };

        let delimiter = std::env::var("FRAME_DELIMITER")
            .unwrap_or_else(|_| Delimiter::default().to_string())
            .parse::<Delimiter>()
            .map_err(|e| Error::Config(format!("FRAME_DELIMITER 无效: {}", e)))?;

        let connect_timeout = std::env::var("CONNECT_TIMEOUT")
            .unwrap_or_else(|_| DEFAULT_CONNECT_TIMEOUT.to_string())
            .parse()
            .map(Duration::from_secs)
            .map_err(|e| Error::Config(format!("CONNECT_TIMEOUT 无效: {}", e)))?;

        let log_level = std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            target,
            delimiter,
            connect_timeout,
            log_level,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: Target::explicit("ws", "localhost", common::models::constants::DEFAULT_HUB_PORT),
            delimiter: Delimiter::default(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            log_level: "info".to_string(),
        }
    }
}
