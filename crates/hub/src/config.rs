/// 配置管理

use common::models::constants::DEFAULT_HUB_PORT;
use common::Delimiter;

#[derive(Debug, Clone)]
pub struct Config {
    pub hub_port: u16,
    pub delimiter: Delimiter,
    pub log_level: String,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        let hub_port = std::env::var("HUB_PORT")
            .unwrap_or_else(|_| DEFAULT_HUB_PORT.to_string())
            .parse()?;

        let delimiter = std::env::var("FRAME_DELIMITER")
            .unwrap_or_else(|_| Delimiter::default().to_string())
            .parse()?;

        let log_level = std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "debug".to_string());

        Ok(Self {
            hub_port,
            delimiter,
            log_level,
        })
    }
}
