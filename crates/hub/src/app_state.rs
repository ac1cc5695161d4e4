/// 应用全局状态

use common::FrameCodec;
use crate::ws::HubManager;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    /// 在线连接管理器
    pub hub: HubManager,
    /// 部署统一的帧编解码器
    pub codec: FrameCodec,
}

impl AppState {
    pub fn new(codec: FrameCodec) -> Self {
        Self {
            hub: HubManager::new(),
            codec,
        }
    }

    /// 获取连接管理器
    pub fn hub(&self) -> HubManager {
        self.hub.clone()
    }

    pub fn codec(&self) -> FrameCodec {
        self.codec
    }
}
