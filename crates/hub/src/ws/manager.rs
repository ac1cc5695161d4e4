/// Hub 连接管理器
/// 
/// 按应用房间登记在线连接，并把帧原样转发给同房间的其他连接

use axum::extract::ws::Message as AxumWsMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// 在线连接信息
#[derive(Debug, Clone)]
pub struct PeerConnection {
    /// 连接 ID
    pub connection_id: String,

    /// 所属房间（URL 的第一段路径，根路径为空字符串）
    pub room: String,

    /// 发送帧的通道
    pub sender: mpsc::UnboundedSender<AxumWsMessage>,

    /// 连接时间
    pub connected_at: chrono::DateTime<chrono::Utc>,
}

/// 连接管理器
#[derive(Clone)]
pub struct HubManager {
    /// 所有连接的映射：connection_id -> PeerConnection
    connections: Arc<RwLock<HashMap<String, Arc<PeerConnection>>>>,
}

impl HubManager {
    /// 创建新的连接管理器
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 注册新连接
    pub async fn register(
        &self,
        connection_id: String,
        room: String,
        sender: mpsc::UnboundedSender<AxumWsMessage>,
    ) -> Arc<PeerConnection> {
        let connection = Arc::new(PeerConnection {
            connection_id: connection_id.clone(),
            room: room.clone(),
            sender,
            connected_at: chrono::Utc::now(),
        });

        let mut connections = self.connections.write().await;
        connections.insert(connection_id.clone(), connection.clone());

        info!("连接已注册: {} (房间: /{})", connection_id, room);
        connection
    }

    /// 注销连接
    pub async fn unregister(&self, connection_id: &str) {
        let mut connections = self.connections.write().await;
        if let Some(conn) = connections.remove(connection_id) {
            let online = chrono::Utc::now() - conn.connected_at;
            info!(
                "连接已注销: {} (房间: /{}, 在线 {} 秒)",
                connection_id,
                conn.room,
                online.num_seconds()
            );
        }
    }

    /// 房间内的连接数量
    pub async fn count(&self, room: &str) -> usize {
        let connections = self.connections.read().await;
        connections.values().filter(|conn| conn.room == room).count()
    }

    /// 全部连接数量
    pub async fn total(&self) -> usize {
        self.connections.read().await.len()
    }

    /// 向房间内除 `except` 以外的连接转发帧，返回成功投递的数量
    pub async fn broadcast(&self, room: &str, except: &str, frame: AxumWsMessage) -> usize {
        let connections = self.connections.read().await;
        let mut count = 0;

        for (connection_id, conn) in connections.iter() {
            if conn.room != room || connection_id == except {
                continue;
            }
            if let Err(e) = conn.sender.send(frame.clone()) {
                warn!("向连接 {} 转发失败: {}", connection_id, e);
            } else {
                count += 1;
            }
        }

        debug!("帧已转发到房间 /{} 的 {} 个连接", room, count);
        count
    }
}

impl Default for HubManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> AxumWsMessage {
        AxumWsMessage::Text(s.to_string())
    }

    #[tokio::test]
    async fn test_register_and_count_by_room() {
        let hub = HubManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        hub.register("a".into(), "draw".into(), tx.clone()).await;
        hub.register("b".into(), "draw".into(), tx.clone()).await;
        hub.register("c".into(), "chat".into(), tx).await;

        assert_eq!(hub.count("draw").await, 2);
        assert_eq!(hub.count("chat").await, 1);
        assert_eq!(hub.count("").await, 0);
        assert_eq!(hub.total().await, 3);

        hub.unregister("a").await;
        hub.unregister("missing").await;
        assert_eq!(hub.count("draw").await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_skips_sender_and_other_rooms() {
        let hub = HubManager::new();
        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        let (c_tx, mut c_rx) = mpsc::unbounded_channel();

        hub.register("a".into(), "draw".into(), a_tx).await;
        hub.register("b".into(), "draw".into(), b_tx).await;
        hub.register("c".into(), "chat".into(), c_tx).await;

        let delivered = hub.broadcast("draw", "a", text("hello")).await;
        assert_eq!(delivered, 1);

        match b_rx.try_recv() {
            Ok(AxumWsMessage::Text(s)) => assert_eq!(s, "hello"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(a_rx.try_recv().is_err());
        assert!(c_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_to_closed_receiver() {
        let hub = HubManager::new();
        let (tx, rx) = mpsc::unbounded_channel();
        hub.register("gone".into(), "draw".into(), tx).await;
        drop(rx);

        assert_eq!(hub.broadcast("draw", "", text("x")).await, 0);
    }
}
