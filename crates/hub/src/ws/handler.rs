/// Hub WebSocket 连接处理器
/// 
/// 每个连接一个发送任务和一个接收任务；能解码的帧原样转发给同房间的其他连接

use axum::extract::ws::{Message as AxumWsMessage, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use common::utils::{format_bytes, generate_id};
use common::FrameCodec;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::app_state::AppState;
use crate::ws::HubManager;

/// 根路径的 WebSocket 升级处理器
pub async fn handle_root_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_peer_connection(socket, String::new(), state))
}

/// `/:app` 的 WebSocket 升级处理器
pub async fn handle_app_websocket(
    ws: WebSocketUpgrade,
    Path(app): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_peer_connection(socket, app, state))
}

/// 处理单个 WebSocket 连接
async fn handle_peer_connection(socket: WebSocket, room: String, state: AppState) {
    let connection_id = generate_id();
    info!("新的 WebSocket 连接: {} (房间: /{})", connection_id, room);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // 创建帧发送通道
    let (tx, mut rx) = mpsc::unbounded_channel::<AxumWsMessage>();

    // 注册到管理器
    state.hub().register(connection_id.clone(), room.clone(), tx).await;

    // 创建帧发送任务
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(msg).await {
                error!("发送帧失败: {}", e);
                break;
            }
        }
        debug!("帧发送任务结束");
    });

    // 创建帧接收任务
    let hub = state.hub();
    let codec = state.codec();
    let from = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(AxumWsMessage::Close(frame)) => {
                    debug!("对端关闭连接: {:?}", frame);
                    break;
                }
                Ok(msg) => relay_frame(&hub, codec, &room, &from, msg).await,
                Err(e) => {
                    error!("接收帧错误: {}", e);
                    break;
                }
            }
        }
        debug!("帧接收任务结束");
    });

    // 等待任一任务完成
    tokio::select! {
        _ = &mut send_task => {
            debug!("发送任务已结束");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            debug!("接收任务已结束");
            send_task.abort();
        }
    }

    // 清理：从管理器中注销
    state.hub().unregister(&connection_id).await;
    info!("WebSocket 连接已关闭: {}", connection_id);
}

/// 校验帧格式后原样转发
async fn relay_frame(
    hub: &HubManager,
    codec: FrameCodec,
    room: &str,
    from: &str,
    msg: AxumWsMessage,
) {
    let decoded = match &msg {
        AxumWsMessage::Text(text) => codec.decode_text(text).map(|envelope| envelope.name),
        AxumWsMessage::Binary(data) => {
            trace!("收到二进制帧: {}", format_bytes(data.len() as u64));
            codec.binary_name(data).map(str::to_string)
        }
        // ping/pong 由 axum 自动处理
        _ => return,
    };

    match decoded {
        Ok(name) => {
            let delivered = hub.broadcast(room, from, msg).await;
            debug!("转发 {} -> /{}: {} 个连接", name, room, delivered);
        }
        Err(e) => {
            warn!("丢弃无法解析的帧 (来自 {}): {}", from, e);
        }
    }
}
