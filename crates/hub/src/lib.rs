/// WireBus - Hub
/// 
/// 按应用房间转发命名消息的 WebSocket 服务

pub mod app_state;
pub mod config;
pub mod ws;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use app_state::AppState;
pub use config::Config;
pub use ws::HubManager;

/// 构建应用路由
///
/// `/` 和 `/:app` 升级为 WebSocket，路径第一段即房间名
pub fn build_router(state: AppState) -> Router {
    // 设置CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/", get(ws::handle_root_websocket))
        .route("/:app", get(ws::handle_app_websocket))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}
