/// WireBus - Hub
/// 
/// 转发服务主程序

use common::FrameCodec;
use hub::{build_router, AppState, Config};
use std::net::SocketAddr;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 加载配置
    let cfg = Config::from_env()?;

    // 初始化日志
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level))
        )
        .init();

    info!("🚀 启动 WireBus Hub...");
    info!("✅ 配置加载成功 (分隔符: {})", cfg.delimiter);

    // 创建应用状态
    let app_state = AppState::new(FrameCodec::new(cfg.delimiter));

    // 构建应用路由
    let app = build_router(app_state);

    // 启动服务器
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.hub_port));
    info!("🎯 服务器监听在 ws://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Hub 已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("监听 Ctrl-C 失败: {}", e);
    }
    info!("收到 Ctrl-C，正在关闭...");
}
