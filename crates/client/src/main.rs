/// WireBus - 控制台
///
/// 连接到 Hub，订阅指定的消息名并打印收到的内容

use client::{Config, Connection, MessageTransport, Payload, CLOSE_EVENT};
use common::utils::format_bytes;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();
    let cfg = Config::from_env()?;

    // 初始化日志
    // 可以通过环境变量 RUST_LOG 覆盖 LOG_LEVEL，例如：
    // RUST_LOG=client=trace cargo run --bin wirebus-console
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .init();

    info!("🚀 启动 WireBus 控制台...");

    let subscriptions: Vec<String> = std::env::var("SUBSCRIBE")
        .unwrap_or_else(|_| "chat".to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let announce = std::env::var("ANNOUNCE_NAME").ok().filter(|s| !s.is_empty());

    let mut connection = Connection::from_config(&cfg)?;
    info!("🎯 目标地址: {}", connection.url());
    info!("📌 订阅: {:?}", subscriptions);

    run(&mut connection, &subscriptions, announce.as_deref()).await?;

    info!("连接统计: {:?}", connection.stats());
    Ok(())
}

/// 订阅、可选地发送一条问候，然后等待 Ctrl-C 或断开
async fn run<T: MessageTransport>(
    transport: &mut T,
    subscriptions: &[String],
    announce: Option<&str>,
) -> anyhow::Result<()> {
    for name in subscriptions {
        let label = name.clone();
        transport.on(name, move |payload| {
            log_payload(&label, &payload);
            Ok(())
        });
    }

    let (closed_tx, mut closed_rx) = mpsc::unbounded_channel::<Payload>();
    transport.on(CLOSE_EVENT, move |payload| {
        let _ = closed_tx.send(payload);
        Ok(())
    });

    transport.open(|| info!("✅ 连接已建立")).await?;

    if let Some(name) = announce {
        transport.emit(
            name,
            Payload::Json(json!({
                "pid": std::process::id(),
                "at": chrono::Utc::now().timestamp()
            })),
        )?;
        info!("📤 已发送: {}", name);
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("收到 Ctrl-C，关闭连接");
            transport.close()?;
        }
        Some(payload) = closed_rx.recv() => {
            warn!("连接已断开: {:?}", payload.as_json());
        }
    }

    Ok(())
}

fn log_payload(name: &str, payload: &Payload) {
    match payload {
        Payload::Json(value) => info!("📨 {}: {}", name, value),
        Payload::Binary(bytes) => info!("📦 {}: {}", name, format_bytes(bytes.len() as u64)),
    }
}
