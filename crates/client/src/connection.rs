/// WebSocket 连接
///
/// 每个 Connection 独占一条 WebSocket：一个发送任务负责写帧，一个接收任务按到达顺序解码并同步调用处理器

use common::models::ConnectionState;
use common::utils::{format_bytes, generate_id};
use common::wire::{CloseInfo, CLOSE_EVENT};
use common::{FrameCodec, Payload, WireError, WireMessage};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::dispatch::{Dispatch, DispatchRegistry};

/// 收到对端关闭帧后，继续读取以完成关闭握手的最长时间
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// 发送任务的输入
enum Outbound {
    Frame(WsMessage),
    Close,
}

/// 连接统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// 已写入 socket 的帧数
    pub frames_sent: u64,
    /// 收到的数据帧数（不含 ping/pong）
    pub frames_received: u64,
    /// 格式错误被丢弃的帧数
    pub frames_dropped: u64,
    /// 没有处理器的消息数
    pub unhandled: u64,
    /// 处理器返回错误的次数
    pub handler_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    unhandled: AtomicU64,
    handler_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            unhandled: self.unhandled.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}

/// 检查消息名，空名属于调用方错误
fn check_name(connection_id: &str, name: &str) -> Result<(), WireError> {
    if name.is_empty() {
        error!(connection = %connection_id, "emit 缺少消息名，未写入 socket");
        return Err(WireError::invalid_name("消息名不能为空"));
    }
    Ok(())
}

/// 消息发送句柄
///
/// 可以克隆后移入处理器内部，用于在处理消息时回发
#[derive(Clone)]
pub struct Emitter {
    connection_id: String,
    codec: FrameCodec,
    state: watch::Receiver<ConnectionState>,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl Emitter {
    /// 发送一条消息（不等待确认）
    pub fn emit(&self, name: &str, payload: impl Into<Payload>) -> Result<(), WireError> {
        check_name(&self.connection_id, name)?;

        let state = *self.state.borrow();
        match state {
            ConnectionState::Open => {}
            ConnectionState::Closed => return Err(WireError::connection_closed()),
            ConnectionState::Idle | ConnectionState::Connecting => {
                return Err(WireError::not_connected())
            }
        }

        let frame = self
            .codec
            .encode(&WireMessage::new(name, payload))
            .map_err(|e| {
                error!(connection = %self.connection_id, "编码消息失败: name={}, error={}", name, e);
                e
            })?;

        self.sender
            .send(Outbound::Frame(frame))
            .map_err(|_| WireError::connection_closed())
    }
}

/// WebSocket 连接
pub struct Connection {
    id: String,
    url: String,
    codec: FrameCodec,
    connect_timeout: Duration,
    registry: Arc<DispatchRegistry>,
    state: Arc<watch::Sender<ConnectionState>>,
    /// 为 false 时意外断开不再派发 `close`
    notify_close: Arc<AtomicBool>,
    counters: Arc<Counters>,
    emitter: Option<Emitter>,
    tasks: Vec<AbortHandle>,
}

impl Connection {
    /// 创建新的连接（尚未打开）
    pub fn new(url: impl Into<String>, codec: FrameCodec) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            id: generate_id(),
            url: url.into(),
            codec,
            connect_timeout: Duration::from_secs(common::models::constants::DEFAULT_CONNECT_TIMEOUT),
            registry: Arc::new(DispatchRegistry::new()),
            state: Arc::new(state),
            notify_close: Arc::new(AtomicBool::new(true)),
            counters: Arc::new(Counters::default()),
            emitter: None,
            tasks: Vec::new(),
        }
    }

    /// 根据配置创建连接
    pub fn from_config(cfg: &Config) -> Result<Self, WireError> {
        let url = cfg.target.to_ws_url()?;
        Ok(Self::new(url.as_str(), FrameCodec::new(cfg.delimiter))
            .with_connect_timeout(cfg.connect_timeout))
    }

    /// 设置连接超时
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// 建立连接，成功后调用一次 `on_open`
    pub async fn open<F>(&mut self, on_open: F) -> Result<(), WireError>
    where
        F: FnOnce(),
    {
        let state = *self.state.borrow();
        if state != ConnectionState::Idle {
            return Err(WireError::already_opened());
        }
        self.state.send_replace(ConnectionState::Connecting);

        info!(connection = %self.id, "连接到 {}", self.url);

        let ws_stream =
            match tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str())).await {
                Ok(Ok((stream, _response))) => stream,
                Ok(Err(e)) => {
                    self.state.send_replace(ConnectionState::Closed);
                    error!(connection = %self.id, "WebSocket 连接失败: {}", e);
                    return Err(WireError::connect_failed(e));
                }
                Err(_) => {
                    self.state.send_replace(ConnectionState::Closed);
                    error!(connection = %self.id, "WebSocket 连接超时: {:?}", self.connect_timeout);
                    return Err(WireError::connect_failed(format!(
                        "超时 {:?}",
                        self.connect_timeout
                    )));
                }
            };

        self.attach(ws_stream, on_open)
    }

    /// 接管一条已建立的 WebSocket，调用一次 `on_open`
    ///
    /// `on_open` 在接收任务启动前执行，因此先于任何处理器
    pub fn attach<S, F>(&mut self, stream: WebSocketStream<S>, on_open: F) -> Result<(), WireError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
        F: FnOnce(),
    {
        let state = *self.state.borrow();
        if !matches!(state, ConnectionState::Idle | ConnectionState::Connecting) {
            return Err(WireError::already_opened());
        }

        let (ws_sender, ws_receiver) = stream.split();
        let (tx, rx) = mpsc::unbounded_channel::<Outbound>();

        self.state.send_replace(ConnectionState::Open);

        let writer = tokio::spawn(write_loop(
            self.id.clone(),
            ws_sender,
            rx,
            self.counters.clone(),
        ));
        self.tasks.push(writer.abort_handle());

        self.emitter = Some(Emitter {
            connection_id: self.id.clone(),
            codec: self.codec,
            state: self.state.subscribe(),
            sender: tx.clone(),
        });

        info!(connection = %self.id, "✅ WebSocket 连接已打开 (delimiter={})", self.codec.delimiter());
        on_open();

        let reader = Reader {
            connection_id: self.id.clone(),
            codec: self.codec,
            registry: self.registry.clone(),
            state: self.state.clone(),
            notify_close: self.notify_close.clone(),
            counters: self.counters.clone(),
        };
        let reader_task = tokio::spawn(reader.clone().run(ws_receiver));
        self.tasks.push(reader_task.abort_handle());
        self.tasks.push(tokio::spawn(watch_reader(reader, reader_task, tx)).abort_handle());

        Ok(())
    }

    /// 注册处理器，同名覆盖
    pub fn on<H>(&self, name: &str, handler: H)
    where
        H: FnMut(Payload) -> anyhow::Result<()> + Send + 'static,
    {
        self.registry.register(name, handler);
        debug!(connection = %self.id, "注册处理器: {}", name);
    }

    /// 发送一条消息（不等待确认）
    ///
    /// 空消息名只记录诊断日志并返回错误，不会写入 socket
    pub fn emit(&self, name: &str, payload: impl Into<Payload>) -> Result<(), WireError> {
        match &self.emitter {
            Some(emitter) => emitter.emit(name, payload),
            None => {
                check_name(&self.id, name)?;
                warn!(connection = %self.id, "连接尚未打开，丢弃消息: {}", name);
                Err(WireError::not_connected())
            }
        }
    }

    /// 获取可克隆的发送句柄（连接打开后可用）
    pub fn emitter(&self) -> Option<Emitter> {
        self.emitter.clone()
    }

    /// 主动关闭连接
    ///
    /// 先摘除 `close` 通知再关闭 socket，主动关闭不会触发 `close` 处理器
    pub fn close(&mut self) -> Result<(), WireError> {
        let state = *self.state.borrow();
        match state {
            ConnectionState::Idle | ConnectionState::Connecting => {
                return Err(WireError::not_connected())
            }
            ConnectionState::Closed => {
                debug!(connection = %self.id, "连接已关闭，忽略 close");
                return Ok(());
            }
            ConnectionState::Open => {}
        }

        self.notify_close.store(false, Ordering::SeqCst);
        self.state.send_replace(ConnectionState::Closed);

        if let Some(emitter) = &self.emitter {
            if emitter.sender.send(Outbound::Close).is_err() {
                debug!(connection = %self.id, "发送任务已结束");
            }
        }

        info!(connection = %self.id, "连接已主动关闭");
        Ok(())
    }

    /// 等待连接进入 Closed 状态
    ///
    /// 对从未打开的连接调用会一直等待
    pub async fn wait_closed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == ConnectionState::Closed).await;
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn stats(&self) -> ConnectionStats {
        self.counters.snapshot()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// 发送任务：按 channel 顺序写帧
async fn write_loop<S>(
    connection_id: String,
    mut ws_sender: SplitSink<WebSocketStream<S>, WsMessage>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    counters: Arc<Counters>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Frame(frame) => {
                if let Err(e) = ws_sender.send(frame).await {
                    error!(connection = %connection_id, "发送帧失败: {}", e);
                    break;
                }
                counters.frames_sent.fetch_add(1, Ordering::Relaxed);
            }
            Outbound::Close => {
                if let Err(e) = ws_sender.close().await {
                    debug!(connection = %connection_id, "关闭 socket 出错: {}", e);
                }
                break;
            }
        }
    }
    debug!(connection = %connection_id, "发送任务结束");
}

/// 接收任务异常退出（处理器 panic）时终止连接
///
/// panic 不在处理器调用处捕获；这里只负责把连接推进到 Closed 并派发一次 `close`
async fn watch_reader(
    reader: Reader,
    task: JoinHandle<()>,
    sender: mpsc::UnboundedSender<Outbound>,
) {
    match task.await {
        Ok(()) => {}
        Err(e) if e.is_panic() => {
            error!(connection = %reader.connection_id, "接收任务 panic，连接终止: {}", e);
            reader.finish(CloseInfo::abnormal("处理器 panic"));
            if sender.send(Outbound::Close).is_err() {
                debug!(connection = %reader.connection_id, "发送任务已结束");
            }
        }
        Err(_) => debug!(connection = %reader.connection_id, "接收任务已取消"),
    }
}

/// 接收任务的上下文
#[derive(Clone)]
struct Reader {
    connection_id: String,
    codec: FrameCodec,
    registry: Arc<DispatchRegistry>,
    state: Arc<watch::Sender<ConnectionState>>,
    notify_close: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl Reader {
    async fn run<S>(self, mut ws_receiver: SplitStream<WebSocketStream<S>>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (close_info, handshake_pending) = loop {
            match ws_receiver.next().await {
                Some(Ok(WsMessage::Close(frame))) => {
                    let info = match frame {
                        Some(frame) => CloseInfo::clean(Some(u16::from(frame.code)), frame.reason.to_string()),
                        None => CloseInfo::clean(None, ""),
                    };
                    break (info, true);
                }
                Some(Ok(msg)) => self.handle_frame(msg),
                Some(Err(e)) => {
                    warn!(connection = %self.connection_id, "接收帧出错: {}", e);
                    break (CloseInfo::abnormal(e.to_string()), false);
                }
                None => break (CloseInfo::abnormal("连接已断开"), false),
            }
        };

        self.finish(close_info);

        // 继续读取，让关闭回应帧被写出
        if handshake_pending {
            let drain = async { while ws_receiver.next().await.is_some() {} };
            if tokio::time::timeout(CLOSE_DRAIN_TIMEOUT, drain).await.is_err() {
                debug!(connection = %self.connection_id, "等待关闭握手超时");
            }
        }
        debug!(connection = %self.connection_id, "接收任务结束");
    }

    fn handle_frame(&self, msg: WsMessage) {
        let message = match self.codec.decode(msg) {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(e) => {
                self.counters.frames_received.fetch_add(1, Ordering::Relaxed);
                self.counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(connection = %self.connection_id, "丢弃无法解析的帧: {}", e);
                return;
            }
        };
        self.counters.frames_received.fetch_add(1, Ordering::Relaxed);

        if *self.state.borrow() == ConnectionState::Closed {
            trace!(connection = %self.connection_id, "连接已关闭，丢弃消息: {}", message.name);
            return;
        }

        if let Payload::Binary(bytes) = &message.payload {
            trace!(
                connection = %self.connection_id,
                name = %message.name,
                size = %format_bytes(bytes.len() as u64),
                "收到二进制帧"
            );
        }

        self.dispatch(&message.name, message.payload);
    }

    fn dispatch(&self, name: &str, payload: Payload) {
        match self.registry.invoke(name, payload) {
            Ok(Dispatch::Delivered) => {}
            Ok(Dispatch::Unhandled) => {
                self.counters.unhandled.fetch_add(1, Ordering::Relaxed);
                trace!(connection = %self.connection_id, "未注册的消息，已丢弃: {}", name);
            }
            Err(e) => {
                self.counters.handler_failures.fetch_add(1, Ordering::Relaxed);
                error!(connection = %self.connection_id, "处理器执行失败: name={}, error={:#}", name, e);
            }
        }
    }

    /// 连接终止：更新状态，意外断开时派发 `close`
    fn finish(&self, info: CloseInfo) {
        self.state.send_replace(ConnectionState::Closed);

        if !self.notify_close.swap(false, Ordering::SeqCst) {
            debug!(connection = %self.connection_id, "主动关闭完成");
            return;
        }

        warn!(
            connection = %self.connection_id,
            "连接意外断开: code={:?}, reason={}, clean={}",
            info.code, info.reason, info.was_clean
        );

        match Payload::json(&info) {
            Ok(payload) => self.dispatch(CLOSE_EVENT, payload),
            Err(e) => error!(connection = %self.connection_id, "序列化关闭信息失败: {}", e),
        }
    }
}
