/// 消息传输能力接口
/// 
/// 上层应用只依赖 open / on / emit / close 四个操作，不关心具体连接类型

use async_trait::async_trait;
use common::{Payload, WireError};

use crate::connection::Connection;

/// 带名称的消息传输
#[async_trait]
pub trait MessageTransport: Send {
    /// 建立连接，成功后调用一次 `on_open`
    async fn open<F>(&mut self, on_open: F) -> Result<(), WireError>
    where
        F: FnOnce() + Send + 'static;

    /// 注册处理器，同名覆盖
    fn on<H>(&self, name: &str, handler: H)
    where
        H: FnMut(Payload) -> anyhow::Result<()> + Send + 'static;

    /// 发送一条消息
    fn emit(&self, name: &str, payload: Payload) -> Result<(), WireError>;

    /// 主动关闭
    fn close(&mut self) -> Result<(), WireError>;
}

#[async_trait]
impl MessageTransport for Connection {
    async fn open<F>(&mut self, on_open: F) -> Result<(), WireError>
    where
        F: FnOnce() + Send + 'static,
    {
        Connection::open(self, on_open).await
    }

    fn on<H>(&self, name: &str, handler: H)
    where
        H: FnMut(Payload) -> anyhow::Result<()> + Send + 'static,
    {
        Connection::on(self, name, handler)
    }

    fn emit(&self, name: &str, payload: Payload) -> Result<(), WireError> {
        Connection::emit(self, name, payload)
    }

    fn close(&mut self) -> Result<(), WireError> {
        Connection::close(self)
    }
}
