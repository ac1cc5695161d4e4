/// 消息分发注册表
///
/// 每个连接独享一张 name -> handler 表，同名注册后者覆盖前者

use common::Payload;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// 消息处理器
pub type Handler = Box<dyn FnMut(Payload) -> anyhow::Result<()> + Send>;

/// 分发结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// 已交给处理器
    Delivered,
    /// 没有注册处理器，消息被丢弃
    Unhandled,
}

/// 分发注册表
#[derive(Default)]
pub struct DispatchRegistry {
    handlers: Mutex<HashMap<String, Handler>>,
}

impl DispatchRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器，返回是否覆盖了已有处理器
    pub fn register<H>(&self, name: impl Into<String>, handler: H) -> bool
    where
        H: FnMut(Payload) -> anyhow::Result<()> + Send + 'static,
    {
        let name = name.into();
        let replaced = self
            .lock()
            .insert(name.clone(), Box::new(handler))
            .is_some();

        if replaced {
            debug!("覆盖已注册的处理器: {}", name);
        }
        replaced
    }

    /// 同步调用处理器
    ///
    /// 调用期间不持有锁，处理器内部可以继续注册；若处理器运行时同名处理器被重新注册，以新注册的为准
    pub fn invoke(&self, name: &str, payload: Payload) -> anyhow::Result<Dispatch> {
        let Some(mut handler) = self.lock().remove(name) else {
            return Ok(Dispatch::Unhandled);
        };

        let result = handler(payload);

        self.lock().entry(name.to_string()).or_insert(handler);

        result.map(|_| Dispatch::Delivered)
    }

    /// 是否已注册
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// 已注册处理器数量
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 已注册的消息名（排序后）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Handler>> {
        // 处理器 panic 不应让整张表不可用
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
