//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了单飞协调器，负责同一键上并发未命中的合并：
//! 同一时刻每个键至多存在一个在途计算，其余调用者等待并共享结果。

use crate::error::{CacheError, Result};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::future::Future;
use tokio::sync::watch;
use tracing::{debug, instrument};

/// 在途计算的状态
///
/// 通过watch通道广播给所有等待者，因此必须可克隆。
/// 失败结果以字符串形式携带原始错误原因
#[derive(Clone, Debug)]
enum FlightState {
    /// 执行者尚未完成
    Pending,
    /// 执行者已完成，携带成功的字节或失败原因
    Done(std::result::Result<Vec<u8>, String>),
}

/// 单飞协调器
///
/// 维护键到在途计算的注册表。注册表的互斥粒度是单个键：
/// 不同键上的操作互不阻塞
pub struct FlightCoordinator {
    /// 在途计算注册表
    flights: DashMap<String, watch::Receiver<FlightState>>,
}

/// 在途计算的清理守卫
///
/// 执行者完成或被取消（Future被丢弃）时从注册表移除记录，
/// 保证键总能回到空闲状态并允许后续重试
struct FlightGuard<'a> {
    flights: &'a DashMap<String, watch::Receiver<FlightState>>,
    key: &'a str,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flights.remove(self.key);
    }
}

impl FlightCoordinator {
    /// 创建新的单飞协调器
    pub fn new() -> Self {
        Self {
            flights: DashMap::new(),
        }
    }

    /// 当前在途计算的数量
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// 注册表是否为空（所有键均处于空闲状态）
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    /// 执行或加入指定键的计算
    ///
    /// 键空闲时，调用者成为执行者并运行 `op`；键上已有在途计算时，
    /// 调用者作为等待者挂起，直到执行者完成并共享其结果。
    /// 执行者的错误原样返回给执行者本身，等待者收到包装了
    /// 原始原因的 `ComputationAborted`。
    ///
    /// 等待者被取消只会丢弃一个接收端，不影响执行者和其他等待者；
    /// 执行者被取消时所有等待者收到 `ComputationAborted`，
    /// 记录被清理，后续调用可重新发起计算
    #[instrument(skip(self, op), level = "debug")]
    pub async fn compute<F, Fut>(&self, key: &str, op: F) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>>>,
    {
        // 快速路径：键上已有在途计算，直接加入等待
        if let Some(rx) = self.flights.get(key).map(|r| r.value().clone()) {
            debug!("joining in-flight computation: key={}", key);
            return Self::wait(key, rx).await;
        }

        // 竞争创建记录，entry API保证每个键只产生一个执行者
        let (tx, rx) = watch::channel(FlightState::Pending);
        let joined = match self.flights.entry(key.to_string()) {
            MapEntry::Occupied(entry) => Some(entry.get().clone()),
            MapEntry::Vacant(entry) => {
                entry.insert(rx);
                None
            }
        };
        if let Some(rx) = joined {
            debug!("lost creation race, joining as waiter: key={}", key);
            return Self::wait(key, rx).await;
        }

        debug!("executing computation: key={}", key);
        let _guard = FlightGuard {
            flights: &self.flights,
            key,
        };
        let result = op().await;

        // 先广播结果再让守卫移除记录；窗口期内新到的调用者会
        // 发起一次全新计算，不影响正确性
        let shared = match &result {
            Ok(bytes) => FlightState::Done(Ok(bytes.clone())),
            Err(e) => FlightState::Done(Err(e.to_string())),
        };
        let _ = tx.send(shared);
        result
    }

    /// 作为等待者挂起，直到执行者发布结果或被取消
    async fn wait(key: &str, mut rx: watch::Receiver<FlightState>) -> Result<Vec<u8>> {
        loop {
            let done = match &*rx.borrow() {
                FlightState::Pending => None,
                FlightState::Done(result) => Some(result.clone()),
            };
            if let Some(result) = done {
                return result.map_err(CacheError::ComputationAborted);
            }
            if rx.changed().await.is_err() {
                // 发送端已丢弃。结果若仍未发布，说明执行者在完成前被取消
                let published = matches!(&*rx.borrow(), FlightState::Done(_));
                if !published {
                    return Err(CacheError::ComputationAborted(format!(
                        "executor for key '{}' was cancelled before completion",
                        key
                    )));
                }
            }
        }
    }
}

impl Default for FlightCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
