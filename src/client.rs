//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了读穿透缓存客户端，是访问层对外的公共接口。

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::flight::FlightCoordinator;
use crate::serialization::{Serializer, SerializerEnum};
use crate::store::Store;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

/// 读穿透缓存客户端
///
/// 包装一个可插拔的后端存储：命中时单次读取直接返回，
/// 未命中时通过单飞协调器合并同键并发计算，计算结果
/// 写回存储后返回。访问层自身不做重试，后端错误原样上抛
pub struct CacheClient {
    /// 后端存储
    store: Arc<dyn Store>,
    /// 单飞协调器
    flights: FlightCoordinator,
    /// 序列化器
    serializer: SerializerEnum,
    /// remember 便捷接口使用的默认过期时间（秒）
    default_ttl: u64,
}

impl CacheClient {
    /// 创建新的缓存客户端
    ///
    /// # 参数
    ///
    /// * `store` - 后端存储实例，由调用方在进程启动时创建并共享
    /// * `serializer` - 序列化器
    pub fn new(store: Arc<dyn Store>, serializer: SerializerEnum) -> Self {
        Self {
            store,
            flights: FlightCoordinator::new(),
            serializer,
            default_ttl: crate::config::DEFAULT_TTL_SECS,
        }
    }

    /// 根据配置创建缓存客户端
    pub fn with_config(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            flights: FlightCoordinator::new(),
            serializer: config.serializer(),
            default_ttl: config.cache.default_ttl,
        }
    }

    /// 校验缓存键的合法性
    fn check_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey("key must not be empty".to_string()));
        }
        Ok(())
    }

    /// 获取缓存值
    ///
    /// 对后端存储执行且仅执行一次读取，不做存在性预检查。
    /// 后端不可用时错误原样上抛，不在此层重试
    #[instrument(skip(self), level = "debug")]
    pub async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        Self::check_key(key)?;
        match self.store.read(key).await? {
            Some(entry) => {
                debug!("cache hit: key={}", key);
                Ok(Some(self.serializer.deserialize(&entry.value)?))
            }
            None => {
                debug!("cache miss: key={}", key);
                Ok(None)
            }
        }
    }

    /// 获取缓存值，未命中时计算并写回（remember语义）
    ///
    /// 快速路径只执行一次存储读取，命中后零额外存储操作。
    /// 未命中时交给单飞协调器：同一键的并发未命中只触发一次
    /// `compute`，所有调用者共享这次计算的结果或失败。
    ///
    /// 计算结果序列化后等于缺失哨兵（JSON `null` 或空负载）时，
    /// 以 `InvalidComputedValue` 拒绝且不写入存储，缺失正是
    /// 快速路径赖以判断未命中的信号，不允许被污染
    ///
    /// # 参数
    ///
    /// * `key` - 缓存键
    /// * `tags` - 写入时附加的标签
    /// * `ttl` - 过期时间（秒），None表示永不过期
    /// * `compute` - 未命中时的计算函数
    #[instrument(skip(self, compute), level = "debug")]
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        tags: &[String],
        ttl: Option<u64>,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        Self::check_key(key)?;

        if let Some(entry) = self.store.read(key).await? {
            debug!("cache hit: key={}", key);
            return self.serializer.deserialize(&entry.value);
        }
        debug!("cache miss, entering single-flight: key={}", key);

        let store = Arc::clone(&self.store);
        let serializer = self.serializer.clone();
        let owned_key = key.to_string();
        let tags = tags.to_vec();

        let bytes = self
            .flights
            .compute(key, move || async move {
                let value = compute().await?;
                if serializer.is_absence_sentinel(&value)? {
                    return Err(CacheError::InvalidComputedValue(format!(
                        "computed value for key '{}' serializes to the absence sentinel",
                        owned_key
                    )));
                }
                let bytes = serializer.serialize(&value)?;
                store.write(&owned_key, bytes.clone(), ttl, &tags).await?;
                Ok(bytes)
            })
            .await?;

        self.serializer.deserialize(&bytes)
    }

    /// 使用配置的默认过期时间的 get_or_compute 便捷封装
    pub async fn remember<T, F, Fut>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.get_or_compute(key, &[], Some(self.default_ttl), compute)
            .await
    }

    /// 删除指定键的缓存条目，键不存在时为幂等空操作
    #[instrument(skip(self), level = "debug")]
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        Self::check_key(key)?;
        self.store.delete(key).await
    }

    /// 删除携带指定标签的所有缓存条目，标签不存在时为幂等空操作
    #[instrument(skip(self), level = "debug")]
    pub async fn invalidate_by_tag(&self, tag: &str) -> Result<()> {
        self.store.delete_by_tag(tag).await
    }

    /// 当前在途计算的数量
    pub fn pending_computations(&self) -> usize {
        self.flights.len()
    }
}
