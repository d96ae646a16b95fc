//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了后端存储的契约接口和缓存条目模型。

pub mod memory;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Instant;

pub use memory::MemoryStore;

/// 缓存条目
///
/// 由后端存储拥有，访问层在单次调用之外不持有条目
#[derive(Debug, Clone)]
pub struct Entry {
    /// 序列化后的缓存值
    pub value: Vec<u8>,
    /// 过期时间点，None表示永不过期
    pub expires_at: Option<Instant>,
    /// 附加在条目上的标签集合
    pub tags: Vec<String>,
}

impl Entry {
    /// 构建新的缓存条目
    ///
    /// # 参数
    ///
    /// * `value` - 序列化后的缓存值
    /// * `ttl` - 过期时间（秒），None表示永不过期
    /// * `tags` - 标签集合
    pub fn new(value: Vec<u8>, ttl: Option<u64>, tags: Vec<String>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|secs| Instant::now() + std::time::Duration::from_secs(secs)),
            tags,
        }
    }

    /// 判断条目是否已过期
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expire_at) => Instant::now() >= expire_at,
            None => false,
        }
    }
}

/// 后端存储特征
///
/// 定义访问层依赖的后端存储契约，每个方法对应底层介质上的
/// 一次逻辑操作。所有方法都可能以 `StoreUnavailable` 失败，
/// 访问层不做重试，重试策略属于外部协作者。
#[async_trait]
pub trait Store: Send + Sync {
    /// 读取缓存条目
    ///
    /// 过期视为隐式删除：实现必须保证不返回已过期的条目
    async fn read(&self, key: &str) -> Result<Option<Entry>>;

    /// 写入缓存条目
    ///
    /// # 参数
    ///
    /// * `key` - 缓存键
    /// * `value` - 序列化后的缓存值
    /// * `ttl` - 过期时间（秒），None表示永不过期
    /// * `tags` - 附加在条目上的标签
    async fn write(&self, key: &str, value: Vec<u8>, ttl: Option<u64>, tags: &[String])
        -> Result<()>;

    /// 删除缓存条目，键不存在时为幂等空操作
    async fn delete(&self, key: &str) -> Result<()>;

    /// 删除携带指定标签的所有条目，标签不存在时为幂等空操作
    async fn delete_by_tag(&self, tag: &str) -> Result<()>;

    /// 判断键是否存在
    ///
    /// 仅为接口完整性提供，访问层的热路径不会调用此方法
    async fn exists(&self, key: &str) -> Result<bool>;
}
