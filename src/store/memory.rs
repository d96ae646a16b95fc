//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于内存的后端存储适配器，使用Moka作为底层缓存库。

use super::{Entry, Store};
use crate::config::MemoryStoreConfig;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use moka::future::Cache;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// 内存后端存储适配器
///
/// 基于Moka的进程内键值存储，读取时检查过期（过期视为隐式删除），
/// 并维护标签到键集合的反向索引以支持按标签批量失效
pub struct MemoryStore {
    /// 条目缓存
    cache: Cache<String, Entry>,
    /// 标签 -> 键集合 反向索引
    tag_index: DashMap<String, HashSet<String>>,
    /// 键的最大长度
    max_key_length: Option<usize>,
    /// 值的最大大小（字节）
    max_value_size: Option<usize>,
}

impl MemoryStore {
    /// 创建新的内存存储实例
    ///
    /// # 参数
    ///
    /// * `max_capacity` - 最大缓存条目数
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
            tag_index: DashMap::new(),
            max_key_length: None,
            max_value_size: None,
        }
    }

    /// 根据配置创建内存存储实例
    pub fn from_config(config: &MemoryStoreConfig) -> Self {
        Self {
            cache: Cache::builder().max_capacity(config.max_capacity).build(),
            tag_index: DashMap::new(),
            max_key_length: config.max_key_length,
            max_value_size: config.max_value_size,
        }
    }

    /// 校验键和值的大小限制
    fn check_limits(&self, key: &str, value_len: usize) -> Result<()> {
        if let Some(max_len) = self.max_key_length {
            if key.len() > max_len {
                return Err(CacheError::LimitExceeded(format!(
                    "key length {} exceeds limit {}",
                    key.len(),
                    max_len
                )));
            }
        }
        if let Some(max_size) = self.max_value_size {
            if value_len > max_size {
                return Err(CacheError::LimitExceeded(format!(
                    "value size {} exceeds limit {}",
                    value_len, max_size
                )));
            }
        }
        Ok(())
    }

    /// 将键记录到各标签的索引中
    fn tag(&self, key: &str, tags: &[String]) {
        for tag in tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// 从各标签的索引中移除键，并清理空的标签集合
    fn untag(&self, key: &str, tags: &[String]) {
        for tag in tags {
            if let Some(mut set) = self.tag_index.get_mut(tag) {
                set.remove(key);
            }
            self.tag_index.remove_if(tag, |_, set| set.is_empty());
        }
    }

    /// 移除条目并同步清理标签索引
    async fn evict(&self, key: &str) -> Option<Entry> {
        let removed = self.cache.remove(key).await;
        if let Some(entry) = &removed {
            self.untag(key, &entry.tags);
        }
        removed
    }
}

#[async_trait]
impl Store for MemoryStore {
    #[instrument(skip(self), level = "debug")]
    async fn read(&self, key: &str) -> Result<Option<Entry>> {
        match self.cache.get(key).await {
            Some(entry) if entry.is_expired() => {
                self.evict(key).await;
                debug!("memory read: key={}, expired=true, removed", key);
                Ok(None)
            }
            Some(entry) => {
                debug!("memory read: key={}, found=true", key);
                Ok(Some(entry))
            }
            None => {
                debug!("memory read: key={}, found=false", key);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn write(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<u64>,
        tags: &[String],
    ) -> Result<()> {
        self.check_limits(key, value.len())?;

        // 覆盖写入前先摘掉旧条目的标签，避免索引残留
        if let Some(previous) = self.cache.get(key).await {
            self.untag(key, &previous.tags);
        }

        let entry = Entry::new(value, ttl, tags.to_vec());
        self.cache.insert(key.to_string(), entry).await;
        self.tag(key, tags);
        debug!("memory write: key={}, ttl={:?}, tags={:?}", key, ttl, tags);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        self.evict(key).await;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_by_tag(&self, tag: &str) -> Result<()> {
        let keys = match self.tag_index.remove(tag) {
            Some((_, keys)) => keys,
            None => return Ok(()),
        };
        debug!("memory delete_by_tag: tag={}, keys={}", tag, keys.len());
        // 覆盖写与索引更新不是原子的，索引可能残留陈旧的键；
        // 删除前核对条目当前确实携带该标签
        join_all(keys.iter().map(|key| async move {
            if let Some(entry) = self.cache.get(key).await {
                if entry.tags.iter().any(|t| t == tag) {
                    self.evict(key).await;
                }
            }
        }))
        .await;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.read(key).await?.is_some())
    }
}
