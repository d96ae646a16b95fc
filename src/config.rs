//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存访问层的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use crate::serialization::{JsonSerializer, SerializerEnum};
use serde::Deserialize;
use std::path::Path;

/// 默认缓存过期时间（秒）
pub const DEFAULT_TTL_SECS: u64 = 300;

/// 顶层配置
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// 缓存访问层配置
    #[serde(default)]
    pub cache: CacheConfig,
    /// 内存存储适配器配置
    #[serde(default)]
    pub memory: MemoryStoreConfig,
}

/// 缓存访问层配置
///
/// 定义访问层的默认行为
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CacheConfig {
    /// 默认的缓存过期时间（秒），用于 remember 便捷接口
    pub default_ttl: u64,
    /// 序列化类型
    pub serialization: SerializationType,
    /// 是否对序列化后的负载启用gzip压缩
    pub compress: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL_SECS,
            serialization: SerializationType::Json,
            compress: false,
        }
    }
}

/// 内存存储适配器配置
///
/// 定义内存后端存储的容量和大小限制
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct MemoryStoreConfig {
    /// 最大缓存条目数
    pub max_capacity: u64,
    /// 键的最大长度，None表示不限制
    pub max_key_length: Option<usize>,
    /// 值的最大大小（字节），None表示不限制
    pub max_value_size: Option<usize>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            max_key_length: Some(1024),
            max_value_size: Some(1024 * 1024),
        }
    }
}

/// 序列化类型枚举
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializationType {
    /// JSON序列化
    #[default]
    Json,
}

impl Config {
    /// 从TOML文件加载配置
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    ///
    /// # 返回值
    ///
    /// 返回解析并校验后的配置或错误
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| CacheError::ConfigError(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置的合法性
    pub fn validate(&self) -> Result<()> {
        if self.memory.max_capacity == 0 {
            return Err(CacheError::ConfigError(
                "memory.max_capacity must be greater than 0".to_string(),
            ));
        }
        if self.cache.default_ttl == 0 {
            return Err(CacheError::ConfigError(
                "cache.default_ttl must be greater than 0".to_string(),
            ));
        }
        if matches!(self.memory.max_key_length, Some(0)) {
            return Err(CacheError::ConfigError(
                "memory.max_key_length must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// 根据配置构建序列化器
    pub fn serializer(&self) -> SerializerEnum {
        match self.cache.serialization {
            SerializationType::Json if self.cache.compress => {
                SerializerEnum::Json(JsonSerializer::with_compression())
            }
            SerializationType::Json => SerializerEnum::Json(JsonSerializer::new()),
        }
    }
}
