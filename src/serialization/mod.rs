//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存访问层的序列化机制。

pub mod json;

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

pub use json::JsonSerializer;

/// 序列化器特征
///
/// 定义序列化和反序列化操作的接口
pub trait Serializer: Send + Sync {
    /// 序列化值为字节数组
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// 从字节数组反序列化值
    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;

    /// 判断值是否序列化为缺失哨兵
    ///
    /// 哨兵判定必须基于逻辑文档形式，与压缩等传输编码无关
    fn is_absence_sentinel<T: Serialize>(&self, value: &T) -> Result<bool>;
}

/// 序列化器枚举
///
/// 用于支持 trait object 的序列化器
#[derive(Clone)]
pub enum SerializerEnum {
    Json(JsonSerializer),
}

impl Serializer for SerializerEnum {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            SerializerEnum::Json(s) => s.serialize(value),
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        match self {
            SerializerEnum::Json(s) => s.deserialize(data),
        }
    }

    fn is_absence_sentinel<T: Serialize>(&self, value: &T) -> Result<bool> {
        match self {
            SerializerEnum::Json(s) => s.is_absence_sentinel(value),
        }
    }
}
