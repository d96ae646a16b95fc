//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存访问层的错误类型和处理机制。

use thiserror::Error;

/// 缓存访问层错误类型枚举
///
/// 定义了读穿透缓存访问过程中可能发生的各种错误类型
#[derive(Error, Debug)]
pub enum CacheError {
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 后端存储不可用
    #[error("Backing store unavailable: {0}")]
    StoreUnavailable(String),

    /// 计算结果等于缺失哨兵值，禁止写入
    #[error("Invalid computed value: {0}")]
    InvalidComputedValue(String),

    /// 计算执行者在完成前失败或被取消
    #[error("Computation aborted: {0}")]
    ComputationAborted(String),

    /// 非法缓存键
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// 超出键或值的大小限制
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// 缓存操作结果类型别名
///
/// 简化错误处理，所有缓存操作都返回此类型
pub type Result<T> = std::result::Result<T, CacheError>;
