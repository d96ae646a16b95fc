//! oxflight - 单飞读穿透缓存访问层
//!
//! 在可插拔后端存储之上提供读穿透缓存客户端：
//! 命中路径只做一次存储读取，同一键的并发未命中被合并为
//! 一次计算，支持TTL过期与按标签批量失效。

#![doc(html_root_url = "https://docs.rs/oxflight/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod client;
pub mod config;
pub mod error;
pub mod flight;
pub mod serialization;
pub mod store;

// Re-export commonly used items
pub use client::CacheClient;
pub use config::Config;
pub use error::{CacheError, Result};
pub use flight::FlightCoordinator;
pub use serialization::{JsonSerializer, Serializer, SerializerEnum};
pub use store::{Entry, MemoryStore, Store};

/// oxflight 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
