//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 读穿透路径集成测试：命中单次读取、回源写回、过期语义与哨兵校验。

#[path = "../common/mod.rs"]
mod common;

use common::{setup_logging, CountingStore, UnavailableStore};
use oxflight::error::CacheError;
use oxflight::serialization::{JsonSerializer, SerializerEnum};
use oxflight::{CacheClient, Config, Store};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn new_client(store: Arc<CountingStore>) -> CacheClient {
    CacheClient::new(store, SerializerEnum::Json(JsonSerializer::new()))
}

#[tokio::test]
async fn test_hit_performs_exactly_one_store_read() {
    setup_logging();

    let store = Arc::new(CountingStore::new(100));
    let client = new_client(store.clone());

    store
        .write("user:1", b"\"alice\"".to_vec(), None, &[])
        .await
        .expect("seed write failed");
    let baseline = store.read_count();

    let value: Option<String> = client.get("user:1").await.expect("get failed");
    assert_eq!(value.as_deref(), Some("alice"));
    assert_eq!(store.read_count() - baseline, 1, "hit must read exactly once");
    assert_eq!(store.exists_count(), 0, "hot path must never call exists");
}

#[tokio::test]
async fn test_get_missing_key_returns_none() {
    setup_logging();

    let store = Arc::new(CountingStore::new(100));
    let client = new_client(store.clone());

    let value: Option<String> = client.get("absent").await.expect("get failed");
    assert!(value.is_none());
    assert_eq!(store.read_count(), 1);
}

#[tokio::test]
async fn test_read_through_round_trip() {
    setup_logging();

    let store = Arc::new(CountingStore::new(100));
    let client = new_client(store.clone());
    let computations = Arc::new(AtomicUsize::new(0));

    // 空存储上回源：恰好一次计算、一次写入
    let counter = computations.clone();
    let value: u64 = client
        .get_or_compute("n", &[], Some(600), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await
        .expect("get_or_compute failed");
    assert_eq!(value, 42);
    assert_eq!(computations.load(Ordering::SeqCst), 1);
    assert_eq!(store.write_count(), 1);

    // 紧接着的get命中：一次读取、零额外计算
    let baseline = store.read_count();
    let cached: Option<u64> = client.get("n").await.expect("get failed");
    assert_eq!(cached, Some(42));
    assert_eq!(store.read_count() - baseline, 1);
    assert_eq!(computations.load(Ordering::SeqCst), 1);

    // 再次回源命中快速路径，计算函数不被调用
    let counter = computations.clone();
    let again: u64 = client
        .get_or_compute("n", &[], Some(600), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        })
        .await
        .expect("get_or_compute failed");
    assert_eq!(again, 42);
    assert_eq!(computations.load(Ordering::SeqCst), 1);
    assert_eq!(store.exists_count(), 0, "hot path must never call exists");
}

#[tokio::test]
async fn test_expired_entry_is_treated_as_absent() {
    setup_logging();

    let store = Arc::new(CountingStore::new(100));
    let client = new_client(store.clone());

    let value: u32 = client
        .get_or_compute("short", &[], Some(1), || async { Ok(7) })
        .await
        .expect("get_or_compute failed");
    assert_eq!(value, 7);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let cached: Option<u32> = client.get("short").await.expect("get failed");
    assert!(cached.is_none(), "expired entry must not be surfaced");

    // 过期后回源重新计算
    let recomputed: u32 = client
        .get_or_compute("short", &[], Some(60), || async { Ok(8) })
        .await
        .expect("get_or_compute failed");
    assert_eq!(recomputed, 8);
}

#[tokio::test]
async fn test_null_sentinel_is_rejected_and_not_written() {
    setup_logging();

    let store = Arc::new(CountingStore::new(100));
    let client = new_client(store.clone());

    let result: Result<Option<u32>, _> = client
        .get_or_compute("maybe", &[], Some(60), || async { Ok(Option::<u32>::None) })
        .await;
    assert!(matches!(result, Err(CacheError::InvalidComputedValue(_))));
    assert_eq!(store.write_count(), 0, "sentinel value must not be written");

    let cached: Option<Option<u32>> = client.get("maybe").await.expect("get failed");
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_empty_key_is_rejected() {
    setup_logging();

    let store = Arc::new(CountingStore::new(100));
    let client = new_client(store.clone());

    let get_result: Result<Option<u32>, _> = client.get("").await;
    assert!(matches!(get_result, Err(CacheError::InvalidKey(_))));

    let compute_result: Result<u32, _> = client
        .get_or_compute("", &[], None, || async { Ok(1) })
        .await;
    assert!(matches!(compute_result, Err(CacheError::InvalidKey(_))));

    assert!(matches!(
        client.invalidate("").await,
        Err(CacheError::InvalidKey(_))
    ));
    assert_eq!(store.read_count(), 0, "invalid keys must not reach the store");
}

#[tokio::test]
async fn test_store_unavailable_is_propagated_unchanged() {
    setup_logging();

    let client = CacheClient::new(
        Arc::new(UnavailableStore),
        SerializerEnum::Json(JsonSerializer::new()),
    );

    let get_result: Result<Option<u32>, _> = client.get("k").await;
    assert!(matches!(get_result, Err(CacheError::StoreUnavailable(_))));

    let compute_result: Result<u32, _> = client
        .get_or_compute("k", &[], None, || async { Ok(1) })
        .await;
    assert!(matches!(
        compute_result,
        Err(CacheError::StoreUnavailable(_))
    ));

    assert!(matches!(
        client.invalidate("k").await,
        Err(CacheError::StoreUnavailable(_))
    ));
    assert!(matches!(
        client.invalidate_by_tag("t").await,
        Err(CacheError::StoreUnavailable(_))
    ));
}

#[tokio::test]
async fn test_remember_caches_under_config_default_ttl() {
    setup_logging();

    let config = Config::from_toml("[cache]\ndefault_ttl = 1\n").expect("failed to parse config");
    let store = Arc::new(CountingStore::new(100));
    let client = CacheClient::with_config(store.clone(), &config);
    let computations = Arc::new(AtomicUsize::new(0));

    let counter = computations.clone();
    let value: u32 = client
        .remember("r", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(21)
        })
        .await
        .expect("remember failed");
    assert_eq!(value, 21);
    assert_eq!(store.write_count(), 1);

    // 命中快速路径：零额外计算
    let counter = computations.clone();
    let cached: u32 = client
        .remember("r", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        })
        .await
        .expect("remember failed");
    assert_eq!(cached, 21);
    assert_eq!(computations.load(Ordering::SeqCst), 1);
    assert_eq!(client.get::<u32>("r").await.expect("get failed"), Some(21));

    // 超过配置的默认TTL后条目过期，remember重新计算
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let counter = computations.clone();
    let recomputed: u32 = client
        .remember("r", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(22)
        })
        .await
        .expect("remember failed");
    assert_eq!(recomputed, 22);
    assert_eq!(computations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_with_config_compression_round_trips_through_store() {
    setup_logging();

    let config = Config::from_toml("[cache]\ncompress = true\n").expect("failed to parse config");
    let store = Arc::new(CountingStore::new(100));
    let client = CacheClient::with_config(store.clone(), &config);

    let value: String = client
        .get_or_compute("z", &[], Some(60), || async { Ok("zipped".to_string()) })
        .await
        .expect("get_or_compute failed");
    assert_eq!(value, "zipped");

    let cached: Option<String> = client.get("z").await.expect("get failed");
    assert_eq!(cached.as_deref(), Some("zipped"));

    // 哨兵校验基于压缩前的文档形式，启用压缩时依然生效
    let result: Result<Option<u32>, _> = client
        .get_or_compute("m", &[], Some(60), || async { Ok(Option::<u32>::None) })
        .await;
    assert!(matches!(result, Err(CacheError::InvalidComputedValue(_))));
    assert_eq!(store.write_count(), 1, "sentinel value must not be written");
}

#[tokio::test]
async fn test_never_expiring_entry_survives() {
    setup_logging();

    let store = Arc::new(CountingStore::new(100));
    let client = new_client(store.clone());

    let value: String = client
        .get_or_compute("pinned", &[], None, || async {
            Ok("forever".to_string())
        })
        .await
        .expect("get_or_compute failed");
    assert_eq!(value, "forever");

    tokio::time::sleep(Duration::from_millis(50)).await;
    let cached: Option<String> = client.get("pinned").await.expect("get failed");
    assert_eq!(cached.as_deref(), Some("forever"));
}
