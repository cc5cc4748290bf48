//! Integration Tests for the Manager Layer
//!
//! Covers routing, circuit breaker failover and ping aggregation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tagcache::{
    CacheError, CacheManager, Cacher, CacherExt, CircuitBreaker, MemoryCacher, Result,
};
use tracing_subscriber::EnvFilter;

// == Helper Types ==

/// Memory backend whose ping can be switched off.
struct FlakyCacher {
    inner: MemoryCacher,
    healthy: AtomicBool,
}

impl FlakyCacher {
    fn new() -> Self {
        Self {
            inner: MemoryCacher::new(),
            healthy: AtomicBool::new(true),
        }
    }

    fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl Cacher for FlakyCacher {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>, tags: &[&str]) -> Result<()> {
        self.inner.set(key, value, ttl, tags).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }

    async fn remove_by_tag(&self, tag: &str) -> Result<()> {
        self.inner.remove_by_tag(tag).await
    }

    async fn remove_by_tags(&self, tags: &[&str]) -> Result<()> {
        self.inner.remove_by_tags(tags).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        self.inner.increment(key).await
    }

    async fn decrement(&self, key: &str) -> Result<i64> {
        self.inner.decrement(key).await
    }

    async fn get_keys_by_tag(&self, tag: &str) -> Result<Vec<String>> {
        self.inner.get_keys_by_tag(tag).await
    }

    async fn flush(&self) -> Result<()> {
        self.inner.flush().await
    }

    async fn ping(&self) -> Result<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable("flaky is down".to_string()))
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// == Circuit Breaker Tests ==

#[tokio::test(start_paused = true)]
async fn test_circuit_breaker_fails_over_and_recovers() {
    init_tracing();
    let primary = Arc::new(FlakyCacher::new());
    let fallback = Arc::new(MemoryCacher::new());

    let breaker = CircuitBreaker::new("primary", &["fallback"])
        .check_interval(Duration::from_secs(5));
    let manager = CacheManager::new()
        .with_debug(true)
        .with_circuit_breaker(breaker);
    manager.register("primary", primary.clone()).await;
    manager.register("fallback", fallback.clone()).await;

    // Healthy primary takes the write even though fallback registered last
    manager.set_value("a", "one", None, &[]).await.unwrap();
    assert!(primary.exists("a").await.unwrap());
    assert!(!fallback.exists("a").await.unwrap());

    primary.set_healthy(false);
    manager.set_value("b", "two", None, &[]).await.unwrap();
    assert!(manager.is_circuit_open().await);
    assert_eq!(manager.current_name().await.as_deref(), Some("fallback"));
    assert!(fallback.exists("b").await.unwrap());

    // Primary is back but the interval has not elapsed yet
    primary.set_healthy(true);
    tokio::time::advance(Duration::from_secs(2)).await;
    manager.set_value("c", "three", None, &[]).await.unwrap();
    assert!(fallback.exists("c").await.unwrap());
    assert!(manager.is_circuit_open().await);

    tokio::time::advance(Duration::from_secs(4)).await;
    let value: String = manager.get_value("a").await.unwrap();
    assert_eq!(value, "one");
    assert!(!manager.is_circuit_open().await);
    assert_eq!(manager.current_name().await.as_deref(), Some("primary"));
}

#[tokio::test(start_paused = true)]
async fn test_circuit_stays_open_while_primary_down() {
    init_tracing();
    let primary = Arc::new(FlakyCacher::new());
    primary.set_healthy(false);
    let fallback = Arc::new(MemoryCacher::new());

    let manager = CacheManager::new().with_circuit_breaker(
        CircuitBreaker::new("primary", &["missing", "fallback"])
            .check_interval(Duration::from_secs(1)),
    );
    manager.register("primary", primary.clone()).await;
    manager.register("fallback", fallback.clone()).await;

    manager.set("k", b"1".to_vec(), None, &[]).await.unwrap();
    tokio::time::advance(Duration::from_secs(3)).await;
    assert_eq!(manager.increment("k").await.unwrap(), 2);

    assert!(manager.is_circuit_open().await);
    assert!(!primary.exists("k").await.unwrap());
    assert_eq!(fallback.get("k").await.unwrap(), b"2");
}

// == Ping / Close Tests ==

#[tokio::test]
async fn test_ping_single_failure_is_returned_as_is() {
    let manager = CacheManager::new();
    let down = Arc::new(FlakyCacher::new());
    down.set_healthy(false);
    manager.register("memory", Arc::new(MemoryCacher::new())).await;
    manager.register("down", down).await;

    let result = manager.ping().await;
    assert!(matches!(result, Err(CacheError::Unavailable(_))));
}

#[tokio::test]
async fn test_ping_aggregates_failures() {
    let manager = CacheManager::new();
    for name in ["one", "two"] {
        let down = Arc::new(FlakyCacher::new());
        down.set_healthy(false);
        manager.register(name, down).await;
    }

    match manager.ping().await {
        Err(CacheError::Aggregate(errors)) => assert_eq!(errors.len(), 2),
        other => panic!("expected aggregate error, got {:?}", other),
    }
    assert!(manager.close().await.is_ok());
}

// == Routing Tests ==

#[tokio::test]
async fn test_manager_tag_operations() {
    let manager = CacheManager::new();
    let memory = Arc::new(MemoryCacher::new());
    manager.register("memory", memory.clone()).await;

    manager.set_value("user:1", "alice", None, &["users"]).await.unwrap();
    manager.set_value("user:2", "bob", None, &["users", "admins"]).await.unwrap();
    manager.set_value("post:1", "hello", None, &["posts"]).await.unwrap();

    manager.remove_by_tags(&["admins", "posts"]).await.unwrap();
    assert_eq!(
        manager.get_keys_by_tag("users").await.unwrap(),
        vec!["user:1".to_string()]
    );

    manager.remove_by_tag("users").await.unwrap();
    assert!(memory.store().is_empty());
}

#[tokio::test]
async fn test_manager_get_missing_key() {
    let manager = CacheManager::new();
    manager.register("memory", Arc::new(MemoryCacher::new())).await;

    let result = manager.get("missing").await;
    assert!(result.unwrap_err().is_not_found());
}
