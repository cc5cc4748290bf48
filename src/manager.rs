//! Cache Manager
//!
//! Registry of named cachers that forwards every operation to the current one,
//! optionally guarded by a circuit breaker that fails over to fallbacks when
//! the primary stops answering pings.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cacher::Cacher;
use crate::chain::ChainedCache;
use crate::config::{Config, DEFAULT_CHECK_INTERVAL};
use crate::error::{CacheError, Result};

// == Circuit Breaker Settings ==
/// Primary/fallback failover policy.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    /// Cacher used while healthy
    pub primary: String,
    /// Tried in order when the primary fails its ping
    pub fallbacks: Vec<String>,
    /// How long to stay on a fallback before pinging the primary again
    pub check_interval: Duration,
}

impl CircuitBreaker {
    pub fn new(primary: impl Into<String>, fallbacks: &[&str]) -> Self {
        Self {
            primary: primary.into(),
            fallbacks: fallbacks.iter().map(|name| name.to_string()).collect(),
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Same as [`CircuitBreaker::new`] with the interval taken from configuration.
    pub fn from_config(primary: impl Into<String>, fallbacks: &[&str], config: &Config) -> Self {
        Self::new(primary, fallbacks).check_interval(config.check_interval())
    }

    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }
}

#[derive(Debug)]
struct Routing {
    current: Option<String>,
    circuit_open: bool,
    last_check: Instant,
}

// == Cache Manager ==
/// Named cacher registry acting as a [`Cacher`] itself.
pub struct CacheManager {
    cachers: RwLock<HashMap<String, Arc<dyn Cacher>>>,
    routing: Mutex<Routing>,
    breaker: Option<CircuitBreaker>,
    /// Applied to writes that carry no TTL
    default_ttl: Option<Duration>,
    chain: OnceLock<Arc<ChainedCache>>,
    debug: bool,
}

impl CacheManager {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            cachers: RwLock::new(HashMap::new()),
            routing: Mutex::new(Routing {
                current: None,
                circuit_open: false,
                last_check: Instant::now(),
            }),
            breaker: None,
            default_ttl: None,
            chain: OnceLock::new(),
            debug: false,
        }
    }

    /// Creates a manager with options taken from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_debug(config.debug)
            .with_default_ttl(config.default_ttl())
    }

    /// TTL used by `set` when the caller passes `None`. Zero disables it.
    ///
    /// An explicit `Some(Duration::ZERO)` still stores without expiry.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl).filter(|ttl| !ttl.is_zero());
        self
    }

    /// Logs every forwarded operation at debug level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enables failover. The primary becomes the current cacher.
    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.routing.get_mut().current = Some(breaker.primary.clone());
        self.breaker = Some(breaker);
        self
    }

    // == Registry ==
    /// Adds a cacher under `name` and makes it current.
    pub async fn register(&self, name: impl Into<String>, cacher: Arc<dyn Cacher>) {
        let name = name.into();
        self.cachers.write().await.insert(name.clone(), cacher);
        self.routing.lock().await.current = Some(name.clone());
        if self.debug {
            debug!(cacher = %name, "Registered cacher");
        }
    }

    /// Returns the cacher registered under `name`.
    pub async fn use_cacher(&self, name: &str) -> Option<Arc<dyn Cacher>> {
        let cacher = self.cachers.read().await.get(name).cloned();
        if self.debug && cacher.is_some() {
            debug!(cacher = name, "Using cacher");
        }
        cacher
    }

    pub(crate) async fn lookup(&self, name: &str) -> Result<Arc<dyn Cacher>> {
        self.cachers
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::UnknownCacher(name.to_string()))
    }

    /// The cacher operations are forwarded to when no failover applies.
    pub async fn current(&self) -> Result<Arc<dyn Cacher>> {
        let name = self.current_name().await.ok_or_else(|| {
            CacheError::UnknownCacher("no cacher registered".to_string())
        })?;
        self.lookup(&name).await
    }

    pub async fn current_name(&self) -> Option<String> {
        self.routing.lock().await.current.clone()
    }

    /// Switches the current cacher.
    pub async fn set_current(&self, name: &str) -> Result<()> {
        self.lookup(name).await?;
        self.routing.lock().await.current = Some(name.to_string());
        Ok(())
    }

    /// True while the circuit breaker has failed over away from the primary.
    pub async fn is_circuit_open(&self) -> bool {
        self.routing.lock().await.circuit_open
    }

    /// The manager's chain, created on first use and shared afterwards.
    ///
    /// Use [`ChainedCache::override_chain`] for an independent chain.
    pub fn chain(self: &Arc<Self>) -> Arc<ChainedCache> {
        Arc::clone(self.chain.get_or_init(|| Arc::new(ChainedCache::new(self))))
    }

    // == Circuit Breaker ==
    /// Picks the cacher for the next operation.
    async fn route(&self) -> Result<Arc<dyn Cacher>> {
        let Some(breaker) = &self.breaker else {
            return self.current().await;
        };

        let mut routing = self.routing.lock().await;
        let Ok(primary) = self.lookup(&breaker.primary).await else {
            drop(routing);
            return self.current().await;
        };

        if !routing.circuit_open {
            if primary.ping().await.is_ok() {
                return Ok(primary);
            }

            routing.circuit_open = true;
            routing.last_check = Instant::now();
            warn!(primary = %breaker.primary, "Circuit opened: primary cacher unavailable");

            for name in &breaker.fallbacks {
                let Ok(fallback) = self.lookup(name).await else {
                    continue;
                };
                if fallback.ping().await.is_ok() {
                    routing.current = Some(name.clone());
                    info!(fallback = %name, "Switched to fallback cacher");
                    return Ok(fallback);
                }
            }
        } else if routing.last_check.elapsed() >= breaker.check_interval {
            if primary.ping().await.is_ok() {
                routing.circuit_open = false;
                routing.current = Some(breaker.primary.clone());
                info!(primary = %breaker.primary, "Circuit closed: primary cacher back online");
                return Ok(primary);
            }
            routing.last_check = Instant::now();
        }

        drop(routing);
        self.current().await
    }

    async fn all_cachers(&self) -> Vec<(String, Arc<dyn Cacher>)> {
        self.cachers
            .read()
            .await
            .iter()
            .map(|(name, cacher)| (name.clone(), Arc::clone(cacher)))
            .collect()
    }

    fn trace(&self, op: &str, key: &str) {
        if self.debug {
            debug!(op, key, "Forwarding cache operation");
        }
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cacher for CacheManager {
    fn name(&self) -> &str {
        "manager"
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Result<()> {
        self.trace("set", key);
        let ttl = ttl.or(self.default_ttl);
        self.route().await?.set(key, value, ttl, tags).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.trace("get", key);
        self.route().await?.get(key).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.trace("remove", key);
        self.route().await?.remove(key).await
    }

    async fn remove_by_tag(&self, tag: &str) -> Result<()> {
        self.trace("remove_by_tag", tag);
        self.route().await?.remove_by_tag(tag).await
    }

    async fn remove_by_tags(&self, tags: &[&str]) -> Result<()> {
        self.trace("remove_by_tags", &tags.join(","));
        self.route().await?.remove_by_tags(tags).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.trace("exists", key);
        self.route().await?.exists(key).await
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        self.trace("increment", key);
        self.route().await?.increment(key).await
    }

    async fn decrement(&self, key: &str) -> Result<i64> {
        self.trace("decrement", key);
        self.route().await?.decrement(key).await
    }

    async fn get_keys_by_tag(&self, tag: &str) -> Result<Vec<String>> {
        self.trace("get_keys_by_tag", tag);
        self.route().await?.get_keys_by_tag(tag).await
    }

    async fn flush(&self) -> Result<()> {
        self.trace("flush", "*");
        self.route().await?.flush().await
    }

    /// Pings every registered cacher.
    async fn ping(&self) -> Result<()> {
        let mut errors = Vec::new();
        for (name, cacher) in self.all_cachers().await {
            if let Err(err) = cacher.ping().await {
                warn!(cacher = %name, error = %err, "Ping failed");
                errors.push(err);
            }
        }
        CacheError::aggregate(errors)
    }

    /// Closes every registered cacher.
    async fn close(&self) -> Result<()> {
        let mut errors = Vec::new();
        for (name, cacher) in self.all_cachers().await {
            if let Err(err) = cacher.close().await {
                warn!(cacher = %name, error = %err, "Close failed");
                errors.push(err);
            }
        }
        CacheError::aggregate(errors)
    }
}
