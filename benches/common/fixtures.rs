use futures::future::BoxFuture;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use swr_fetch::CacheKey;

/// Test data structure for benchmarks
#[derive(Clone, Debug, PartialEq)]
pub struct BenchUser {
    pub id: u64,
    pub name: String,
    pub email: String,
}

impl BenchUser {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: format!("User {}", id),
            email: format!("user{}@example.com", id),
        }
    }
}

/// Simulated API with configurable latency
#[derive(Clone)]
pub struct FakeApi {
    data: Arc<HashMap<String, BenchUser>>,
    latency_ms: u64,
    request_count: Arc<AtomicUsize>,
}

impl FakeApi {
    pub fn new(num_users: usize, latency_ms: u64) -> Self {
        let data = (0..num_users)
            .map(|i| (format!("/users/{}", i), BenchUser::new(i as u64)))
            .collect();

        Self {
            data: Arc::new(data),
            latency_ms,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Producer for `GET {path}`.
    pub fn producer(
        &self,
        path: &str,
    ) -> impl Fn() -> BoxFuture<'static, Result<BenchUser, String>> + Send + Sync + 'static {
        let api = self.clone();
        let path = path.to_string();
        move || {
            let api = api.clone();
            let path = path.clone();
            Box::pin(async move {
                api.request_count.fetch_add(1, Ordering::Relaxed);

                // Simulate network latency
                tokio::time::sleep(Duration::from_millis(api.latency_ms)).await;

                api.data
                    .get(&path)
                    .cloned()
                    .ok_or_else(|| format!("404 {}", path))
            })
        }
    }

    #[allow(dead_code)]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }
}

/// Generate request paths and keys for different workload patterns
pub struct KeyGenerator {
    num_keys: usize,
}

impl KeyGenerator {
    pub fn new(num_keys: usize) -> Self {
        Self { num_keys }
    }

    /// Sequential paths (for cold cache tests)
    pub fn sequential(&self) -> Vec<(CacheKey, String)> {
        (0..self.num_keys).map(Self::request).collect()
    }

    /// Keys for mixed workload (some hits, some misses)
    pub fn mixed(&self, hit_ratio: f64) -> Vec<(CacheKey, String)> {
        let mut rng = rand::thread_rng();
        let hot_key_count = ((self.num_keys as f64 * hit_ratio) as usize).max(1);

        (0..1000)
            .map(|_| {
                if rng.gen_bool(hit_ratio) || hot_key_count >= self.num_keys {
                    Self::request(rng.gen_range(0..hot_key_count))
                } else {
                    Self::request(rng.gen_range(hot_key_count..self.num_keys))
                }
            })
            .collect()
    }

    fn request(id: usize) -> (CacheKey, String) {
        let path = format!("/users/{}", id);
        (CacheKey::from_request("GET", &path), path)
    }
}
