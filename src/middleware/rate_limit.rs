use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::config::RateLimitConfig;
use crate::error::AppError;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

/// 按 IP 的令牌桶限流，访客懒创建，空闲超过 ttl 后被清理
pub struct RateLimiter {
    name: &'static str,
    config: RateLimitConfig,
    visitors: RwLock<HashMap<String, Arc<Mutex<Bucket>>>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        Self {
            name,
            config,
            visitors: RwLock::new(HashMap::new()),
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn bucket(&self, key: &str, now: Instant) -> Arc<Mutex<Bucket>> {
        if let Some(bucket) = self
            .visitors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return bucket.clone();
        }

        let mut visitors = self.visitors.write().unwrap_or_else(PoisonError::into_inner);
        visitors
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Bucket {
                    tokens: self.config.burst as f64,
                    last_refill: now,
                    last_seen: now,
                }))
            })
            .clone()
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let bucket = self.bucket(key, now);
        let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.config.rps).min(self.config.burst as f64);
        bucket.last_refill = now;
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// 删除空闲超过 ttl 的访客，返回删除数量
    pub fn sweep(&self, now: Instant) -> usize {
        let mut visitors = self.visitors.write().unwrap_or_else(PoisonError::into_inner);
        let before = visitors.len();
        visitors.retain(|_, bucket| {
            let bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
            now.saturating_duration_since(bucket.last_seen) <= self.config.ttl
        });
        before - visitors.len()
    }

    pub fn visitor_count(&self) -> usize {
        self.visitors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 后台定时清理
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep(Instant::now());
                if removed > 0 {
                    tracing::debug!(limiter = limiter.name, removed, "swept idle visitors");
                }
            }
        })
    }
}

/// 依次取 x-real-ip、x-forwarded-for 第一个地址、连接地址
pub fn client_ip(req: &Request<Body>) -> String {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    req.headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&req);

    if !limiter.allow(&ip) {
        tracing::warn!(limiter = limiter.name, ip = %ip, "rate limited");
        return AppError::RateLimited.into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rps: f64, burst: u32) -> RateLimiter {
        RateLimiter::new(
            "test",
            RateLimitConfig {
                rps,
                burst,
                ttl: Duration::from_secs(60),
            },
        )
    }

    #[test]
    fn allows_burst_then_refills() {
        let limiter = limiter(2.0, 2);
        let start = Instant::now();

        assert!(limiter.allow_at("1.1.1.1", start));
        assert!(limiter.allow_at("1.1.1.1", start));
        assert!(!limiter.allow_at("1.1.1.1", start));

        // 0.5 秒补充一个令牌
        let later = start + Duration::from_millis(500);
        assert!(limiter.allow_at("1.1.1.1", later));
        assert!(!limiter.allow_at("1.1.1.1", later));
    }

    #[test]
    fn visitors_are_independent() {
        let limiter = limiter(1.0, 1);
        let now = Instant::now();
        assert!(limiter.allow_at("a", now));
        assert!(!limiter.allow_at("a", now));
        assert!(limiter.allow_at("b", now));
    }

    #[test]
    fn refill_never_exceeds_burst() {
        let limiter = limiter(100.0, 3);
        let start = Instant::now();
        assert!(limiter.allow_at("a", start));
        let much_later = start + Duration::from_secs(3600);
        for _ in 0..3 {
            assert!(limiter.allow_at("a", much_later));
        }
        assert!(!limiter.allow_at("a", much_later));
    }

    #[test]
    fn sweep_removes_idle_visitors() {
        let limiter = limiter(1.0, 1);
        let start = Instant::now();
        limiter.allow_at("idle", start);
        limiter.allow_at("busy", start + Duration::from_secs(50));

        assert_eq!(limiter.sweep(start + Duration::from_secs(61)), 1);
        assert_eq!(limiter.visitor_count(), 1);
    }

    #[test]
    fn client_ip_prefers_proxy_headers() {
        let req = Request::builder()
            .header("x-forwarded-for", " , 10.0.0.1, 10.0.0.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), "10.0.0.1");

        let req = Request::builder()
            .header("x-real-ip", "192.168.1.9")
            .header("x-forwarded-for", "10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), "192.168.1.9");

        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&req), "unknown");
    }
}
