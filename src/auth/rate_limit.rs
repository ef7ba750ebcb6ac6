use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Sliding-window limiter for failed login attempts, keyed by client IP.
#[derive(Clone)]
pub struct RateLimiter {
    max_attempts: usize,
    window: Duration,
    attempts: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            window,
            attempts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// True once `max_attempts` failures fall inside the window.
    /// Expired timestamps for this IP are dropped on the way.
    pub fn is_blocked(&self, ip: IpAddr) -> bool {
        self.is_blocked_at(ip, Instant::now())
    }

    fn is_blocked_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let Some(timestamps) = map.get_mut(&ip) else {
            return false;
        };
        timestamps.retain(|t| now.saturating_duration_since(*t) < self.window);
        if timestamps.is_empty() {
            map.remove(&ip);
            return false;
        }
        timestamps.len() >= self.max_attempts
    }

    pub fn record_failure(&self, ip: IpAddr) {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(ip).or_default().push(Instant::now());
    }

    /// Forget an IP's failures (after a successful login).
    pub fn clear(&self, ip: IpAddr) {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&ip);
    }
}
