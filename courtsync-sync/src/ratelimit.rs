//! Token bucket rate limiter for pacing requests to external providers.
//!
//! Tokens accrue at a fixed rate up to `burst_size`; each request consumes
//! one. Refill happens on demand from a monotonic clock, so there is no
//! background timer to manage. Scrape targets get their own, slower bucket.

use rand::Rng;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_update: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    requests_per_second: f64,
    burst_size: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size: f64::from(burst_size),
            state: Mutex::new(BucketState {
                tokens: f64::from(burst_size),
                last_update: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_update).as_secs_f64();
        state.tokens = self
            .burst_size
            .min(state.tokens + elapsed * self.requests_per_second);
        state.last_update = now;
    }

    /// Takes one token, sleeping until one accrues. With a timeout, returns
    /// `false` once the deadline passes without a token.
    pub async fn acquire(&self, timeout: Option<Duration>) -> bool {
        let started = Instant::now();

        loop {
            let wait = {
                let mut state = self.state.lock().expect("rate limiter lock poisoned");
                self.refill(&mut state);

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return true;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.requests_per_second)
            };

            let wait = match timeout {
                Some(timeout) => {
                    let remaining = timeout.saturating_sub(started.elapsed());
                    if remaining.is_zero() {
                        return false;
                    }
                    wait.min(remaining)
                }
                None => wait,
            };

            tokio::time::sleep(wait).await;
        }
    }

    /// Non-blocking variant: takes a token only if one is available now.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().expect("rate limiter lock poisoned");
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Projected wait until the next token is available.
    pub fn wait_time(&self) -> Duration {
        let mut state = self.state.lock().expect("rate limiter lock poisoned");
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - state.tokens) / self.requests_per_second)
        }
    }

    /// Back to full capacity, as if freshly constructed.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("rate limiter lock poisoned");
        state.tokens = self.burst_size;
        state.last_update = Instant::now();
    }

    pub fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock().expect("rate limiter lock poisoned");
        self.refill(&mut state);
        state.tokens
    }
}

/// Exponential backoff delay: `min(base * 2^attempt, max)`, with 0-50%
/// jitter when enabled, never exceeding `max_delay`.
pub fn backoff(attempt: u32, base_delay: Duration, max_delay: Duration, jitter: bool) -> Duration {
    let exp = (base_delay.as_secs_f64() * 2f64.powi(attempt.min(32) as i32))
        .min(max_delay.as_secs_f64());

    let delay = if jitter {
        exp * (1.0 + rand::rng().random_range(0.0..0.5))
    } else {
        exp
    };

    Duration::from_secs_f64(delay.min(max_delay.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_without_jitter() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(30);
        assert_eq!(backoff(0, base, max, false), Duration::from_secs(1));
        assert_eq!(backoff(1, base, max, false), Duration::from_secs(2));
        assert_eq!(backoff(2, base, max, false), Duration::from_secs(4));
        assert_eq!(backoff(5, base, max, false), Duration::from_secs(30));
        assert_eq!(backoff(20, base, max, false), Duration::from_secs(30));
    }

    #[test]
    fn backoff_is_non_decreasing() {
        let base = Duration::from_millis(250);
        let max = Duration::from_secs(30);
        let mut prev = Duration::ZERO;
        for attempt in 0..12 {
            let delay = backoff(attempt, base, max, false);
            assert!(delay >= prev);
            prev = delay;
        }
    }

    #[test]
    fn backoff_jitter_stays_bounded() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(30);
        for attempt in 0..12 {
            let delay = backoff(attempt, base, max, true);
            assert!(delay >= backoff(attempt, base, max, false).mul_f64(0.99));
            assert!(delay <= max);
        }
    }

    #[tokio::test]
    async fn burst_then_drain() {
        let limiter = RateLimiter::new(100.0, 3);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        // Bucket is empty; the next token is some time away.
        assert!(limiter.wait_time() > Duration::ZERO);
    }

    #[tokio::test]
    async fn acquire_times_out_when_starved() {
        let limiter = RateLimiter::new(0.001, 1);
        assert!(limiter.acquire(None).await);
        let got = limiter.acquire(Some(Duration::from_millis(20))).await;
        assert!(!got);
    }

    #[tokio::test]
    async fn reset_restores_burst() {
        let limiter = RateLimiter::new(0.001, 2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        limiter.reset();
        assert!(limiter.try_acquire());
    }
}
