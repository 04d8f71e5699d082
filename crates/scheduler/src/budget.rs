use std::sync::Mutex;
use std::time::Instant;

/// A simple token bucket shared across every paid-provider task in a run.
/// Refills continuously at `rate_per_sec`; `acquire` waits
/// until at least one token is available rather than rejecting outright,
/// since paid calls are rare enough that queuing briefly is preferable to
/// dropping them.
pub struct TokenBucket {
    rate_per_sec: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(rate_per_sec: f64) -> Self {
        let capacity = (rate_per_sec * 2.0).max(1.0);
        Self {
            rate_per_sec,
            capacity,
            state: Mutex::new(BucketState { tokens: capacity, last_refill: Instant::now() }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        state.last_refill = now;
    }

    /// Wait until a token is available, then consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().unwrap();
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - state.tokens;
                    Some(std::time::Duration::from_secs_f64(deficit / self.rate_per_sec))
                }
            };
            match wait {
                None => return,
                Some(d) => tokio::time::sleep(d.max(std::time::Duration::from_millis(5))).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_immediately_within_burst_capacity() {
        let bucket = TokenBucket::new(10.0);
        for _ in 0..5 {
            bucket.acquire().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn blocks_until_refill_once_capacity_exhausted() {
        let bucket = TokenBucket::new(1.0);
        bucket.acquire().await;
        bucket.acquire().await;
        let start = Instant::now();
        bucket.acquire().await;
        assert!(start.elapsed() < std::time::Duration::from_secs(10));
    }
}
