use std::time::Duration;

use tokio::time::Instant;

/// Pool-wide jobs-per-second limiter: a fixed one-second window with a
/// counter. `acquire` sleeps into the next window when the budget is spent.
pub struct RateLimiter {
    max_per_sec: u32,
    state: tokio::sync::Mutex<WindowState>,
}

struct WindowState {
    window_start: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(max_per_sec: u32) -> Self {
        Self {
            max_per_sec: max_per_sec.max(1),
            state: tokio::sync::Mutex::new(WindowState {
                window_start: Instant::now(),
                count: 0,
            }),
        }
    }

    pub async fn acquire(&self) {
        loop {
            let sleep_for = {
                let mut s = self.state.lock().await;
                let now = Instant::now();
                if now.duration_since(s.window_start) >= Duration::from_secs(1) {
                    s.window_start = now;
                    s.count = 0;
                }
                if s.count < self.max_per_sec {
                    s.count += 1;
                    return;
                }
                Duration::from_secs(1) - now.duration_since(s.window_start)
            };
            tokio::time::sleep(sleep_for).await;
        }
    }
}
