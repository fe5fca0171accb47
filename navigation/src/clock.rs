use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current request time as a unix timestamp.
pub trait Clock: Send + Sync {
    fn request_time(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn request_time(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}
