// src/engine/sleeper.rs

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Trait abstracting how the monitor waits between cycles.
///
/// Production code uses [`TokioSleeper`]; tests record the requested
/// delays and return immediately so no real time passes.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}
