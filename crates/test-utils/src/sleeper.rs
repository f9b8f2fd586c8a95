use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use runwatch::engine::{ShutdownHandle, Sleeper};

/// A `Sleeper` that records each requested delay and returns at once.
///
/// With `stop_after(n, handle)` it triggers shutdown on the n-th sleep, so
/// a monitor loop under test runs a bounded number of cycles.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
    stop_after: Option<(usize, ShutdownHandle)>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_after(mut self, sleeps: usize, handle: ShutdownHandle) -> Self {
        self.stop_after = Some((sleeps, handle));
        self
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().expect("sleeper lock poisoned").clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        let count = {
            let mut slept = self.slept.lock().expect("sleeper lock poisoned");
            slept.push(duration);
            slept.len()
        };

        if let Some((limit, handle)) = &self.stop_after {
            if count >= *limit {
                handle.trigger();
            }
        }

        Box::pin(tokio::task::yield_now())
    }
}
