//! Render progress reporting.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Receives the completed fraction of a render.
///
/// Updates arrive in non-decreasing order from whichever worker finished a
/// row; the last one of a successful render is exactly `1.0`.
pub trait ProgressSink: Send + Sync {
    fn update(&self, fraction: f32);
}

impl<F> ProgressSink for F
where
    F: Fn(f32) + Send + Sync,
{
    fn update(&self, fraction: f32) {
        self(fraction)
    }
}

/// Logs every additional tenth of the render at info level.
#[derive(Debug, Default)]
pub struct LogProgress {
    logged: AtomicU32,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for LogProgress {
    fn update(&self, fraction: f32) {
        let tenths = (fraction * 10.0).floor() as u32;
        if tenths > self.logged.fetch_max(tenths, Ordering::Relaxed) {
            log::info!("Rendering {}%", tenths * 10);
        }
    }
}

/// Row counter shared by the workers of one render.
pub(crate) struct Progress {
    sink: Option<Arc<dyn ProgressSink>>,
    done: Mutex<usize>,
    total: usize,
}

impl Progress {
    pub(crate) fn new(sink: Option<Arc<dyn ProgressSink>>, total: usize) -> Self {
        Self {
            sink,
            done: Mutex::new(0),
            total: total.max(1),
        }
    }

    /// Count one finished row and notify the sink.
    pub(crate) fn row_done(&self) {
        let Some(sink) = &self.sink else {
            return;
        };

        // The sink is called under the lock so fractions never go backwards
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        *done += 1;
        sink.update(*done as f32 / self.total as f32);
    }
}
