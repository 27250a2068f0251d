use std::time::{Duration, Instant};

/// Times one named operation and reports it at debug level when finished.
pub struct PerfLog {
    name: &'static str,
    start: Instant,
}

impl PerfLog {
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        log::debug!("perf: {} {:.3}ms", self.name, elapsed.as_secs_f64() * 1_000.0);

        elapsed
    }
}
