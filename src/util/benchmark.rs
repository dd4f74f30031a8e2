//! Execution timing
//!
//! `Benchmark` logs when it starts and, when finished or dropped, how long
//! it ran in plain English.

use std::time::Instant;
use tracing::info;

/// Scoped timer
pub struct Benchmark {
    msg: String,
    start: Instant,
    finished: bool,
}

impl Benchmark {
    /// Start timing `msg`
    pub fn start(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        info!("Starting {}", msg);
        Self {
            msg,
            start: Instant::now(),
            finished: false,
        }
    }

    /// Log and return the seconds elapsed so far
    pub fn current(&self) -> f64 {
        let elapsed = self.elapsed();
        info!("{}", make_msg(&self.msg, elapsed));
        elapsed
    }

    /// Stop the timer, log and return the total seconds
    pub fn finish(mut self) -> f64 {
        self.finished = true;
        self.current()
    }

    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for Benchmark {
    fn drop(&mut self) {
        if !self.finished {
            self.current();
        }
    }
}

/// Time a closure under `name`, returning its result
pub fn benchmark<T>(name: &str, f: impl FnOnce() -> T) -> T {
    let timer = Benchmark::start(name);
    let result = f();
    timer.finish();
    result
}

/// Render an elapsed time in days, hours, minutes and seconds
///
/// Under a minute keeps millisecond precision; longer runs are whole seconds.
pub fn make_msg(msg: &str, secs: f64) -> String {
    let (m, s) = divmod(secs, 60.0);
    let (h, m) = divmod(m, 60.0);
    let (d, h) = divmod(h, 24.0);

    if d > 0.0 {
        format!("{}: {:.0} days, {:.0} hours, {:.0} minutes, {:.0} seconds", msg, d, h, m, s)
    } else if h > 0.0 {
        format!("{}: {:.0} hours, {:.0} minutes, {:.0} seconds", msg, h, m, s)
    } else if m > 0.0 {
        format!("{}: {:.0} minutes, {:.0} seconds", msg, m, s)
    } else {
        format!("{}: {:.3} seconds", msg, s)
    }
}

fn divmod(value: f64, divisor: f64) -> (f64, f64) {
    ((value / divisor).floor(), value.rem_euclid(divisor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_make_msg() {
        let cases = [
            (42.111, "Foo: 42.111 seconds"),
            (42.0, "Foo: 42.000 seconds"),
            (42.0 + 2.0 * 60.0, "Foo: 2 minutes, 42 seconds"),
            (42.111 + 2.0 * 60.0, "Foo: 2 minutes, 42 seconds"),
            (42.0 + 2.0 * 60.0 + 3.0 * 3600.0, "Foo: 3 hours, 2 minutes, 42 seconds"),
            (42.111 + 2.0 * 60.0 + 3.0 * 3600.0, "Foo: 3 hours, 2 minutes, 42 seconds"),
            (
                42.0 + 2.0 * 60.0 + 3.0 * 3600.0 + 4.0 * 86400.0,
                "Foo: 4 days, 3 hours, 2 minutes, 42 seconds",
            ),
            (
                42.111 + 2.0 * 60.0 + 3.0 * 3600.0 + 4.0 * 86400.0,
                "Foo: 4 days, 3 hours, 2 minutes, 42 seconds",
            ),
        ];

        for (secs, expected) in cases {
            assert_eq!(make_msg("Foo", secs), expected);
        }
    }

    #[test]
    fn test_benchmark_current_and_finish() {
        let timer = Benchmark::start("Foo");
        std::thread::sleep(Duration::from_millis(100));
        assert!(timer.current() >= 0.1);
        assert!(timer.finish() >= 0.1);
    }

    #[test]
    fn test_benchmark_closure_returns_result() {
        let value = benchmark("sum", || {
            std::thread::sleep(Duration::from_millis(10));
            (1..=4).sum::<i32>()
        });
        assert_eq!(value, 10);
    }
}
