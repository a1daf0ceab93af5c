//! Scoped timers for database operations and arbitrary named functions.
//!
//! ```ignore
//! let _timer = start_database_timer(&metrics, "UserDao", "ByEmail", &[&email]);
//! // ... query ...
//! // observed when `_timer` goes out of scope, on every exit path
//! ```

use std::fmt::Display;
use std::time::Instant;

use super::measure::{format_label_args, seconds_since};
use super::recorder::MetricsRecorder;

enum Target {
    Database {
        dao: String,
        filter: String,
        args: String,
    },
    Func {
        func: String,
        args: String,
    },
}

/// Records one duration observation when finished or dropped, whichever comes first.
///
/// A timer started with an empty dao/func name is disarmed and records nothing.
#[must_use = "a timer records when it is dropped; binding it to `_` drops it immediately"]
pub struct ScopedTimer<'a, R: MetricsRecorder> {
    recorder: &'a R,
    start: Instant,
    target: Option<Target>,
}

impl<'a, R: MetricsRecorder> ScopedTimer<'a, R> {
    /// Starts timing a database call. Dao and filter names are lower-cased.
    pub fn database(recorder: &'a R, dao: &str, filter: &str, args: &[&dyn Display]) -> Self {
        let target = (!dao.is_empty()).then(|| Target::Database {
            dao: dao.to_lowercase(),
            filter: filter.to_lowercase(),
            args: format_label_args(args),
        });
        ScopedTimer {
            recorder,
            start: Instant::now(),
            target,
        }
    }

    /// Starts timing a named function.
    pub fn func(recorder: &'a R, func: &str, args: &[&dyn Display]) -> Self {
        let target = (!func.is_empty()).then(|| Target::Func {
            func: func.to_string(),
            args: format_label_args(args),
        });
        ScopedTimer {
            recorder,
            start: Instant::now(),
            target,
        }
    }

    /// Whether finishing this timer will record an observation.
    pub fn is_armed(&self) -> bool {
        self.target.is_some()
    }

    /// Stops the timer and records its observation.
    pub fn finish(mut self) {
        self.record();
    }

    fn record(&mut self) {
        let duration = seconds_since(self.start);
        match self.target.take() {
            Some(Target::Database { dao, filter, args }) => {
                self.recorder
                    .record_database_duration(&dao, &filter, &args, duration);
            }
            Some(Target::Func { func, args }) => {
                self.recorder.record_func_duration(&func, &args, duration);
            }
            None => {}
        }
    }
}

impl<R: MetricsRecorder> Drop for ScopedTimer<'_, R> {
    fn drop(&mut self) {
        self.record();
    }
}

/// Starts a database timer; see [`ScopedTimer::database`].
pub fn start_database_timer<'a, R: MetricsRecorder>(
    recorder: &'a R,
    dao: &str,
    filter: &str,
    args: &[&dyn Display],
) -> ScopedTimer<'a, R> {
    ScopedTimer::database(recorder, dao, filter, args)
}

/// Alias of [`start_database_timer`].
pub fn new_database_timer<'a, R: MetricsRecorder>(
    recorder: &'a R,
    dao: &str,
    filter: &str,
    args: &[&dyn Display],
) -> ScopedTimer<'a, R> {
    start_database_timer(recorder, dao, filter, args)
}

/// Starts a function timer; see [`ScopedTimer::func`].
pub fn start_func_timer<'a, R: MetricsRecorder>(
    recorder: &'a R,
    func: &str,
    args: &[&dyn Display],
) -> ScopedTimer<'a, R> {
    ScopedTimer::func(recorder, func, args)
}

/// Alias of [`start_func_timer`].
pub fn new_func_timer<'a, R: MetricsRecorder>(
    recorder: &'a R,
    func: &str,
    args: &[&dyn Display],
) -> ScopedTimer<'a, R> {
    start_func_timer(recorder, func, args)
}

/// Records a database duration for a caller that captured `start` itself.
///
/// Unlike the timers, an empty dao name is recorded as is.
pub fn record_database_duration<R: MetricsRecorder>(
    recorder: &R,
    dao: &str,
    filter: &str,
    args: &[&dyn Display],
    start: Instant,
) {
    recorder.record_database_duration(
        &dao.to_lowercase(),
        &filter.to_lowercase(),
        &format_label_args(args),
        seconds_since(start),
    );
}

/// Records a function duration for a caller that captured `start` itself.
pub fn record_func_duration<R: MetricsRecorder>(
    recorder: &R,
    func: &str,
    args: &[&dyn Display],
    start: Instant,
) {
    recorder.record_func_duration(func, &format_label_args(args), seconds_since(start));
}
