use std::time::{Duration, Instant};

use crate::ray::Ray;

pub mod aabb;
pub mod bvh;
pub mod error;
pub mod geometry;
pub mod material;
pub mod par;
pub mod ray;
pub mod render;
pub mod rng;
pub mod sampling;
pub mod scene;
pub mod settings;
pub mod test_util;

pub use error::{Error, Result};

/// Offset used to lift secondary rays off a surface and as the generic
/// "treat as zero" threshold for denominators.
pub const EPSILON: f32 = 0.001;

/// Reusable explicit-stack state for iterative BVH traversal.
pub struct Traversal {
    pub stack: Vec<i32>,
    pub ray: Ray,
}

#[macro_export]
macro_rules! scope {
    ($name:expr) => {
        #[cfg(feature = "profile")]
        profiling::scope!($name);
    };
}

#[macro_export]
macro_rules! scope_print {
    ($name:expr) => {
        #[cfg(feature = "scope_print")]
        let _scope_timer = $crate::ScopeTimer::new($name);
    };
}

#[macro_export]
macro_rules! scope_print_major {
    ($name:expr) => {
        #[cfg(feature = "scope_print_major")]
        let _scope_timer = $crate::ScopeTimer::new($name);
    };
}

/// Reports the wall time of a scope through `tracing` when dropped.
#[doc(hidden)]
pub struct ScopeTimer {
    name: &'static str,
    start: Instant,
}

impl ScopeTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopeTimer {
    fn drop(&mut self) {
        tracing::info!(
            "{:>10} {}",
            PrettyDuration(self.start.elapsed()).to_string(),
            self.name
        );
    }
}

/// A wrapper struct for `std::time::Duration` to provide pretty-printing of durations.
#[doc(hidden)]
pub struct PrettyDuration(pub Duration);

impl std::fmt::Display for PrettyDuration {
    /// Durations are formatted as follows:
    /// - If the duration is greater than or equal to 1 second, it is formatted in seconds (s).
    /// - If the duration is greater than or equal to 1 millisecond but less than 1 second, it is formatted in milliseconds (ms).
    /// - If the duration is less than 1 millisecond, it is formatted in microseconds (µs).
    ///   In the case of seconds & milliseconds, the duration is always printed with a precision of two decimal places.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = self.0;
        if duration.as_secs() > 0 {
            let seconds =
                duration.as_secs() as f64 + f64::from(duration.subsec_nanos()) / 1_000_000_000.0;
            write!(f, "{seconds:.2}s ")
        } else if duration.subsec_millis() > 0 {
            let milliseconds =
                duration.as_millis() as f64 + f64::from(duration.subsec_micros() % 1_000) / 1_000.0;
            write!(f, "{milliseconds:.2}ms")
        } else {
            let microseconds = duration.as_micros();
            write!(f, "{microseconds}µs")
        }
    }
}
