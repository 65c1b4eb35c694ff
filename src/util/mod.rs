//! Shared utilities: clocks, delay sampling, redaction, telemetry.

pub mod clock;
pub mod delay;
pub mod privacy;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use delay::{DelayRange, DelaySampler, FixedDelay, InvertedDelay, UniformDelay};
pub use privacy::{mask_identifier, sanitize_excerpt};
pub use telemetry::*;
