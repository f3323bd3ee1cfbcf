#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the coalescing timer library.
//! 合并定时器库的根。

pub mod config;
pub mod error;
pub mod timer;

pub use config::TimerConfig;
pub use error::{Error, Result};
pub use timer::{ArmOutcome, Behavior, CoalescingTimer, TimerError, TimerStats};
