//! 合并定时器模块
//! Coalescing Timer Module
//!
//! 该模块实现了针对单个目标对象的单次延迟执行定时器。重复的请求会按照
//! "最早胜出"（Coalesce）或"最新胜出"（Delay）策略合并，定时器只持有目标的
//! 弱引用，目标销毁后回调会被静默跳过。
//!
//! This module implements a one-shot deferred-execution timer bound to a
//! single target object. Repeated requests are merged by either an
//! earliest-wins (Coalesce) or latest-wins (Delay) policy; the timer holds only
//! a weak reference to its target and silently skips the callback once the
//! target is gone.

pub mod actor;
pub mod clock;
pub mod commands;
pub mod handle;
pub mod source;
pub mod target;


pub use clock::{MonotonicClock, duration_from_secs_ceil};
pub use commands::{ArmOutcome, TimerError, TimerStats};
pub use handle::CoalescingTimer;
pub use source::Behavior;
pub use target::TargetRef;
