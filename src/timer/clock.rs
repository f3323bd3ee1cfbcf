//! 单调时钟
//! Monotonic clock
//!
//! 定时器的所有截止时间都以"自纪元以来的时长"表示。纪元在首次读取时
//! 惰性校准一次并缓存，之后所有读数都相对于它计算，不受系统时间调整影响。
//!
//! Every deadline of a timer is expressed as a duration since an epoch. The
//! epoch is calibrated lazily on the first read and cached; all later
//! readings are relative to it and are immune to wall-clock adjustments.

use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::Instant;

/// Nanoseconds per second, the tick domain deadlines are computed in.
const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Roughly 30 years; deadlines beyond what `Instant` can represent are
/// scheduled this far out instead.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// 单调时钟，纪元按实例惰性校准
/// Monotonic clock with a per-instance, lazily calibrated epoch
#[derive(Debug, Default)]
pub struct MonotonicClock {
    epoch: OnceLock<Instant>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取（必要时校准）纪元
    /// Get the epoch, calibrating it on first use
    fn epoch(&self) -> Instant {
        *self.epoch.get_or_init(Instant::now)
    }

    /// 当前时间，自纪元以来的时长
    /// Current time as a duration since the epoch
    pub fn now(&self) -> Duration {
        let epoch = self.epoch();
        Instant::now().saturating_duration_since(epoch)
    }

    /// 将自纪元以来的时长转换为可供调度的绝对时刻
    /// Convert a duration since the epoch into an absolute, schedulable instant
    pub fn instant_at(&self, since_epoch: Duration) -> Instant {
        self.epoch()
            .checked_add(since_epoch)
            .unwrap_or_else(|| Instant::now() + FAR_FUTURE)
    }
}

/// 将实数秒转换为纳秒刻度的时长，向上取整
/// Convert real-valued seconds into a nanosecond-tick duration, rounding up
///
/// Negative, zero and NaN inputs yield zero; values beyond the representable
/// range saturate at `Duration::MAX`.
pub fn duration_from_secs_ceil(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    let nanos = (secs * NANOS_PER_SEC).ceil();
    if nanos >= u64::MAX as f64 {
        return Duration::MAX;
    }
    Duration::from_nanos(nanos as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_and_nan_clamp_to_zero() {
        assert_eq!(duration_from_secs_ceil(-1.0), Duration::ZERO);
        assert_eq!(duration_from_secs_ceil(0.0), Duration::ZERO);
        assert_eq!(duration_from_secs_ceil(f64::NAN), Duration::ZERO);
        assert_eq!(duration_from_secs_ceil(f64::NEG_INFINITY), Duration::ZERO);
    }

    #[test]
    fn test_rounds_up_to_next_tick() {
        // 1.5ns 不能提前到 1ns
        // 1.5ns must not be scheduled early at 1ns
        assert_eq!(duration_from_secs_ceil(1.5e-9), Duration::from_nanos(2));
        assert_eq!(duration_from_secs_ceil(0.25), Duration::from_millis(250));
        assert!(duration_from_secs_ceil(0.1) >= Duration::from_millis(100));
    }

    #[test]
    fn test_huge_values_saturate() {
        assert_eq!(duration_from_secs_ceil(f64::INFINITY), Duration::MAX);
        assert_eq!(duration_from_secs_ceil(1e30), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_now_is_relative_to_lazy_epoch() {
        let clock = MonotonicClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(clock.now(), Duration::from_millis(1500));

        let at = clock.instant_at(Duration::from_secs(2));
        assert_eq!(
            at.duration_since(Instant::now()),
            Duration::from_millis(500)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_deadline_saturates() {
        let clock = MonotonicClock::new();
        let at = clock.instant_at(Duration::MAX);
        assert!(at > Instant::now() + Duration::from_secs(86400 * 365));
    }

    #[tokio::test(start_paused = true)]
    async fn test_now_is_monotonic() {
        let clock = MonotonicClock::new();
        let mut last = clock.now();
        for _ in 0..10 {
            tokio::time::advance(Duration::from_millis(7)).await;
            let current = clock.now();
            assert!(current >= last);
            last = current;
        }
    }
}
