//! 合并定时器句柄
//! Coalescing timer handle
//!
//! 本模块包含定时器的客户端句柄。句柄本身不保存任何挂起状态，只是把请求
//! 转交给自己的串行上下文并等待应答。
//!
//! This module contains the client handle of the timer. The handle keeps no
//! pending state itself; it forwards requests to its serial context and waits
//! for the reply.

use std::sync::Arc;
use std::time::Duration;
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
};
use tracing::trace;

use crate::config::TimerConfig;
use crate::error::Result;

use super::actor::TimerActor;
use super::clock::{MonotonicClock, duration_from_secs_ceil};
use super::commands::{ArmOutcome, TimerCommand, TimerError, TimerStats};
use super::source::Behavior;
use super::target::TargetRef;

/// 针对单个目标对象的防抖/合并单次定时器
/// Debouncing/coalescing one-shot timer bound to a single target object
///
/// The timer holds only a weak reference to its target. When an armed
/// deadline is reached the callback runs on the timer's serial context with
/// the live target; if the target has been dropped in the meantime the
/// callback is skipped.
///
/// Requests made while a timer is pending are merged according to the
/// configured [`Behavior`]. Dropping the timer cancels any pending callback.
///
/// Callbacks run on the serial context itself, so they must not block on
/// another request to the same timer. To arm again from a callback, spawn a
/// task that calls [`CoalescingTimer::after`].
pub struct CoalescingTimer<T> {
    command_tx: mpsc::Sender<TimerCommand<T>>,
    clock: Arc<MonotonicClock>,
    behavior: Behavior,
    label: String,
}

impl<T: Send + Sync + 'static> CoalescingTimer<T> {
    /// 使用默认配置（`Coalesce` 行为）创建定时器
    /// Create a timer with the default configuration (`Coalesce` behavior)
    ///
    /// # Panics
    /// Panics when called outside of a tokio runtime.
    pub fn new(target: &Arc<T>) -> Self {
        Self::start(target, TimerConfig::default(), &Handle::current())
    }

    /// 使用给定配置在当前运行时上创建定时器
    /// Create a timer with the given configuration on the current runtime
    ///
    /// # Panics
    /// Panics when called outside of a tokio runtime.
    pub fn with_config(target: &Arc<T>, config: TimerConfig) -> Result<Self> {
        Self::with_config_in(target, config, &Handle::current())
    }

    /// 使用给定配置在指定运行时上创建定时器
    /// Create a timer with the given configuration on the given runtime
    pub fn with_config_in(target: &Arc<T>, config: TimerConfig, runtime: &Handle) -> Result<Self> {
        config.validate()?;
        Ok(Self::start(target, config, runtime))
    }

    fn start(target: &Arc<T>, config: TimerConfig, runtime: &Handle) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size);
        let clock = Arc::new(MonotonicClock::new());
        // 先校准纪元，使首个请求的时间读数有意义
        // Calibrate the epoch up front so the first request reading is meaningful
        let _ = clock.now();

        TimerActor::new(
            TargetRef::new(target),
            config.behavior,
            config.label.clone(),
            clock.clone(),
            command_rx,
        )
        .spawn(runtime);

        trace!(label = %config.label, behavior = ?config.behavior, "Coalescing timer created");
        Self {
            command_tx,
            clock,
            behavior: config.behavior,
            label: config.label,
        }
    }

    /// 请求在 `delay` 后以目标对象执行 `callback`
    /// Request `callback` to run against the target after `delay`
    ///
    /// The delay is measured from this call, not from when the serial context
    /// gets around to the request. Whether the request actually (re)arms the
    /// timer is decided by the configured [`Behavior`] and reported in the
    /// returned [`ArmOutcome`].
    pub async fn after<F>(&self, delay: Duration, callback: F) -> std::result::Result<ArmOutcome, TimerError>
    where
        F: FnOnce(Arc<T>) + Send + 'static,
    {
        let request_time = self.clock.now();
        let (response_tx, response_rx) = oneshot::channel();

        let command = TimerCommand::After {
            request_time,
            delay,
            handler: Box::new(callback),
            response_tx,
        };

        self.send(command).await?;
        response_rx.await.map_err(|_| TimerError::ContextClosed)
    }

    /// 以实数秒表示延迟的 [`after`](Self::after)
    /// [`after`](Self::after) with the delay given in real-valued seconds
    ///
    /// Negative and NaN delays are treated as zero. The delay is rounded up to
    /// the next nanosecond so the callback never fires earlier than asked.
    pub async fn after_secs<F>(&self, delay: f64, callback: F) -> std::result::Result<ArmOutcome, TimerError>
    where
        F: FnOnce(Arc<T>) + Send + 'static,
    {
        self.after(duration_from_secs_ceil(delay), callback).await
    }

    /// 取消挂起的回调
    /// Cancel the pending callback
    ///
    /// Returns whether a callback was pending. Once this returns, the
    /// cancelled callback can no longer fire. Cancelling an idle timer is a
    /// no-op.
    pub async fn cancel(&self) -> std::result::Result<bool, TimerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(TimerCommand::Cancel { response_tx }).await?;
        response_rx.await.map_err(|_| TimerError::ContextClosed)
    }

    /// 在串行上下文中执行 `block` 并等待其结果
    /// Run `block` on the serial context and wait for its result
    pub async fn while_locked<F, R>(&self, block: F) -> std::result::Result<R, TimerError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let block = Box::new(move || {
            let _ = result_tx.send(block());
        });

        self.send(TimerCommand::WhileLocked { block }).await?;
        result_rx.await.map_err(|_| TimerError::ContextClosed)
    }

    /// 将串行上下文（包括挂起的回调）迁移到另一个运行时
    /// Move the serial context, including any pending callback, onto another
    /// runtime
    pub async fn set_target_runtime(&self, runtime: Handle) -> std::result::Result<(), TimerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(TimerCommand::Retarget {
            runtime,
            response_tx,
        })
        .await?;
        response_rx.await.map_err(|_| TimerError::ContextClosed)
    }

    /// 当前挂起回调的截止时间（自时钟纪元起）
    /// Deadline of the pending callback, measured from the clock epoch
    pub async fn next_fire_time(&self) -> std::result::Result<Option<Duration>, TimerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(TimerCommand::NextFireTime { response_tx }).await?;
        response_rx.await.map_err(|_| TimerError::ContextClosed)
    }

    /// 获取统计信息
    /// Get statistics
    pub async fn stats(&self) -> std::result::Result<TimerStats, TimerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(TimerCommand::GetStats { response_tx }).await?;
        response_rx.await.map_err(|_| TimerError::ContextClosed)
    }

    /// 定时器时钟的当前读数，与 [`ArmOutcome`] 中的截止时间可比较
    /// Current reading of the timer's clock, comparable with the deadlines
    /// reported in [`ArmOutcome`]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    async fn send(&self, command: TimerCommand<T>) -> std::result::Result<(), TimerError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| TimerError::ContextClosed)
    }
}

impl<T> CoalescingTimer<T> {
    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T> Drop for CoalescingTimer<T> {
    fn drop(&mut self) {
        // 释放发送端即关闭通道；串行上下文会清除挂起句柄并退出，
        // 这里不能等待上下文，否则在回调中释放定时器会死锁
        // Dropping the sender closes the channel; the serial context clears
        // the pending handle and exits. Must not wait on the context here, or
        // dropping the timer from inside a callback would deadlock.
        trace!(label = %self.label, "Coalescing timer dropped");
    }
}

impl<T> std::fmt::Debug for CoalescingTimer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescingTimer")
            .field("label", &self.label)
            .field("behavior", &self.behavior)
            .finish_non_exhaustive()
    }
}
