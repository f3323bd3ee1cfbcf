//! 定时器命令定义
//! Timer command definitions
//!
//! 本模块包含句柄与串行上下文之间的命令枚举、应答类型、错误类型和统计信息。
//!
//! This module contains the command enum, reply types, error type and
//! statistics exchanged between a timer handle and its serial context.

use std::time::Duration;
use tokio::{runtime::Handle, sync::oneshot};

use super::source::FireHandler;

/// 在串行上下文中执行并等待完成的代码块
/// Block executed on the serial context while the caller waits
pub type LockedBlock = Box<dyn FnOnce() + Send + 'static>;

/// 定时器命令
/// Timer commands
pub enum TimerCommand<T> {
    /// 请求在延迟后执行回调
    /// Request a callback after a delay
    After {
        /// 调用方提交请求时的时钟读数
        /// Clock reading taken when the caller made the request
        request_time: Duration,
        delay: Duration,
        handler: FireHandler<T>,
        response_tx: oneshot::Sender<ArmOutcome>,
    },
    /// 取消挂起的定时器
    /// Cancel the pending timer
    Cancel {
        response_tx: oneshot::Sender<bool>,
    },
    /// 在串行上下文中执行代码块
    /// Run a block on the serial context
    WhileLocked {
        block: LockedBlock,
    },
    /// 将串行上下文迁移到另一个运行时
    /// Move the serial context onto another runtime
    Retarget {
        runtime: Handle,
        response_tx: oneshot::Sender<()>,
    },
    /// 查询当前截止时间
    /// Query the current deadline
    NextFireTime {
        response_tx: oneshot::Sender<Option<Duration>>,
    },
    /// 获取统计信息
    /// Get statistics
    GetStats {
        response_tx: oneshot::Sender<TimerStats>,
    },
}

impl<T> std::fmt::Debug for TimerCommand<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerCommand::After {
                request_time, delay, ..
            } => f
                .debug_struct("After")
                .field("request_time", request_time)
                .field("delay", delay)
                .finish_non_exhaustive(),
            TimerCommand::Cancel { .. } => f.write_str("Cancel"),
            TimerCommand::WhileLocked { .. } => f.write_str("WhileLocked"),
            TimerCommand::Retarget { .. } => f.write_str("Retarget"),
            TimerCommand::NextFireTime { .. } => f.write_str("NextFireTime"),
            TimerCommand::GetStats { .. } => f.write_str("GetStats"),
        }
    }
}

/// `after` 请求的处理结果
/// Result of processing an `after` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// 之前没有挂起的定时器，新建并启动了句柄
    /// Nothing was pending; a new handle was created and started
    Armed { next_fire_time: Duration },
    /// 原地重新设置了挂起句柄的截止时间
    /// The pending handle was reprogrammed in place
    Rearmed { next_fire_time: Duration },
    /// 按策略丢弃了请求，已有的截止时间保持不变
    /// The request lost to the policy; the existing deadline stands
    Dropped,
}

impl ArmOutcome {
    /// 请求是否影响了截止时间
    /// Whether the request changed the deadline
    pub fn is_scheduled(&self) -> bool {
        !matches!(self, ArmOutcome::Dropped)
    }

    pub fn next_fire_time(&self) -> Option<Duration> {
        match self {
            ArmOutcome::Armed { next_fire_time } | ArmOutcome::Rearmed { next_fire_time } => {
                Some(*next_fire_time)
            }
            ArmOutcome::Dropped => None,
        }
    }
}

/// 定时器错误类型
/// Timer error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    #[error("Timer serial context has been shut down")]
    ContextClosed,
}

/// 定时器统计信息
/// Timer statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// 新建并启动的句柄数
    /// Number of handles created and started
    pub armed: u64,
    /// 原地重新设置截止时间的次数
    /// Number of in-place reprograms
    pub rearmed: u64,
    /// 按策略丢弃的请求数
    /// Number of requests dropped by the policy
    pub dropped: u64,
    /// 回调被执行的次数
    /// Number of callbacks invoked
    pub fired: u64,
    /// 目标已销毁而跳过的触发次数
    /// Number of firings skipped because the target was gone
    pub skipped: u64,
    /// 被取消的挂起句柄数
    /// Number of pending handles cancelled
    pub cancelled: u64,
}

impl std::fmt::Display for TimerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TimerStats {{ armed: {}, rearmed: {}, dropped: {}, fired: {}, skipped: {}, cancelled: {} }}",
            self.armed, self.rearmed, self.dropped, self.fired, self.skipped, self.cancelled
        )
    }
}
