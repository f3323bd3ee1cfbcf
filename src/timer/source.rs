//! 挂起状态与可调度句柄
//! Pending arm state and the schedulable handle
//!
//! 一个定时器实例在任意时刻最多拥有一个 [`TimerSource`]。`ArmState` 用带标签的
//! 变体表示"空闲/已装填"，从类型上保证"存在句柄 ⇔ 存在下次触发时间"。
//!
//! A timer instance owns at most one [`TimerSource`] at any time. `ArmState`
//! models idle/armed as a tagged variant, so "a handle exists ⇔ a next fire
//! time exists" holds by construction.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// 新请求在定时器挂起期间的合并策略
/// Merge policy for requests arriving while a timer is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Behavior {
    /// 最早的截止时间胜出：只有会更早触发的请求才会收紧截止时间
    /// Earliest deadline wins: only a request that would fire earlier
    /// tightens the deadline
    #[default]
    Coalesce,
    /// 最新的请求胜出：每个请求都把截止时间推到新的时刻（防抖）
    /// Latest request wins: every request pushes the deadline to its own
    /// time (debounce)
    Delay,
}

/// 触发时调用的回调，接收仍然存活的目标
/// Callback invoked on firing with the still-alive target
pub type FireHandler<T> = Box<dyn FnOnce(Arc<T>) + Send + 'static>;

/// 单次可调度句柄
/// One-shot schedulable handle
pub struct TimerSource<T> {
    /// 自时钟纪元以来的截止时间
    /// Deadline as a duration since the clock epoch
    next_fire_time: Duration,
    /// 绝对截止时刻
    /// Absolute deadline
    deadline: Instant,
    handler: Option<FireHandler<T>>,
    started: bool,
}

impl<T> TimerSource<T> {
    /// 创建尚未启动的句柄
    /// Create a handle that has not been started yet
    pub fn new(next_fire_time: Duration, deadline: Instant) -> Self {
        Self {
            next_fire_time,
            deadline,
            handler: None,
            started: false,
        }
    }

    /// 原地重新设置截止时间
    /// Reprogram the deadline in place
    pub fn reprogram(&mut self, next_fire_time: Duration, deadline: Instant) {
        self.next_fire_time = next_fire_time;
        self.deadline = deadline;
    }

    /// 安装触发处理器，替换之前安装的处理器
    /// Install the fire handler, replacing any previous one
    pub fn set_handler(&mut self, handler: FireHandler<T>) {
        self.handler = Some(handler);
    }

    /// 启动句柄。每个句柄只能启动一次。
    /// Start the handle. A handle may only be started once.
    ///
    /// # Panics
    /// 重复启动说明状态机不变量已被破坏。
    /// Starting twice means the state machine invariant has been violated.
    pub fn start(&mut self) {
        if self.started {
            panic!("timer source started twice; arm state invariant violated");
        }
        self.started = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn next_fire_time(&self) -> Duration {
        self.next_fire_time
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// 消费句柄，取出处理器
    /// Consume the handle and take its handler
    pub fn into_handler(self) -> Option<FireHandler<T>> {
        self.handler
    }
}

impl<T> std::fmt::Debug for TimerSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerSource")
            .field("next_fire_time", &self.next_fire_time)
            .field("deadline", &self.deadline)
            .field("has_handler", &self.handler.is_some())
            .field("started", &self.started)
            .finish()
    }
}

/// 挂起状态
/// Pending arm state
#[derive(Debug)]
pub enum ArmState<T> {
    Idle,
    Armed(TimerSource<T>),
}

impl<T> Default for ArmState<T> {
    fn default() -> Self {
        ArmState::Idle
    }
}

impl<T> ArmState<T> {
    pub fn is_armed(&self) -> bool {
        matches!(self, ArmState::Armed(_))
    }

    pub fn next_fire_time(&self) -> Option<Duration> {
        match self {
            ArmState::Armed(source) => Some(source.next_fire_time()),
            ArmState::Idle => None,
        }
    }

    /// 已启动句柄的截止时刻；空闲或尚未启动时为 `None`
    /// Deadline of a started handle; `None` while idle or not yet started
    pub fn running_deadline(&self) -> Option<Instant> {
        match self {
            ArmState::Armed(source) if source.is_started() => Some(source.deadline()),
            _ => None,
        }
    }

    /// 取出当前句柄，状态变为空闲
    /// Take the current handle, leaving the state idle
    pub fn take(&mut self) -> Option<TimerSource<T>> {
        match std::mem::take(self) {
            ArmState::Armed(source) => Some(source),
            ArmState::Idle => None,
        }
    }
}

/// 决定一个请求是否应当（重新）装填定时器
/// Decide whether a request should (re)arm the timer
///
/// `candidate` is the deadline the request would fire at, on the same clock
/// as `next_fire_time`. With `Coalesce`, a pending timer that has no recorded
/// deadline is treated like an idle one and the request proceeds.
pub fn should_proceed(
    has_timer: bool,
    behavior: Behavior,
    next_fire_time: Option<Duration>,
    candidate: Duration,
) -> bool {
    if !has_timer {
        return true;
    }
    match behavior {
        Behavior::Delay => true,
        Behavior::Coalesce => match next_fire_time {
            Some(current) => candidate < current,
            None => true,
        },
    }
}
