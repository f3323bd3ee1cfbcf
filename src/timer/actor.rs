//! Timer Actor - 串行执行上下文
//!
//! 每个定时器实例拥有一个专用的 Actor 任务。所有对挂起状态的读写——装填决策、
//! 截止时间比较、句柄创建、处理器安装、触发与取消——都只在这个任务中发生，
//! 因此状态机天然没有数据竞争。
//!
//! Timer Actor - Serial execution context
//!
//! Every timer instance owns one dedicated actor task. All reads and writes
//! of the pending state (arm decision, deadline comparison, handle creation,
//! handler installation, firing and cancellation) happen only on this task,
//! which makes the state machine free of data races.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
    time::{Instant, sleep_until},
};
use tracing::{Instrument, debug, debug_span, info, trace, warn};

use super::clock::MonotonicClock;
use super::commands::{ArmOutcome, TimerCommand, TimerStats};
use super::source::{ArmState, Behavior, FireHandler, TimerSource, should_proceed};
use super::target::TargetRef;

/// 主循环退出的原因
/// Why the main loop returned
enum Exit {
    /// 所有句柄都已释放
    /// Every handle has been dropped
    Closed,
    /// 需要迁移到另一个运行时
    /// The actor must move onto another runtime
    Retarget {
        runtime: Handle,
        response_tx: oneshot::Sender<()>,
    },
}

/// 定时器Actor
/// Timer Actor
pub struct TimerActor<T> {
    target: TargetRef<T>,
    behavior: Behavior,
    label: String,
    clock: Arc<MonotonicClock>,
    state: ArmState<T>,
    stats: TimerStats,
    command_rx: mpsc::Receiver<TimerCommand<T>>,
}

impl<T: Send + Sync + 'static> TimerActor<T> {
    pub fn new(
        target: TargetRef<T>,
        behavior: Behavior,
        label: String,
        clock: Arc<MonotonicClock>,
        command_rx: mpsc::Receiver<TimerCommand<T>>,
    ) -> Self {
        Self {
            target,
            behavior,
            label,
            clock,
            state: ArmState::Idle,
            stats: TimerStats::default(),
            command_rx,
        }
    }

    /// 在给定运行时上启动Actor
    /// Spawn the actor on the given runtime
    pub fn spawn(self, runtime: &Handle) {
        let span = debug_span!("coalescing_timer", label = %self.label);
        let task: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(async move {
            let mut actor = self;
            match actor.run().await {
                Exit::Closed => {}
                Exit::Retarget {
                    runtime: next_runtime,
                    response_tx,
                } => {
                    info!("Moving timer context to another runtime");
                    actor.spawn(&next_runtime);
                    let _ = response_tx.send(());
                }
            }
        });
        runtime.spawn(task.instrument(span));
    }

    /// 运行Actor主循环
    /// Run the actor main loop
    async fn run(&mut self) -> Exit {
        trace!(behavior = ?self.behavior, "Timer context started");

        loop {
            let deadline = self.state.running_deadline();

            tokio::select! {
                // 命令优先：句柄释放后，关闭信号总是先于任何截止时间被观察到
                // Commands first: once the handle is dropped, the closure is
                // always observed before any deadline
                biased;

                command = self.command_rx.recv() => {
                    match command {
                        Some(cmd) => {
                            if let Some(exit) = self.handle_command(cmd) {
                                return exit;
                            }
                        }
                        None => {
                            if self.cancel_pending() {
                                debug!("Timer handle dropped, pending callback cancelled");
                            }
                            debug!(stats = %self.stats, "Timer context shut down");
                            return Exit::Closed;
                        }
                    }
                }

                _ = wait_until(deadline) => {
                    self.fire();
                }
            }
        }
    }

    /// 处理单个命令，需要退出主循环时返回 `Some`
    /// Handle a single command; returns `Some` when the main loop must exit
    fn handle_command(&mut self, command: TimerCommand<T>) -> Option<Exit> {
        trace!(?command, "Handling timer command");
        match command {
            TimerCommand::After {
                request_time,
                delay,
                handler,
                response_tx,
            } => {
                let outcome = self.arm(request_time, delay, handler);
                let _ = response_tx.send(outcome);
            }

            TimerCommand::Cancel { response_tx } => {
                let cancelled = self.cancel_pending();
                let _ = response_tx.send(cancelled);
            }

            TimerCommand::WhileLocked { block } => {
                block();
            }

            TimerCommand::Retarget {
                runtime,
                response_tx,
            } => {
                return Some(Exit::Retarget {
                    runtime,
                    response_tx,
                });
            }

            TimerCommand::NextFireTime { response_tx } => {
                let _ = response_tx.send(self.state.next_fire_time());
            }

            TimerCommand::GetStats { response_tx } => {
                let _ = response_tx.send(self.stats.clone());
            }
        }
        None
    }

    /// 处理一次 `after` 请求
    /// Process one `after` request
    fn arm(&mut self, request_time: Duration, delay: Duration, handler: FireHandler<T>) -> ArmOutcome {
        // 扣除请求排队等待进入串行上下文所花费的时间
        // Deduct the time the request spent queued before reaching the context
        let now = self.clock.now();
        let elapsed = now.saturating_sub(request_time);
        let adjusted_delay = delay.saturating_sub(elapsed);
        let next_fire_time = now.saturating_add(adjusted_delay);

        let has_timer = self.state.is_armed();
        if !should_proceed(has_timer, self.behavior, self.state.next_fire_time(), next_fire_time) {
            self.stats.dropped += 1;
            trace!(
                ?delay,
                ?adjusted_delay,
                current = ?self.state.next_fire_time(),
                "Request dropped by policy"
            );
            return ArmOutcome::Dropped;
        }

        let deadline = self.clock.instant_at(next_fire_time);
        let mut source = match self.state.take() {
            Some(mut source) => {
                source.reprogram(next_fire_time, deadline);
                source
            }
            None => TimerSource::new(next_fire_time, deadline),
        };
        source.set_handler(handler);

        // 复用的句柄已在运行，不能再次启动
        // A reused handle is already running and must not be started again
        let outcome = if has_timer {
            self.stats.rearmed += 1;
            debug!(?adjusted_delay, ?next_fire_time, "Timer rearmed");
            ArmOutcome::Rearmed { next_fire_time }
        } else {
            source.start();
            self.stats.armed += 1;
            debug!(?adjusted_delay, ?next_fire_time, "Timer armed");
            ArmOutcome::Armed { next_fire_time }
        };

        self.state = ArmState::Armed(source);
        outcome
    }

    /// 截止时间到达：目标仍存活时执行回调，随后清除句柄
    /// Deadline reached: invoke the callback if the target is alive, then
    /// clear the handle
    fn fire(&mut self) {
        let Some(source) = self.state.take() else {
            return;
        };
        let next_fire_time = source.next_fire_time();

        let Some(handler) = source.into_handler() else {
            warn!(?next_fire_time, "Timer fired without an installed handler");
            return;
        };

        match self.target.resolve() {
            Some(target) => {
                self.stats.fired += 1;
                debug!(?next_fire_time, "Timer fired");
                handler(target);
            }
            None => {
                self.stats.skipped += 1;
                debug!(?next_fire_time, "Timer fired after target was dropped, callback skipped");
            }
        }
    }

    /// 取消并清除挂起句柄。没有挂起句柄时什么也不做。
    /// Cancel and clear the pending handle. Does nothing when none is pending.
    fn cancel_pending(&mut self) -> bool {
        match self.state.take() {
            Some(source) => {
                self.stats.cancelled += 1;
                debug!(next_fire_time = ?source.next_fire_time(), "Timer cancelled");
                true
            }
            None => false,
        }
    }
}

/// 等待到截止时间；没有截止时间时永远挂起
/// Wait for the deadline; pends forever when there is none
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
