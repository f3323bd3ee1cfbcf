//! 定义了合并定时器的可配置参数。
//! Defines configurable parameters for the coalescing timer.

use crate::error::{Error, Result};
use crate::timer::Behavior;

/// The label given to a timer's serial context when none is configured.
/// 未配置时赋予定时器串行上下文的标签。
pub const DEFAULT_LABEL: &str = "coalesce_timer.timer";

/// A structure containing all configurable parameters for a timer.
///
/// 包含定时器所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// How requests that arrive while a timer is pending are merged.
    /// 定时器挂起期间到达的请求如何合并。
    pub behavior: Behavior,

    /// Label of the serial context. Attached to every log record the
    /// context emits.
    ///
    /// 串行上下文的标签。附加到该上下文输出的每条日志记录上。
    pub label: String,

    /// Capacity of the command channel feeding the serial context. Callers
    /// wait for a free slot once it is full.
    ///
    /// 向串行上下文传递命令的通道容量。通道满时调用方等待空位。
    pub command_buffer_size: usize,
}

impl TimerConfig {
    /// Creates a configuration with the given behavior and default values
    /// for everything else.
    /// 使用给定行为创建配置，其余使用默认值。
    pub fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    /// Sets the label of the serial context.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.command_buffer_size == 0 {
            return Err(Error::InvalidConfig("command_buffer_size must be non-zero"));
        }
        if self.label.is_empty() {
            return Err(Error::InvalidConfig("label must not be empty"));
        }
        Ok(())
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            behavior: Behavior::Coalesce,
            label: DEFAULT_LABEL.to_string(),
            command_buffer_size: 64,
        }
    }
}
