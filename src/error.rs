//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use thiserror::Error;

use crate::timer::TimerError;

/// The primary error type for the coalescing timer library.
/// 合并定时器库的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// The timer's serial context rejected or dropped a request.
    /// 定时器的串行上下文拒绝或丢弃了请求。
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// The configuration could not be used to build a timer.
    /// 配置无法用于构建定时器。
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        match err {
            Error::Timer(TimerError::ContextClosed) => ErrorKind::BrokenPipe.into(),
            Error::InvalidConfig(msg) => std::io::Error::new(ErrorKind::InvalidInput, msg),
        }
    }
}
