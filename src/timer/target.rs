//! 弱目标引用
//! Weak target reference

use std::sync::{Arc, Weak};

/// 不持有所有权的目标句柄
/// Non-owning handle to the timer's target
///
/// 目标的生命周期完全由其外部所有者决定；目标被销毁后 `resolve` 返回 `None`。
/// The target's lifetime is decided solely by its external owner; once it is
/// destroyed `resolve` returns `None`.
pub struct TargetRef<T> {
    inner: Weak<T>,
}

impl<T> TargetRef<T> {
    pub fn new(target: &Arc<T>) -> Self {
        Self {
            inner: Arc::downgrade(target),
        }
    }

    /// 尝试获取目标的强引用
    /// Try to obtain a strong reference to the target
    pub fn resolve(&self) -> Option<Arc<T>> {
        self.inner.upgrade()
    }
}

impl<T> Clone for TargetRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for TargetRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetRef")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
