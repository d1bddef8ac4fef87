//! Cooperative cancellation for the polling loop

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable cancellation flag shared between a caller and a running serve
///
/// Cancelling a token also cancels every child created from it. Cancelling
/// a child leaves the parent untouched.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    parent: Option<Arc<Self>>,
}

impl CancellationToken {
    /// Create a new, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that is cancelled with this one, or on its own
    pub fn child_token(&self) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                parent: Some(Arc::clone(&self.inner)),
            }),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Cancel this token when the returned guard is dropped, unwinding included
    pub const fn drop_guard(&self) -> DropGuard<'_> {
        DropGuard { token: self }
    }

    /// Non-blocking cancellation check
    pub fn is_cancelled(&self) -> bool {
        let mut current = Some(&self.inner);
        while let Some(inner) = current {
            if inner.cancelled.load(Ordering::Acquire) {
                return true;
            }
            current = inner.parent.as_ref();
        }
        false
    }
}

/// Cancels its token on drop, see [`CancellationToken::drop_guard`]
#[derive(Debug)]
pub struct DropGuard<'a> {
    token: &'a CancellationToken,
}

impl Drop for DropGuard<'_> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
