//! 任务作用域
//!
//! 封装"这批任务属于谁、什么时候该停"这一信息：
//! - 作为批量任务的键（`ScopeId`）
//! - 作为取消信号（主动取消 / 截止时间）

use crate::error::ScopeError;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// 作用域唯一标识，用作任务注册表的键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    fn next() -> Self {
        Self(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// 可取消的任务作用域
///
/// 克隆得到的是同一个作用域（同一个键、同一个取消信号）；
/// 需要独立取消时使用 [`Scope::child`]。
#[derive(Debug, Clone)]
pub struct Scope {
    id: ScopeId,
    token: CancellationToken,
    deadline: Option<Instant>,
    reason: Arc<OnceLock<ScopeError>>,
}

impl Scope {
    /// 创建一个没有截止时间的作用域
    pub fn new() -> Self {
        Self::build(CancellationToken::new(), None)
    }

    /// 创建一个在 `timeout` 后自动结束的作用域
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// 创建一个在 `deadline` 时刻自动结束的作用域
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(CancellationToken::new(), Some(deadline))
    }

    /// 派生子作用域
    ///
    /// 子作用域拥有新的键，继承父作用域的截止时间；
    /// 父作用域取消时子作用域一并取消，反之不影响父作用域。
    pub fn child(&self) -> Self {
        Self::build(self.token.child_token(), self.deadline)
    }

    /// 派生带超时的子作用域，截止时间取父子两者中较早的一个
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let own = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) => parent.min(own),
            None => own,
        };
        Self::build(self.token.child_token(), Some(deadline))
    }

    fn build(token: CancellationToken, deadline: Option<Instant>) -> Self {
        Self {
            id: ScopeId::next(),
            token,
            deadline,
            reason: Arc::new(OnceLock::new()),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 主动取消作用域
    pub fn cancel(&self) {
        let expired = self.deadline_passed();
        self.reason.get_or_init(|| {
            if expired {
                ScopeError::DeadlineExceeded
            } else {
                ScopeError::Cancelled
            }
        });
        self.token.cancel();
    }

    /// 非阻塞检查作用域是否已结束
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// 返回作用域结束原因，未结束时返回 `None`
    ///
    /// 原因一旦确定就不再改变
    pub fn err(&self) -> Option<ScopeError> {
        if let Some(reason) = self.reason.get() {
            return Some(*reason);
        }
        if self.deadline_passed() {
            return Some(*self.reason.get_or_init(|| ScopeError::DeadlineExceeded));
        }
        if self.token.is_cancelled() {
            return Some(*self.reason.get_or_init(|| ScopeError::Cancelled));
        }
        None
    }

    /// 等待作用域结束，返回结束原因
    pub async fn done(&self) -> ScopeError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
        self.err().unwrap_or(ScopeError::Cancelled)
    }

    fn deadline_passed(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Scope {}

impl Hash for Scope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.id)
    }
}
