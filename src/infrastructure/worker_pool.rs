//! 工作池 - 基础设施层
//!
//! 持有有限的执行单元，只暴露"提交一个无参任务"的能力

use crate::config::{PanicHandler, PoolOptions};
use crate::error::{PoolError, PoolResult};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

/// 有界工作池
///
/// 职责：
/// - 同一时刻最多运行 `capacity` 个任务
/// - 池满时按策略排队（阻塞模式，先到先得）或拒绝（非阻塞模式）
/// - 捕获任务 panic，执行单元不会因此丢失
/// - 不认识批次 / 作用域
///
/// 克隆得到的是同一个池的句柄。
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

struct Inner {
    capacity: usize,
    nonblocking: bool,
    max_blocking_tasks: usize,
    permits: Arc<Semaphore>,
    running: AtomicUsize,
    waiting: AtomicUsize,
    tracker: TaskTracker,
    panic_handler: Option<PanicHandler>,
}

impl WorkerPool {
    /// 创建工作池
    ///
    /// 容量为 0 或超出信号量上限时返回 `InvalidCapacity`
    pub fn new(options: &PoolOptions) -> PoolResult<Self> {
        let capacity = options.capacity;
        if capacity == 0 || capacity > Semaphore::MAX_PERMITS {
            return Err(PoolError::InvalidCapacity { capacity });
        }

        Ok(Self {
            inner: Arc::new(Inner {
                capacity,
                nonblocking: options.nonblocking,
                max_blocking_tasks: options.max_blocking_tasks,
                permits: Arc::new(Semaphore::new(capacity)),
                running: AtomicUsize::new(0),
                waiting: AtomicUsize::new(0),
                tracker: TaskTracker::new(),
                panic_handler: options.panic_handler.clone(),
            }),
        })
    }

    /// 提交一个任务
    ///
    /// 非阻塞模式下池满立即返回 `Saturated`；
    /// 阻塞模式下等待空闲执行单元，排队数超过上限时返回 `Saturated`。
    pub async fn submit<F>(&self, unit: F) -> PoolResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self.acquire().await?;
        self.spawn(permit, unit);
        Ok(())
    }

    async fn acquire(&self) -> PoolResult<OwnedSemaphorePermit> {
        let inner = &self.inner;

        match inner.permits.clone().try_acquire_owned() {
            Ok(permit) => return Ok(permit),
            Err(TryAcquireError::Closed) => return Err(PoolError::Closed),
            Err(TryAcquireError::NoPermits) if inner.nonblocking => {
                return Err(PoolError::Saturated {
                    capacity: inner.capacity,
                });
            }
            Err(TryAcquireError::NoPermits) => {}
        }

        let _waiting = WaitingGuard::enter(inner)?;
        inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)
    }

    fn spawn<F>(&self, permit: OwnedSemaphorePermit, unit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = RunningGuard::enter(self.inner.clone(), permit);

        self.inner.tracker.spawn(async move {
            if let Err(payload) = AssertUnwindSafe(unit).catch_unwind().await {
                let message = panic_message(payload.as_ref());
                error!("工作池任务 panic: {}", message);
                if let Some(handler) = &slot.inner.panic_handler {
                    handler(message);
                }
            }
            drop(slot);
        });
    }

    /// 正在运行的任务数
    pub fn running(&self) -> usize {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// 工作池容量
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// 阻塞模式下正在排队的提交方数量
    pub fn waiting(&self) -> usize {
        self.inner.waiting.load(Ordering::SeqCst)
    }

    /// 空闲执行单元数
    pub fn free(&self) -> usize {
        self.inner.capacity.saturating_sub(self.running())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.permits.is_closed()
    }

    /// 关闭工作池
    ///
    /// 之后的提交返回 `Closed`，正在排队的提交方也会收到 `Closed`；
    /// 已经在运行的任务不受影响。
    pub fn release(&self) {
        self.inner.permits.close();
        self.inner.tracker.close();
        debug!("工作池已关闭, 在途任务: {}", self.running());
    }

    /// 关闭工作池并等待在途任务退出，最多等待 `timeout`
    pub async fn release_timeout(&self, timeout: Duration) -> PoolResult<()> {
        self.release();
        tokio::time::timeout(timeout, self.inner.tracker.wait())
            .await
            .map_err(|_| PoolError::ReleaseTimeout { timeout })
    }
}

/// 排队计数守卫，离开作用域（包括等待被取消）时自动减一
struct WaitingGuard<'a> {
    waiting: &'a AtomicUsize,
}

impl<'a> WaitingGuard<'a> {
    fn enter(inner: &'a Inner) -> PoolResult<Self> {
        let queued = inner.waiting.fetch_add(1, Ordering::SeqCst);
        let guard = Self {
            waiting: &inner.waiting,
        };
        if inner.max_blocking_tasks > 0 && queued >= inner.max_blocking_tasks {
            return Err(PoolError::Saturated {
                capacity: inner.capacity,
            });
        }
        Ok(guard)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 运行计数守卫，持有执行单元许可
///
/// 任务结束（包括 panic 处理函数自身 panic）时运行数减一并归还许可
struct RunningGuard {
    inner: Arc<Inner>,
    _permit: OwnedSemaphorePermit,
}

impl RunningGuard {
    fn enter(inner: Arc<Inner>, permit: OwnedSemaphorePermit) -> Self {
        inner.running.fetch_add(1, Ordering::SeqCst);
        Self {
            inner,
            _permit: permit,
        }
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.inner.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 提取 panic 信息
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知 panic".to_string()
    }
}
