//! 任务池 - 编排层入口
//!
//! ## 职责
//!
//! 组合工作池（WorkerPool）与任务注册表（TaskRegistry），对外提供四类操作：
//!
//! 1. **`submit`**：提交即忘，不关心结果
//! 2. **`submit_task`**：提交单个任务并等待结果
//! 3. **`push`**：按作用域暂存任务，不立即执行
//! 4. **`exec`**：并发执行某个作用域下暂存的全部任务，统一超时、逐个记录错误
//!
//! 以及状态查询（`status`）、超时设置（`set_timeout`）和释放（`release`）。
//!
//! ## 使用方式
//!
//! 进程启动时构造一次，克隆句柄传给需要的组件：
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use task_pool::{Scope, TaskPool};
//!
//! let pool = TaskPool::new(10)?;
//! let scope = Scope::new();
//!
//! let id = pool.push(&scope, |_scope, (a, b): (i32, i32)| async move {
//!     Ok::<_, std::io::Error>(a + b)
//! }, (3, 4))?;
//!
//! let outcome = pool.exec(&scope).await.expect("batch exists");
//! assert_eq!(outcome.result::<i32>(&id), Some(&7));
//! # Ok(())
//! # }
//! ```

use crate::config::PoolOptions;
use crate::error::{PoolError, PoolResult, TaskError};
use crate::infrastructure::WorkerPool;
use crate::models::task::run_guarded;
use crate::models::{BatchOutcome, TaskDescriptor, TaskId};
use crate::orchestrator::batch_executor;
use crate::services::TaskRegistry;
use crate::utils::logging;
use crate::workflow::Scope;
use parking_lot::Mutex;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// 任务池状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// 正在运行的任务数
    pub running: usize,
    /// 容量
    pub capacity: usize,
    /// 排队等待空闲执行单元的提交方数量
    pub waiting: usize,
}

/// 任务池
///
/// 克隆得到的是同一个池的句柄
#[derive(Clone)]
pub struct TaskPool {
    inner: Arc<Shared>,
}

struct Shared {
    workers: WorkerPool,
    registry: TaskRegistry,
    default_timeout: Duration,
    next_timeout: Mutex<Option<Duration>>,
}

impl TaskPool {
    /// 使用默认参数创建指定容量的任务池
    pub fn new(capacity: usize) -> PoolResult<Self> {
        Self::with_options(PoolOptions::new(capacity))
    }

    /// 按运行参数创建任务池
    pub fn with_options(options: PoolOptions) -> PoolResult<Self> {
        let workers = WorkerPool::new(&options)?;
        logging::log_pool_started(&options);

        Ok(Self {
            inner: Arc::new(Shared {
                workers,
                registry: TaskRegistry::new(),
                default_timeout: options.task_timeout,
                next_timeout: Mutex::new(None),
            }),
        })
    }

    /// 提交即忘
    pub async fn submit<F>(&self, unit: F) -> PoolResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.workers.submit(unit).await
    }

    /// 提交单个任务并等待结果
    ///
    /// 作用域先结束时返回作用域错误；此时任务如果已经开始运行，会继续在后台跑完。
    pub async fn submit_task<F, P, Fut, T, E>(
        &self,
        scope: &Scope,
        task: F,
        params: P,
    ) -> Result<T, TaskError>
    where
        F: FnOnce(P) -> Fut + Send + 'static,
        P: Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if let Some(reason) = scope.err() {
            return Err(reason.into());
        }

        let (tx, rx) = oneshot::channel();
        let unit = async move {
            let output = run_guarded(async move { task(params).await })
                .await
                .and_then(|result| result.map_err(|e| TaskError::failed(e)));
            let _ = tx.send(output);
        };

        // 阻塞模式下排队等待执行单元时同样受作用域约束
        tokio::select! {
            biased;
            submitted = self.inner.workers.submit(unit) => submitted.map_err(TaskError::Submit)?,
            reason = scope.done() => return Err(reason.into()),
        }

        tokio::select! {
            biased;
            output = rx => output.unwrap_or_else(|_| Err(TaskError::Submit(PoolError::Closed))),
            reason = scope.done() => Err(reason.into()),
        }
    }

    /// 按作用域暂存一个任务，返回任务 ID
    ///
    /// 任务执行时以 `method(scope, params)` 的形式调用。
    /// 作用域已结束或任务池已释放时直接返回错误，不做任何修改。
    pub fn push<F, P, Fut, T, E>(&self, scope: &Scope, method: F, params: P) -> PoolResult<TaskId>
    where
        F: FnOnce(Scope, P) -> Fut + Send + 'static,
        P: Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Any + Send,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if let Some(reason) = scope.err() {
            return Err(reason.into());
        }
        if self.inner.workers.is_closed() {
            return Err(PoolError::Closed);
        }

        let descriptor = TaskDescriptor::new(method, params);
        Ok(self.inner.registry.push(scope, descriptor))
    }

    /// 执行某个作用域下暂存的全部任务
    ///
    /// 批次在进入时被整体取走：执行期间同一作用域的新 `push` 会进入下一个批次。
    /// 作用域下没有任务时返回 `None`。
    /// 无论结果如何，超时时间都会恢复为默认值。
    pub async fn exec(&self, scope: &Scope) -> Option<BatchOutcome> {
        let timeout = self
            .inner
            .next_timeout
            .lock()
            .take()
            .unwrap_or(self.inner.default_timeout);

        let Some(batch) = self.inner.registry.take(scope) else {
            debug!("{} 没有待执行的任务", scope);
            return None;
        };

        Some(batch_executor::execute(&self.inner.workers, scope, batch, timeout).await)
    }

    /// 设置下一次 `exec` 使用的超时时间
    pub fn set_timeout(&self, timeout: Duration) {
        *self.inner.next_timeout.lock() = Some(timeout);
    }

    /// 下一次 `exec` 将使用的超时时间
    pub fn timeout(&self) -> Duration {
        self.inner
            .next_timeout
            .lock()
            .unwrap_or(self.inner.default_timeout)
    }

    /// 丢弃某个作用域下暂存的任务，返回丢弃数量
    pub fn discard(&self, scope: &Scope) -> usize {
        self.inner.registry.discard(scope)
    }

    /// 某个作用域下暂存的任务数
    pub fn pending(&self, scope: &Scope) -> usize {
        self.inner.registry.pending(scope)
    }

    /// 任务池状态（运行中 / 容量 / 排队数）
    pub fn status(&self) -> PoolStatus {
        let workers = &self.inner.workers;
        PoolStatus {
            running: workers.running(),
            capacity: workers.capacity(),
            waiting: workers.waiting(),
        }
    }

    /// 释放任务池
    ///
    /// 不再接受新任务并清空所有暂存批次。
    /// 只应在有序关闭时调用，不要与提交操作并发。
    pub fn release(&self) {
        self.inner.workers.release();
        let dropped = self.inner.registry.clear();
        logging::log_pool_released(dropped, self.inner.workers.running());
    }

    /// 释放任务池并等待在途任务退出，最多等待 `timeout`
    pub async fn release_timeout(&self, timeout: Duration) -> PoolResult<()> {
        self.release();
        self.inner.workers.release_timeout(timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScopeError;
    use std::io;

    #[test]
    fn test_invalid_capacity() {
        assert!(matches!(
            TaskPool::new(0),
            Err(PoolError::InvalidCapacity { capacity: 0 })
        ));
    }

    #[test]
    fn test_set_timeout_applies_once() {
        let pool = TaskPool::with_options(PoolOptions::new(1).task_timeout(Duration::from_secs(3)))
            .unwrap();
        assert_eq!(pool.timeout(), Duration::from_secs(3));

        pool.set_timeout(Duration::from_millis(20));
        assert_eq!(pool.timeout(), Duration::from_millis(20));
    }

    #[test]
    fn test_exec_restores_default_timeout_even_without_batch() {
        let pool = TaskPool::new(1).unwrap();
        pool.set_timeout(Duration::from_millis(20));

        assert!(tokio_test::block_on(pool.exec(&Scope::new())).is_none());
        assert_eq!(pool.timeout(), crate::config::DEFAULT_TASK_TIMEOUT);
    }

    #[test]
    fn test_push_on_done_scope_is_rejected() {
        let pool = TaskPool::new(1).unwrap();
        let scope = Scope::new();
        scope.cancel();

        let result = pool.push(&scope, |_, ()| async { Ok::<_, io::Error>(()) }, ());
        assert_eq!(result, Err(PoolError::Scope(ScopeError::Cancelled)));
        assert_eq!(pool.pending(&scope), 0);
    }

    #[test]
    fn test_release_clears_pending_batches() {
        let pool = TaskPool::new(1).unwrap();
        let scope = Scope::new();
        pool.push(&scope, |_, ()| async { Ok::<_, io::Error>(()) }, ())
            .unwrap();

        pool.release();
        assert_eq!(pool.pending(&scope), 0);
        assert_eq!(
            pool.push(&scope, |_, ()| async { Ok::<_, io::Error>(()) }, ()),
            Err(PoolError::Closed)
        );
    }

    #[tokio::test]
    async fn test_submit_task_on_done_scope_skips_submission() {
        let pool = TaskPool::new(1).unwrap();
        let scope = Scope::new();
        scope.cancel();

        let result = pool
            .submit_task(&scope, |x: i32| async move { Ok::<_, io::Error>(x) }, 1)
            .await;
        assert_eq!(result.unwrap_err().scope_error(), Some(ScopeError::Cancelled));
        assert_eq!(pool.status().running, 0);
    }
}
