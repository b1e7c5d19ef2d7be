//! 批量执行器 - 编排层
//!
//! ## 职责
//!
//! 把一个批次的任务全部提交到工作池并等待结果，三者取先到者：
//!
//! 1. **全部完成**：返回各任务的返回值 / 错误
//! 2. **超时**：每个任务 ID 记为 `TaskError::Timeout`，返回值全部丢弃
//! 3. **作用域结束**：每个任务 ID 记为作用域错误，返回值全部丢弃
//!
//! 单个任务失败（返回错误或 panic）只影响它自己的那一项。
//! 超时不会停止已经在运行的任务，它们会在后台跑完并释放执行单元。

use crate::error::TaskError;
use crate::infrastructure::WorkerPool;
use crate::models::task::TaskOutput;
use crate::models::{BatchOutcome, TaskDescriptor, TaskId};
use crate::utils::logging;
use crate::workflow::Scope;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::warn;

/// 执行一个批次
pub(crate) async fn execute(
    workers: &WorkerPool,
    scope: &Scope,
    batch: Vec<TaskDescriptor>,
    timeout: Duration,
) -> BatchOutcome {
    let ids: Vec<TaskId> = batch.iter().map(TaskDescriptor::id).collect();

    if let Some(reason) = scope.err() {
        warn!("{} 执行前作用域已结束: {}，{} 个任务未执行", scope, reason, ids.len());
        return BatchOutcome::fail_all(&ids, || reason.into());
    }

    let started = Instant::now();
    logging::log_batch_dispatch(scope, ids.len(), timeout);

    let outcome = tokio::select! {
        biased;
        outcome = dispatch_and_collect(workers, scope, batch) => outcome,
        _ = tokio::time::sleep(timeout) => {
            warn!("{} 批量执行超时 ({:?})", scope, timeout);
            BatchOutcome::fail_all(&ids, || TaskError::Timeout { timeout })
        }
        reason = scope.done() => {
            warn!("{} 等待期间作用域结束: {}", scope, reason);
            BatchOutcome::fail_all(&ids, || reason.into())
        }
    };

    logging::log_batch_complete(scope, &outcome, started.elapsed());
    outcome
}

/// 提交所有任务并收集结果
///
/// 每个任务持有一个发送端，任务结束（无论成功、失败还是 panic）时发送端被释放；
/// 所有发送端都释放后接收端返回 `None`，即整批完成。
async fn dispatch_and_collect(
    workers: &WorkerPool,
    scope: &Scope,
    batch: Vec<TaskDescriptor>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::with_capacity(batch.len());
    let (tx, mut rx) = mpsc::unbounded_channel::<(TaskId, TaskOutput)>();

    for descriptor in batch {
        let id = descriptor.id();
        let tx = tx.clone();
        let task_scope = scope.clone();

        let unit = async move {
            let output = tokio::select! {
                output = descriptor.invoke(task_scope.clone()) => output,
                reason = task_scope.done() => Err(reason.into()),
            };
            let _ = tx.send((id, output));
        };

        if let Err(e) = workers.submit(unit).await {
            warn!("{} 任务 {} 提交失败: {}", scope, id, e);
            outcome.record(id, Err(TaskError::Submit(e)));
        }
    }
    drop(tx);

    while let Some((id, output)) = rx.recv().await {
        if let Err(e) = &output {
            warn!("{} 任务 {} 失败: {}", scope, id, e);
        }
        outcome.record(id, output);
    }

    outcome
}
