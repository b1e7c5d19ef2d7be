//! 任务注册表 - 业务能力层
//!
//! 只负责"按作用域暂存待执行任务"，不关心任务怎么执行

use crate::models::{TaskDescriptor, TaskId};
use crate::workflow::{Scope, ScopeId};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// 任务注册表
///
/// 职责：
/// - 作用域 → 有序任务列表
/// - 同一作用域的并发追加按加锁顺序串行化，不会丢任务
/// - 批次只能被整体取走一次
#[derive(Default)]
pub struct TaskRegistry {
    batches: Mutex<HashMap<ScopeId, Vec<TaskDescriptor>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加任务，第一次追加时创建批次
    pub fn push(&self, scope: &Scope, descriptor: TaskDescriptor) -> TaskId {
        let id = descriptor.id();
        let mut batches = self.batches.lock();
        let batch = batches.entry(scope.id()).or_default();
        batch.push(descriptor);
        debug!("{} 追加任务 {} (当前 {} 个)", scope, id, batch.len());
        id
    }

    /// 取走整个批次，之后同一作用域的追加会进入新批次
    pub fn take(&self, scope: &Scope) -> Option<Vec<TaskDescriptor>> {
        self.batches.lock().remove(&scope.id())
    }

    /// 丢弃批次，返回丢弃的任务数
    pub fn discard(&self, scope: &Scope) -> usize {
        self.take(scope).map_or(0, |batch| batch.len())
    }

    /// 某个作用域下待执行的任务数
    pub fn pending(&self, scope: &Scope) -> usize {
        self.batches
            .lock()
            .get(&scope.id())
            .map_or(0, |batch| batch.len())
    }

    /// 当前批次数
    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    /// 清空所有批次，返回丢弃的任务数
    pub fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.batches.lock());
        drained.values().map(Vec::len).sum()
    }
}
