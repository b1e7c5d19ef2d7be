//! 批量执行结果

use crate::error::TaskError;
use crate::models::task::{TaskId, TaskValue};
use std::any::Any;
use std::collections::HashMap;

/// 一次批量执行的结果
///
/// - `results`：成功任务的返回值
/// - `errors`：批次中每个任务 ID 都有一项，`None` 表示成功
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: HashMap<TaskId, TaskValue>,
    pub errors: HashMap<TaskId, Option<TaskError>>,
}

impl BatchOutcome {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            results: HashMap::with_capacity(capacity),
            errors: HashMap::with_capacity(capacity),
        }
    }

    /// 整批失败：每个任务 ID 记录同一种错误，返回值全部丢弃
    pub(crate) fn fail_all(ids: &[TaskId], mut make_error: impl FnMut() -> TaskError) -> Self {
        Self {
            results: HashMap::new(),
            errors: ids.iter().map(|id| (*id, Some(make_error()))).collect(),
        }
    }

    pub(crate) fn record(&mut self, id: TaskId, output: Result<TaskValue, TaskError>) {
        match output {
            Ok(value) => {
                self.results.insert(id, value);
                self.errors.insert(id, None);
            }
            Err(e) => {
                self.errors.insert(id, Some(e));
            }
        }
    }

    /// 按类型读取某个任务的返回值
    pub fn result<T: Any>(&self, id: &TaskId) -> Option<&T> {
        self.results.get(id).and_then(|value| value.downcast_ref::<T>())
    }

    /// 按类型取走某个任务的返回值，类型不匹配时保留原值
    pub fn take_result<T: Any>(&mut self, id: &TaskId) -> Option<T> {
        let value = self.results.remove(id)?;
        match value.downcast::<T>() {
            Ok(typed) => Some(typed),
            Err(value) => {
                self.results.insert(*id, value);
                None
            }
        }
    }

    /// 某个任务的错误，成功或不存在时返回 `None`
    pub fn error(&self, id: &TaskId) -> Option<&TaskError> {
        self.errors.get(id).and_then(Option::as_ref)
    }

    /// 批次中的任务数
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.errors.values().filter(|e| e.is_some()).count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.len() - self.failed_count()
    }

    /// 所有任务都成功
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_record_keeps_every_id() {
        let ok = TaskId::generate();
        let bad = TaskId::generate();

        let mut outcome = BatchOutcome::with_capacity(2);
        outcome.record(ok, Ok(TaskValue::new("done")));
        outcome.record(bad, Err(TaskError::failed("失败")));

        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.failed_count(), 1);
        assert_eq!(outcome.succeeded_count(), 1);
        assert_eq!(outcome.result::<&str>(&ok), Some(&"done"));
        assert!(outcome.error(&ok).is_none());
        assert!(outcome.error(&bad).is_some());
        assert!(!outcome.results.contains_key(&bad));
    }

    #[test]
    fn test_take_result_with_wrong_type_keeps_value() {
        let id = TaskId::generate();
        let mut outcome = BatchOutcome::default();
        outcome.record(id, Ok(TaskValue::new(1_u64)));

        assert_eq!(outcome.take_result::<i32>(&id), None);
        assert_eq!(outcome.take_result::<u64>(&id), Some(1));
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn test_fail_all_discards_results() {
        let ids = [TaskId::generate(), TaskId::generate()];
        let timeout = Duration::from_millis(5);
        let outcome = BatchOutcome::fail_all(&ids, || TaskError::Timeout { timeout });

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.len(), 2);
        assert!(ids.iter().all(|id| outcome.error(id).is_some_and(TaskError::is_timeout)));
    }
}
