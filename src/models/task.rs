//! 任务描述
//!
//! 一个待执行的任务 = 可调用对象 + Push 时绑定的参数 + 生成的 ID

use crate::error::TaskError;
use crate::infrastructure::worker_pool::panic_message;
use crate::workflow::Scope;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use uuid::Uuid;

/// 任务 ID
///
/// 既是调用方拿到的句柄，也是批量结果 / 错误的键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 任务返回值（类型擦除）
///
/// 同一批次中的任务返回类型可以各不相同，取值时按类型向下转换
pub struct TaskValue(Box<dyn Any + Send>);

impl TaskValue {
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self(Box::new(value))
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// 转换为具体类型，类型不匹配时原样返回
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        self.0.downcast::<T>().map(|value| *value).map_err(Self)
    }
}

impl fmt::Debug for TaskValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TaskValue(..)")
    }
}

pub(crate) type TaskOutput = Result<TaskValue, TaskError>;

type BoundCall = Box<dyn FnOnce(Scope) -> BoxFuture<'static, TaskOutput> + Send>;

/// 待执行任务
///
/// 创建后不可变；批次执行或丢弃时销毁
pub struct TaskDescriptor {
    id: TaskId,
    call: BoundCall,
}

impl TaskDescriptor {
    /// 绑定任务函数与参数
    ///
    /// 执行时以 `method(scope, params)` 的形式调用，作用域总是第一个参数
    pub fn new<F, P, Fut, T, E>(method: F, params: P) -> Self
    where
        F: FnOnce(Scope, P) -> Fut + Send + 'static,
        P: Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Any + Send,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let call: BoundCall = Box::new(move |scope: Scope| {
            async move {
                match method(scope, params).await {
                    Ok(value) => Ok(TaskValue::new(value)),
                    Err(e) => Err(TaskError::failed(e)),
                }
            }
            .boxed()
        });

        Self {
            id: TaskId::generate(),
            call,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// 执行任务，panic 会被转换为 `TaskError::Panicked`
    pub(crate) async fn invoke(self, scope: Scope) -> TaskOutput {
        run_guarded((self.call)(scope))
            .await
            .and_then(|output| output)
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// 运行一个 future，把 panic 转换为 `TaskError::Panicked`
pub(crate) async fn run_guarded<Fut>(fut: Fut) -> Result<Fut::Output, TaskError>
where
    Fut: Future,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|payload| TaskError::Panicked {
            message: panic_message(payload.as_ref()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_task_value_downcast() {
        let value = TaskValue::new(7_i32);
        assert!(value.is::<i32>());
        assert_eq!(value.downcast_ref::<i32>(), Some(&7));
        assert!(value.downcast_ref::<String>().is_none());

        let value = value.downcast::<String>().unwrap_err();
        assert_eq!(value.downcast::<i32>().unwrap(), 7);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = TaskDescriptor::new(|_, ()| async { Ok::<_, io::Error>(()) }, ());
        let b = TaskDescriptor::new(|_, ()| async { Ok::<_, io::Error>(()) }, ());
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_invoke_passes_scope_and_params() {
        let scope = Scope::new();
        let expected = scope.id();
        let task = TaskDescriptor::new(
            move |scope: Scope, (a, b): (i32, i32)| async move {
                assert_eq!(scope.id(), expected);
                Ok::<_, io::Error>(a + b)
            },
            (3, 4),
        );

        let value = task.invoke(scope).await.unwrap();
        assert_eq!(value.downcast::<i32>().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_invoke_maps_business_error() {
        let task = TaskDescriptor::new(
            |_, ()| async { Err::<(), _>(io::Error::new(io::ErrorKind::Other, "库存不足")) },
            (),
        );

        let err = task.invoke(Scope::new()).await.unwrap_err();
        assert!(matches!(err, TaskError::Failed(_)));
        assert_eq!(err.to_string(), "库存不足");
    }

    #[tokio::test]
    async fn test_invoke_catches_panic() {
        let task = TaskDescriptor::new(
            |_, code: u32| async move {
                if code > 0 {
                    panic!("bad code {}", code);
                }
                Ok::<_, io::Error>(code)
            },
            5_u32,
        );

        let err = task.invoke(Scope::new()).await.unwrap_err();
        match err {
            TaskError::Panicked { message } => assert_eq!(message, "bad code 5"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
