use std::time::Duration;
use thiserror::Error;

/// 作用域（Scope）结束原因
///
/// 对应调用方可观察到的两种取消方式：主动取消与截止时间到达
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// 作用域被主动取消
    #[error("作用域已取消")]
    Cancelled,
    /// 作用域截止时间已到
    #[error("作用域已超过截止时间")]
    DeadlineExceeded,
}

/// 协程池错误
///
/// 构造、提交、释放阶段的错误都同步返回给直接调用方
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// 容量非法（必须大于 0）
    #[error("协程池容量非法: {capacity}")]
    InvalidCapacity { capacity: usize },
    /// 协程池已满，拒绝新任务
    #[error("协程池已满 (容量: {capacity})")]
    Saturated { capacity: usize },
    /// 协程池已释放，不再接受任务
    #[error("协程池已关闭")]
    Closed,
    /// 等待在途任务退出超时
    #[error("释放协程池超时 ({timeout:?})")]
    ReleaseTimeout { timeout: Duration },
    /// 作用域在操作开始前已结束
    #[error(transparent)]
    Scope(#[from] ScopeError),
}

/// 单个任务的执行错误
///
/// 批量执行时按任务 ID 隔离记录，互不影响
#[derive(Debug, Error)]
pub enum TaskError {
    /// 批量执行总耗时超过超时时间
    #[error("任务超时 ({timeout:?})")]
    Timeout { timeout: Duration },
    /// 等待期间作用域结束
    #[error(transparent)]
    Scope(#[from] ScopeError),
    /// 提交到协程池失败
    #[error("提交任务失败: {0}")]
    Submit(#[source] PoolError),
    /// 任务执行过程中 panic
    #[error("任务 panic: {message}")]
    Panicked { message: String },
    /// 任务自身返回的业务错误
    #[error(transparent)]
    Failed(Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// 包装任务返回的业务错误
    pub fn failed(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        TaskError::Failed(source.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskError::Timeout { .. })
    }

    /// 返回导致失败的作用域错误（如果有）
    pub fn scope_error(&self) -> Option<ScopeError> {
        match self {
            TaskError::Scope(e) => Some(*e),
            _ => None,
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },
}

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 协程池错误
    #[error("协程池错误: {0}")]
    Pool(#[from] PoolError),
    /// 任务错误
    #[error("任务错误: {0}")]
    Task(#[from] TaskError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 协程池结果类型
pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_error_passes_through_task_error() {
        let err: TaskError = ScopeError::DeadlineExceeded.into();
        assert_eq!(err.scope_error(), Some(ScopeError::DeadlineExceeded));
        assert_eq!(err.to_string(), ScopeError::DeadlineExceeded.to_string());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_failed_wraps_string_errors() {
        let err = TaskError::failed("余额不足");
        assert_eq!(err.to_string(), "余额不足");
        assert!(err.scope_error().is_none());
    }

    #[test]
    fn test_submit_error_keeps_pool_error_as_source() {
        use std::error::Error as _;

        let err = TaskError::Submit(PoolError::Saturated { capacity: 2 });
        assert!(err.source().is_some());
        assert!(err.to_string().contains("协程池已满"));
    }

    #[test]
    fn test_app_error_wraps_layer_errors() {
        fn start() -> AppResult<()> {
            Err(PoolError::Closed)?
        }

        let err = start().unwrap_err();
        assert!(matches!(err, AppError::Pool(PoolError::Closed)));
        assert_eq!(err.to_string(), "协程池错误: 协程池已关闭");

        let err: AppError = TaskError::from(ScopeError::Cancelled).into();
        assert_eq!(err.to_string(), "任务错误: 作用域已取消");
    }
}
