//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `task_pool` - 任务池入口
//! - 构造工作池与任务注册表
//! - 提交即忘 / 单任务等待结果
//! - 按作用域暂存任务（push）
//! - 状态查询、超时设置、释放
//!
//! ### `batch_executor` - 批量执行器
//! - 并发提交一个批次的全部任务
//! - 完成 / 超时 / 作用域结束三者竞速
//! - 逐个任务记录结果与错误
//!
//! ## 层次关系
//!
//! ```text
//! task_pool (对外接口)
//!     ↓
//! batch_executor (处理 Vec<TaskDescriptor>)
//!     ↓
//! services::TaskRegistry (暂存批次)
//!     ↓
//! infrastructure::WorkerPool (有界执行单元)
//! ```

pub mod batch_executor;
pub mod task_pool;

// 重新导出主要类型
pub use task_pool::{PoolStatus, TaskPool};
