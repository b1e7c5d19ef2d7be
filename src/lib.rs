//! # Task Pool
//!
//! 基于有界工作池的任务池：单任务提交、按作用域批量暂存与执行
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有有限的执行单元，只暴露"提交任务"的能力
//! - `WorkerPool` - 有界工作池，阻塞 / 非阻塞两种策略
//!
//! ### ② 数据层（Models）
//! - `models/` - 任务描述、任务 ID、类型擦除的返回值、批量执行结果
//!
//! ### ③ 业务能力层（Services）
//! - `TaskRegistry` - 按作用域暂存待执行任务
//!
//! ### ④ 流程层（Workflow）
//! - `Scope` - 批次的键，同时也是取消信号（主动取消 / 截止时间）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/task_pool` - 对外接口
//! - `orchestrator/batch_executor` - 批量执行：完成 / 超时 / 取消三者竞速
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::{Config, PoolOptions};
pub use error::{AppError, AppResult, ConfigError, PoolError, PoolResult, ScopeError, TaskError};
pub use infrastructure::WorkerPool;
pub use models::{BatchOutcome, TaskId, TaskValue};
pub use orchestrator::{PoolStatus, TaskPool};
pub use workflow::{Scope, ScopeId};
