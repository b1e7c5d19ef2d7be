//! 日志工具模块
//!
//! 提供任务池生命周期与批量执行的日志输出

use crate::config::PoolOptions;
use crate::models::BatchOutcome;
use crate::workflow::Scope;
use anyhow::Result;
use std::fs;
use std::time::Duration;
use tracing::{debug, info};

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n任务池日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录任务池启动信息
pub fn log_pool_started(options: &PoolOptions) {
    info!(
        "🚀 任务池已创建: 容量 {} | {} | 默认超时 {:?}",
        options.capacity,
        if options.nonblocking {
            "非阻塞模式"
        } else {
            "阻塞模式"
        },
        options.task_timeout
    );
}

/// 记录批次开始执行
///
/// # 参数
/// - `scope`: 批次所属作用域
/// - `total`: 任务数
/// - `timeout`: 本次超时时间
pub fn log_batch_dispatch(scope: &Scope, total: usize, timeout: Duration) {
    debug!("📦 {} 开始执行 {} 个任务 (超时 {:?})", scope, total, timeout);
}

/// 记录批次执行完成
pub fn log_batch_complete(scope: &Scope, outcome: &BatchOutcome, elapsed: Duration) {
    debug!(
        "✓ {} 执行完成: 成功 {}/{} | 耗时 {:?}",
        scope,
        outcome.succeeded_count(),
        outcome.len(),
        elapsed
    );
}

/// 记录任务池释放
///
/// # 参数
/// - `dropped`: 被丢弃的暂存任务数
/// - `running`: 释放时仍在运行的任务数
pub fn log_pool_released(dropped: usize, running: usize) {
    info!(
        "任务池已释放: 丢弃暂存任务 {} 个, 在途任务 {} 个",
        dropped, running
    );
}
