//! 日志初始化

use crate::config::LogConfig;
use crate::utils::logging::init_log_file;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// RUST_LOG 存在时以 RUST_LOG 为准，否则使用配置的日志级别；
/// 配置了日志文件时写入文件头并把日志追加到文件，否则输出到标准输出。
pub fn init(config: &LogConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // 重复初始化（例如测试中）时保留已有的订阅者
    let _ = match &config.file {
        Some(path) => {
            init_log_file(path)?;
            let file = OpenOptions::new()
                .append(true)
                .open(path)
                .with_context(|| format!("无法打开日志文件: {}", path))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.try_init(),
    };
    Ok(())
}
