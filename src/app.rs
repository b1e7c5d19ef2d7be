use crate::config::Config;
use crate::error::{AppResult, TaskError};
use crate::orchestrator::TaskPool;
use crate::workflow::Scope;
use std::time::Duration;
use tracing::{info, warn};

/// 关闭时等待在途任务的最长时间
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// 应用主结构
///
/// 进程内唯一持有任务池的地方，其他组件拿到的都是克隆出的句柄
pub struct App {
    config: Config,
    pool: TaskPool,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        let pool = TaskPool::with_options(config.pool_options())?;
        Ok(Self { config, pool })
    }

    /// 获取任务池句柄
    pub fn pool(&self) -> TaskPool {
        self.pool.clone()
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> AppResult<()> {
        info!("{}", "=".repeat(60));
        info!("📊 任务池容量: {}", self.config.pool.size);
        info!("{}", "=".repeat(60));

        // 提交即忘
        self.pool
            .submit(async {
                info!("后台任务已执行");
            })
            .await?;

        // 单任务等待结果
        let scope = Scope::with_timeout(Duration::from_secs(1));
        let sum = self
            .pool
            .submit_task(
                &scope,
                |(a, b): (i64, i64)| async move { Ok::<_, TaskError>(a + b) },
                (3, 4),
            )
            .await?;
        info!("单任务结果: {}", sum);

        // 批量执行
        self.run_batch().await;

        let status = self.pool.status();
        info!("运行中 {} / 容量 {}", status.running, status.capacity);
        Ok(())
    }

    async fn run_batch(&self) {
        let scope = Scope::new();
        let mut ids = Vec::new();

        for (a, b) in [(1, 2), (10, 20)] {
            let pushed = self.pool.push(
                &scope,
                |_scope, (a, b): (i64, i64)| async move { Ok::<_, TaskError>(a + b) },
                (a, b),
            );
            match pushed {
                Ok(id) => ids.push(id),
                Err(e) => warn!("暂存任务失败: {}", e),
            }
        }
        let label = self.pool.push(
            &scope,
            |scope: Scope, name: String| async move {
                Ok::<_, TaskError>(format!("{} {}", scope, name))
            },
            "批量任务".to_string(),
        );
        if let Err(e) = &label {
            warn!("暂存任务失败: {}", e);
        }

        let Some(outcome) = self.pool.exec(&scope).await else {
            warn!("没有待执行的任务");
            return;
        };

        for id in &ids {
            match (outcome.result::<i64>(id), outcome.error(id)) {
                (Some(value), None) => info!("任务 {} => {}", id, value),
                (_, Some(e)) => warn!("任务 {} 失败: {}", id, e),
                (None, None) => warn!("任务 {} 没有返回值", id),
            }
        }
        if let Ok(id) = label {
            if let Some(text) = outcome.result::<String>(&id) {
                info!("任务 {} => {}", id, text);
            }
        }
        info!(
            "✓ 批量执行完成: 成功 {}/{}",
            outcome.succeeded_count(),
            outcome.len()
        );
    }

    /// 释放任务池
    pub async fn shutdown(&self) -> AppResult<()> {
        self.pool.release_timeout(SHUTDOWN_TIMEOUT).await?;
        info!("✅ 任务池已关闭");
        Ok(())
    }
}
