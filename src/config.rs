use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// 默认批量执行超时时间
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);

/// 默认配置文件路径
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// 程序配置文件
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 协程池配置
    pub pool: PoolConfig,
    /// 日志配置
    pub log: LogConfig,
}

/// 协程池配置（`[pool]` 段）
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// 协程池容量
    pub size: usize,
    /// 批量执行超时时间（毫秒）
    pub task_timeout_ms: u64,
    /// 是否为非阻塞模式（池满时直接拒绝）
    pub nonblocking: bool,
    /// 阻塞模式下最多允许多少个提交方排队，0 表示不限制
    pub max_blocking_tasks: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 10,
            task_timeout_ms: DEFAULT_TASK_TIMEOUT.as_millis() as u64,
            nonblocking: false,
            max_blocking_tasks: 0,
        }
    }
}

/// 日志配置（`[log]` 段）
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// 日志级别，RUST_LOG 存在时以 RUST_LOG 为准
    pub level: String,
    /// 输出日志文件
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// 加载配置：先读配置文件（不存在则使用默认值），再用环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };
        base.with_env_overrides()
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::TomlParseFailed { source, .. } => ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: String::new(),
            source,
        })
    }

    /// 使用环境变量覆盖配置项
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(size) = env_parse("POOL_SIZE", "usize")? {
            self.pool.size = size;
        }
        if let Some(timeout) = env_parse("POOL_TASK_TIMEOUT_MS", "u64")? {
            self.pool.task_timeout_ms = timeout;
        }
        if let Some(nonblocking) = env_parse("POOL_NONBLOCKING", "bool")? {
            self.pool.nonblocking = nonblocking;
        }
        if let Some(max) = env_parse("POOL_MAX_BLOCKING_TASKS", "usize")? {
            self.pool.max_blocking_tasks = max;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.log.level = level;
        }
        if let Ok(file) = std::env::var("LOG_FILE") {
            self.log.file = Some(file);
        }
        Ok(self)
    }

    /// 转换为协程池运行参数
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions::new(self.pool.size)
            .nonblocking(self.pool.nonblocking)
            .max_blocking_tasks(self.pool.max_blocking_tasks)
            .task_timeout(Duration::from_millis(self.pool.task_timeout_ms))
    }
}

fn env_parse<T: std::str::FromStr>(
    var_name: &str,
    expected_type: &'static str,
) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type,
            }),
        Err(_) => Ok(None),
    }
}

/// 任务 panic 回调，参数为 panic 信息
pub type PanicHandler = Arc<dyn Fn(String) + Send + Sync>;

/// 协程池运行参数
#[derive(Clone)]
pub struct PoolOptions {
    /// 协程池容量
    pub capacity: usize,
    /// 池满时是否直接拒绝
    pub nonblocking: bool,
    /// 阻塞模式下排队上限，0 表示不限制
    pub max_blocking_tasks: usize,
    /// 默认批量执行超时时间
    pub task_timeout: Duration,
    /// 任务 panic 回调
    pub panic_handler: Option<PanicHandler>,
}

impl PoolOptions {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            nonblocking: false,
            max_blocking_tasks: 0,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            panic_handler: None,
        }
    }

    pub fn nonblocking(mut self, nonblocking: bool) -> Self {
        self.nonblocking = nonblocking;
        self
    }

    pub fn max_blocking_tasks(mut self, max: usize) -> Self {
        self.max_blocking_tasks = max;
        self
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn panic_handler(mut self, handler: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.panic_handler = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for PoolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOptions")
            .field("capacity", &self.capacity)
            .field("nonblocking", &self.nonblocking)
            .field("max_blocking_tasks", &self.max_blocking_tasks)
            .field("task_timeout", &self.task_timeout)
            .field("panic_handler", &self.panic_handler.is_some())
            .finish()
    }
}
