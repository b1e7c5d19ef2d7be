use anyhow::Result;
use task_pool::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logger::init(&config.log)?;

    // 初始化并运行应用
    let app = App::initialize(config)?;
    let result = app.run().await;
    app.shutdown().await?;

    result?;
    Ok(())
}
