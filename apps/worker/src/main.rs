use ledgerfolio_worker::config::Config;
use ledgerfolio_worker::{build_context, init_tracing, scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    let context = build_context(&config).await?;

    let handle = scheduler::start_balance_processing_scheduler(context, &config);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    handle.abort();
    Ok(())
}
