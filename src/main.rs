use anyhow::{Context, Result};
use doc_digest::utils::logging;
use doc_digest::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // CONFIG_FILE points at an optional TOML file; environment variables win
    let config = match std::env::var("CONFIG_FILE") {
        Ok(path) => Config::from_toml_file(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        Err(_) => Config::from_env().context("invalid configuration in environment")?,
    };

    logging::init(config.verbose_logging);

    let stats = App::initialize(config).await?.run().await?;

    if stats.failed > 0 {
        anyhow::bail!("{} of {} documents failed", stats.failed, stats.total);
    }
    Ok(())
}
