use std::path::PathBuf;

use anyhow::Result;
use flashdeck_lib::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // Optional config path as the only argument
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(path.as_deref())?;

    flashdeck_lib::serve(&config).await
}
