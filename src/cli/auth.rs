use crate::config::Config;
use crate::error::Result;
use crate::google::{authenticate, clear_tokens};
use tracing::info;

pub async fn execute(reset: bool) -> Result<()> {
    let config = Config::load()?;

    if reset {
        clear_tokens(&config.paths)?;
    }

    let _credential = authenticate(&config.paths).await?;

    info!("Google authentication verified");

    Ok(())
}
