use crate::config::Config;
use crate::error::Result;
use clap::Subcommand;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum ShowResource {
    /// Show credential, token and state file paths
    Paths,
}

impl ShowResource {
    pub async fn execute(&self) -> Result<()> {
        match self {
            ShowResource::Paths => show_paths(),
        }
    }
}

fn show_paths() -> Result<()> {
    let config = Config::load()?;
    let paths = &config.paths;

    info!(path = ?paths.credentials_file, "Client secret path");
    info!(path = ?paths.token_file, "Token cache path");
    info!(path = ?paths.spreadsheet_id_file, "Spreadsheet ID path");
    info!(path = ?paths.output_dir, "PDF output directory");

    Ok(())
}
