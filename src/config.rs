use crate::error::{AppError, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::PathBuf;

const CONFIG_DIR_PREFIX: &str = "invoice-mailer";

const DEFAULT_RECIPIENT: &str = "default_recipient@example.com";
const DEFAULT_CC: &str = "default_cc@example.com";
const DEFAULT_SENDER: &str = "me@example.com";
const DEFAULT_TOTAL: &str = "0";

/// Raw environment variables, one field per recognised option.
#[derive(Debug, Deserialize, Default)]
struct EnvVars {
    spreadsheet_id: Option<String>,
    email_recipients: Option<String>,
    email_cc: Option<String>,
    email_from: Option<String>,
    salary: Option<String>,
    credentials_file: Option<PathBuf>,
    token_file: Option<PathBuf>,
    spreadsheet_id_file: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Source spreadsheet used when no working copy has been recorded yet
    pub spreadsheet_id: Option<String>,
    /// Value written to the total cell
    pub salary: String,
    pub email: EmailConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub recipient: String,
    pub cc: String,
    pub sender: String,
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
    pub spreadsheet_id_file: PathBuf,
    pub output_dir: PathBuf,
}

impl Config {
    /// Load configuration from the process environment, honouring a `.env` file
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(Self::process_vars())
    }

    /// Process environment, skipping entries that are not valid UTF-8
    fn process_vars() -> impl Iterator<Item = (String, String)> {
        Self::utf8_vars(std::env::vars_os())
    }

    fn utf8_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        // Blank variables behave as if they were unset
        let vars = vars.into_iter().filter(|(_, value)| !value.trim().is_empty());
        let env: EnvVars = envy::from_iter(vars)
            .map_err(|e| AppError::Config(format!("Failed to parse environment: {}", e)))?;

        let paths = PathsConfig {
            credentials_file: match env.credentials_file {
                Some(path) => path,
                None => Self::config_file("credentials.json")?,
            },
            token_file: match env.token_file {
                Some(path) => path,
                None => Self::cache_file("google_tokens.json")?,
            },
            spreadsheet_id_file: match env.spreadsheet_id_file {
                Some(path) => path,
                None => Self::cache_file("spreadsheet_id.txt")?,
            },
            output_dir: env.output_dir.unwrap_or_else(|| PathBuf::from(".")),
        };

        Ok(Self {
            spreadsheet_id: env.spreadsheet_id.map(|id| id.trim().to_string()),
            salary: env.salary.unwrap_or_else(|| DEFAULT_TOTAL.to_string()),
            email: EmailConfig {
                recipient: env
                    .email_recipients
                    .unwrap_or_else(|| DEFAULT_RECIPIENT.to_string()),
                cc: env.email_cc.unwrap_or_else(|| DEFAULT_CC.to_string()),
                sender: env.email_from.unwrap_or_else(|| DEFAULT_SENDER.to_string()),
            },
            paths,
        })
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    /// Get a config file path
    pub fn config_file(filename: &str) -> Result<PathBuf> {
        Self::xdg_dirs()
            .place_config_file(filename)
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))
    }

    /// Get a cache file path
    pub fn cache_file(filename: &str) -> Result<PathBuf> {
        Self::xdg_dirs()
            .place_cache_file(filename)
            .map_err(|e| AppError::Config(format!("Failed to create cache file path: {}", e)))
    }
}


#[cfg(test)]
mod tests {
    use super::test_helpers::mock_config;
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let dir = tempfile::tempdir().unwrap();
        let config = mock_config(dir.path(), &[]);

        assert_eq!(config.spreadsheet_id, None);
        assert_eq!(config.salary, "0");
        assert_eq!(config.email.recipient, "default_recipient@example.com");
        assert_eq!(config.email.cc, "default_cc@example.com");
        assert_eq!(config.email.sender, "me@example.com");
    }

    #[test]
    fn test_recognised_options() {
        let dir = tempfile::tempdir().unwrap();
        let config = mock_config(
            dir.path(),
            &[
                ("SPREADSHEET_ID", "abc123"),
                ("EMAIL_RECIPIENTS", "billing@client.test"),
                ("EMAIL_CC", "me@contractor.test"),
                ("SALARY", "1500.00"),
            ],
        );

        assert_eq!(config.spreadsheet_id.as_deref(), Some("abc123"));
        assert_eq!(config.salary, "1500.00");
        assert_eq!(config.email.recipient, "billing@client.test");
        assert_eq!(config.email.cc, "me@contractor.test");
        assert_eq!(config.paths.output_dir, dir.path());
        assert_eq!(config.paths.token_file, dir.path().join("token.json"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let dir = tempfile::tempdir().unwrap();
        let config = mock_config(dir.path(), &[("SPREADSHEET_ID", "  "), ("SALARY", "")]);

        assert_eq!(config.spreadsheet_id, None);
        assert_eq!(config.salary, "0");
    }

    #[test]
    fn test_unrelated_variables_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = mock_config(dir.path(), &[("HOME", "/home/someone"), ("PATH", "/bin")]);

        assert_eq!(config.spreadsheet_id, None);
    }

    #[test]
    fn test_non_utf8_variables_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let vars = vec![
            (OsString::from("SALARY"), OsString::from("1500.00")),
            (OsString::from("BROKEN"), OsString::from_vec(vec![0x66, 0x6f, 0x80])),
            (OsString::from_vec(vec![0xff]), OsString::from("value")),
        ];

        let vars: Vec<(String, String)> = Config::utf8_vars(vars).collect();

        assert_eq!(vars, vec![("SALARY".to_string(), "1500.00".to_string())]);
    }
}
