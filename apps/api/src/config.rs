use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::mail_client::{MailConfig, DEFAULT_MAIL_API_URL};

/// Application configuration loaded from environment variables.
/// Everything has a default; the mail transport and the Postgres source are
/// only enabled when their variables are set.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    pub rasterizer_bin: String,
    pub export_work_dir: Option<PathBuf>,
    pub template_partials_dir: Option<PathBuf>,
    pub mail: Option<MailConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mail = match (var("MAIL_API_KEY"), var("MAIL_FROM"), var("MAIL_TO")) {
            (Some(api_key), Some(from), Some(to)) => Some(MailConfig {
                api_url: var("MAIL_API_URL").unwrap_or_else(|| DEFAULT_MAIL_API_URL.to_string()),
                api_key,
                from,
                to,
            }),
            (None, None, None) => None,
            _ => anyhow::bail!("MAIL_API_KEY, MAIL_FROM and MAIL_TO must be set together"),
        };

        Ok(Config {
            port: var("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            data_dir: var("DATA_DIR")
                .unwrap_or_else(|| "data/companies".to_string())
                .into(),
            database_url: var("DATABASE_URL"),
            rasterizer_bin: var("RASTERIZER_BIN").unwrap_or_else(|| "wkhtmltopdf".to_string()),
            export_work_dir: var("EXPORT_WORK_DIR").map(PathBuf::from),
            template_partials_dir: var("TEMPLATE_PARTIALS_DIR").map(PathBuf::from),
            mail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.rust_log, "info");
        assert_eq!(cfg.data_dir, PathBuf::from("data/companies"));
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.rasterizer_bin, "wkhtmltopdf");
        assert!(cfg.mail.is_none());
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(config(&[("PORT", "eighty")]).is_err());
    }

    #[test]
    fn test_mail_requires_all_three() {
        assert!(config(&[("MAIL_API_KEY", "re_123")]).is_err());

        let cfg = config(&[
            ("MAIL_API_KEY", "re_123"),
            ("MAIL_FROM", "site@example.com"),
            ("MAIL_TO", "me@example.com"),
        ])
        .unwrap();
        let mail = cfg.mail.unwrap();
        assert_eq!(mail.api_url, DEFAULT_MAIL_API_URL);
        assert_eq!(mail.to, "me@example.com");
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let cfg = config(&[("DATABASE_URL", "  "), ("EXPORT_WORK_DIR", "")]).unwrap();
        assert!(cfg.database_url.is_none());
        assert!(cfg.export_work_dir.is_none());
    }
}
