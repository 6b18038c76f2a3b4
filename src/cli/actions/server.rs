use crate::{auth::AuthConfig, otpgate};
use anyhow::{bail, Result};
use secrecy::SecretString;
use std::{fmt::Write as _, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub allowed_origin: Option<String>,
    pub jwt_secret: SecretString,
    pub rate_limit: usize,
    pub rate_window: Duration,
    pub otp_ttl: Duration,
    pub token_ttl: Duration,
    pub dev_log_otp: bool,
}

impl Args {
    /// # Errors
    /// Returns an error if the signing secret is empty.
    pub fn auth_config(&self) -> Result<AuthConfig> {
        let config = AuthConfig::new(self.jwt_secret.clone())
            .with_rate_limit(self.rate_limit)
            .with_rate_window(self.rate_window)
            .with_otp_ttl(self.otp_ttl)
            .with_token_ttl(self.token_ttl)
            .with_log_otp(self.dev_log_otp);

        if !config.has_signing_secret() {
            bail!("--jwt-secret must not be empty");
        }

        Ok(config)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.auth_config()?;

    log_startup_args(&args);
    if args.dev_log_otp {
        warn!("OTP codes will be written to the log; do not use in production");
    }

    otpgate::new(args.port, config, args.allowed_origin).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "allowed_origin",
            args.allowed_origin
                .clone()
                .unwrap_or_else(|| "*".to_string()),
        ),
        ("rate_limit", args.rate_limit.to_string()),
        ("rate_window", format!("{}s", args.rate_window.as_secs())),
        ("otp_ttl", format!("{}s", args.otp_ttl.as_secs())),
        ("token_ttl", format!("{}s", args.token_ttl.as_secs())),
        ("dev_log_otp", args.dev_log_otp.to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ = write!(message, "\n  {key}:{padding} {value}");
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(secret: &str) -> Args {
        Args {
            port: 8080,
            allowed_origin: None,
            jwt_secret: SecretString::from(secret.to_string()),
            rate_limit: 4,
            rate_window: Duration::from_secs(300),
            otp_ttl: Duration::from_secs(60),
            token_ttl: Duration::from_secs(7200),
            dev_log_otp: true,
        }
    }

    #[test]
    fn auth_config_from_args() -> Result<()> {
        let config = args("secret").auth_config()?;
        assert_eq!(config.rate_limit(), 4);
        assert_eq!(config.rate_window(), Duration::from_secs(300));
        assert_eq!(config.otp_ttl(), Duration::from_secs(60));
        assert_eq!(config.token_ttl(), Duration::from_secs(7200));
        assert!(config.single_use_otp());
        assert!(config.log_otp());
        Ok(())
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(args("").auth_config().is_err());
    }

    #[tokio::test]
    async fn execute_fails_fast_on_empty_secret() {
        let result = execute(args("")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_short_commit() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit("abc"), "abc");
        assert_eq!(short_commit("unknown"), "unknown");
    }
}
