use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let jwt_secret = matches
        .get_one::<String>("jwt-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --jwt-secret")?;

    let seconds = |id: &str, default: u64| {
        Duration::from_secs(matches.get_one::<u64>(id).copied().unwrap_or(default))
    };

    Ok(Action::Server(Args {
        port,
        allowed_origin: matches.get_one::<String>("allowed-origin").cloned(),
        jwt_secret,
        rate_limit: matches.get_one::<usize>("rate-limit").copied().unwrap_or(3),
        rate_window: seconds("rate-window-seconds", 600),
        otp_ttl: seconds("otp-ttl-seconds", 120),
        token_ttl: seconds("token-ttl-seconds", 86_400),
        dev_log_otp: matches.get_flag("dev-log-otp"),
    }))
}
