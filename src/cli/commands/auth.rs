use clap::{Arg, ArgAction, Command};

pub fn with_args(command: Command) -> Command {
    let command = with_otp_args(command);
    with_token_args(command)
}

fn with_otp_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("rate-limit")
                .long("rate-limit")
                .help("Max OTP requests per phone within the rate window")
                .env("OTPGATE_RATE_LIMIT")
                .default_value("3")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("rate-window-seconds")
                .long("rate-window-seconds")
                .help("Sliding rate limit window in seconds")
                .env("OTPGATE_RATE_WINDOW_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("otp-ttl-seconds")
                .long("otp-ttl-seconds")
                .help("OTP lifetime in seconds")
                .env("OTPGATE_OTP_TTL_SECONDS")
                .default_value("120")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("dev-log-otp")
                .long("dev-log-otp")
                .help("Log issued OTP codes (development only, never enable in production)")
                .env("OTPGATE_DEV_LOG_OTP")
                .action(ArgAction::SetTrue),
        )
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("jwt-secret")
                .long("jwt-secret")
                .help("HS256 signing secret for session tokens")
                .env("OTPGATE_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("token-ttl-seconds")
                .long("token-ttl-seconds")
                .help("Session token lifetime in seconds")
                .env("OTPGATE_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64)),
        )
}
