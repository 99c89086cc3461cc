use std::fmt;
use std::io::Write;
use std::net::{IpAddr, SocketAddr};

use gumdrop::Options;
use log::{debug, info};

use crate::parse_flag;

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Options)]
pub struct CliOptions {
    #[options(help = "print help message")]
    pub help: bool,

    #[options(help = "AWS access key id (env ACCESS_KEY)", meta = "KEY", no_short)]
    pub aws_access: Option<String>,

    #[options(help = "AWS secret access key (env SECRET_KEY)", meta = "SECRET", no_short)]
    pub aws_secret: Option<String>,

    #[options(
        help = "AWS region (env AWS_REGION, default us-east-1)",
        meta = "REGION",
        no_short
    )]
    pub aws_region: Option<String>,

    #[options(
        help = "statsd daemon address (env STATSD_HOST, default localhost:8125)",
        meta = "HOST:PORT",
        no_short
    )]
    pub statsd_host: Option<String>,

    #[options(help = "enable debug logging (env DEBUG)")]
    pub verbose: bool,

    #[options(help = "port to serve the relay's own metrics on", meta = "PORT", no_short)]
    pub metrics_port: Option<u16>,

    #[options(help = "address to serve the relay's own metrics on", default = "::", no_short)]
    pub listen: IpAddr,
}

/// Validated settings the relay runs with.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub aws_access: String,
    pub aws_secret: String,
    pub aws_region: String,
    pub statsd_host: String,
    pub verbose: bool,
    pub metrics_addr: Option<SocketAddr>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("aws_access", &self.aws_access)
            .field("aws_secret", &"<redacted>")
            .field("aws_region", &self.aws_region)
            .field("statsd_host", &self.statsd_host)
            .field("verbose", &self.verbose)
            .field("metrics_addr", &self.metrics_addr)
            .finish()
    }
}

fn required(value: Option<String>, option: &str, var: &str) -> Result<String, String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!(
            "missing required option `--{}` (or environment variable {})",
            option, var
        )),
    }
}

impl Config {
    /// Fills in unset options from `env`, then defaults, and validates the
    /// result. Command line values win over the environment.
    pub fn from_options<F>(opts: CliOptions, env: F) -> Result<Config, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let aws_access = required(
            opts.aws_access.or_else(|| env("ACCESS_KEY")),
            "aws-access",
            "ACCESS_KEY",
        )?;
        let aws_secret = required(
            opts.aws_secret.or_else(|| env("SECRET_KEY")),
            "aws-secret",
            "SECRET_KEY",
        )?;
        let aws_region = opts
            .aws_region
            .or_else(|| env("AWS_REGION"))
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let statsd_host = opts
            .statsd_host
            .or_else(|| env("STATSD_HOST"))
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| crate::statsd::DEFAULT_HOST.to_string());
        if !statsd_host.contains(':') {
            return Err(format!(
                "invalid statsd host '{}', expected HOST:PORT",
                statsd_host
            ));
        }
        let verbose = opts.verbose || env("DEBUG").is_some_and(|v| parse_flag(&v));
        let metrics_addr = opts
            .metrics_port
            .map(|port| SocketAddr::from((opts.listen, port)));
        Ok(Config {
            aws_access,
            aws_secret,
            aws_region,
            statsd_host,
            verbose,
            metrics_addr,
        })
    }
}

pub fn parse_args_from<S: AsRef<str>>(args: &[S]) -> Result<CliOptions, String> {
    CliOptions::parse_args_default(args).map_err(|e| e.to_string())
}

fn syslog_level(level: log::Level) -> u8 {
    match level {
        log::Level::Error => 3,
        log::Level::Warn => 4,
        log::Level::Info => 6,
        log::Level::Debug | log::Level::Trace => 7,
    }
}

/// Sets up env_logger. `RUST_LOG` overrides the default level; with
/// `RUST_LOG_SYSTEMD` set, lines carry a syslog priority prefix instead of
/// a timestamp so journald can classify them.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if std::env::var_os("RUST_LOG_SYSTEMD").is_some() {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "<{}>{}: {}",
                syslog_level(record.level()),
                record.target(),
                record.args()
            )
        });
    }
    // Already initialised (tests), keep the existing logger.
    let _ = builder.try_init();
}

/// Common startup for both binaries: loads `.env` from the working
/// directory only, parses arguments, sets up logging and validates the
/// configuration. Returns `None` when help was requested.
pub fn init_binary() -> Result<Option<Config>, String> {
    let dotenv_result = dotenv::from_path(".env");
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = parse_args_from(args.as_slice())?;
    let verbose = opts.verbose || std::env::var("DEBUG").is_ok_and(|v| parse_flag(&v));
    init_logging(verbose);
    if dotenv_result.is_ok() {
        debug!("Loaded environment from .env");
    }

    if opts.help {
        debug!("Help requested, showing usage and exiting.");
        let program = std::env::args()
            .next()
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
        eprintln!("Usage: {} [OPTIONS]\n\n{}", program, CliOptions::usage());
        return Ok(None);
    }

    let config = Config::from_options(opts, |var| std::env::var(var).ok())?;
    info!("Starting up with the following options: {:?}", config);
    Ok(Some(config))
}
