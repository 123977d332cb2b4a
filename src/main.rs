use anyhow::Result;
use clap::{Parser, Subcommand};
use ratewatch::core::config::{ActionSet, RuleSet};
use ratewatch::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a configuration file, may be repeated
    #[arg(short, long)]
    config_path: Vec<PathBuf>,

    /// Do not wait for acknowledgment on notify or halt
    #[arg(long)]
    no_wait: bool,

    /// Base currency, overrides every rule set
    #[arg(long)]
    from: Option<String>,

    /// Quote currency, overrides every rule set
    #[arg(long)]
    to: Option<String>,

    /// Provider identifier, e.g. yql or openexchangerates
    #[arg(short, long)]
    service: Option<String>,

    /// Amount of the base currency
    #[arg(short, long)]
    amount: Option<f64>,

    /// Actions to take, e.g. "print,notify"
    #[arg(long)]
    action: Option<ActionSet>,

    /// Notify when the rate is below this value
    #[arg(long)]
    notify_below: Option<f64>,

    /// Notify when the rate is above this value
    #[arg(long)]
    notify_above: Option<f64>,

    /// Provider parameter as KEY=VALUE, e.g. app_id=abc
    #[arg(short = 'k', long = "service-kwarg", value_parser = parse_key_val)]
    service_kwargs: Vec<(String, String)>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
}

impl Cli {
    fn overrides(&self) -> RuleSet {
        RuleSet {
            from: self.from.clone(),
            to: self.to.clone(),
            service: self.service.clone(),
            amount: self.amount,
            service_kwargs: (!self.service_kwargs.is_empty())
                .then(|| self.service_kwargs.iter().cloned().collect()),
            action: self.action.clone(),
            notify_below: self.notify_below,
            notify_above: self.notify_above,
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => ratewatch::cli::setup::setup(),
        None => {
            let options = ratewatch::RunOptions {
                config_paths: cli.config_path.clone(),
                overrides: cli.overrides(),
                wait_for_user: !cli.no_wait,
            };
            ratewatch::run(&options).await
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
