pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::notify::{ConsoleNotifier, SilentNotifier};
use crate::core::config::{self, ConfigDiscovery, RuleRecord, RuleSet};
use crate::core::notify::Notifier;
use crate::core::rules::{self, BatchReport};
use crate::providers::{ProviderEndpoints, ProviderResolver};
use anyhow::{Result, bail};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct RunOptions {
    /// Explicit config files. Empty means default discovery.
    pub config_paths: Vec<PathBuf>,
    /// Fields applied on top of every loaded rule set.
    pub overrides: RuleSet,
    /// Block on notifications and halt until the user presses enter.
    /// On by default; `--no-wait` turns it off.
    pub wait_for_user: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            config_paths: Vec::new(),
            overrides: RuleSet::default(),
            wait_for_user: true,
        }
    }
}

/// Loads the rule sets to evaluate. Falls back to a single empty rule set,
/// which only validates if the overrides supply the required fields.
/// Unreadable files and bad records come back as failed records.
pub fn load_rules(config_paths: &[PathBuf], discovery: &ConfigDiscovery) -> Vec<RuleRecord> {
    let rules = if config_paths.is_empty() {
        match discovery.find() {
            Some(path) => {
                info!("Using config file {}", path.display());
                config::load_all(&[path])
            }
            None => {
                warn!("No config file found");
                Vec::new()
            }
        }
    } else {
        config::load_all(config_paths)
    };

    if rules.is_empty() {
        return vec![Ok(RuleSet::default())];
    }
    rules
}

pub async fn run_with<W: Write>(
    options: &RunOptions,
    discovery: &ConfigDiscovery,
    endpoints: &ProviderEndpoints,
    notifier: &dyn Notifier,
    out: &mut W,
) -> Result<BatchReport> {
    let rules = load_rules(&options.config_paths, discovery);
    debug!("Loaded rule sets: {rules:#?}");

    let resolver = ProviderResolver::new(endpoints)?;
    Ok(rules::evaluate_batch(rules, &options.overrides, &resolver, notifier, out).await)
}

pub async fn run(options: &RunOptions) -> Result<()> {
    info!("Exchange rate check starting...");

    let notifier: Box<dyn Notifier> = if options.wait_for_user {
        Box::new(ConsoleNotifier)
    } else {
        Box::new(SilentNotifier)
    };

    let report = run_with(
        options,
        &ConfigDiscovery::from_env(),
        &ProviderEndpoints::default(),
        notifier.as_ref(),
        &mut std::io::stdout(),
    )
    .await?;

    if let Some(failures) = cli::check::display_failures(&report) {
        eprintln!("\n{failures}");
        let failed = report.failures().count();
        bail!("{failed} of {} rule set(s) failed", report.rules.len());
    }
    Ok(())
}
