use crate::core::currency::{CurrencyPair, ProviderParams, ProviderRequest};
use crate::core::error::{RateError, RateResult};
use anyhow::{Context, Result, anyhow, bail};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, error};

/// File name looked up in the home and XDG config directories.
pub const CONFIG_FILE_NAME: &str = "exchange_rate_config.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Print,
    Notify,
    Halt,
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "print" => Ok(Action::Print),
            "notify" => Ok(Action::Notify),
            "halt" => Ok(Action::Halt),
            other => Err(anyhow!(
                "Unknown action '{other}', expected one of: print, notify, halt"
            )),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Print => "print",
            Action::Notify => "notify",
            Action::Halt => "halt",
        };
        f.write_str(name)
    }
}

/// One or more actions. Parsed from `"print"`, `"print, notify"`, `"notify+halt"`
/// or a YAML list of names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ActionSpec")]
pub struct ActionSet(BTreeSet<Action>);

impl ActionSet {
    pub fn contains(&self, action: Action) -> bool {
        self.0.contains(&action)
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        self.0.iter().copied()
    }

    fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let actions = names
            .into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Action::from_str)
            .collect::<Result<BTreeSet<_>>>()?;
        if actions.is_empty() {
            bail!("Action must name at least one of: print, notify, halt");
        }
        Ok(ActionSet(actions))
    }
}

impl Default for ActionSet {
    fn default() -> Self {
        ActionSet(BTreeSet::from([Action::Print]))
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        ActionSet(iter.into_iter().collect())
    }
}

impl FromStr for ActionSet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_names(s.split(|c: char| c == ',' || c == '+' || c == '|' || c.is_whitespace()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ActionSpec {
    One(String),
    Many(Vec<String>),
}

impl TryFrom<ActionSpec> for ActionSet {
    type Error = anyhow::Error;

    fn try_from(spec: ActionSpec) -> Result<Self> {
        match spec {
            ActionSpec::One(s) => s.parse(),
            ActionSpec::Many(names) => Self::from_names(names.iter().map(String::as_str)),
        }
    }
}

/// One configured unit of work: a currency pair, a provider and an action policy.
///
/// Every field is optional so that records can be merged with caller overrides
/// before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleSet {
    pub from: Option<String>,
    pub to: Option<String>,
    pub service: Option<String>,
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_params")]
    pub service_kwargs: Option<ProviderParams>,
    pub action: Option<ActionSet>,
    pub notify_below: Option<f64>,
    pub notify_above: Option<f64>,
}

impl RuleSet {
    pub fn amount(&self) -> f64 {
        self.amount.unwrap_or(1.0)
    }

    pub fn actions(&self) -> ActionSet {
        self.action.clone().unwrap_or_default()
    }

    /// Returns a copy where every field present in `overrides` wins.
    /// `service_kwargs` are merged key by key.
    pub fn merged_with(&self, overrides: &RuleSet) -> RuleSet {
        let service_kwargs = match (&self.service_kwargs, &overrides.service_kwargs) {
            (Some(own), Some(extra)) => {
                let mut merged = own.clone();
                merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
                Some(merged)
            }
            (own, extra) => extra.clone().or_else(|| own.clone()),
        };

        RuleSet {
            from: overrides.from.clone().or_else(|| self.from.clone()),
            to: overrides.to.clone().or_else(|| self.to.clone()),
            service: overrides.service.clone().or_else(|| self.service.clone()),
            amount: overrides.amount.or(self.amount),
            service_kwargs,
            action: overrides.action.clone().or_else(|| self.action.clone()),
            notify_below: overrides.notify_below.or(self.notify_below),
            notify_above: overrides.notify_above.or(self.notify_above),
        }
    }

    /// Builds the resolver request, failing on absent or empty `from`, `to`, `service`
    /// and on an amount that is negative or not finite.
    pub fn to_request(&self) -> RateResult<ProviderRequest> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let from = present(&self.from);
        let to = present(&self.to);
        let service = present(&self.service);
        let amount = self.amount();

        match (from, to, service) {
            (Some(_), Some(_), Some(_)) if !amount.is_finite() || amount < 0.0 => {
                Err(RateError::InvalidRuleSet {
                    reason: format!("amount must be a finite non-negative number, got {amount}"),
                })
            }
            (Some(from), Some(to), Some(service)) => Ok(ProviderRequest::new(
                service,
                CurrencyPair::new(from, to),
            )
            .with_amount(amount)
            .with_params(self.service_kwargs.clone().unwrap_or_default())),
            _ => {
                let fields = [("from", from), ("to", to), ("service", service)]
                    .into_iter()
                    .filter(|(_, value)| value.is_none())
                    .map(|(name, _)| name)
                    .collect();
                Err(RateError::MissingField { fields })
            }
        }
    }

    /// Short human readable identification used in reports.
    pub fn label(&self) -> String {
        format!(
            "{} to {}",
            self.from.as_deref().unwrap_or("?"),
            self.to.as_deref().unwrap_or("?")
        )
    }
}

fn deserialize_params<'de, D>(deserializer: D) -> Result<Option<ProviderParams>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    raw.map(|map| {
        map.into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(D::Error::custom(format!(
                            "service_kwargs.{key} must be a string, number or boolean"
                        )));
                    }
                };
                Ok((key, value))
            })
            .collect()
    })
    .transpose()
}

/// A record read from a rule file. Records that fail to deserialize keep their
/// place in the batch and are reported there as `InvalidRuleSet`.
pub type RuleRecord = RateResult<RuleSet>;

fn invalid_record(reason: impl fmt::Display) -> RuleRecord {
    Err(RateError::InvalidRuleSet {
        reason: reason.to_string(),
    })
}

fn parse_record(value: serde_yaml::Value) -> RuleRecord {
    serde_yaml::from_value(value).or_else(invalid_record)
}

/// Parses a rule file holding either a single record or a sequence of them.
///
/// Each record is decoded on its own, so one bad record does not hide the
/// others. Only YAML that cannot be read at all fails the whole file.
pub fn parse_rule_sets(yaml: &str) -> Result<Vec<RuleRecord>> {
    use serde_yaml::Value;

    if yaml.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_yaml::from_str(yaml).context("Invalid YAML")?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => Ok(items.into_iter().map(parse_record).collect()),
        Value::Mapping(_) => Ok(vec![parse_record(value)]),
        _ => bail!("Expected a rule set mapping or a list of rule sets"),
    }
}

pub fn load_rule_sets<P: AsRef<Path>>(path: P) -> Result<Vec<RuleRecord>> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let rules = parse_rule_sets(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    debug!(
        path = %path.display(),
        count = rules.len(),
        invalid = rules.iter().filter(|r| r.is_err()).count(),
        "Successfully loaded rule sets"
    );
    Ok(rules)
}

/// Loads every file in order, concatenating their records.
/// A file that cannot be read or parsed becomes a single invalid record.
pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Vec<RuleRecord> {
    let mut rules = Vec::new();
    for path in paths {
        match load_rule_sets(path) {
            Ok(records) => rules.extend(records),
            Err(e) => {
                error!(path = %path.as_ref().display(), error = %format!("{e:#}"), "Skipping config file");
                rules.push(invalid_record(format!("{e:#}")));
            }
        }
    }
    rules
}

/// Location the `setup` command writes to.
pub fn default_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "ratewatch", "ratewatch")
        .context("Could not determine project directories")?;
    Ok(proj_dirs.config_dir().join("config.yaml"))
}

/// Candidate locations for the default config, in priority order.
#[derive(Debug, Clone, Default)]
pub struct ConfigDiscovery {
    pub home_dir: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
    pub app_config: Option<PathBuf>,
    pub bundled_dir: Option<PathBuf>,
}

impl ConfigDiscovery {
    pub fn from_env() -> Self {
        let base_dirs = BaseDirs::new();
        ConfigDiscovery {
            home_dir: base_dirs.as_ref().map(|d| d.home_dir().to_path_buf()),
            config_dir: base_dirs.as_ref().map(|d| d.config_dir().to_path_buf()),
            app_config: default_config_path().ok(),
            bundled_dir: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join("demos"))),
        }
    }

    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(home) = &self.home_dir {
            candidates.push(home.join(format!(".{CONFIG_FILE_NAME}")));
        }
        if let Some(config_dir) = &self.config_dir {
            candidates.push(config_dir.join(CONFIG_FILE_NAME));
        }
        if let Some(app_config) = &self.app_config {
            candidates.push(app_config.clone());
        }
        if let Some(bundled) = &self.bundled_dir {
            let mut demos: Vec<PathBuf> = fs::read_dir(bundled)
                .into_iter()
                .flatten()
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.extension().is_some_and(|ext| ext == "yaml"))
                .collect();
            demos.sort();
            candidates.extend(demos);
        }
        candidates
    }

    /// First existing candidate.
    pub fn find(&self) -> Option<PathBuf> {
        let found = self.candidates().into_iter().find(|path| path.is_file());
        debug!(?found, "Config discovery finished");
        found
    }
}
