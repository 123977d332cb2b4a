//! Rule evaluation: resolve a rate for each rule set and react to it.

use crate::core::config::{Action, RuleRecord, RuleSet};
use crate::core::currency::QuoteSource;
use crate::core::error::{RateError, RateResult};
use crate::core::notify::Notifier;
use std::fmt;
use std::io::Write;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Below,
    Above,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Below => f.write_str("below"),
            Direction::Above => f.write_str("above"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Printed,
    Notified(Direction),
    Halted,
}

/// Evaluates a single rule set.
///
/// Outcomes are returned in the order they happened: print, then any
/// threshold notifications, then halt. Halt is skipped when a notification
/// already blocked for acknowledgment.
#[instrument(name = "EvaluateRule", skip_all, fields(rule = %rule.label()))]
pub async fn evaluate<W: Write>(
    rule: &RuleSet,
    source: &dyn QuoteSource,
    notifier: &dyn Notifier,
    out: &mut W,
) -> RateResult<Vec<ActionOutcome>> {
    let request = rule.to_request()?;
    let rate = source.resolve(&request).await?.value();
    let (curr1, curr2) = (request.pair.base(), request.pair.quote());
    info!(service = %request.service, rate, "Resolved exchange rate");

    let actions = rule.actions();
    let mut outcomes = Vec::new();

    if actions.contains(Action::Print) {
        writeln!(out, "Exchange rate ({curr1} to {curr2}): {rate}")?;
        outcomes.push(ActionOutcome::Printed);
    }

    if actions.contains(Action::Notify) {
        let crossings = [
            (Direction::Below, rule.notify_below.filter(|limit| rate < *limit)),
            (Direction::Above, rule.notify_above.filter(|limit| rate > *limit)),
        ];
        for (direction, limit) in crossings {
            if let Some(limit) = limit {
                notifier.display_and_wait(&format!(
                    "{curr1} to {curr2} exchange rate {rate} is {direction} preset value of {limit}"
                ))?;
                outcomes.push(ActionOutcome::Notified(direction));
            }
        }
    }

    let notified = outcomes
        .iter()
        .any(|o| matches!(o, ActionOutcome::Notified(_)));
    if actions.contains(Action::Halt) && !notified {
        notifier.wait()?;
        outcomes.push(ActionOutcome::Halted);
    }

    Ok(outcomes)
}

pub struct RuleReport {
    /// Zero-based position in the batch.
    pub index: usize,
    pub rule: RuleSet,
    pub result: RateResult<Vec<ActionOutcome>>,
}

#[derive(Default)]
pub struct BatchReport {
    pub rules: Vec<RuleReport>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = (&RuleReport, &RateError)> {
        self.rules
            .iter()
            .filter_map(|report| report.result.as_ref().err().map(|e| (report, e)))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Evaluates each rule set in order, merged with `overrides`.
/// A failing rule set is recorded and logged; the remaining ones still run.
/// Records that could not be loaded are reported in place, carrying only the
/// overrides.
pub async fn evaluate_batch<W: Write>(
    records: impl IntoIterator<Item = RuleRecord>,
    overrides: &RuleSet,
    source: &dyn QuoteSource,
    notifier: &dyn Notifier,
    out: &mut W,
) -> BatchReport {
    let mut report = BatchReport::default();

    for (index, record) in records.into_iter().enumerate() {
        let (rule, result) = match record {
            Ok(stored) => {
                let rule = stored.merged_with(overrides);
                let result = evaluate(&rule, source, notifier, &mut *out).await;
                (rule, result)
            }
            Err(e) => (overrides.clone(), Err(e)),
        };
        if let Err(e) = &result {
            error!(
                index,
                rule = %rule.label(),
                service = rule.service.as_deref().unwrap_or("<unset>"),
                error = %e,
                "Rule set evaluation failed"
            );
        }
        report.rules.push(RuleReport {
            index,
            rule,
            result,
        });
    }

    report
}
