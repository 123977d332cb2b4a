use super::ui;
use crate::core::rules::BatchReport;
use comfy_table::Cell;

/// Renders the failed rule sets of a batch, or `None` when all succeeded.
pub fn display_failures(report: &BatchReport) -> Option<String> {
    if !report.has_failures() {
        return None;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Rule"),
        ui::header_cell("Pair"),
        ui::header_cell("Service"),
        ui::header_cell("Error"),
    ]);

    for (rule_report, err) in report.failures() {
        let rule = &rule_report.rule;
        table.add_row(vec![
            Cell::new(rule_report.index + 1),
            Cell::new(rule.label()),
            Cell::new(rule.service.as_deref().unwrap_or("N/A")),
            ui::error_cell(&err.to_string()),
        ]);
    }

    let failed = report.failures().count();
    Some(format!(
        "{}\n\n{}",
        ui::style_text(
            &format!("{failed} of {} rule set(s) failed", report.rules.len()),
            ui::StyleType::Title
        ),
        table
    ))
}
