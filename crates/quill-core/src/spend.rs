//! Per-report money totals taken from the stored report fields.

use quill_types::Report;
use tracing::debug;

use crate::context::Context;

/// Spend amounts in the currency's minor unit, as they should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpendBreakdown {
    pub non_reimbursable: i64,
    pub reimbursable: i64,
    pub total_display: i64,
}

/// The report whose totals describe `report`: the report itself for money
/// reports, or the linked IOU report when it is loaded.
fn money_request_report(ctx: &Context<'_>, report: &Report) -> Option<Report> {
    let mut source = (report.is_money_request_report() || report.is_invoice_report()).then(|| report.clone());
    if let Some(iou_report_id) = report.iou_report_id.as_deref() {
        match ctx.reports.report(iou_report_id) {
            Some(linked) => source = Some(linked),
            None => debug!("IOU report {} of {} is not loaded", iou_report_id, report.report_id),
        }
    }
    source
}

/// Expense reports store spend negated; every other report is shown unsigned.
pub fn money_request_spend_breakdown(ctx: &Context<'_>, report: &Report) -> SpendBreakdown {
    let Some(source) = money_request_report(ctx, report) else {
        return SpendBreakdown::default();
    };
    breakdown_of(&source)
}

pub fn breakdown_of(report: &Report) -> SpendBreakdown {
    let (non_reimbursable, total) = (report.non_reimbursable_total, report.total);
    if non_reimbursable.checked_add(total).is_none_or(|sum| sum == 0) {
        return SpendBreakdown::default();
    }

    let (non_reimbursable, total_display) = if report.is_expense_report() {
        (non_reimbursable.saturating_neg(), total.saturating_neg())
    } else {
        (non_reimbursable.saturating_abs(), total.saturating_abs())
    };
    let Some(reimbursable) = total_display.checked_sub(non_reimbursable) else {
        debug!("Spend of report {} is out of range", report.report_id);
        return SpendBreakdown::default();
    };
    SpendBreakdown {
        non_reimbursable,
        reimbursable,
        total_display,
    }
}

/// Whether any transaction in the report is paid by the company.
pub fn has_non_reimbursable_transactions(ctx: &Context<'_>, report_id: &str) -> bool {
    ctx.transactions
        .report_transactions(report_id)
        .iter()
        .any(|t| !t.reimbursable)
}
