//! Links between money-request actions, transactions, previews and threads.

use std::collections::BTreeMap;

use quill_types::action::IouType;
use quill_types::{AccountId, Report, ReportAction};

use crate::context::Context;

/// The only transaction thread of an IOU, expense or invoice report, if the
/// report has exactly one live money request.
pub fn one_transaction_thread_report_id(
    report: Option<&Report>,
    actions: &BTreeMap<String, ReportAction>,
    is_offline: bool,
) -> Option<String> {
    let report = report?;
    if !(report.is_iou_report() || report.is_expense_report() || report.is_invoice_report()) {
        return None;
    }

    let mut requests = actions.values().filter(|action| {
        let Some(iou) = action.iou() else {
            return false;
        };
        if iou.iou_type == IouType::Delete || action.child_report_id.is_none() {
            return false;
        }
        // deleted requests still count while they have a transaction or replies,
        // or while a local delete is waiting to sync
        iou.iou_transaction_id.is_some()
            || (action.is_message_deleted() && action.child_visible_action_count > 0)
            || (action.is_pending_delete() && is_offline)
    });

    let only = requests.next()?;
    if requests.next().is_some() {
        return None;
    }
    if only.iou().and_then(|m| m.deleted.as_deref()).is_some_and(|d| !d.is_empty()) {
        return None;
    }
    only.child_report_id.clone()
}

pub fn linked_transaction_id(ctx: &Context<'_>, report_id: &str, action_id: &str) -> Option<String> {
    ctx.reports
        .report_action(report_id, action_id)
        .and_then(|a| a.linked_transaction_id().map(str::to_string))
}

pub fn is_linked_transaction_held(ctx: &Context<'_>, report_id: &str, action_id: &str) -> bool {
    linked_transaction_id(ctx, report_id, action_id)
        .and_then(|id| ctx.transactions.transaction(&id))
        .is_some_and(|t| t.is_on_hold)
}

/// The preview in a chat that points at `iou_report_id`.
pub fn report_preview_action(ctx: &Context<'_>, chat_report_id: &str, iou_report_id: &str) -> Option<ReportAction> {
    ctx.reports
        .report_actions(chat_report_id)
        .into_values()
        .find(|a| a.linked_report_id() == Some(iou_report_id))
}

/// Whether `account_id` has any money request in the report.
pub fn has_request_from_account(ctx: &Context<'_>, report_id: &str, account_id: AccountId) -> bool {
    ctx.reports
        .report_actions(report_id)
        .values()
        .any(|a| a.is_money_request() && a.actor_account_id == Some(account_id))
}
