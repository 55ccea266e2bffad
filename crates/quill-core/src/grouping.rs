//! Grouping of consecutive actions from the same author.

use quill_types::ReportAction;

use crate::time::millis_between;

/// The action displayed just before `index` in a descending list. Pending
/// deletes are skipped unless offline, where they are still on screen.
pub fn find_previous_action(actions: &[ReportAction], index: usize, is_offline: bool) -> Option<&ReportAction> {
    actions
        .iter()
        .skip(index + 1)
        .find(|a| is_offline || !a.is_pending_delete())
}

/// Whether the action at `index` continues a run by the same author and
/// should be rendered without its own header.
pub fn is_consecutive_action_by_previous_actor(
    actions: &[ReportAction],
    index: usize,
    is_offline: bool,
    window_ms: i64,
) -> bool {
    let Some(current) = actions.get(index) else {
        return false;
    };
    let Some(previous) = find_previous_action(actions, index, is_offline) else {
        return false;
    };

    // unparseable timestamps never group
    match millis_between(&previous.created, &current.created) {
        Some(elapsed) if elapsed <= window_ms => {}
        _ => return false,
    }

    if previous.is_created() || previous.is_renamed() || current.is_renamed() {
        return false;
    }

    if previous.delegate_account_id != current.delegate_account_id {
        return false;
    }

    if previous.is_report_preview() != current.is_report_preview() {
        return false;
    }

    if current.is_submitted() {
        return current.admin_account_id == previous.actor_account_id
            || current.admin_account_id == previous.admin_account_id;
    }

    if previous.is_submitted() {
        return match previous.admin_account_id {
            Some(admin) => current.actor_account_id == Some(admin),
            None => current.actor_account_id == previous.actor_account_id,
        };
    }

    current.actor_account_id == previous.actor_account_id
}
