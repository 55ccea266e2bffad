//! Which actions may be shown, and what the conversation list shows for a report.

use std::collections::BTreeMap;

use quill_types::action::{ATTACHMENT_TRANSLATION_KEY, MemberChangeKind};
use quill_types::{ActionPayload, Report, ReportAction};
use tracing::info;

use crate::context::{Context, Snapshot};
use crate::ordering::{Direction, sorted_actions};
use crate::phrase::Phrase;

const BASE_URL_PLACEHOLDER: &str = "%baseURL";

/// Deprecated actions are kept by the server but never rendered: legacy
/// records keyed by sequence number, and a handful of retired kinds.
pub fn is_deprecated(action: &ReportAction, key: &str) -> bool {
    if action.sequence_number.is_some_and(|n| n.to_string() == key) {
        info!(
            "Filtered out report action {} keyed by sequence number",
            action.report_action_id
        );
        return true;
    }
    if let ActionPayload::Deprecated(name) = &action.payload {
        info!(
            "Filtered out deprecated {} report action {}",
            name, action.report_action_id
        );
        return true;
    }
    false
}

pub fn is_supported(action: &ReportAction) -> bool {
    !matches!(action.payload, ActionPayload::Unsupported(_))
}

pub fn is_whisper_targeted_to_others(snapshot: &Snapshot, action: &ReportAction) -> bool {
    action.is_whisper() && !action.whispered_to.contains(&snapshot.current_account_id)
}

/// Whether an action stored under `key` belongs in the conversation view.
pub fn is_visible(snapshot: &Snapshot, action: &ReportAction, key: &str) -> bool {
    if is_deprecated(action, key) || !is_supported(action) {
        return false;
    }

    // Both are already explained elsewhere in the conversation
    if matches!(action.payload, ActionPayload::Closed(_) | ActionPayload::MarkedReimbursed) {
        return false;
    }

    if is_whisper_targeted_to_others(snapshot, action) {
        return false;
    }

    if action.is_pending_remove() && action.child_visible_action_count == 0 {
        return false;
    }

    !action.is_deleted()
        || action.pending_action.is_some()
        || action.is_deleted_parent_action()
        || action.is_reversed_transaction()
}

/// Stricter rule for the action summarised in the conversation list.
pub fn is_visible_as_last_action(snapshot: &Snapshot, action: &ReportAction) -> bool {
    if !action.errors.is_empty() {
        return false;
    }

    is_visible(snapshot, action, &action.report_action_id)
        && !(action.is_whisper() && !action.is_report_preview() && !action.is_money_request())
        && !(action.is_deleted() && !action.is_deleted_parent_action())
        && !action.is_resolved_track_expense()
}

/// Policy change logs carry links with a placeholder host.
fn replace_base_url(mut action: ReportAction, environment_url: &str) -> ReportAction {
    let is_policy_change_log = matches!(
        action.payload,
        ActionPayload::PolicyChangeLog(_)
            | ActionPayload::MemberChange(
                MemberChangeKind::PolicyInvite | MemberChangeKind::PolicyRemove | MemberChangeKind::PolicyLeave,
                _
            )
    );
    if !is_policy_change_log {
        return action;
    }
    if let Some(html) = action.message.first_mut().and_then(|f| f.html.as_mut()) {
        *html = html.replacen(BASE_URL_PLACEHOLDER, environment_url, 1);
    }
    action
}

/// Actions ready for the conversation view, newest first.
pub fn sorted_for_display(
    snapshot: &Snapshot,
    actions: &BTreeMap<String, ReportAction>,
    include_invisible: bool,
) -> Vec<ReportAction> {
    let filtered = actions
        .iter()
        .filter(|(key, action)| include_invisible || is_visible(snapshot, action, key))
        .map(|(_, action)| replace_base_url(action.clone(), &snapshot.environment_url));
    sorted_actions(filtered, Direction::Descending)
}

pub fn filter_out_deprecated(actions: &BTreeMap<String, ReportAction>) -> Vec<ReportAction> {
    actions
        .iter()
        .filter(|(key, action)| !is_deprecated(action, key))
        .map(|(_, action)| action.clone())
        .collect()
}

pub fn last_visible_action<'a>(
    snapshot: &Snapshot,
    actions: impl IntoIterator<Item = &'a ReportAction>,
) -> Option<ReportAction> {
    let visible = actions
        .into_iter()
        .filter(|a| is_visible_as_last_action(snapshot, a))
        .cloned();
    sorted_actions(visible, Direction::Descending).into_iter().next()
}

/// Text shown in the conversation list for a report's last action.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LastVisibleMessage {
    pub text: String,
    pub translation_key: Option<String>,
    pub html: Option<String>,
}

pub fn last_visible_message(ctx: &Context<'_>, action: Option<&ReportAction>) -> LastVisibleMessage {
    let Some(action) = action else {
        return LastVisibleMessage::default();
    };

    if action.first_fragment().is_some_and(|f| f.is_attachment()) {
        return LastVisibleMessage {
            text: ctx.tr(Phrase::Attachment),
            translation_key: Some(ATTACHMENT_TRANSLATION_KEY.to_string()),
            html: Some(ATTACHMENT_TRANSLATION_KEY.to_string()),
        };
    }

    if action.is_created() {
        return LastVisibleMessage::default();
    }

    let text = action.first_fragment().map(|f| f.text.as_str()).unwrap_or("");
    LastVisibleMessage {
        text: truncate_message(text, ctx.config.last_message_max_len),
        ..Default::default()
    }
}

/// Line breaks become spaces, then the text is cut and trimmed.
pub fn truncate_message(text: &str, max_len: usize) -> String {
    let flattened = text.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let cut: String = flattened.chars().take(max_len).collect();
    cut.trim().to_string()
}

/// Whether anything beyond CREATED and task system messages would be shown.
pub fn has_visible_actions<'a>(snapshot: &Snapshot, actions: impl IntoIterator<Item = &'a ReportAction>) -> bool {
    actions
        .into_iter()
        .filter(|a| is_visible_as_last_action(snapshot, a))
        .any(|a| !a.is_task_action() && !a.is_created())
}

/// The newest CLOSED action, used to explain why a report was archived.
pub fn last_closed_action(actions: &BTreeMap<String, ReportAction>) -> Option<ReportAction> {
    if !actions.values().any(ReportAction::is_closed) {
        return None;
    }
    sorted_actions(filter_out_deprecated(actions), Direction::Ascending)
        .into_iter()
        .rev()
        .find(ReportAction::is_closed)
}

/// Id of the oldest visible action other than CREATED, in a descending list
/// whose last entry is CREATED. Empty when there is none.
pub fn first_visible_action_id(sorted: &[ReportAction], is_offline: bool) -> String {
    let kept: Vec<&ReportAction> = sorted
        .iter()
        .filter(|a| !a.is_deleted() || a.child_visible_action_count > 0 || is_offline)
        .collect();
    if kept.len() > 1 {
        kept[kept.len() - 2].report_action_id.clone()
    } else {
        String::new()
    }
}

/// Pending deletes are hidden when online, so they cannot carry the marker.
pub fn should_hide_new_marker(action: Option<&ReportAction>, is_offline: bool) -> bool {
    match action {
        None => true,
        Some(action) => !is_offline && action.is_pending_delete(),
    }
}

pub fn is_action_unread(action: &ReportAction, last_read_time: &str) -> bool {
    if last_read_time.is_empty() {
        return !action.is_created();
    }
    !action.created.is_empty() && last_read_time < action.created.as_str()
}

/// Whether `action` is the first unread action of the report, i.e. where the
/// new-messages marker goes.
pub fn is_current_action_unread(report: &Report, action: &ReportAction, actions: &[ReportAction]) -> bool {
    let last_read_time = report.last_read_time.as_deref().unwrap_or("");
    let sorted = sorted_actions(actions.iter().cloned(), Direction::Ascending);
    let Some(index) = sorted
        .iter()
        .position(|a| a.report_action_id == action.report_action_id)
    else {
        return false;
    };
    let previous = index.checked_sub(1).and_then(|i| sorted.get(i));
    is_action_unread(action, last_read_time) && previous.is_none_or(|p| !is_action_unread(p, last_read_time))
}
