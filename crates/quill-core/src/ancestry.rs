//! Walks up the thread tree through parent links.
//!
//! Every walk keeps a visited set; a record that points back at itself or at
//! a descendant ends the walk with a warning.

use std::collections::HashSet;

use quill_types::{Report, ReportAction};
use tracing::{debug, warn};

use crate::context::Context;
use crate::visibility::is_current_action_unread;

/// One step up the tree: the child report and the parent action it hangs off.
#[derive(Debug, Clone, PartialEq)]
pub struct Ancestor {
    pub report: Report,
    pub action: ReportAction,
    pub should_display_new_marker: bool,
}

/// Ids of every ancestor report and the action each thread hangs off,
/// nearest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AncestorIds {
    pub report_ids: Vec<String>,
    pub action_ids: Vec<String>,
}

pub fn parent_report_action(ctx: &Context<'_>, report: &Report) -> Option<ReportAction> {
    let parent_id = report.parent_report_id.as_deref()?;
    let action_id = report.parent_report_action_id.as_deref()?;
    let action = ctx.reports.report_action(parent_id, action_id);
    if action.is_none() {
        debug!("Parent action {} of report {} is not loaded", action_id, report.report_id);
    }
    action
}

/// Stops a walk if `report_id` has been seen before.
fn first_visit(visited: &mut HashSet<String>, report_id: &str) -> bool {
    if visited.insert(report_id.to_string()) {
        return true;
    }
    warn!("Report {} appears twice in its own ancestry, stopping walk", report_id);
    false
}

fn ends_ancestry(action: &ReportAction) -> bool {
    action.is_transaction_thread() || action.is_report_preview()
}

/// Parent actions shown above a thread, root first. The walk stops at a
/// missing parent, a transaction thread or a report preview.
pub fn all_ancestor_actions(ctx: &Context<'_>, report: &Report) -> Vec<Ancestor> {
    let mut ancestors = Vec::new();
    let mut visited = HashSet::from([report.report_id.clone()]);
    let mut current = report.clone();
    let mut parent_id = report.parent_report_id.clone();
    let mut parent_action_id = report.parent_report_action_id.clone();

    while let Some(report_id) = parent_id.take() {
        if !first_visit(&mut visited, &report_id) {
            break;
        }
        let action_id = parent_action_id.take().unwrap_or_default();
        let Some(action) = ctx.reports.report_action(&report_id, &action_id) else {
            break;
        };
        if ends_ancestry(&action) {
            break;
        }

        let parent = ctx.reports.report(&report_id);
        let siblings: Vec<ReportAction> = ctx.reports.report_actions(&report_id).into_values().collect();
        let should_display_new_marker =
            is_current_action_unread(parent.as_ref().unwrap_or(&Report::default()), &action, &siblings);
        ancestors.push(Ancestor {
            report: current.clone(),
            action,
            should_display_new_marker,
        });

        let Some(parent) = parent else {
            break;
        };
        parent_id = parent.parent_report_id.clone();
        parent_action_id = parent.parent_report_action_id.clone();
        current = parent;
    }

    ancestors.reverse();
    ancestors
}

/// Ancestor ids, nearest first. Transaction threads and previews end the walk
/// unless `include_transaction_thread` is set.
pub fn ancestor_ids(ctx: &Context<'_>, report: &Report, include_transaction_thread: bool) -> AncestorIds {
    let mut ids = AncestorIds::default();
    let mut visited = HashSet::from([report.report_id.clone()]);
    let mut parent_id = report.parent_report_id.clone();
    let mut parent_action_id = report.parent_report_action_id.clone();

    while let Some(report_id) = parent_id.take() {
        if !first_visit(&mut visited, &report_id) {
            break;
        }
        let action_id = parent_action_id.take().unwrap_or_default();
        let Some(action) = ctx.reports.report_action(&report_id, &action_id) else {
            break;
        };
        if !include_transaction_thread && ends_ancestry(&action) {
            break;
        }

        ids.report_ids.push(report_id.clone());
        ids.action_ids.push(action_id);

        let Some(parent) = ctx.reports.report(&report_id) else {
            break;
        };
        parent_id = parent.parent_report_id;
        parent_action_id = parent.parent_report_action_id;
    }

    ids
}

/// The top of the tree. A missing parent ends the walk at the last known report.
pub fn root_parent_report(ctx: &Context<'_>, report: &Report) -> Report {
    let mut visited = HashSet::from([report.report_id.clone()]);
    let mut current = report.clone();
    while let Some(parent_id) = current.parent_report_id.clone() {
        if !first_visit(&mut visited, &parent_id) {
            break;
        }
        match ctx.reports.report(&parent_id) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}
