//! Reply counters kept on the actions that start a thread.

use quill_types::{AccountId, PendingAction, ReportAction, StoreKey, StoreUpdate};
use serde_json::{Value, json};
use tracing::debug;

use crate::ancestry::ancestor_ids;
use crate::context::Context;

const OLDEST_COMMENTER_LIMIT: usize = 4;

/// The `child*` fields of a thread's parent action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChildCounters {
    pub visible_action_count: u32,
    pub commenter_count: u32,
    pub oldest_four_account_ids: Vec<AccountId>,
    pub last_visible_action_created: Option<String>,
}

impl ChildCounters {
    pub fn of(action: &ReportAction) -> Self {
        Self {
            visible_action_count: action.child_visible_action_count,
            commenter_count: action.child_commenter_count,
            oldest_four_account_ids: action.child_oldest_four_account_ids.clone(),
            last_visible_action_created: action.child_last_visible_action_created.clone(),
        }
    }

    /// Counters after `change` was made in the thread by `actor`.
    pub fn apply(&self, change: PendingAction, actor: AccountId, last_visible_action_created: &str) -> Self {
        let mut next = self.clone();
        match change {
            PendingAction::Add => {
                next.visible_action_count += 1;
                if next.oldest_four_account_ids.len() < OLDEST_COMMENTER_LIMIT
                    && !next.oldest_four_account_ids.contains(&actor)
                {
                    next.oldest_four_account_ids.push(actor);
                    next.commenter_count += 1;
                }
            }
            PendingAction::Delete => {
                next.visible_action_count = next.visible_action_count.saturating_sub(1);
                if next.visible_action_count == 0 {
                    next.commenter_count = 0;
                    next.oldest_four_account_ids.clear();
                }
            }
            PendingAction::Update => {}
        }
        next.last_visible_action_created = Some(last_visible_action_created.to_string());
        next
    }

    /// Merge patch for the parent action. The id list is always written so a
    /// cleared list replaces the stored one.
    pub fn to_patch(&self) -> Value {
        json!({
            "childVisibleActionCount": self.visible_action_count,
            "childCommenterCount": self.commenter_count,
            "childOldestFourAccountIDs": self.oldest_four_account_ids,
            "childLastVisibleActionCreated": self.last_visible_action_created,
        })
    }

    pub fn update_for(&self, report_id: &str, action_id: &str) -> StoreUpdate {
        StoreUpdate::merge(
            StoreKey::ReportActions(report_id.to_string()),
            json!({ action_id: self.to_patch() }),
        )
    }
}

/// One ancestor's parent action and its current counters.
#[derive(Debug, Clone, PartialEq)]
pub struct AncestorCounters {
    pub report_id: String,
    pub action_id: String,
    pub counters: ChildCounters,
}

/// Counters of every action above `report_id`, nearest first. Transaction
/// threads do not stop the walk.
pub fn ancestor_counters(ctx: &Context<'_>, report_id: &str) -> Vec<AncestorCounters> {
    let Some(report) = ctx.reports.report(report_id) else {
        return Vec::new();
    };
    let ids = ancestor_ids(ctx, &report, true);
    ids.report_ids
        .into_iter()
        .zip(ids.action_ids)
        .map(|(report_id, action_id)| {
            let counters = ctx
                .reports
                .report_action(&report_id, &action_id)
                .map(|action| ChildCounters::of(&action))
                .unwrap_or_default();
            AncestorCounters {
                report_id,
                action_id,
                counters,
            }
        })
        .collect()
}

/// Store updates that record `change` on every ancestor of `report_id`.
pub fn parent_action_updates(
    ctx: &Context<'_>,
    report_id: &str,
    last_visible_action_created: &str,
    change: PendingAction,
) -> Vec<StoreUpdate> {
    let actor = ctx.current_account_id();
    let updates: Vec<StoreUpdate> = ancestor_counters(ctx, report_id)
        .iter()
        .map(|ancestor| {
            ancestor
                .counters
                .apply(change, actor, last_visible_action_created)
                .update_for(&ancestor.report_id, &ancestor.action_id)
        })
        .collect();
    debug!("Updating {} parent actions above report {}", updates.len(), report_id);
    updates
}
