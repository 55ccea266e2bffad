//! The three update lists written for a whole user operation.
//!
//! Optimistic data goes in before the request is sent. Success data clears
//! the pending markers in place, since ids are chosen locally and never change.
//! Failure data removes what was added and puts back what was overwritten.

use quill_types::action::IouType;
use quill_types::models::{Receipt, StateNum};
use quill_types::{
    AccountId, MessageFragment, OptimisticBatch, PendingAction, Report, ReportAction, StoreKey, StoreUpdate,
    Transaction, replacement_patch,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::reports::{ChatReportArgs, MoneyRequestEntities, MoneyRequestEntityArgs};
use super::thread::{ancestor_counters, parent_action_updates};
use super::{CommentBody, MutationBuilder, OptimisticComment};
use crate::error::{Error, Result};
use crate::linkage::report_preview_action;
use crate::visibility::{last_visible_action, last_visible_message, truncate_message};

/// Inputs to [`MutationBuilder::request_money`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MoneyRequestArgs<'s> {
    /// Chat to request in. A new chat is built when it is unknown, reusing
    /// the id when one is given.
    pub chat_report_id: Option<&'s str>,
    pub payer: AccountId,
    pub amount: i64,
    pub currency: &'s str,
    pub comment: &'s str,
    pub merchant: &'s str,
    pub receipt: Option<&'s Receipt>,
    pub billable: bool,
    pub non_reimbursable: bool,
}

/// Everything a money request wrote, with the batch that writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyRequest {
    pub chat_report: Report,
    pub iou_report: Report,
    pub transaction: Transaction,
    pub entities: MoneyRequestEntities,
    pub report_preview: ReportAction,
    pub is_new_chat_report: bool,
    pub is_new_iou_report: bool,
    pub batch: OptimisticBatch,
}

fn to_value<T: Serialize>(record: &T) -> Result<Value> {
    Ok(serde_json::to_value(record)?)
}

fn action_patch(report_id: &str, action_id: &str, patch: Value) -> StoreUpdate {
    StoreUpdate::merge(StoreKey::ReportActions(report_id.to_string()), json!({ action_id: patch }))
}

fn write_action(report_id: &str, action: &ReportAction) -> Result<StoreUpdate> {
    Ok(action_patch(report_id, &action.report_action_id, to_value(action)?))
}

fn remove_action(report_id: &str, action_id: &str) -> StoreUpdate {
    action_patch(report_id, action_id, Value::Null)
}

fn clear_pending_action(report_id: &str, action_id: &str) -> StoreUpdate {
    action_patch(
        report_id,
        action_id,
        json!({ "pendingAction": null, "isOptimisticAction": null }),
    )
}

fn clear_pending_report(report_id: &str) -> StoreUpdate {
    StoreUpdate::merge(
        StoreKey::Report(report_id.to_string()),
        json!({ "pendingAction": null, "isOptimisticReport": null }),
    )
}

fn remove_report(report_id: &str) -> StoreUpdate {
    StoreUpdate::set(StoreKey::Report(report_id.to_string()), Value::Null)
}

/// The conversation-list fields of a report as they are now. Missing values
/// become `null`, so merging the patch back removes what was added.
fn last_message_fields(report: Option<&Report>) -> Value {
    json!({
        "lastVisibleActionCreated": report.and_then(|r| r.last_visible_action_created.clone()),
        "lastReadTime": report.and_then(|r| r.last_read_time.clone()),
        "lastMessageText": report.and_then(|r| r.last_message_text.clone()),
        "lastActorAccountID": report.and_then(|r| r.last_actor_account_id),
    })
}

impl<'a> MutationBuilder<'a> {
    /// Counts a new visible action in `report_id` on every ancestor. Failure
    /// takes the action back out again.
    fn count_in_ancestors(&self, batch: &mut OptimisticBatch, report_id: &str, created: &str) {
        let actor = self.context().current_account_id();
        for ancestor in ancestor_counters(self.context(), report_id) {
            let added = ancestor.counters.apply(PendingAction::Add, actor, created);
            let mut reverted = added.apply(PendingAction::Delete, actor, created);
            reverted.last_visible_action_created = ancestor.counters.last_visible_action_created.clone();

            batch
                .optimistic_data
                .push(added.update_for(&ancestor.report_id, &ancestor.action_id));
            batch
                .failure_data
                .push(reverted.update_for(&ancestor.report_id, &ancestor.action_id));
        }
    }

    pub fn add_comment_batch(&self, report_id: &str, body: CommentBody<'_>) -> Result<(OptimisticComment, OptimisticBatch)> {
        let ctx = self.context();
        let comment = self.add_comment(body, 0);
        let action = &comment.action;
        let action_id = action.report_action_id.as_str();
        let report_key = StoreKey::Report(report_id.to_string());
        let last_message = last_visible_message(ctx, Some(action));

        let mut batch = OptimisticBatch::default();
        batch.optimistic_data.push(write_action(report_id, action)?);
        batch.optimistic_data.push(StoreUpdate::merge(
            report_key.clone(),
            json!({
                "lastVisibleActionCreated": action.created,
                "lastReadTime": action.created,
                "lastMessageText": last_message.text,
                "lastActorAccountID": ctx.current_account_id(),
            }),
        ));
        batch.success_data.push(clear_pending_action(report_id, action_id));
        batch.failure_data.push(remove_action(report_id, action_id));
        batch.failure_data.push(StoreUpdate::merge(
            report_key,
            last_message_fields(ctx.reports.report(report_id).as_ref()),
        ));
        self.count_in_ancestors(&mut batch, report_id, &action.created);

        info!("Prepared comment {} for report {}", action_id, report_id);
        Ok((comment, batch))
    }

    /// Marks a comment deleted. Its thread, if any, keeps a placeholder parent.
    pub fn delete_comment_batch(&self, report_id: &str, action: &ReportAction) -> Result<OptimisticBatch> {
        let ctx = self.context();
        let action_id = action.report_action_id.as_str();
        if action.is_deleted() {
            return Err(Error::InvalidInput(format!("action {} is already deleted", action_id)));
        }

        let deleted_at = self.now();
        let mut fragment = MessageFragment::comment("", "");
        fragment.deleted = Some(deleted_at.clone());
        fragment.is_edited = true;
        fragment.is_deleted_parent_action = action.child_visible_action_count > 0;

        let report = ctx.reports.report(report_id);
        let mut remaining = ctx.reports.report_actions(report_id);
        remaining.remove(action_id);
        let last = last_visible_action(ctx.snapshot, remaining.values());
        let last_message = last_visible_message(ctx, last.as_ref());
        let last_created = last
            .as_ref()
            .map(|a| a.created.clone())
            .or_else(|| report.as_ref().and_then(|r| r.last_visible_action_created.clone()))
            .unwrap_or(deleted_at);

        let mut batch = OptimisticBatch::default();
        batch.optimistic_data.push(action_patch(
            report_id,
            action_id,
            json!({ "pendingAction": PendingAction::Delete, "message": [to_value(&fragment)?] }),
        ));
        batch.optimistic_data.push(StoreUpdate::merge(
            StoreKey::Report(report_id.to_string()),
            json!({
                "lastVisibleActionCreated": last_created,
                "lastMessageText": last_message.text,
                "lastActorAccountID": last.as_ref().and_then(|a| a.actor_account_id),
            }),
        ));
        batch
            .optimistic_data
            .extend(parent_action_updates(ctx, report_id, &last_created, PendingAction::Delete));

        batch
            .success_data
            .push(action_patch(report_id, action_id, json!({ "pendingAction": null })));

        batch.failure_data.push(action_patch(
            report_id,
            action_id,
            json!({ "pendingAction": null, "message": to_value(&action.message)? }),
        ));
        batch.failure_data.push(StoreUpdate::merge(
            StoreKey::Report(report_id.to_string()),
            last_message_fields(report.as_ref()),
        ));
        for ancestor in ancestor_counters(ctx, report_id) {
            batch
                .failure_data
                .push(ancestor.counters.update_for(&ancestor.report_id, &ancestor.action_id));
        }

        info!("Prepared deletion of {} in report {}", action_id, report_id);
        Ok(batch)
    }

    /// An open IOU or expense report the chat already points at.
    fn reusable_money_request_report(&self, chat_report: &Report) -> Option<Report> {
        let report = self.context().reports.report(chat_report.iou_report_id.as_deref()?)?;
        let closed = report.is_settled() || report.is_report_approved() || report.state_num == StateNum::Approved;
        (!closed).then_some(report)
    }

    /// Adds `amount` to an existing report. An IOU report flips direction
    /// when the running balance changes sides.
    fn add_to_money_request_report(&self, mut report: Report, args: &MoneyRequestArgs<'_>) -> Report {
        let ctx = self.context();
        if report.is_expense_report() {
            report.total -= args.amount;
            if args.non_reimbursable {
                report.non_reimbursable_total -= args.amount;
            }
        } else {
            let me = ctx.current_account_id();
            if report.owner_account_id == Some(me) {
                report.total += args.amount;
            } else {
                report.total -= args.amount;
            }
            if report.total < 0 {
                std::mem::swap(&mut report.owner_account_id, &mut report.manager_id);
                report.total = -report.total;
            }
        }
        report.cached_total = Some(ctx.format_amount(report.total, &report.currency));
        report.last_visible_action_created = Some(self.now());
        report
    }

    /// Requests money from `args.payer`, building or updating the chat, the
    /// money-request report, the transaction and all linked actions.
    pub fn request_money(&self, args: MoneyRequestArgs<'_>) -> Result<MoneyRequest> {
        let ctx = self.context();
        if args.amount <= 0 {
            return Err(Error::InvalidInput(format!("amount must be positive, got {}", args.amount)));
        }
        if args.currency.is_empty() {
            return Err(Error::InvalidInput("currency is required".into()));
        }
        let me = ctx.current_account_id();

        let existing_chat = args.chat_report_id.and_then(|id| ctx.reports.report(id));
        let is_new_chat_report = existing_chat.is_none();
        let original_chat = existing_chat.clone();
        let mut chat_report = existing_chat.unwrap_or_else(|| {
            self.chat_report(ChatReportArgs {
                participants: &[me, args.payer],
                optimistic_report_id: args.chat_report_id,
                ..Default::default()
            })
        });
        let is_expense = chat_report.is_policy_expense_chat();

        let original_report = self.reusable_money_request_report(&chat_report);
        let is_new_iou_report = original_report.is_none();
        let iou_report = match original_report.clone() {
            Some(report) => self.add_to_money_request_report(report, &args),
            None if is_expense => self.expense_report(
                &chat_report.report_id,
                chat_report.policy_id.as_deref().unwrap_or_default(),
                me,
                args.amount,
                args.currency,
                !args.non_reimbursable,
            ),
            None => self.iou_report(me, args.payer, args.amount, &chat_report.report_id, args.currency, false),
        };

        let created = self.now();
        let transaction = Transaction {
            transaction_id: self.ids.transaction_id(),
            report_id: iou_report.report_id.clone(),
            amount: if is_expense { -args.amount } else { args.amount },
            currency: args.currency.to_string(),
            merchant: args.merchant.to_string(),
            comment: args.comment.to_string(),
            created: created.clone(),
            billable: args.billable,
            reimbursable: !args.non_reimbursable,
            receipt: args.receipt.cloned(),
            pending_action: Some(PendingAction::Add),
            ..Default::default()
        };

        let entities = self.money_request_entities(
            &iou_report,
            MoneyRequestEntityArgs {
                iou_type: IouType::Create,
                amount: args.amount,
                currency: args.currency,
                comment: args.comment,
                payee_email: &ctx.snapshot.current_email,
                participants: &[args.payer],
                transaction_id: &transaction.transaction_id,
                receipt: args.receipt,
                is_own_policy_expense_chat: chat_report.is_own_policy_expense_chat,
                ..Default::default()
            },
        );

        let original_preview = if is_new_iou_report {
            None
        } else {
            report_preview_action(ctx, &chat_report.report_id, &iou_report.report_id)
        };
        let report_preview = match &original_preview {
            Some(preview) => {
                self.update_report_preview(Some(&iou_report), preview, false, args.comment, Some(&transaction))
            }
            None => self.report_preview(Some(&chat_report), &iou_report, args.comment, Some(&transaction), None),
        };

        chat_report.iou_report_id = Some(iou_report.report_id.clone());
        chat_report.last_visible_action_created = Some(report_preview.created.clone());
        chat_report.last_message_text = Some(truncate_message(
            &report_preview.message_text(),
            ctx.config.last_message_max_len,
        ));
        chat_report.last_actor_account_id = Some(me);

        let mut batch = OptimisticBatch::default();
        let chat_id = chat_report.report_id.clone();
        let iou_id = iou_report.report_id.clone();
        let thread_id = entities.transaction_thread.report_id.clone();

        // Reports
        if is_new_chat_report {
            batch
                .optimistic_data
                .push(StoreUpdate::set(StoreKey::Report(chat_id.clone()), to_value(&chat_report)?));
            batch.success_data.push(clear_pending_report(&chat_id));
            batch.failure_data.push(remove_report(&chat_id));
        } else {
            batch.optimistic_data.push(StoreUpdate::merge(
                StoreKey::Report(chat_id.clone()),
                json!({
                    "iouReportID": chat_report.iou_report_id,
                    "lastVisibleActionCreated": chat_report.last_visible_action_created,
                    "lastMessageText": chat_report.last_message_text,
                    "lastActorAccountID": me,
                }),
            ));
            let mut restore = last_message_fields(original_chat.as_ref());
            restore["iouReportID"] = json!(original_chat.as_ref().and_then(|c| c.iou_report_id.clone()));
            batch
                .failure_data
                .push(StoreUpdate::merge(StoreKey::Report(chat_id.clone()), restore));
        }
        match &original_report {
            None => {
                batch
                    .optimistic_data
                    .push(StoreUpdate::set(StoreKey::Report(iou_id.clone()), to_value(&iou_report)?));
                batch.success_data.push(clear_pending_report(&iou_id));
                batch.failure_data.push(remove_report(&iou_id));
            }
            Some(original) => {
                batch
                    .optimistic_data
                    .push(StoreUpdate::merge(StoreKey::Report(iou_id.clone()), to_value(&iou_report)?));
                batch
                    .failure_data
                    .push(StoreUpdate::set(StoreKey::Report(iou_id.clone()), to_value(original)?));
            }
        }
        batch.optimistic_data.push(StoreUpdate::set(
            StoreKey::Report(thread_id.clone()),
            to_value(&entities.transaction_thread)?,
        ));
        batch.success_data.push(clear_pending_report(&thread_id));
        batch.failure_data.push(remove_report(&thread_id));

        // Transaction
        let transaction_key = StoreKey::Transaction(transaction.transaction_id.clone());
        batch
            .optimistic_data
            .push(StoreUpdate::set(transaction_key.clone(), to_value(&transaction)?));
        batch
            .success_data
            .push(StoreUpdate::merge(transaction_key.clone(), json!({ "pendingAction": null })));
        batch.failure_data.push(StoreUpdate::set(transaction_key, Value::Null));

        // Actions
        for (report_id, action) in entities.actions_by_report(&chat_id, &iou_id) {
            let already_created = action.is_created()
                && ((report_id == chat_id && !is_new_chat_report) || (report_id == iou_id && !is_new_iou_report));
            if already_created {
                continue;
            }
            batch.optimistic_data.push(write_action(&report_id, action)?);
            batch
                .success_data
                .push(clear_pending_action(&report_id, &action.report_action_id));
            batch
                .failure_data
                .push(remove_action(&report_id, &action.report_action_id));
        }
        let preview_id = report_preview.report_action_id.as_str();
        match &original_preview {
            Some(original) => {
                // Receipt ids dropped by the update, and keys it added, must
                // not survive a merge in either direction.
                let (before, after) = (to_value(original)?, to_value(&report_preview)?);
                batch
                    .optimistic_data
                    .push(action_patch(&chat_id, preview_id, replacement_patch(&before, &after)));
                batch
                    .failure_data
                    .push(action_patch(&chat_id, preview_id, replacement_patch(&after, &before)));
            }
            None => {
                batch.optimistic_data.push(write_action(&chat_id, &report_preview)?);
                batch.failure_data.push(remove_action(&chat_id, preview_id));
            }
        }
        batch.success_data.push(clear_pending_action(&chat_id, preview_id));
        self.count_in_ancestors(&mut batch, &iou_id, &entities.iou_action.created);

        debug!(
            "Money request batch: {} optimistic, {} success, {} failure updates",
            batch.optimistic_data.len(),
            batch.success_data.len(),
            batch.failure_data.len()
        );
        info!(
            "Prepared money request {} in report {} (new chat: {}, new report: {})",
            transaction.transaction_id, iou_id, is_new_chat_report, is_new_iou_report
        );

        Ok(MoneyRequest {
            chat_report,
            iou_report,
            transaction,
            entities,
            report_preview,
            is_new_chat_report,
            is_new_iou_report,
            batch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{NOW, clock, ids, snapshot};
    use super::*;
    use crate::context::Context;
    use crate::source::{Replica, ReportSource, TransactionSource};
    use pretty_assertions::assert_eq;
    use quill_types::Phase;

    fn thread_replica() -> Replica {
        let mut replica = Replica::new();
        replica.insert_report(&Report {
            report_id: "chat".into(),
            last_message_text: Some("hello".into()),
            last_visible_action_created: Some("2024-05-01 09:00:00.000".into()),
            ..Default::default()
        });
        replica.insert_action(
            "chat",
            &ReportAction {
                report_action_id: "parent".into(),
                created: "2024-05-01 09:00:00.000".into(),
                message: vec![MessageFragment::comment("hello", "hello")],
                child_report_id: Some("thread".into()),
                ..Default::default()
            },
        );
        replica.insert_report(&Report {
            report_id: "thread".into(),
            parent_report_id: Some("chat".into()),
            parent_report_action_id: Some("parent".into()),
            ..Default::default()
        });
        replica
    }

    #[test]
    fn test_add_comment_success_keeps_record() {
        let mut replica = thread_replica();
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let batch = {
            let ctx = Context::new(&snapshot, &replica, &replica);
            let builder = MutationBuilder::new(ctx, &ids, &clock);
            let (comment, batch) = builder.add_comment_batch("thread", CommentBody::Text("hi *there*")).unwrap();
            assert_eq!(comment.comment_html, "hi <strong>there</strong>");
            batch
        };

        replica.apply_batch(&batch, Phase::Optimistic);
        let pending = replica.report_action("thread", "100").unwrap();
        assert_eq!(pending.pending_action, Some(PendingAction::Add));
        let thread = replica.report("thread").unwrap();
        assert_eq!(thread.last_message_text.as_deref(), Some("hi there"));
        assert_eq!(thread.last_visible_action_created.as_deref(), Some(NOW));
        let parent = replica.report_action("chat", "parent").unwrap();
        assert_eq!(parent.child_visible_action_count, 1);
        assert_eq!(parent.child_oldest_four_account_ids, vec![1]);

        replica.apply_batch(&batch, Phase::Success);
        let confirmed = replica.report_action("thread", "100").unwrap();
        assert_eq!(confirmed.pending_action, None);
        assert!(!confirmed.is_optimistic_action);
        assert_eq!(confirmed.message_text(), "hi there");
    }

    #[test]
    fn test_add_comment_failure_restores_state() {
        let mut replica = thread_replica();
        let before_parent = replica.report_action("chat", "parent").unwrap();
        let before_thread = replica.report("thread").unwrap();
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let batch = {
            let ctx = Context::new(&snapshot, &replica, &replica);
            let builder = MutationBuilder::new(ctx, &ids, &clock);
            builder.add_comment_batch("thread", CommentBody::Attachment).unwrap().1
        };

        replica.apply_batch(&batch, Phase::Optimistic);
        assert_eq!(replica.report("thread").unwrap().last_message_text.as_deref(), Some("[Attachment]"));
        replica.apply_batch(&batch, Phase::Failure);

        assert!(replica.report_action("thread", "100").is_none());
        assert_eq!(replica.report("thread").unwrap(), before_thread);
        let parent = replica.report_action("chat", "parent").unwrap();
        assert_eq!(parent.child_visible_action_count, before_parent.child_visible_action_count);
        assert_eq!(parent.child_commenter_count, 0);
        assert!(parent.child_oldest_four_account_ids.is_empty());
    }

    #[test]
    fn test_delete_comment_round_trip() {
        let mut replica = thread_replica();
        let original = replica.report_action("chat", "parent").unwrap();
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let batch = {
            let ctx = Context::new(&snapshot, &replica, &replica);
            let builder = MutationBuilder::new(ctx, &ids, &clock);
            builder.delete_comment_batch("chat", &original).unwrap()
        };

        replica.apply_batch(&batch, Phase::Optimistic);
        let deleted = replica.report_action("chat", "parent").unwrap();
        assert!(deleted.is_deleted());
        assert!(deleted.is_pending_delete());
        assert_eq!(replica.report("chat").unwrap().last_message_text.as_deref(), Some(""));

        replica.apply_batch(&batch, Phase::Failure);
        let restored = replica.report_action("chat", "parent").unwrap();
        assert_eq!(restored, original);
        assert_eq!(replica.report("chat").unwrap().last_message_text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_delete_rejects_deleted_action() {
        let replica = Replica::new();
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);
        let result = builder.delete_comment_batch("chat", &ReportAction::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_request_money_in_new_chat() {
        let mut replica = Replica::new();
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let request = {
            let ctx = Context::new(&snapshot, &replica, &replica);
            let builder = MutationBuilder::new(ctx, &ids, &clock);
            builder
                .request_money(MoneyRequestArgs {
                    chat_report_id: Some("dm"),
                    payer: 2,
                    amount: 1500,
                    currency: "USD",
                    comment: "lunch",
                    ..Default::default()
                })
                .unwrap()
        };
        assert!(request.is_new_chat_report);
        assert!(request.is_new_iou_report);
        assert_eq!(request.chat_report.report_id, "dm");
        assert_eq!(request.chat_report.iou_report_id.as_deref(), Some(request.iou_report.report_id.as_str()));
        assert_eq!(request.report_preview.child_money_request_count, 1);

        replica.apply_batch(&request.batch, Phase::Optimistic);
        let iou_id = request.iou_report.report_id.as_str();
        assert_eq!(replica.report(iou_id).unwrap().total, 1500);
        assert_eq!(replica.report_actions(iou_id).len(), 2);
        assert_eq!(replica.report_actions("dm").len(), 2);
        assert_eq!(replica.report_transactions(iou_id).len(), 1);
        let thread = replica.report(&request.entities.transaction_thread.report_id).unwrap();
        assert_eq!(thread.parent_report_action_id, Some(request.entities.iou_action.report_action_id.clone()));

        replica.apply_batch(&request.batch, Phase::Success);
        assert!(replica.report_actions(iou_id).values().all(|a| a.pending_action.is_none()));
        assert!(!replica.report("dm").unwrap().is_optimistic_report);
        assert_eq!(
            replica.transaction(&request.transaction.transaction_id).unwrap().pending_action,
            None
        );
    }

    #[test]
    fn test_request_money_failure_removes_new_records() {
        let mut replica = Replica::new();
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let request = {
            let ctx = Context::new(&snapshot, &replica, &replica);
            let builder = MutationBuilder::new(ctx, &ids, &clock);
            builder
                .request_money(MoneyRequestArgs {
                    chat_report_id: Some("dm"),
                    payer: 2,
                    amount: 700,
                    currency: "EUR",
                    ..Default::default()
                })
                .unwrap()
        };
        replica.apply_batch(&request.batch, Phase::Optimistic);
        replica.apply_batch(&request.batch, Phase::Failure);

        assert!(replica.report("dm").is_none());
        assert!(replica.report(&request.iou_report.report_id).is_none());
        assert!(replica.report(&request.entities.transaction_thread.report_id).is_none());
        assert!(replica.transaction(&request.transaction.transaction_id).is_none());
        assert!(replica.report_actions(&request.iou_report.report_id).is_empty());
    }

    #[test]
    fn test_second_request_updates_existing_report() {
        let mut replica = Replica::new();
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let args = MoneyRequestArgs {
            chat_report_id: Some("dm"),
            payer: 2,
            amount: 1000,
            currency: "USD",
            comment: "taxi",
            ..Default::default()
        };
        let first = {
            let ctx = Context::new(&snapshot, &replica, &replica);
            MutationBuilder::new(ctx, &ids, &clock).request_money(args).unwrap()
        };
        replica.apply_batch(&first.batch, Phase::Optimistic);
        replica.apply_batch(&first.batch, Phase::Success);

        let second = {
            let ctx = Context::new(&snapshot, &replica, &replica);
            MutationBuilder::new(ctx, &ids, &clock)
                .request_money(MoneyRequestArgs { amount: 500, ..args })
                .unwrap()
        };
        assert!(!second.is_new_chat_report);
        assert!(!second.is_new_iou_report);
        assert_eq!(second.iou_report.report_id, first.iou_report.report_id);
        assert_eq!(second.iou_report.total, 1500);
        assert_eq!(second.report_preview.report_action_id, first.report_preview.report_action_id);
        assert_eq!(second.report_preview.child_money_request_count, 2);

        replica.apply_batch(&second.batch, Phase::Optimistic);
        replica.apply_batch(&second.batch, Phase::Failure);
        let report = replica.report(&first.iou_report.report_id).unwrap();
        assert_eq!(report.total, 1000);
        let preview = replica
            .report_action("dm", &first.report_preview.report_action_id)
            .unwrap();
        assert_eq!(preview.child_money_request_count, 1);
    }

    #[test]
    fn test_failed_receipt_request_restores_preview_exactly() {
        let mut replica = Replica::new();
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let first = {
            let ctx = Context::new(&snapshot, &replica, &replica);
            MutationBuilder::new(ctx, &ids, &clock)
                .request_money(MoneyRequestArgs {
                    chat_report_id: Some("dm"),
                    payer: 2,
                    amount: 1000,
                    currency: "USD",
                    ..Default::default()
                })
                .unwrap()
        };
        replica.apply_batch(&first.batch, Phase::Optimistic);
        replica.apply_batch(&first.batch, Phase::Success);
        let preview_id = first.report_preview.report_action_id.as_str();
        let before = replica.report_action("dm", preview_id).unwrap();
        assert!(before.child_recent_receipt_transaction_ids.is_empty());

        let receipt = Receipt {
            state: quill_types::models::ReceiptState::ScanComplete,
            source: Some("receipt.jpg".into()),
        };
        let second = {
            let ctx = Context::new(&snapshot, &replica, &replica);
            MutationBuilder::new(ctx, &ids, &clock)
                .request_money(MoneyRequestArgs {
                    chat_report_id: Some("dm"),
                    payer: 2,
                    amount: 500,
                    currency: "USD",
                    comment: "taxi",
                    receipt: Some(&receipt),
                    ..Default::default()
                })
                .unwrap()
        };

        replica.apply_batch(&second.batch, Phase::Optimistic);
        let pending = replica.report_action("dm", preview_id).unwrap();
        assert_eq!(pending.child_last_money_request_comment.as_deref(), Some("taxi"));
        assert!(
            pending
                .child_recent_receipt_transaction_ids
                .contains_key(&second.transaction.transaction_id)
        );

        replica.apply_batch(&second.batch, Phase::Failure);
        assert_eq!(replica.report_action("dm", preview_id).unwrap(), before);
        assert!(replica.transaction(&second.transaction.transaction_id).is_none());
    }

    #[test]
    fn test_expense_report_in_workspace_chat() {
        let mut replica = Replica::new();
        replica.insert_report(&Report {
            report_id: "ws".into(),
            chat_type: Some(quill_types::models::ChatType::PolicyExpenseChat),
            policy_id: Some("pol".into()),
            is_own_policy_expense_chat: true,
            ..Default::default()
        });
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let request = MutationBuilder::new(ctx, &ids, &clock)
            .request_money(MoneyRequestArgs {
                chat_report_id: Some("ws"),
                payer: 2,
                amount: 2000,
                currency: "USD",
                non_reimbursable: true,
                ..Default::default()
            })
            .unwrap();
        assert!(request.iou_report.is_expense_report());
        assert_eq!(request.iou_report.total, -2000);
        assert_eq!(request.transaction.amount, -2000);
        assert!(!request.transaction.reimbursable);
    }

    #[test]
    fn test_request_money_validates_amount() {
        let replica = Replica::new();
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);
        let result = builder.request_money(MoneyRequestArgs {
            payer: 2,
            currency: "USD",
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
