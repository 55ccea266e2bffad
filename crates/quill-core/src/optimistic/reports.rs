use std::collections::BTreeMap;

use quill_types::action::{IouType, PaymentType};
use quill_types::models::{ChatType, NotificationPreference, Participant, ParticipantRole, Receipt, StateNum, StatusNum};
use quill_types::{AccountId, PendingAction, Report, ReportAction, ReportType};
use tracing::debug;

use super::MutationBuilder;
use super::expense::IouActionArgs;
use crate::time::add_millis;

pub const DEFAULT_REPORT_NAME: &str = "Chat Report";
pub const ADMINS_ROOM_NAME: &str = "#admins";

/// Inputs to [`MutationBuilder::chat_report`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatReportArgs<'s> {
    pub participants: &'s [AccountId],
    /// Falls back to [`DEFAULT_REPORT_NAME`] when empty.
    pub report_name: &'s str,
    pub chat_type: Option<ChatType>,
    pub policy_id: Option<&'s str>,
    pub owner_account_id: Option<AccountId>,
    pub is_own_policy_expense_chat: bool,
    pub old_policy_name: &'s str,
    pub notification_preference: NotificationPreference,
    pub parent_report_action_id: Option<&'s str>,
    pub parent_report_id: Option<&'s str>,
    pub description: &'s str,
    pub optimistic_report_id: Option<&'s str>,
    pub hide_participants: bool,
}

/// Inputs to [`MutationBuilder::money_request_entities`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MoneyRequestEntityArgs<'s> {
    pub iou_type: IouType,
    pub amount: i64,
    pub currency: &'s str,
    pub comment: &'s str,
    pub payee_email: &'s str,
    pub participants: &'s [AccountId],
    pub transaction_id: &'s str,
    pub payment_type: Option<PaymentType>,
    pub is_settling_up: bool,
    pub is_send_money_flow: bool,
    pub receipt: Option<&'s Receipt>,
    pub is_own_policy_expense_chat: bool,
    pub is_personal_tracking_expense: bool,
    pub existing_transaction_thread_id: Option<&'s str>,
}

/// The records written together for one money request.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyRequestEntities {
    pub created_for_chat: ReportAction,
    pub created_for_iou_report: ReportAction,
    pub iou_action: ReportAction,
    pub transaction_thread: Report,
    /// `None` when an existing thread was reused.
    pub created_for_thread: Option<ReportAction>,
}

impl<'a> MutationBuilder<'a> {
    pub fn chat_report(&self, args: ChatReportArgs<'_>) -> Report {
        let ctx = self.context();
        let now = self.now();
        let report_name = if args.report_name.is_empty() {
            DEFAULT_REPORT_NAME
        } else {
            args.report_name
        };
        let participants = args
            .participants
            .iter()
            .map(|&account_id| {
                let role = if ctx.is_current_user(Some(account_id)) {
                    ParticipantRole::Admin
                } else {
                    ParticipantRole::Member
                };
                let participant = Participant {
                    hidden: args.hide_participants,
                    role: Some(role),
                };
                (account_id, participant)
            })
            .collect();
        let is_new_workspace_chat =
            args.chat_type == Some(ChatType::PolicyExpenseChat) && args.is_own_policy_expense_chat;

        let report = Report {
            report_id: args
                .optimistic_report_id
                .map(str::to_string)
                .unwrap_or_else(|| self.ids.report_id()),
            report_type: ReportType::Chat,
            chat_type: args.chat_type,
            report_name: report_name.to_string(),
            description: args.description.to_string(),
            parent_report_id: args.parent_report_id.map(str::to_string),
            parent_report_action_id: args.parent_report_action_id.map(str::to_string),
            policy_id: args.policy_id.map(str::to_string),
            old_policy_name: args.old_policy_name.to_string(),
            owner_account_id: args.owner_account_id,
            is_own_policy_expense_chat: args.is_own_policy_expense_chat,
            is_pinned: report_name == ADMINS_ROOM_NAME || is_new_workspace_chat,
            is_optimistic_report: true,
            last_visible_action_created: Some(now.clone()),
            last_read_time: Some(now),
            notification_preference: args.notification_preference,
            participants,
            ..Default::default()
        };
        debug!("Built optimistic chat report {}", report.report_id);
        report
    }

    pub fn group_chat_report(&self, participants: &[AccountId], report_name: &str, optimistic_report_id: Option<&str>) -> Report {
        self.chat_report(ChatReportArgs {
            participants,
            report_name,
            chat_type: Some(ChatType::Group),
            optimistic_report_id,
            ..Default::default()
        })
    }

    /// An IOU report between two people. Money sent without a request
    /// starts out settled.
    pub fn iou_report(
        &self,
        payee: AccountId,
        payer: AccountId,
        total: i64,
        chat_report_id: &str,
        currency: &str,
        is_sending_money: bool,
    ) -> Report {
        let ctx = self.context();
        let formatted_total = ctx.format_amount(total, currency);
        let hidden = Participant {
            hidden: true,
            role: None,
        };
        let (state_num, status_num) = if is_sending_money {
            (StateNum::Approved, StatusNum::Reimbursed)
        } else {
            (StateNum::Submitted, StatusNum::Submitted)
        };

        Report {
            report_id: self.ids.report_id(),
            report_type: ReportType::Iou,
            // Report names are stored untranslated.
            report_name: format!("{} owes {}", ctx.login(payer), formatted_total),
            cached_total: Some(formatted_total),
            chat_report_id: Some(chat_report_id.to_string()),
            parent_report_id: Some(chat_report_id.to_string()),
            currency: currency.to_string(),
            manager_id: Some(payer),
            owner_account_id: Some(payee),
            participants: BTreeMap::from([(payee, hidden.clone()), (payer, hidden)]),
            state_num,
            status_num,
            total,
            notification_preference: NotificationPreference::Hidden,
            last_visible_action_created: Some(self.now()),
            ..Default::default()
        }
    }

    /// An expense report in a workspace chat. The total is stored negated,
    /// and instant-submit workspaces skip the open state.
    pub fn expense_report(
        &self,
        chat_report_id: &str,
        policy_id: &str,
        payee: AccountId,
        total: i64,
        currency: &str,
        reimbursable: bool,
    ) -> Report {
        let ctx = self.context();
        let stored_total = -total;
        let policy_name = ctx
            .reports
            .report(chat_report_id)
            .map(|chat| ctx.policy_name(&chat))
            .unwrap_or_default();
        let instant_submit = ctx.policy(Some(policy_id)).is_some_and(|p| p.is_instant_submit);
        let (state_num, status_num) = if instant_submit {
            (StateNum::Submitted, StatusNum::Submitted)
        } else {
            (StateNum::Open, StatusNum::Open)
        };

        Report {
            report_id: self.ids.report_id(),
            report_type: ReportType::Expense,
            report_name: format!("{} owes {}", policy_name, ctx.format_amount(stored_total, currency)),
            chat_report_id: Some(chat_report_id.to_string()),
            parent_report_id: Some(chat_report_id.to_string()),
            policy_id: Some(policy_id.to_string()),
            owner_account_id: Some(payee),
            currency: currency.to_string(),
            state_num,
            status_num,
            total: stored_total,
            non_reimbursable_total: if reimbursable { 0 } else { stored_total },
            notification_preference: NotificationPreference::Hidden,
            last_visible_action_created: Some(self.now()),
            ..Default::default()
        }
    }

    pub fn task_report(
        &self,
        owner: AccountId,
        assignee: Option<AccountId>,
        parent_report_id: Option<&str>,
        title: &str,
        description: &str,
        policy_id: Option<&str>,
    ) -> Report {
        let visible = Participant {
            hidden: false,
            role: None,
        };
        let mut participants = BTreeMap::from([(owner, visible.clone())]);
        if let Some(assignee) = assignee {
            participants.insert(assignee, visible);
        }

        Report {
            report_id: self.ids.report_id(),
            report_type: ReportType::Task,
            report_name: title.to_string(),
            description: self.context().rich_text.text_to_html(description),
            owner_account_id: Some(owner),
            manager_id: assignee,
            parent_report_id: parent_report_id.map(str::to_string),
            policy_id: policy_id.map(str::to_string),
            participants,
            last_visible_action_created: Some(self.now()),
            ..Default::default()
        }
    }

    /// The thread under a money-request action. An existing thread is reused
    /// and re-parented onto `action`.
    pub fn transaction_thread(
        &self,
        action: &ReportAction,
        money_request_report: Option<&Report>,
        existing_thread_id: Option<&str>,
    ) -> Report {
        let ctx = self.context();
        let name = self.composer.transaction_thread_name(action);
        let policy_id = money_request_report.and_then(|r| r.policy_id.clone());
        let parent_report_id = money_request_report.map(|r| r.report_id.clone());

        if let Some(existing) = existing_thread_id.and_then(|id| ctx.reports.report(id)) {
            return Report {
                is_optimistic_report: true,
                parent_report_action_id: Some(action.report_action_id.clone()),
                parent_report_id,
                report_name: name,
                policy_id,
                ..existing
            };
        }

        let mut participants = vec![ctx.current_account_id()];
        if let Some(actor) = action.actor_account_id.filter(|&a| a != 0 && a != ctx.current_account_id()) {
            participants.push(actor);
        }
        self.chat_report(ChatReportArgs {
            participants: &participants,
            report_name: &name,
            policy_id: policy_id.as_deref(),
            notification_preference: NotificationPreference::Hidden,
            parent_report_action_id: Some(&action.report_action_id),
            parent_report_id: parent_report_id.as_deref(),
            hide_participants: true,
            ..Default::default()
        })
    }

    /// The chat CREATED action, the IOU report CREATED action one millisecond
    /// before the request, the IOU action, its thread and the thread's
    /// CREATED action. The IOU action and the thread point at each other.
    pub fn money_request_entities(&self, iou_report: &Report, args: MoneyRequestEntityArgs<'_>) -> MoneyRequestEntities {
        let created_for_chat = self.created(args.payee_email, None);

        let iou_created = self.now();
        let created_for_iou_report = self.created(args.payee_email, Some(add_millis(&iou_created, -1)));

        let iou_report_id = if args.is_personal_tracking_expense {
            "0"
        } else {
            iou_report.report_id.as_str()
        };
        let mut iou_action = self.iou_action(IouActionArgs {
            iou_type: args.iou_type,
            amount: args.amount,
            currency: args.currency,
            comment: args.comment,
            participants: args.participants,
            transaction_id: args.transaction_id,
            payment_type: args.payment_type,
            iou_report_id: Some(iou_report_id),
            is_settling_up: args.is_settling_up,
            is_send_money_flow: args.is_send_money_flow,
            receipt: args.receipt,
            is_own_policy_expense_chat: args.is_own_policy_expense_chat,
            created: Some(&iou_created),
        });

        let transaction_thread = self.transaction_thread(&iou_action, Some(iou_report), args.existing_transaction_thread_id);
        // An unloaded existing thread is replaced by a new one
        let reused = args.existing_transaction_thread_id == Some(transaction_thread.report_id.as_str());
        let created_for_thread = (!reused).then(|| self.created(args.payee_email, None));
        iou_action.child_report_id = Some(transaction_thread.report_id.clone());
        debug!(
            "Built money request entities: action {} thread {}",
            iou_action.report_action_id, transaction_thread.report_id
        );

        MoneyRequestEntities {
            created_for_chat,
            created_for_iou_report,
            iou_action,
            transaction_thread,
            created_for_thread,
        }
    }
}

impl MoneyRequestEntities {
    /// Every action in the set, paired with the report it belongs to.
    pub fn actions_by_report(&self, chat_report_id: &str, iou_report_id: &str) -> Vec<(String, &ReportAction)> {
        let mut actions = vec![
            (chat_report_id.to_string(), &self.created_for_chat),
            (iou_report_id.to_string(), &self.created_for_iou_report),
            (iou_report_id.to_string(), &self.iou_action),
        ];
        if let Some(created) = &self.created_for_thread {
            actions.push((self.transaction_thread.report_id.clone(), created));
        }
        actions
    }

    pub fn is_pending(&self) -> bool {
        self.iou_action.pending_action == Some(PendingAction::Add)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{NOW, clock, ids, snapshot};
    use super::*;
    use crate::context::Context;
    use crate::source::Replica;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chat_report_roles_and_pinning() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let admins = builder.chat_report(ChatReportArgs {
            participants: &[1, 2],
            report_name: ADMINS_ROOM_NAME,
            chat_type: Some(ChatType::PolicyAdmins),
            policy_id: Some("pol"),
            ..Default::default()
        });
        assert_eq!(admins.report_id, "100");
        assert!(admins.is_pinned);
        assert!(admins.is_optimistic_report);
        assert_eq!(admins.participants[&1].role, Some(ParticipantRole::Admin));
        assert_eq!(admins.participants[&2].role, Some(ParticipantRole::Member));
        assert_eq!(admins.last_read_time.as_deref(), Some(NOW));

        let dm = builder.chat_report(ChatReportArgs {
            participants: &[1, 2],
            optimistic_report_id: Some("dm"),
            ..Default::default()
        });
        assert_eq!(dm.report_id, "dm");
        assert_eq!(dm.report_name, DEFAULT_REPORT_NAME);
        assert!(!dm.is_pinned);

        let group = builder.group_chat_report(&[1, 2, 3], "Friends", None);
        assert_eq!(group.chat_type, Some(ChatType::Group));
        assert_eq!(group.participants.len(), 3);
    }

    #[test]
    fn test_iou_report_states() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let requested = builder.iou_report(1, 2, 1500, "chat", "USD", false);
        assert_eq!(requested.report_name, "dana@example.com owes $15.00");
        assert_eq!(requested.state_num, StateNum::Submitted);
        assert_eq!(requested.status_num, StatusNum::Submitted);
        assert_eq!(requested.manager_id, Some(2));
        assert!(requested.participants[&2].hidden);
        assert!(!requested.is_settled());

        let sent = builder.iou_report(1, 2, 1500, "chat", "USD", true);
        assert!(sent.is_settled());
        assert_eq!(sent.state_num, StateNum::Approved);
    }

    #[test]
    fn test_expense_report_is_negative() {
        let mut replica = Replica::new();
        replica.insert_report(&Report {
            report_id: "ws".into(),
            chat_type: Some(ChatType::PolicyExpenseChat),
            policy_id: Some("pol".into()),
            ..Default::default()
        });
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let report = builder.expense_report("ws", "pol", 1, 2000, "USD", false);
        assert_eq!(report.total, -2000);
        assert_eq!(report.non_reimbursable_total, -2000);
        assert_eq!(report.report_name, "Acme owes -$20.00");
        // The fixture workspace submits instantly.
        assert_eq!(report.state_num, StateNum::Submitted);

        let manual = builder.expense_report("ws", "other", 1, 2000, "USD", true);
        assert_eq!(manual.state_num, StateNum::Open);
        assert_eq!(manual.non_reimbursable_total, 0);
    }

    #[test]
    fn test_task_report() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let task = builder.task_report(1, Some(2), Some("chat"), "Buy milk", "two *litres*", None);
        assert!(task.is_task_report());
        assert_eq!(task.description, "two <strong>litres</strong>");
        assert_eq!(task.manager_id, Some(2));
        assert_eq!(task.participants.len(), 2);
    }

    #[test]
    fn test_money_request_entities_are_linked() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let iou_report = builder.iou_report(1, 2, 1500, "chat", "USD", false);
        let entities = builder.money_request_entities(
            &iou_report,
            MoneyRequestEntityArgs {
                amount: 1500,
                currency: "USD",
                comment: "lunch",
                payee_email: "me@example.com",
                participants: &[2],
                transaction_id: "t1",
                ..Default::default()
            },
        );

        assert_eq!(entities.created_for_iou_report.created, "2024-05-01 11:59:59.999");
        assert_eq!(entities.iou_action.created, NOW);
        assert_eq!(
            entities.iou_action.child_report_id.as_deref(),
            Some(entities.transaction_thread.report_id.as_str())
        );
        assert_eq!(
            entities.transaction_thread.parent_report_action_id.as_deref(),
            Some(entities.iou_action.report_action_id.as_str())
        );
        assert_eq!(entities.transaction_thread.parent_report_id.as_deref(), Some(iou_report.report_id.as_str()));
        assert_eq!(entities.transaction_thread.notification_preference, NotificationPreference::Hidden);
        assert!(entities.created_for_thread.is_some());
        assert_eq!(entities.actions_by_report("chat", &iou_report.report_id).len(), 4);
        assert!(entities.is_pending());
    }

    #[test]
    fn test_existing_thread_is_reparented() {
        let mut replica = Replica::new();
        replica.insert_report(&Report {
            report_id: "thread".into(),
            report_name: "old name".into(),
            parent_report_id: Some("elsewhere".into()),
            ..Default::default()
        });
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let iou_report = Report {
            report_id: "iou".into(),
            report_type: ReportType::Iou,
            policy_id: Some("pol".into()),
            ..Default::default()
        };
        let entities = builder.money_request_entities(
            &iou_report,
            MoneyRequestEntityArgs {
                amount: 500,
                currency: "USD",
                payee_email: "me@example.com",
                existing_transaction_thread_id: Some("thread"),
                ..Default::default()
            },
        );
        let thread = &entities.transaction_thread;
        assert_eq!(thread.report_id, "thread");
        assert_eq!(thread.parent_report_id.as_deref(), Some("iou"));
        assert_eq!(thread.policy_id.as_deref(), Some("pol"));
        assert!(thread.is_optimistic_report);
        assert!(entities.created_for_thread.is_none());
        assert_eq!(entities.iou_action.child_report_id.as_deref(), Some("thread"));
    }

    #[test]
    fn test_unloaded_thread_is_replaced_and_linked() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let iou_report = Report {
            report_id: "iou".into(),
            report_type: ReportType::Iou,
            ..Default::default()
        };
        let entities = builder.money_request_entities(
            &iou_report,
            MoneyRequestEntityArgs {
                amount: 500,
                currency: "USD",
                payee_email: "me@example.com",
                existing_transaction_thread_id: Some("gone"),
                ..Default::default()
            },
        );
        let thread = &entities.transaction_thread;
        assert_ne!(thread.report_id, "gone");
        assert_eq!(entities.iou_action.child_report_id.as_deref(), Some(thread.report_id.as_str()));
        assert_eq!(
            thread.parent_report_action_id.as_deref(),
            Some(entities.iou_action.report_action_id.as_str())
        );
        assert!(entities.created_for_thread.is_some());
    }
}
