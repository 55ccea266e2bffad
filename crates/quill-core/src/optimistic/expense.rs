use std::collections::BTreeMap;

use quill_types::action::{
    ActionPayload, AmountMessage, CancellationReason, CommentMessage, IouDetails, IouMessage, IouType,
    MessageFragment, ModifiedExpenseMessage, PaymentType, ReimbursementDequeuedMessage, ReportPreviewMessage,
    TrackExpenseWhisperMessage,
};
use quill_types::models::{Receipt, ReceiptState};
use quill_types::{AccountId, Report, ReportAction, Transaction};

use super::MutationBuilder;
use crate::phrase::Phrase;
use crate::preview::{IouMessageArgs, IouMessageKind, PreviewMode};
use crate::rich_text::escape_html;
use crate::time::add_millis;

/// Account that posts automated whispers.
pub const CONCIERGE_ACCOUNT_ID: AccountId = 8_392_101;
pub const CONCIERGE_DISPLAY_NAME: &str = "Concierge";
pub const TRACK_EXPENSE_WHISPER_HTML: &str = "What would you like to do with this expense?";

/// Inputs to [`MutationBuilder::iou_action`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IouActionArgs<'s> {
    pub iou_type: IouType,
    pub amount: i64,
    pub currency: &'s str,
    pub comment: &'s str,
    pub participants: &'s [AccountId],
    pub transaction_id: &'s str,
    pub payment_type: Option<PaymentType>,
    /// A new id is generated when this is `None`.
    pub iou_report_id: Option<&'s str>,
    pub is_settling_up: bool,
    pub is_send_money_flow: bool,
    pub receipt: Option<&'s Receipt>,
    pub is_own_policy_expense_chat: bool,
    pub created: Option<&'s str>,
}

/// Fields the user changed on an expense. `None` means untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionChanges {
    pub comment: Option<String>,
    pub created: Option<String>,
    pub merchant: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub billable: Option<bool>,
}

fn billable_label(billable: bool) -> String {
    if billable { "billable" } else { "non-billable" }.to_string()
}

impl TransactionChanges {
    /// Old and new values of every changed field. Amount and currency are
    /// always recorded together.
    pub fn diff(&self, old: &Transaction, is_from_expense_report: bool) -> ModifiedExpenseMessage {
        let mut message = ModifiedExpenseMessage::default();
        if let Some(comment) = &self.comment {
            message.old_comment = Some(old.comment.clone());
            message.new_comment = Some(comment.clone());
        }
        if let Some(created) = &self.created {
            message.old_created = Some(old.created.clone());
            message.created = Some(created.clone());
        }
        if let Some(merchant) = &self.merchant {
            message.old_merchant = Some(old.merchant.clone());
            message.merchant = Some(merchant.clone());
        }
        if self.amount.is_some() || self.currency.is_some() {
            let old_amount = old.amount_for(is_from_expense_report);
            message.old_amount = Some(old_amount);
            message.amount = Some(self.amount.unwrap_or(old_amount));
            message.old_currency = Some(old.currency.clone());
            message.currency = Some(self.currency.clone().unwrap_or_else(|| old.currency.clone()));
        }
        if let Some(category) = &self.category {
            message.old_category = Some(old.category.clone());
            message.category = Some(category.clone());
        }
        if let Some(tag) = &self.tag {
            message.old_tag = Some(old.tag.clone());
            message.tag = Some(tag.clone());
        }
        if let Some(billable) = self.billable {
            message.old_billable = Some(billable_label(old.billable));
            message.billable = Some(billable_label(billable));
        }
        message
    }
}

impl<'a> MutationBuilder<'a> {
    /// A money-request action: create, split, track, pay or delete.
    pub fn iou_action(&self, args: IouActionArgs<'_>) -> ReportAction {
        let ctx = self.context();
        let current = ctx.current_account_id();
        let iou_report_id = args
            .iou_report_id
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.ids.report_id());

        let mut iou = IouMessage {
            iou_type: args.iou_type,
            amount: Some(args.amount),
            currency: Some(args.currency.to_string()),
            comment: Some(args.comment.to_string()),
            iou_transaction_id: Some(args.transaction_id.to_string()),
            iou_report_id: Some(iou_report_id),
            ..Default::default()
        };

        match args.iou_type {
            IouType::Pay if args.is_send_money_flow => {
                iou.amount = None;
                iou.currency = None;
                iou.comment = None;
                iou.iou_details = Some(IouDetails {
                    amount: args.amount,
                    comment: args.comment.to_string(),
                    currency: args.currency.to_string(),
                });
                iou.payment_type = args.payment_type;
            }
            IouType::Pay => {
                // Settling a report covers every transaction in it.
                iou.iou_transaction_id = None;
                iou.comment = None;
                iou.payment_type = args.payment_type;
            }
            IouType::Split => {
                // Splits live in group chats, which have no IOU report.
                iou.iou_report_id = None;
                iou.participant_account_ids = if args.is_own_policy_expense_chat {
                    vec![current]
                } else {
                    std::iter::once(current).chain(args.participants.iter().copied()).collect()
                };
            }
            IouType::Create | IouType::Track | IouType::Delete => {}
        }

        let message = self.composer.iou_report_action_message(IouMessageArgs {
            iou_report_id: args.iou_report_id.unwrap_or_default(),
            kind: IouMessageKind::Iou(args.iou_type),
            total: args.amount,
            comment: args.comment,
            currency: args.currency,
            payment_type: args.payment_type,
            is_settling_up: args.is_settling_up,
        });
        let created = args.created.map(str::to_string).unwrap_or_else(|| self.now());

        let mut action = self.stamp(ActionPayload::Iou(iou), message, created);
        if args
            .receipt
            .is_some_and(|r| matches!(r.state, ReceiptState::ScanReady | ReceiptState::Scanning))
        {
            action.whispered_to = vec![current];
        }
        action
    }

    pub fn approved(&self, amount: i64, currency: &str, expense_report_id: &str) -> ReportAction {
        let message = self.composer.iou_report_action_message(IouMessageArgs {
            iou_report_id: expense_report_id,
            kind: IouMessageKind::Approved,
            total: amount.abs(),
            comment: "",
            currency,
            payment_type: None,
            is_settling_up: false,
        });
        let payload = ActionPayload::Approved(AmountMessage {
            amount,
            currency: currency.to_string(),
            expense_report_id: Some(expense_report_id.to_string()),
        });
        self.stamp(payload, message, self.now())
    }

    pub fn submitted(
        &self,
        amount: i64,
        currency: &str,
        expense_report_id: &str,
        admin_account_id: Option<AccountId>,
    ) -> ReportAction {
        let message = self.composer.iou_report_action_message(IouMessageArgs {
            iou_report_id: expense_report_id,
            kind: IouMessageKind::Submitted,
            total: amount.abs(),
            comment: "",
            currency,
            payment_type: None,
            is_settling_up: false,
        });
        let payload = ActionPayload::Submitted(AmountMessage {
            amount,
            currency: currency.to_string(),
            expense_report_id: Some(expense_report_id.to_string()),
        });
        let mut action = self.stamp(payload, message, self.now());
        action.admin_account_id = admin_account_id;
        action
    }

    /// The chat-side summary of a new IOU or expense report. A preview created
    /// with a scanning receipt is whispered to its author.
    pub fn report_preview(
        &self,
        chat_report: Option<&Report>,
        iou_report: &Report,
        comment: &str,
        transaction: Option<&Transaction>,
        child_report_id: Option<&str>,
    ) -> ReportAction {
        let ctx = self.context();
        let has_receipt = transaction.is_some_and(Transaction::has_receipt);
        let being_scanned = transaction.is_some_and(Transaction::is_receipt_being_scanned);
        let message = self
            .composer
            .report_preview_message(Some(iou_report), None, PreviewMode::default(), None);
        let created = self.now();

        let payload = ActionPayload::ReportPreview(ReportPreviewMessage {
            linked_report_id: iou_report.report_id.clone(),
            last_modified: None,
        });
        let mut action = self.stamp(
            payload,
            vec![MessageFragment::comment(message.clone(), message)],
            created.clone(),
        );
        action.report_id = chat_report.map(|r| r.report_id.clone());
        if being_scanned {
            action.whispered_to = vec![ctx.current_account_id()];
        }
        if !has_receipt {
            action.actor_account_id = iou_report.manager_id;
        }
        action.child_report_id = Some(child_report_id.unwrap_or(&iou_report.report_id).to_string());
        action.child_money_request_count = 1;
        action.child_last_money_request_comment = Some(comment.to_string());
        if let Some(transaction) = transaction.filter(|t| t.has_receipt()) {
            action
                .child_recent_receipt_transaction_ids
                .insert(transaction.transaction_id.clone(), created);
        }
        action
    }

    /// Folds one more expense into an existing preview. Pay actions do not
    /// count as requests. Adding an expense without a receipt means the
    /// report has something ready, so the whisper is lifted.
    pub fn update_report_preview(
        &self,
        iou_report: Option<&Report>,
        preview: &ReportAction,
        is_pay: bool,
        comment: &str,
        transaction: Option<&Transaction>,
    ) -> ReportAction {
        let ctx = self.context();
        let receipt = transaction.filter(|t| t.has_receipt());

        let mut kept: Vec<(&String, &String)> = preview.child_recent_receipt_transaction_ids.iter().collect();
        kept.sort_by(|a, b| b.1.cmp(a.1));
        kept.truncate(ctx.config.recent_receipt_limit);

        let message = self
            .composer
            .report_preview_message(iou_report, Some(preview), PreviewMode::default(), None);

        let mut updated = preview.clone();
        updated.message = vec![MessageFragment::comment(message.clone(), message)];
        if !comment.is_empty() {
            updated.child_last_money_request_comment = Some(comment.to_string());
        }
        if !is_pay {
            updated.child_money_request_count += 1;
        }
        match receipt {
            Some(transaction) => {
                let mut recent: BTreeMap<String, String> =
                    kept.into_iter().map(|(id, created)| (id.clone(), created.clone())).collect();
                recent.insert(transaction.transaction_id.clone(), transaction.created.clone());
                updated.child_recent_receipt_transaction_ids = recent;
            }
            None => updated.whispered_to.clear(),
        }
        updated
    }

    /// Concierge's follow-up to a tracked expense, placed just after it.
    pub fn track_expense_whisper(&self, iou_action: &ReportAction, transaction_id: &str) -> ReportAction {
        let created = add_millis(&self.now(), 1);
        let payload = ActionPayload::ActionableTrackExpenseWhisper(TrackExpenseWhisperMessage {
            transaction_id: transaction_id.to_string(),
            last_modified: Some(created.clone()),
            resolution: None,
        });
        let mut action = self.stamp(
            payload,
            vec![MessageFragment::comment(TRACK_EXPENSE_WHISPER_HTML, TRACK_EXPENSE_WHISPER_HTML)],
            created.clone(),
        );
        action.actor_account_id = Some(CONCIERGE_ACCOUNT_ID);
        action.person = vec![MessageFragment::text(CONCIERGE_DISPLAY_NAME, "strong")];
        action.last_modified = Some(created);
        action.previous_report_action_id = Some(iou_action.report_action_id.clone());
        action
    }

    pub fn modified_expense(
        &self,
        transaction_thread: Option<&Report>,
        old: &Transaction,
        changes: &TransactionChanges,
        is_from_expense_report: bool,
    ) -> ReportAction {
        let diff = changes.diff(old, is_from_expense_report);
        let text = self.composer.modified_expense_text(&diff);
        let mut action = self.stamp(
            ActionPayload::ModifiedExpense(diff),
            vec![MessageFragment::comment(escape_html(&text), text)],
            self.now(),
        );
        action.report_id = transaction_thread.map(|r| r.report_id.clone());
        action
    }

    pub fn hold(&self, created: Option<String>) -> ReportAction {
        let text = self.context().tr(Phrase::HeldExpense);
        self.stamp(
            ActionPayload::Hold,
            vec![MessageFragment::text(text, "normal")],
            created.unwrap_or_else(|| self.now()),
        )
    }

    /// The reason given when putting an expense on hold. Stored verbatim.
    pub fn hold_comment(&self, comment: &str, created: Option<String>) -> ReportAction {
        let payload = ActionPayload::AddComment(CommentMessage {
            html: comment.to_string(),
            ..Default::default()
        });
        self.stamp(
            payload,
            vec![MessageFragment::comment(comment, comment)],
            created.unwrap_or_else(|| self.now()),
        )
    }

    pub fn unhold(&self, created: Option<String>) -> ReportAction {
        let text = self.context().tr(Phrase::UnheldExpense);
        let mut action = self.stamp(
            ActionPayload::Unhold,
            vec![MessageFragment::text(text, "normal")],
            created.unwrap_or_else(|| self.now()),
        );
        if let Some(person) = action.person.first_mut() {
            person.style = Some("normal".to_string());
        }
        action
    }

    /// An admin canceling a payment that is waiting on the payee.
    pub fn cancel_payment(&self, expense_report_id: &str, amount: i64, currency: &str) -> ReportAction {
        let payload = ActionPayload::ReimbursementDequeued(ReimbursementDequeuedMessage {
            cancellation_reason: CancellationReason::Admin,
            expense_report_id: Some(expense_report_id.to_string()),
            amount,
            currency: currency.to_string(),
        });
        let mut action = self.stamp(payload, Vec::new(), self.now());
        let report = self.context().reports.report(expense_report_id);
        let text = self
            .composer
            .reimbursement_dequeued_message(&action, report.as_ref(), false);
        action.message = vec![MessageFragment::comment(escape_html(&text), text)];
        action
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{NOW, clock, ids, snapshot};
    use super::*;
    use crate::context::Context;
    use crate::source::Replica;
    use pretty_assertions::assert_eq;
    use quill_types::models::StatusNum;
    use quill_types::{PendingAction, ReportType};

    fn iou_report() -> Report {
        Report {
            report_id: "iou".into(),
            report_type: ReportType::Iou,
            total: 1500,
            currency: "USD".into(),
            manager_id: Some(2),
            owner_account_id: Some(1),
            ..Default::default()
        }
    }

    fn scanning_transaction() -> Transaction {
        Transaction {
            transaction_id: "t1".into(),
            report_id: "iou".into(),
            created: "2024-05-01".into(),
            receipt: Some(Receipt {
                state: ReceiptState::Scanning,
                source: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_action_message() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let action = builder.iou_action(IouActionArgs {
            amount: 1500,
            currency: "USD",
            comment: "lunch",
            transaction_id: "t1",
            iou_report_id: Some("iou"),
            ..Default::default()
        });
        let iou = action.iou().unwrap();
        assert_eq!(iou.iou_report_id.as_deref(), Some("iou"));
        assert_eq!(iou.iou_transaction_id.as_deref(), Some("t1"));
        assert_eq!(action.message_text(), "submitted $15.00 for lunch");
        assert_eq!(action.pending_action, Some(PendingAction::Add));
        assert!(action.whispered_to.is_empty());
        assert_eq!(action.created, NOW);
    }

    #[test]
    fn test_scanning_receipt_whispers_to_author() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);
        let receipt = Receipt {
            state: ReceiptState::ScanReady,
            source: None,
        };
        let action = builder.iou_action(IouActionArgs {
            receipt: Some(&receipt),
            ..Default::default()
        });
        assert_eq!(action.whispered_to, vec![1]);
    }

    #[test]
    fn test_pay_variants() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let sent = builder.iou_action(IouActionArgs {
            iou_type: IouType::Pay,
            amount: 700,
            currency: "USD",
            comment: "rent",
            transaction_id: "t1",
            payment_type: Some(PaymentType::Elsewhere),
            is_send_money_flow: true,
            ..Default::default()
        });
        let iou = sent.iou().unwrap();
        assert_eq!(iou.amount, None);
        assert_eq!(iou.comment, None);
        assert_eq!(
            iou.iou_details,
            Some(IouDetails {
                amount: 700,
                comment: "rent".into(),
                currency: "USD".into(),
            })
        );
        assert!(sent.is_sent_money_action());
        // A fresh IOU report id is generated for money sent without one.
        assert!(iou.iou_report_id.is_some());

        let settle = builder.iou_action(IouActionArgs {
            iou_type: IouType::Pay,
            amount: 700,
            currency: "USD",
            comment: "rent",
            transaction_id: "t1",
            payment_type: Some(PaymentType::Expensify),
            iou_report_id: Some("iou"),
            is_settling_up: true,
            ..Default::default()
        });
        let iou = settle.iou().unwrap();
        assert_eq!(iou.iou_transaction_id, None);
        assert_eq!(iou.comment, None);
        assert_eq!(iou.payment_type, Some(PaymentType::Expensify));
    }

    #[test]
    fn test_split_lists_participants() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let split = builder.iou_action(IouActionArgs {
            iou_type: IouType::Split,
            amount: 900,
            currency: "USD",
            participants: &[2, 3],
            ..Default::default()
        });
        let iou = split.iou().unwrap();
        assert_eq!(iou.iou_report_id, None);
        assert_eq!(iou.participant_account_ids, vec![1, 2, 3]);

        let own_chat = builder.iou_action(IouActionArgs {
            iou_type: IouType::Split,
            participants: &[2, 3],
            is_own_policy_expense_chat: true,
            ..Default::default()
        });
        assert_eq!(own_chat.iou().unwrap().participant_account_ids, vec![1]);
    }

    #[test]
    fn test_approved_and_submitted() {
        let mut replica = Replica::new();
        replica.insert_report(&Report {
            report_id: "exp".into(),
            report_type: ReportType::Expense,
            policy_id: Some("pol".into()),
            owner_account_id: Some(1),
            ..Default::default()
        });
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let approved = builder.approved(-1200, "USD", "exp");
        assert_eq!(approved.message_text(), "approved $12.00");

        let submitted = builder.submitted(-1200, "USD", "exp", Some(2));
        assert_eq!(
            submitted.message_text(),
            "You submitted this report to Dana Scully (dana@example.com)"
        );
        assert_eq!(submitted.admin_account_id, Some(2));
    }

    #[test]
    fn test_report_preview_with_scanning_receipt() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let chat = Report {
            report_id: "chat".into(),
            ..Default::default()
        };
        let transaction = scanning_transaction();
        let preview = builder.report_preview(Some(&chat), &iou_report(), "lunch", Some(&transaction), None);

        assert_eq!(preview.linked_report_id(), Some("iou"));
        assert_eq!(preview.report_id.as_deref(), Some("chat"));
        assert_eq!(preview.whispered_to, vec![1]);
        assert_eq!(preview.actor_account_id, Some(1));
        assert_eq!(preview.child_report_id.as_deref(), Some("iou"));
        assert_eq!(preview.child_money_request_count, 1);
        assert_eq!(preview.child_recent_receipt_transaction_ids.get("t1").map(String::as_str), Some(NOW));
        assert_eq!(preview.message_text(), "Dana owes $15.00");

        let plain = builder.report_preview(Some(&chat), &iou_report(), "", None, None);
        assert_eq!(plain.actor_account_id, Some(2));
        assert!(plain.whispered_to.is_empty());
    }

    #[test]
    fn test_update_report_preview() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let mut preview = builder.report_preview(None, &iou_report(), "lunch", Some(&scanning_transaction()), None);
        preview.child_recent_receipt_transaction_ids = BTreeMap::from([
            ("a".to_string(), "2024-01-01".to_string()),
            ("b".to_string(), "2024-03-01".to_string()),
            ("c".to_string(), "2024-02-01".to_string()),
        ]);

        let newer = Transaction {
            transaction_id: "d".into(),
            created: "2024-04-01".into(),
            ..scanning_transaction()
        };
        let with_receipt = builder.update_report_preview(Some(&iou_report()), &preview, false, "", Some(&newer));
        assert_eq!(with_receipt.child_money_request_count, 2);
        assert_eq!(with_receipt.child_last_money_request_comment.as_deref(), Some("lunch"));
        let kept: Vec<&str> = with_receipt
            .child_recent_receipt_transaction_ids
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(kept, vec!["b", "c", "d"]);
        assert_eq!(with_receipt.whispered_to, vec![1]);

        let cash = Transaction {
            transaction_id: "e".into(),
            ..Default::default()
        };
        let paid = builder.update_report_preview(Some(&iou_report()), &with_receipt, true, "taxi", Some(&cash));
        assert_eq!(paid.child_money_request_count, 2);
        assert_eq!(paid.child_last_money_request_comment.as_deref(), Some("taxi"));
        assert!(paid.whispered_to.is_empty());
    }

    #[test]
    fn test_track_expense_whisper_follows_iou_action() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let iou = builder.iou_action(IouActionArgs {
            iou_type: IouType::Track,
            ..Default::default()
        });
        let whisper = builder.track_expense_whisper(&iou, "t1");
        assert_eq!(whisper.created, "2024-05-01 12:00:00.001");
        assert_eq!(whisper.previous_report_action_id.as_deref(), Some(iou.report_action_id.as_str()));
        assert_eq!(whisper.actor_account_id, Some(CONCIERGE_ACCOUNT_ID));
        assert!(whisper.is_actionable_track_expense());
    }

    #[test]
    fn test_modified_expense_diff() {
        let (snapshot, replica, ids, clock) = (snapshot(), Replica::new(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        let old = Transaction {
            amount: -1000,
            currency: "USD".into(),
            merchant: "Cafe".into(),
            billable: false,
            ..Default::default()
        };
        let changes = TransactionChanges {
            amount: Some(2500),
            merchant: Some("Bistro".into()),
            billable: Some(true),
            ..Default::default()
        };
        let action = builder.modified_expense(None, &old, &changes, true);
        let ActionPayload::ModifiedExpense(diff) = &action.payload else {
            panic!("expected a modified expense payload");
        };
        assert_eq!(diff.old_amount, Some(1000));
        assert_eq!(diff.amount, Some(2500));
        assert_eq!(diff.currency.as_deref(), Some("USD"));
        assert_eq!(diff.old_billable.as_deref(), Some("non-billable"));
        assert_eq!(diff.old_comment, None);
        assert_eq!(
            action.message_text(),
            "changed the amount to $25.00 (previously $10.00), changed the merchant to Bistro (previously Cafe) \
             and changed the expense to billable (previously non-billable)"
        );
    }

    #[test]
    fn test_hold_and_cancel() {
        let mut replica = Replica::new();
        replica.insert_report(&Report {
            report_id: "exp".into(),
            report_type: ReportType::Expense,
            manager_id: Some(1),
            status_num: StatusNum::Approved,
            ..Default::default()
        });
        let (snapshot, ids, clock) = (snapshot(), ids(), clock());
        let ctx = Context::new(&snapshot, &replica, &replica);
        let builder = MutationBuilder::new(ctx, &ids, &clock);

        assert_eq!(builder.hold(None).message_text(), "held this expense");
        assert_eq!(builder.unhold(None).message_text(), "unheld this expense");
        let reason = builder.hold_comment("waiting on receipt", None);
        assert_eq!(reason.message_html(), "waiting on receipt");

        let cancel = builder.cancel_payment("exp", 1200, "USD");
        assert_eq!(cancel.message_text(), "canceled the $12.00 payment.");
        assert_eq!(cancel.action_name(), "REIMBURSEMENTDEQUEUED");
    }
}
