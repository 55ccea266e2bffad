//! Human-readable text derived from actions, reports and transactions.
//!
//! Nothing here fails: a transaction or report that is not loaded yet makes
//! the composer fall back to the message text the server sent.

pub mod cache;
pub mod member_change;
pub mod modified_expense;

use quill_types::action::{
    ActionPayload, CancellationReason, DismissedViolationMessage, IouType, MessageFragment, ModifiedExpenseMessage,
    PaymentType,
};
use quill_types::{Report, ReportAction, Transaction};
use tracing::debug;

use crate::context::Context;
use crate::ordering::most_recent_iou_request_action_id;
use crate::phrase::Phrase;
use crate::rich_text::{escape_html, mentioned_report_ids};
use crate::spend::{has_non_reimbursable_transactions, money_request_spend_breakdown};
use crate::visibility::{LastVisibleMessage, last_visible_action, last_visible_message};

pub use cache::{PreviewCache, PreviewKey};
pub use member_change::{MemberChangeElement, member_change_elements, member_change_fragment, member_change_plain_text};
pub use modified_expense::{EnglishModifiedExpense, ModifiedExpenseFormatter};

static ENGLISH_MODIFIED_EXPENSE: EnglishModifiedExpense = EnglishModifiedExpense;

/// Server messages for wallet payments end with one of these.
const WALLET_SUFFIXES: [&str; 2] = [" with wallet", " using wallet"];

/// Where a report preview is shown, which changes its wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreviewMode {
    /// Report a scanning receipt or pending route on the linked transaction.
    pub consider_pending_receipt: bool,
    /// The preview summarises the IOU report inside its parent chat.
    pub for_parent_chat: bool,
    /// The preview is a conversation-list row.
    pub for_list: bool,
}

/// Transaction fields in display form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionDetails {
    pub amount: i64,
    pub currency: String,
    pub comment: String,
    pub merchant: String,
}

/// Which message an IOU report action carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IouMessageKind {
    Submitted,
    Approved,
    Iou(IouType),
}

/// Inputs to [`PreviewComposer::iou_report_action_message`].
#[derive(Debug, Clone, Copy)]
pub struct IouMessageArgs<'a> {
    pub iou_report_id: &'a str,
    pub kind: IouMessageKind,
    pub total: i64,
    pub comment: &'a str,
    pub currency: &'a str,
    pub payment_type: Option<PaymentType>,
    pub is_settling_up: bool,
}

#[derive(Clone, Copy)]
pub struct PreviewComposer<'a> {
    ctx: Context<'a>,
    modified_expense: &'a dyn ModifiedExpenseFormatter,
    cache: Option<&'a PreviewCache>,
}

impl<'a> PreviewComposer<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self {
            ctx,
            modified_expense: &ENGLISH_MODIFIED_EXPENSE,
            cache: None,
        }
    }

    pub fn with_modified_expense_formatter(mut self, formatter: &'a dyn ModifiedExpenseFormatter) -> Self {
        self.modified_expense = formatter;
        self
    }

    pub fn with_cache(mut self, cache: &'a PreviewCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn context(&self) -> &Context<'a> {
        &self.ctx
    }

    fn linked_transaction(&self, action: &ReportAction) -> Option<Transaction> {
        let id = action.linked_transaction_id()?;
        let transaction = self.ctx.transactions.transaction(id);
        if transaction.is_none() {
            debug!("Transaction {} of action {} is not loaded", id, action.report_action_id);
        }
        transaction
    }

    /// Amounts on expense reports are stored negated, so the sign depends on
    /// the report holding the transaction.
    pub fn transaction_details(&self, transaction: &Transaction) -> TransactionDetails {
        let is_from_expense_report = self
            .ctx
            .reports
            .report(&transaction.report_id)
            .is_some_and(|r| r.is_expense_report());
        TransactionDetails {
            amount: transaction.amount_for(is_from_expense_report),
            currency: transaction.currency.clone(),
            comment: transaction.comment.clone(),
            merchant: transaction.merchant.clone(),
        }
    }

    fn amount_phrase_for(&self, details: &TransactionDetails) -> String {
        self.ctx.format_amount(details.amount, &details.currency)
    }

    /// Summary of an IOU action shown inside a money-request report.
    pub fn iou_report_action_display_message(&self, action: &ReportAction, transaction: Option<&Transaction>) -> String {
        let Some(iou) = action.iou() else {
            return String::new();
        };

        if iou.iou_type == IouType::Pay {
            let (amount, currency) = match &iou.iou_details {
                Some(details) => (details.amount, details.currency.as_str()),
                None => (iou.amount.unwrap_or_default(), iou.currency.as_deref().unwrap_or_default()),
            };
            let amount = self.ctx.format_amount(amount.abs(), currency);
            let payer = String::new();
            return self.ctx.tr(match iou.payment_type {
                Some(PaymentType::Elsewhere) => Phrase::PaidElsewhere { payer, amount },
                Some(PaymentType::Expensify | PaymentType::Vbba) => Phrase::PaidWithWallet { payer, amount },
                None => Phrase::PayerPaidAmount { payer, amount },
            });
        }

        let details = transaction.map(|t| self.transaction_details(t)).unwrap_or_default();
        let amount = self.amount_phrase_for(&details);
        let iou_report = iou.iou_report_id.as_deref().and_then(|id| self.ctx.reports.report(id));
        if iou_report.as_ref().is_some_and(Report::is_settled) {
            return self.ctx.tr(Phrase::PayerSettled { amount });
        }
        if iou_report.as_ref().is_some_and(Report::is_report_approved) {
            return self.ctx.tr(Phrase::ApprovedAmount { amount });
        }

        let comment = details.comment;
        self.ctx.tr(if action.is_split_bill_action() {
            Phrase::DidSplitAmount { amount, comment }
        } else if action.is_track_expense_action() {
            Phrase::TrackedAmount { amount, comment }
        } else {
            Phrase::SubmittedAmount { amount, comment }
        })
    }

    /// Scanning or missing-details text for a transaction, if either applies.
    fn receipt_status(&self, transaction: &Transaction) -> Option<String> {
        if transaction.is_receipt_being_scanned() {
            return Some(self.ctx.tr(Phrase::Scanning));
        }
        if transaction.has_missing_smartscan_fields() {
            return Some(self.ctx.tr(Phrase::MissingDetails));
        }
        None
    }

    /// Summary of an IOU or expense report, shown on its preview action and
    /// in the conversation list. `original` is the preview action when
    /// `iou_action` was unwrapped from one.
    pub fn report_preview_message(
        &self,
        report: Option<&Report>,
        iou_action: Option<&ReportAction>,
        mode: PreviewMode,
        original: Option<&ReportAction>,
    ) -> String {
        let ctx = &self.ctx;
        let raw_html = iou_action.map(ReportAction::message_html).unwrap_or_default().to_string();

        let Some(report) = report.filter(|r| !r.report_id.is_empty()) else {
            debug!("Report preview without a loaded report, using server text");
            return raw_html;
        };

        if let Some(action) = iou_action
            .filter(|a| !report.is_iou_report() && (a.is_split_bill_action() || a.is_track_expense_action()))
        {
            let Some(transaction) = self.linked_transaction(action) else {
                return raw_html;
            };
            if let Some(status) = self.receipt_status(&transaction) {
                return status;
            }
            let details = self.transaction_details(&transaction);
            let amount = self.amount_phrase_for(&details);
            let comment = details.comment;
            return ctx.tr(if action.is_split_bill_action() {
                Phrase::DidSplitAmount { amount, comment }
            } else {
                Phrase::TrackedAmount { amount, comment }
            });
        }

        let contains_non_reimbursable = has_non_reimbursable_transactions(ctx, &report.report_id);
        let total = money_request_spend_breakdown(ctx, report).total_display;
        let payer_name = if report.is_expense_report() {
            ctx.policy_name(report)
        } else {
            ctx.display_name(report.manager_id, !mode.for_parent_chat)
        };
        let formatted_total = ctx.format_amount(total, &report.currency);

        if report.is_report_approved() && ctx.is_paid_group_policy(report) {
            return ctx.tr(Phrase::ManagerApprovedAmount {
                manager: payer_name,
                amount: formatted_total,
            });
        }

        let mut linked = iou_action
            .filter(|a| mode.consider_pending_receipt && a.is_money_request())
            .and_then(|a| self.linked_transaction(a));

        if let Some(transaction) = &linked {
            if transaction.has_receipt() && transaction.is_receipt_being_scanned() {
                return ctx.tr(Phrase::Scanning);
            }
            if transaction.is_fetching_waypoints && transaction.amount == 0 {
                return ctx.tr(Phrase::RoutePending);
            }
        }

        let iou = iou_action.and_then(ReportAction::iou);

        if report.is_settled() || (report.is_waiting_on_bank_account && mode.for_parent_chat) {
            let paid_with_wallet = iou
                .and_then(|m| m.payment_type)
                .is_some_and(|p| matches!(p, PaymentType::Expensify | PaymentType::Vbba))
                || WALLET_SUFFIXES.iter().any(|suffix| raw_html.ends_with(suffix))
                || report.is_waiting_on_bank_account;

            let mut actual_payer = if ctx.is_current_user(report.manager_id) {
                String::new()
            } else {
                ctx.display_name(report.manager_id, true)
            };
            if !actual_payer.is_empty() && mode.for_list && !mode.for_parent_chat {
                actual_payer.push(':');
            }

            return ctx.tr(if mode.for_parent_chat {
                Phrase::PayerPaidAmount {
                    payer: payer_name,
                    amount: formatted_total,
                }
            } else if paid_with_wallet {
                Phrase::PaidWithWallet {
                    payer: actual_payer,
                    amount: formatted_total,
                }
            } else {
                Phrase::PaidElsewhere {
                    payer: actual_payer,
                    amount: formatted_total,
                }
            });
        }

        if report.is_waiting_on_bank_account {
            return ctx.tr(Phrase::WaitingOnBankAccount {
                submitter: ctx.display_name(report.owner_account_id, true),
            });
        }

        let last_actor = iou_action.and_then(|a| a.actor_account_id);
        let mut amount = iou.and_then(|m| m.amount);
        let mut currency = iou
            .and_then(|m| m.currency.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| report.currency.clone());

        if let Some(transaction) = &linked {
            amount = Some(transaction.amount_for(report.is_expense_report()));
            currency = transaction.currency.clone();
        }
        if linked.is_none() {
            linked = iou_action.and_then(|a| self.linked_transaction(a));
        }

        let original = original.or(iou_action);
        let mut comment = linked.map(|t| t.comment);
        if original.is_some_and(|a| a.is_report_preview() && a.child_money_request_count != 1) {
            comment = None;
        }

        if let (Some(amount), Some(actor), false) = (amount, last_actor, mode.for_parent_chat) {
            let submitted = ctx.tr(Phrase::SubmittedAmount {
                amount: ctx.format_amount(amount.abs(), &currency),
                comment: comment.unwrap_or_default(),
            });
            if ctx.is_current_user(Some(actor)) {
                return submitted;
            }
            let requestor = ctx.display_name(Some(actor), true);
            if requestor.is_empty() {
                return submitted;
            }
            return format!("{}: {}", requestor, submitted);
        }

        if contains_non_reimbursable {
            return ctx.tr(Phrase::PayerSpentAmount {
                payer: ctx.display_name(report.owner_account_id, false),
                amount: formatted_total,
            });
        }

        ctx.tr(Phrase::PayerOwesAmount {
            payer: payer_name,
            amount: formatted_total,
            comment: comment.unwrap_or_default(),
        })
    }

    /// Name of the thread started from a money-request action.
    pub fn transaction_thread_name(&self, action: &ReportAction) -> String {
        let ctx = &self.ctx;
        if action.is_reversed_transaction() {
            return ctx.tr(Phrase::ReversedTransaction);
        }
        if action.is_deleted() {
            return ctx.tr(Phrase::DeletedExpense);
        }

        let Some(transaction) = self.linked_transaction(action) else {
            return ctx.tr(if action.is_track_expense_action() {
                Phrase::TrackExpense
            } else {
                Phrase::Expense
            });
        };

        if transaction.has_receipt() && transaction.is_receipt_being_scanned() {
            return ctx.tr(Phrase::Scanning);
        }
        if transaction.has_missing_smartscan_fields() {
            return ctx.tr(Phrase::MissingDetails);
        }
        let pending = ctx.tr(Phrase::RoutePending);
        if transaction.is_fetching_waypoints && transaction.merchant == pending {
            return pending;
        }

        let details = self.transaction_details(&transaction);
        let amount = self.amount_phrase_for(&details);
        let comment = if transaction.is_merchant_missing() {
            details.comment
        } else {
            details.merchant
        };
        ctx.tr(if action.is_track_expense_action() {
            Phrase::ThreadTrackName { amount, comment }
        } else if action.is_sent_money_action() {
            Phrase::ThreadSentMoneyName { amount, comment }
        } else {
            Phrase::ThreadExpenseName { amount, comment }
        })
    }

    pub fn reimbursement_queued_message(&self, action: &ReportAction, report: Option<&Report>, short_name: bool) -> String {
        let submitter = self.ctx.display_name(report.and_then(|r| r.owner_account_id), short_name);
        let on_wallet = matches!(
            &action.payload,
            ActionPayload::ReimbursementQueued(m) if m.payment_type == Some(PaymentType::Expensify)
        );
        self.ctx.tr(if on_wallet {
            Phrase::WaitingOnEnabledWallet { submitter }
        } else {
            Phrase::WaitingOnBankAccount { submitter }
        })
    }

    /// The admin who canceled is named only in list previews, and never when
    /// it is the current user.
    pub fn reimbursement_dequeued_message(&self, action: &ReportAction, report: Option<&Report>, for_list: bool) -> String {
        let ActionPayload::ReimbursementDequeued(message) = &action.payload else {
            return String::new();
        };
        let amount = self.ctx.format_amount(message.amount, &message.currency);
        let manager_id = report.and_then(|r| r.manager_id);

        if message.cancellation_reason == CancellationReason::Admin {
            let manager = if self.ctx.is_current_user(manager_id) || !for_list {
                String::new()
            } else {
                self.ctx.display_name(manager_id, true)
            };
            return self.ctx.tr(Phrase::AdminCanceledRequest { manager, amount });
        }

        let submitter = self.ctx.display_name(report.and_then(|r| r.owner_account_id), true);
        self.ctx.tr(Phrase::CanceledRequest { submitter, amount })
    }

    pub fn deleted_parent_action_message(&self, action: &ReportAction) -> String {
        self.ctx.tr(if action.is_created_task_action() {
            Phrase::DeletedTask
        } else {
            Phrase::DeletedMessage
        })
    }

    /// Conversation-list text for a report, covering chats whose last action
    /// is a deleted parent with replies.
    pub fn report_last_visible_message(&self, report_id: &str) -> LastVisibleMessage {
        let actions = self.ctx.reports.report_actions(report_id);
        let last = last_visible_action(self.ctx.snapshot, actions.values());

        let is_chat = self.ctx.reports.report(report_id).is_some_and(|r| r.is_chat_report());
        if let Some(action) = last.as_ref().filter(|a| is_chat && a.is_deleted_parent_action()) {
            return LastVisibleMessage {
                text: self.deleted_parent_action_message(action),
                ..Default::default()
            };
        }
        last_visible_message(&self.ctx, last.as_ref())
    }

    /// Html for the whisper sent when someone mentions people outside the room.
    pub fn actionable_mention_whisper_message(&self, action: &ReportAction) -> String {
        let ActionPayload::ActionableMentionWhisper(message) = &action.payload else {
            return String::new();
        };
        let mentions: Vec<String> = message
            .invitee_account_ids
            .iter()
            .map(|&account_id| {
                let handle = self
                    .ctx
                    .effective_display_name(account_id)
                    .unwrap_or_else(|| self.ctx.tr(Phrase::Hidden));
                format!("<mention-user accountID={}>@{}</mention-user>", account_id, handle)
            })
            .collect();

        let joined = match mentions.split_last() {
            Some((last, rest)) if !rest.is_empty() => {
                format!("{} {} {}", rest.join(", "), self.ctx.tr(Phrase::ListAnd), last)
            }
            _ => mentions.concat(),
        };
        self.ctx.tr(Phrase::NotRoomMembers {
            mentions: joined,
            plural: mentions.len() > 1,
        })
    }

    pub fn modified_expense_text(&self, message: &ModifiedExpenseMessage) -> String {
        self.modified_expense.format(&self.ctx, message)
    }

    pub fn dismissed_violation_text(&self, message: &DismissedViolationMessage) -> String {
        self.ctx.tr(Phrase::ViolationDismissal {
            violation: message.violation_name.clone(),
            reason: message.reason.clone(),
        })
    }

    /// Legacy actions only carry pre-rendered fragments.
    pub fn old_dot_message(&self, action: &ReportAction) -> String {
        action.message_text()
    }

    /// Plain text of the first fragment, with mentions resolved. Memoized
    /// when a cache is attached.
    pub fn parse_html_to_text(&self, action: &ReportAction, report_id: &str, child_report_id: Option<&str>) -> String {
        let compute = || {
            let Some(fragment) = action.first_fragment() else {
                return String::new();
            };
            let html = fragment.html_or_empty();
            if html.is_empty() {
                return fragment.text.clone();
            }

            let mut names = self.ctx.snapshot.mention_names();
            for id in mentioned_report_ids(html) {
                if Some(id.as_str()) == child_report_id {
                    continue;
                }
                let name = self.ctx.reports.report(&id).map(|r| r.report_name).unwrap_or_default();
                names.reports.insert(id, name);
            }
            self.ctx.rich_text.html_to_text(html, &names)
        };

        match self.cache {
            Some(cache) => cache.get_or_insert_with(PreviewCache::key(report_id, action), compute),
            None => compute(),
        }
    }

    /// Plain-text rendering of any action.
    pub fn report_action_message(&self, action: &ReportAction, report_id: &str) -> String {
        if action.is_deleted_parent_action() {
            return self.deleted_parent_action_message(action);
        }

        match &action.payload {
            ActionPayload::Created | ActionPayload::Deprecated(_) | ActionPayload::Unsupported(_) => String::new(),
            ActionPayload::Hold => self.ctx.tr(Phrase::HeldExpense),
            ActionPayload::Unhold => self.ctx.tr(Phrase::UnheldExpense),
            ActionPayload::Submitted(_) | ActionPayload::Approved(_) | ActionPayload::OldDot(_) => {
                self.old_dot_message(action)
            }
            ActionPayload::ReimbursementQueued(_) => {
                self.reimbursement_queued_message(action, self.ctx.reports.report(report_id).as_ref(), false)
            }
            ActionPayload::ReimbursementDequeued(_) => {
                self.reimbursement_dequeued_message(action, self.ctx.reports.report(report_id).as_ref(), false)
            }
            ActionPayload::Iou(iou) => {
                let transaction = self.linked_transaction(action);
                if iou.iou_type == IouType::Pay || transaction.is_some() {
                    self.iou_report_action_display_message(action, transaction.as_ref())
                } else {
                    self.parse_html_to_text(action, report_id, action.child_report_id.as_deref())
                }
            }
            ActionPayload::ReportPreview(preview) => {
                let iou_report = self.ctx.reports.report(&preview.linked_report_id);
                if iou_report.is_none() {
                    return self.parse_html_to_text(action, report_id, None);
                }
                let iou_actions: Vec<ReportAction> = self
                    .ctx
                    .reports
                    .report_actions(&preview.linked_report_id)
                    .into_values()
                    .collect();
                let latest = most_recent_iou_request_action_id(&iou_actions)
                    .and_then(|id| iou_actions.iter().find(|a| a.report_action_id == id));
                let mode = PreviewMode {
                    for_parent_chat: true,
                    ..Default::default()
                };
                self.report_preview_message(iou_report.as_ref(), latest, mode, Some(action))
            }
            ActionPayload::ModifiedExpense(message) => self.modified_expense_text(message),
            ActionPayload::MemberChange(..) => member_change_plain_text(&self.ctx, action),
            ActionPayload::DismissedViolation(message) => self.dismissed_violation_text(message),
            ActionPayload::ActionableMentionWhisper(_) => {
                self.ctx.html_to_text(&self.actionable_mention_whisper_message(action))
            }
            ActionPayload::AddComment(_)
            | ActionPayload::Closed(_)
            | ActionPayload::MarkedReimbursed
            | ActionPayload::Renamed(_)
            | ActionPayload::Task(..)
            | ActionPayload::PolicyChangeLog(_)
            | ActionPayload::ActionableTrackExpenseWhisper(_)
            | ActionPayload::ActionableJoinRequest(_)
            | ActionPayload::Moved(_) => self.parse_html_to_text(action, report_id, action.child_report_id.as_deref()),
        }
    }

    /// Fragments stored on a new IOU report action.
    pub fn iou_report_action_message(&self, args: IouMessageArgs<'_>) -> Vec<MessageFragment> {
        let ctx = &self.ctx;
        let report = ctx.reports.report(args.iou_report_id);

        let iou_type = match args.kind {
            IouMessageKind::Submitted => return self.iou_submitted_message(report.as_ref()),
            IouMessageKind::Approved => None,
            IouMessageKind::Iou(iou_type) => Some(iou_type),
        };

        let amount = if iou_type == Some(IouType::Pay) {
            let total = report
                .as_ref()
                .map(|r| money_request_spend_breakdown(ctx, r).total_display)
                .unwrap_or_default();
            ctx.format_amount(total, args.currency)
        } else {
            ctx.format_amount(args.total, args.currency)
        };

        let payment_method = match args.payment_type {
            Some(PaymentType::Vbba | PaymentType::Expensify) => WALLET_SUFFIXES[0],
            _ => " elsewhere",
        };
        let for_comment = if args.comment.is_empty() {
            String::new()
        } else {
            format!(" for {}", args.comment)
        };

        let text = match iou_type {
            None => format!("approved {}", amount),
            Some(IouType::Create) => format!("submitted {}{}", amount, for_comment),
            Some(IouType::Track) => format!("tracking {}{}", amount, for_comment),
            Some(IouType::Split) => format!("split {}{}", amount, for_comment),
            Some(IouType::Delete) => format!("deleted the {} expense{}", amount, for_comment),
            Some(IouType::Pay) if args.is_settling_up => format!("paid {}{}", amount, payment_method),
            Some(IouType::Pay) => format!("sent {}{}{}", amount, for_comment, payment_method),
        };

        vec![MessageFragment::comment(escape_html(&text), text)]
    }

    fn iou_submitted_message(&self, report: Option<&Report>) -> Vec<MessageFragment> {
        let ctx = &self.ctx;
        let owner = report.and_then(|r| r.owner_account_id);
        let submits_to = ctx
            .policy(report.and_then(|r| r.policy_id.as_deref()))
            .and_then(|p| p.submits_to)
            .or(owner);

        let submitted_to = match submits_to {
            Some(id) if ctx.is_current_user(Some(id)) => "yourself".to_string(),
            Some(id) => {
                let name = ctx.display_name(Some(id), false);
                let login = ctx.login(id);
                if name != login && !login.is_empty() {
                    format!("{} ({})", name, login)
                } else {
                    name
                }
            }
            None => String::new(),
        };

        vec![
            MessageFragment::text("You", "strong"),
            MessageFragment::text(" submitted this report", "normal"),
            MessageFragment::text(" to ", "normal"),
            MessageFragment::text(submitted_to, "strong"),
        ]
    }
}
