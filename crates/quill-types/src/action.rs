use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{AccountId, PendingAction, null_as_default};

/// Wire names of every action kind the client knows about.
pub mod names {
    pub const CREATED: &str = "CREATED";
    pub const ADD_COMMENT: &str = "ADDCOMMENT";
    pub const IOU: &str = "IOU";
    pub const REPORT_PREVIEW: &str = "REPORTPREVIEW";
    pub const MODIFIED_EXPENSE: &str = "MODIFIEDEXPENSE";
    pub const SUBMITTED: &str = "SUBMITTED";
    pub const APPROVED: &str = "APPROVED";
    pub const REIMBURSEMENT_QUEUED: &str = "REIMBURSEMENTQUEUED";
    pub const REIMBURSEMENT_DEQUEUED: &str = "REIMBURSEMENTDEQUEUED";
    pub const CLOSED: &str = "CLOSED";
    pub const MARKED_REIMBURSED: &str = "MARKEDREIMBURSED";
    pub const RENAMED: &str = "RENAMED";
    pub const HOLD: &str = "HOLD";
    pub const UNHOLD: &str = "UNHOLD";
    pub const TASK_COMPLETED: &str = "TASKCOMPLETED";
    pub const TASK_REOPENED: &str = "TASKREOPENED";
    pub const TASK_CANCELLED: &str = "TASKCANCELLED";
    pub const TASK_EDITED: &str = "TASKEDITED";
    pub const TASK_REASSIGNED: &str = "TASKREASSIGNED";
    pub const ROOM_INVITE: &str = "INVITETOROOM";
    pub const ROOM_REMOVE: &str = "REMOVEFROMROOM";
    pub const POLICY_INVITE: &str = "POLICYCHANGELOG_INVITETOROOM";
    pub const POLICY_REMOVE: &str = "POLICYCHANGELOG_REMOVEFROMROOM";
    pub const POLICY_LEAVE: &str = "POLICYCHANGELOG_LEAVEPOLICY";
    pub const POLICY_CHANGE_LOG_PREFIX: &str = "POLICYCHANGELOG_";
    pub const DISMISSED_VIOLATION: &str = "DISMISSEDVIOLATION";
    pub const ACTIONABLE_MENTION_WHISPER: &str = "ACTIONABLEMENTIONWHISPER";
    pub const ACTIONABLE_TRACK_EXPENSE_WHISPER: &str = "ACTIONABLETRACKEXPENSEWHISPER";
    pub const ACTIONABLE_JOIN_REQUEST: &str = "ACTIONABLEJOINREQUEST";
    pub const MOVED: &str = "MOVED";

    /// Kinds that are still stored but must never be shown.
    pub const DEPRECATED: [&str; 4] = [
        "DELETEDACCOUNT",
        "REIMBURSEMENTREQUESTED",
        "REIMBURSEMENTSETUPREQUESTED",
        "DONATION",
    ];

    /// Kinds produced by the legacy web app. Their message is rendered from the fragments alone.
    pub const OLD_DOT: [&str; 24] = [
        "CHANGEFIELD",
        "CHANGEPOLICY",
        "CHANGETYPE",
        "DELEGATESUBMIT",
        "EXPORTEDTOCSV",
        "EXPORTEDTOINTEGRATION",
        "EXPORTEDTOQUICKBOOKS",
        "FORWARDED",
        "INTEGRATIONSMESSAGE",
        "MANAGERATTACHRECEIPT",
        "MANAGERDETACHRECEIPT",
        "MARKREIMBURSEDFROMINTEGRATION",
        "OUTDATEDBANKACCOUNT",
        "REIMBURSEMENTACHBOUNCE",
        "REIMBURSEMENTACHCANCELLED",
        "REIMBURSEMENTACCOUNTCHANGED",
        "REIMBURSEMENTDELAYED",
        "REIMBURSEMENTSETUP",
        "SELECTEDFORRANDOMAUDIT",
        "SHARE",
        "STRIPEPAID",
        "TAKECONTROL",
        "UNAPPROVED",
        "UNSHARE",
    ];
}

// -- Message fragments --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FragmentKind {
    #[default]
    Comment,
    Text,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationDecision {
    pub decision: String,
}

pub const PENDING_REMOVE: &str = "pendingRemove";
pub const ATTACHMENT_TRANSLATION_KEY: &str = "attachment";

/// One rendered piece of an action's message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageFragment {
    #[serde(rename = "type")]
    pub kind: FragmentKind,
    /// `Some("")` marks a legacy deleted comment, so absence and emptiness are kept apart.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_edited: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_deleted_parent_action: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_reversed_transaction: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation_decision: Option<ModerationDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_key: Option<String>,
    #[serde(rename = "taskReportID", skip_serializing_if = "Option::is_none")]
    pub task_report_id: Option<String>,
}

impl MessageFragment {
    pub fn comment(html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Comment,
            html: Some(html.into()),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>, style: &str) -> Self {
        Self {
            kind: FragmentKind::Text,
            text: text.into(),
            style: Some(style.to_string()),
            ..Default::default()
        }
    }

    pub fn html_or_empty(&self) -> &str {
        self.html.as_deref().unwrap_or("")
    }

    pub fn is_attachment(&self) -> bool {
        self.translation_key.as_deref() == Some(ATTACHMENT_TRANSLATION_KEY)
            || self.html_or_empty().contains("data-expensify-source")
    }
}

// -- Original messages, one shape per kind --

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentMessage {
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(rename = "taskReportID", skip_serializing_if = "Option::is_none")]
    pub task_report_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IouType {
    #[default]
    Create,
    Split,
    Pay,
    Track,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    Elsewhere,
    Expensify,
    #[serde(rename = "ACH")]
    Vbba,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IouDetails {
    pub amount: i64,
    pub comment: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IouMessage {
    #[serde(rename = "type")]
    pub iou_type: IouType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "IOUTransactionID", skip_serializing_if = "Option::is_none")]
    pub iou_transaction_id: Option<String>,
    #[serde(rename = "IOUReportID", skip_serializing_if = "Option::is_none")]
    pub iou_report_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<PaymentType>,
    #[serde(rename = "IOUDetails", skip_serializing_if = "Option::is_none")]
    pub iou_details: Option<IouDetails>,
    #[serde(rename = "participantAccountIDs", skip_serializing_if = "Vec::is_empty")]
    pub participant_account_ids: Vec<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportPreviewMessage {
    #[serde(rename = "linkedReportID")]
    pub linked_report_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// Field-by-field diff of an edited expense. Unchanged fields stay `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModifiedExpenseMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_merchant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_billable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billable: Option<String>,
}

impl ModifiedExpenseMessage {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmountMessage {
    pub amount: i64,
    pub currency: String,
    #[serde(rename = "expenseReportID", skip_serializing_if = "Option::is_none")]
    pub expense_report_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReimbursementQueuedMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<PaymentType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CancellationReason {
    #[serde(rename = "CANCEL_REASON_ADMIN")]
    Admin,
    #[default]
    #[serde(rename = "CANCEL_REASON_PAYMENT_EXPIRED")]
    PaymentExpired,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReimbursementDequeuedMessage {
    pub cancellation_reason: CancellationReason,
    #[serde(rename = "expenseReportID", skip_serializing_if = "Option::is_none")]
    pub expense_report_id: Option<String>,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClosedMessage {
    pub policy_name: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenamedMessage {
    pub old_name: String,
    pub new_name: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskEvent {
    Completed,
    Reopened,
    Cancelled,
    Edited,
    Reassigned,
}

impl TaskEvent {
    pub fn action_name(self) -> &'static str {
        match self {
            Self::Completed => names::TASK_COMPLETED,
            Self::Reopened => names::TASK_REOPENED,
            Self::Cancelled => names::TASK_CANCELLED,
            Self::Edited => names::TASK_EDITED,
            Self::Reassigned => names::TASK_REASSIGNED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskMessage {
    #[serde(rename = "taskReportID")]
    pub task_report_id: String,
    pub html: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberChangeKind {
    RoomInvite,
    RoomRemove,
    PolicyInvite,
    PolicyRemove,
    PolicyLeave,
}

impl MemberChangeKind {
    pub fn action_name(self) -> &'static str {
        match self {
            Self::RoomInvite => names::ROOM_INVITE,
            Self::RoomRemove => names::ROOM_REMOVE,
            Self::PolicyInvite => names::POLICY_INVITE,
            Self::PolicyRemove => names::POLICY_REMOVE,
            Self::PolicyLeave => names::POLICY_LEAVE,
        }
    }

    pub fn is_invite(self) -> bool {
        matches!(self, Self::RoomInvite | Self::PolicyInvite)
    }

    pub fn is_leave(self) -> bool {
        self == Self::PolicyLeave
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeLogMessage {
    #[serde(rename = "targetAccountIDs")]
    pub target_account_ids: Vec<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    #[serde(rename = "reportID", skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DismissedViolationMessage {
    pub reason: String,
    pub violation_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MentionWhisperMessage {
    #[serde(rename = "inviteeAccountIDs")]
    pub invitee_account_ids: Vec<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackExpenseWhisperMessage {
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinRequestMessage {
    pub choice: String,
    #[serde(rename = "accountID")]
    pub account_id: AccountId,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MovedMessage {
    #[serde(rename = "fromPolicyID", skip_serializing_if = "Option::is_none")]
    pub from_policy_id: Option<String>,
    #[serde(rename = "toPolicyID")]
    pub to_policy_id: String,
    #[serde(rename = "newParentReportID")]
    pub new_parent_report_id: String,
    #[serde(rename = "movedReportID")]
    pub moved_report_id: String,
}

// -- Payload --

/// The kind of an action together with its kind-specific original message.
///
/// Serialized as the `actionName` / `originalMessage` pair. Names that are not
/// recognised land in `Unsupported` and names whose message fails to decode are
/// treated the same way, so a single odd record never poisons a whole report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPayload", into = "RawPayload")]
pub enum ActionPayload {
    Created,
    AddComment(CommentMessage),
    Iou(IouMessage),
    ReportPreview(ReportPreviewMessage),
    ModifiedExpense(ModifiedExpenseMessage),
    Submitted(AmountMessage),
    Approved(AmountMessage),
    ReimbursementQueued(ReimbursementQueuedMessage),
    ReimbursementDequeued(ReimbursementDequeuedMessage),
    Closed(ClosedMessage),
    MarkedReimbursed,
    Renamed(RenamedMessage),
    Hold,
    Unhold,
    Task(TaskEvent, TaskMessage),
    MemberChange(MemberChangeKind, ChangeLogMessage),
    PolicyChangeLog(String),
    DismissedViolation(DismissedViolationMessage),
    ActionableMentionWhisper(MentionWhisperMessage),
    ActionableTrackExpenseWhisper(TrackExpenseWhisperMessage),
    ActionableJoinRequest(JoinRequestMessage),
    Moved(MovedMessage),
    OldDot(String),
    Deprecated(String),
    Unsupported(String),
}

impl Default for ActionPayload {
    fn default() -> Self {
        Self::Unsupported(String::new())
    }
}

impl ActionPayload {
    pub fn action_name(&self) -> &str {
        match self {
            Self::Created => names::CREATED,
            Self::AddComment(_) => names::ADD_COMMENT,
            Self::Iou(_) => names::IOU,
            Self::ReportPreview(_) => names::REPORT_PREVIEW,
            Self::ModifiedExpense(_) => names::MODIFIED_EXPENSE,
            Self::Submitted(_) => names::SUBMITTED,
            Self::Approved(_) => names::APPROVED,
            Self::ReimbursementQueued(_) => names::REIMBURSEMENT_QUEUED,
            Self::ReimbursementDequeued(_) => names::REIMBURSEMENT_DEQUEUED,
            Self::Closed(_) => names::CLOSED,
            Self::MarkedReimbursed => names::MARKED_REIMBURSED,
            Self::Renamed(_) => names::RENAMED,
            Self::Hold => names::HOLD,
            Self::Unhold => names::UNHOLD,
            Self::Task(event, _) => event.action_name(),
            Self::MemberChange(kind, _) => kind.action_name(),
            Self::DismissedViolation(_) => names::DISMISSED_VIOLATION,
            Self::ActionableMentionWhisper(_) => names::ACTIONABLE_MENTION_WHISPER,
            Self::ActionableTrackExpenseWhisper(_) => names::ACTIONABLE_TRACK_EXPENSE_WHISPER,
            Self::ActionableJoinRequest(_) => names::ACTIONABLE_JOIN_REQUEST,
            Self::Moved(_) => names::MOVED,
            Self::PolicyChangeLog(name) | Self::OldDot(name) | Self::Deprecated(name) | Self::Unsupported(name) => name,
        }
    }

    fn original_message(&self) -> Value {
        let encoded = match self {
            Self::AddComment(m) => serde_json::to_value(m),
            Self::Iou(m) => serde_json::to_value(m),
            Self::ReportPreview(m) => serde_json::to_value(m),
            Self::ModifiedExpense(m) => serde_json::to_value(m),
            Self::Submitted(m) | Self::Approved(m) => serde_json::to_value(m),
            Self::ReimbursementQueued(m) => serde_json::to_value(m),
            Self::ReimbursementDequeued(m) => serde_json::to_value(m),
            Self::Closed(m) => serde_json::to_value(m),
            Self::Renamed(m) => serde_json::to_value(m),
            Self::Task(_, m) => serde_json::to_value(m),
            Self::MemberChange(_, m) => serde_json::to_value(m),
            Self::DismissedViolation(m) => serde_json::to_value(m),
            Self::ActionableMentionWhisper(m) => serde_json::to_value(m),
            Self::ActionableTrackExpenseWhisper(m) => serde_json::to_value(m),
            Self::ActionableJoinRequest(m) => serde_json::to_value(m),
            Self::Moved(m) => serde_json::to_value(m),
            Self::Created
            | Self::MarkedReimbursed
            | Self::Hold
            | Self::Unhold
            | Self::PolicyChangeLog(_)
            | Self::OldDot(_)
            | Self::Deprecated(_)
            | Self::Unsupported(_) => return Value::Null,
        };
        encoded.unwrap_or_default()
    }
}

/// The stored shape of a payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPayload {
    action_name: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    original_message: Value,
}

fn decode<T: serde::de::DeserializeOwned + Default>(message: Value) -> Option<T> {
    if message.is_null() {
        return Some(T::default());
    }
    serde_json::from_value(message).ok()
}

impl From<RawPayload> for ActionPayload {
    fn from(raw: RawPayload) -> Self {
        let RawPayload {
            action_name: name,
            original_message: message,
        } = raw;

        let task = |event: TaskEvent, message: Value| decode(message).map(|m| Self::Task(event, m));
        let member = |kind: MemberChangeKind, message: Value| decode(message).map(|m| Self::MemberChange(kind, m));

        let decoded = match name.as_str() {
            names::CREATED => Some(Self::Created),
            names::ADD_COMMENT => decode(message).map(Self::AddComment),
            names::IOU => decode(message).map(Self::Iou),
            names::REPORT_PREVIEW => decode(message).map(Self::ReportPreview),
            names::MODIFIED_EXPENSE => decode(message).map(Self::ModifiedExpense),
            names::SUBMITTED => decode(message).map(Self::Submitted),
            names::APPROVED => decode(message).map(Self::Approved),
            names::REIMBURSEMENT_QUEUED => decode(message).map(Self::ReimbursementQueued),
            names::REIMBURSEMENT_DEQUEUED => decode(message).map(Self::ReimbursementDequeued),
            names::CLOSED => decode(message).map(Self::Closed),
            names::MARKED_REIMBURSED => Some(Self::MarkedReimbursed),
            names::RENAMED => decode(message).map(Self::Renamed),
            names::HOLD => Some(Self::Hold),
            names::UNHOLD => Some(Self::Unhold),
            names::TASK_COMPLETED => task(TaskEvent::Completed, message),
            names::TASK_REOPENED => task(TaskEvent::Reopened, message),
            names::TASK_CANCELLED => task(TaskEvent::Cancelled, message),
            names::TASK_EDITED => task(TaskEvent::Edited, message),
            names::TASK_REASSIGNED => task(TaskEvent::Reassigned, message),
            names::ROOM_INVITE => member(MemberChangeKind::RoomInvite, message),
            names::ROOM_REMOVE => member(MemberChangeKind::RoomRemove, message),
            names::POLICY_INVITE => member(MemberChangeKind::PolicyInvite, message),
            names::POLICY_REMOVE => member(MemberChangeKind::PolicyRemove, message),
            names::POLICY_LEAVE => member(MemberChangeKind::PolicyLeave, message),
            names::DISMISSED_VIOLATION => decode(message).map(Self::DismissedViolation),
            names::ACTIONABLE_MENTION_WHISPER => decode(message).map(Self::ActionableMentionWhisper),
            names::ACTIONABLE_TRACK_EXPENSE_WHISPER => decode(message).map(Self::ActionableTrackExpenseWhisper),
            names::ACTIONABLE_JOIN_REQUEST => decode(message).map(Self::ActionableJoinRequest),
            names::MOVED => decode(message).map(Self::Moved),
            other if names::DEPRECATED.contains(&other) => Some(Self::Deprecated(name.clone())),
            other if names::OLD_DOT.contains(&other) => Some(Self::OldDot(name.clone())),
            other if other.starts_with(names::POLICY_CHANGE_LOG_PREFIX) => Some(Self::PolicyChangeLog(name.clone())),
            _ => None,
        };
        decoded.unwrap_or(Self::Unsupported(name))
    }
}

impl From<ActionPayload> for RawPayload {
    fn from(payload: ActionPayload) -> Self {
        Self {
            action_name: payload.action_name().to_string(),
            original_message: payload.original_message(),
        }
    }
}

// -- Actions --

/// One event inside a report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportAction {
    #[serde(rename = "reportActionID")]
    pub report_action_id: String,
    #[serde(rename = "reportID", skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
    #[serde(flatten)]
    pub payload: ActionPayload,
    /// `YYYY-MM-DD HH:MM:SS.mmm`, ordered lexicographically.
    pub created: String,
    #[serde(rename = "actorAccountID", skip_serializing_if = "Option::is_none")]
    pub actor_account_id: Option<AccountId>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub person: Vec<MessageFragment>,
    #[serde(rename = "previousReportActionID", skip_serializing_if = "Option::is_none")]
    pub previous_report_action_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub message: Vec<MessageFragment>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub whispered_to: Vec<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
    #[serde(skip_serializing_if = "std::ops::Not::not", deserialize_with = "null_as_default")]
    pub is_optimistic_action: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "null_as_default")]
    pub errors: BTreeMap<String, Value>,
    #[serde(rename = "delegateAccountID", skip_serializing_if = "Option::is_none")]
    pub delegate_account_id: Option<AccountId>,
    #[serde(rename = "adminAccountID", skip_serializing_if = "Option::is_none")]
    pub admin_account_id: Option<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_attachment: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not", deserialize_with = "null_as_default")]
    pub should_show: bool,

    // Linkage to the thread started from this action.
    #[serde(rename = "childReportID", skip_serializing_if = "Option::is_none")]
    pub child_report_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_report_name: Option<String>,
    #[serde(rename = "childManagerAccountID", skip_serializing_if = "Option::is_none")]
    pub child_manager_account_id: Option<AccountId>,
    #[serde(deserialize_with = "null_as_default")]
    pub child_visible_action_count: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub child_commenter_count: u32,
    #[serde(
        rename = "childOldestFourAccountIDs",
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub child_oldest_four_account_ids: Vec<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_last_visible_action_created: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub child_money_request_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_last_money_request_comment: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "null_as_default")]
    pub child_recent_receipt_transaction_ids: BTreeMap<String, String>,
}

impl ReportAction {
    pub fn action_name(&self) -> &str {
        self.payload.action_name()
    }

    pub fn first_fragment(&self) -> Option<&MessageFragment> {
        self.message.first()
    }

    /// Concatenated text of every fragment.
    pub fn message_text(&self) -> String {
        self.message.iter().map(|f| f.text.as_str()).collect()
    }

    pub fn message_html(&self) -> &str {
        self.first_fragment().map(MessageFragment::html_or_empty).unwrap_or("")
    }

    pub fn iou(&self) -> Option<&IouMessage> {
        match &self.payload {
            ActionPayload::Iou(m) => Some(m),
            _ => None,
        }
    }

    fn iou_type(&self) -> Option<IouType> {
        self.iou().map(|m| m.iou_type)
    }

    pub fn is_created(&self) -> bool {
        matches!(self.payload, ActionPayload::Created)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.payload, ActionPayload::Closed(_))
    }

    pub fn is_renamed(&self) -> bool {
        matches!(self.payload, ActionPayload::Renamed(_))
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.payload, ActionPayload::Submitted(_))
    }

    pub fn is_report_preview(&self) -> bool {
        matches!(self.payload, ActionPayload::ReportPreview(_))
    }

    pub fn is_money_request(&self) -> bool {
        matches!(self.payload, ActionPayload::Iou(_))
    }

    pub fn is_modified_expense(&self) -> bool {
        matches!(self.payload, ActionPayload::ModifiedExpense(_))
    }

    pub fn is_room_invite(&self) -> bool {
        matches!(self.payload, ActionPayload::MemberChange(MemberChangeKind::RoomInvite, _))
    }

    pub fn is_member_change(&self) -> bool {
        matches!(self.payload, ActionPayload::MemberChange(..))
    }

    pub fn is_whisper(&self) -> bool {
        !self.whispered_to.is_empty()
    }

    pub fn is_pending_delete(&self) -> bool {
        self.pending_action == Some(PendingAction::Delete)
    }

    /// Written locally and not yet acknowledged by the server.
    pub fn is_optimistic(&self) -> bool {
        self.is_optimistic_action || matches!(self.pending_action, Some(PendingAction::Add | PendingAction::Delete))
    }

    /// Empty message, a legacy empty html fragment, or a deletion timestamp.
    pub fn is_deleted(&self) -> bool {
        match self.first_fragment() {
            None => true,
            Some(fragment) => fragment.html.as_deref() == Some("") || fragment.deleted.is_some(),
        }
    }

    pub fn is_deleted_parent_action(&self) -> bool {
        self.first_fragment().is_some_and(|f| f.is_deleted_parent_action) && self.child_visible_action_count > 0
    }

    pub fn is_reversed_transaction(&self) -> bool {
        self.first_fragment().is_some_and(|f| f.is_reversed_transaction) && self.child_visible_action_count > 0
    }

    /// The first fragment carries the deleted-parent marker regardless of replies.
    pub fn is_message_deleted(&self) -> bool {
        self.first_fragment().is_some_and(|f| f.is_deleted_parent_action)
    }

    pub fn is_pending_remove(&self) -> bool {
        self.first_fragment()
            .and_then(|f| f.moderation_decision.as_ref())
            .is_some_and(|d| d.decision == PENDING_REMOVE)
    }

    pub fn is_attachment_action(&self) -> bool {
        match self.is_attachment {
            Some(flag) => flag,
            None => self.first_fragment().is_some_and(MessageFragment::is_attachment),
        }
    }

    pub fn is_split_bill_action(&self) -> bool {
        self.iou_type() == Some(IouType::Split)
    }

    pub fn is_track_expense_action(&self) -> bool {
        self.iou_type() == Some(IouType::Track)
    }

    pub fn is_pay_action(&self) -> bool {
        self.iou_type() == Some(IouType::Pay)
    }

    /// A pay action that carried its own amount, i.e. money sent without a prior request.
    pub fn is_sent_money_action(&self) -> bool {
        self.iou().is_some_and(|m| m.iou_type == IouType::Pay && m.iou_details.is_some())
    }

    /// Whether a report whose parent is this action is a transaction thread.
    pub fn is_transaction_thread(&self) -> bool {
        self.iou().is_some_and(|m| match m.iou_type {
            IouType::Create | IouType::Track => true,
            IouType::Pay => m.iou_details.is_some(),
            IouType::Split | IouType::Delete => false,
        })
    }

    /// System messages for task status changes.
    pub fn is_task_action(&self) -> bool {
        matches!(
            self.payload,
            ActionPayload::Task(
                TaskEvent::Completed | TaskEvent::Reopened | TaskEvent::Cancelled | TaskEvent::Edited,
                _
            )
        )
    }

    pub fn is_created_task_action(&self) -> bool {
        matches!(&self.payload, ActionPayload::AddComment(m) if m.task_report_id.is_some())
    }

    pub fn is_thread_parent_message(&self, report_id: &str) -> bool {
        self.child_type.as_deref() == Some("chat")
            && (self.child_visible_action_count > 0 || self.child_report_id.as_deref() == Some(report_id))
    }

    pub fn is_actionable_track_expense(&self) -> bool {
        matches!(self.payload, ActionPayload::ActionableTrackExpenseWhisper(_))
    }

    pub fn is_resolved_track_expense(&self) -> bool {
        matches!(&self.payload, ActionPayload::ActionableTrackExpenseWhisper(m) if m.resolution.is_some())
    }

    pub fn is_actionable_join_request_pending(&self) -> bool {
        matches!(&self.payload, ActionPayload::ActionableJoinRequest(m) if m.choice.is_empty())
    }

    pub fn linked_transaction_id(&self) -> Option<&str> {
        self.iou().and_then(|m| m.iou_transaction_id.as_deref())
    }

    /// IOU report referenced by a preview action.
    pub fn linked_report_id(&self) -> Option<&str> {
        match &self.payload {
            ActionPayload::ReportPreview(m) => Some(m.linked_report_id.as_str()),
            _ => None,
        }
    }
}
