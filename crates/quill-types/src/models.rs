use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

pub type AccountId = u64;

/// Reads an explicit `null` the same as a missing key.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Merchant placeholders the server writes before a receipt has been read.
pub const UNKNOWN_MERCHANT: &str = "Unknown Merchant";
pub const PARTIAL_TRANSACTION_MERCHANT: &str = "(none)";

// -- Pending state --

/// Marker carried by records that were written locally and not yet confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingAction {
    Add,
    Update,
    Delete,
}

// -- Reports --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[default]
    Chat,
    Expense,
    Iou,
    Invoice,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatType {
    #[serde(rename = "policyAdmins")]
    PolicyAdmins,
    #[serde(rename = "policyAnnounce")]
    PolicyAnnounce,
    #[serde(rename = "policyExpenseChat")]
    PolicyExpenseChat,
    #[serde(rename = "policyRoom")]
    PolicyRoom,
    #[serde(rename = "domainAll")]
    Domain,
    #[serde(rename = "selfDM")]
    SelfDm,
    #[serde(rename = "group")]
    Group,
    #[serde(rename = "invoice")]
    Invoice,
}

/// Lifecycle state of a report. Serialized as its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StateNum {
    #[default]
    Open = 0,
    Submitted = 1,
    Approved = 2,
    Billing = 3,
}

impl TryFrom<u8> for StateNum {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Open),
            1 => Ok(Self::Submitted),
            2 => Ok(Self::Approved),
            3 => Ok(Self::Billing),
            other => Err(format!("unknown report stateNum {}", other)),
        }
    }
}

impl From<StateNum> for u8 {
    fn from(value: StateNum) -> Self {
        value as u8
    }
}

/// Settlement status of a report. Serialized as its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StatusNum {
    #[default]
    Open = 0,
    Submitted = 1,
    Closed = 2,
    Approved = 3,
    Reimbursed = 4,
}

impl TryFrom<u8> for StatusNum {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Open),
            1 => Ok(Self::Submitted),
            2 => Ok(Self::Closed),
            3 => Ok(Self::Approved),
            4 => Ok(Self::Reimbursed),
            other => Err(format!("unknown report statusNum {}", other)),
        }
    }
}

impl From<StatusNum> for u8 {
    fn from(value: StatusNum) -> Self {
        value as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPreference {
    #[default]
    Always,
    Daily,
    Mute,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Participant {
    pub hidden: bool,
    pub role: Option<ParticipantRole>,
}

/// A conversation container. Threads point at their parent through
/// `parent_report_id` + `parent_report_action_id`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Report {
    #[serde(rename = "reportID")]
    pub report_id: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub chat_type: Option<ChatType>,
    #[serde(deserialize_with = "null_as_default")]
    pub report_name: String,
    pub description: String,
    #[serde(rename = "parentReportID")]
    pub parent_report_id: Option<String>,
    #[serde(rename = "parentReportActionID")]
    pub parent_report_action_id: Option<String>,
    #[serde(rename = "chatReportID")]
    pub chat_report_id: Option<String>,
    #[serde(rename = "iouReportID")]
    pub iou_report_id: Option<String>,
    #[serde(rename = "policyID")]
    pub policy_id: Option<String>,
    pub old_policy_name: String,
    #[serde(rename = "ownerAccountID")]
    pub owner_account_id: Option<AccountId>,
    #[serde(rename = "managerID")]
    pub manager_id: Option<AccountId>,
    pub state_num: StateNum,
    pub status_num: StatusNum,
    /// Stored in the smallest currency unit. Expense reports store spend as a negative value.
    #[serde(deserialize_with = "null_as_default")]
    pub total: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub non_reimbursable_total: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub currency: String,
    pub cached_total: Option<String>,
    pub is_waiting_on_bank_account: bool,
    pub is_own_policy_expense_chat: bool,
    pub is_pinned: bool,
    pub is_optimistic_report: bool,
    pub last_visible_action_created: Option<String>,
    pub last_read_time: Option<String>,
    pub last_message_text: Option<String>,
    #[serde(rename = "lastActorAccountID")]
    pub last_actor_account_id: Option<AccountId>,
    pub notification_preference: NotificationPreference,
    #[serde(deserialize_with = "null_as_default")]
    pub participants: BTreeMap<AccountId, Participant>,
    pub pending_action: Option<PendingAction>,
}

impl Report {
    pub fn is_chat_report(&self) -> bool {
        self.report_type == ReportType::Chat
    }

    pub fn is_expense_report(&self) -> bool {
        self.report_type == ReportType::Expense
    }

    pub fn is_iou_report(&self) -> bool {
        self.report_type == ReportType::Iou
    }

    pub fn is_invoice_report(&self) -> bool {
        self.report_type == ReportType::Invoice
    }

    pub fn is_task_report(&self) -> bool {
        self.report_type == ReportType::Task
    }

    /// IOU or expense report.
    pub fn is_money_request_report(&self) -> bool {
        self.is_iou_report() || self.is_expense_report()
    }

    pub fn is_thread(&self) -> bool {
        self.parent_report_id.is_some() && self.parent_report_action_id.is_some()
    }

    pub fn is_self_dm(&self) -> bool {
        self.chat_type == Some(ChatType::SelfDm)
    }

    pub fn is_policy_expense_chat(&self) -> bool {
        self.chat_type == Some(ChatType::PolicyExpenseChat)
    }

    pub fn is_report_approved(&self) -> bool {
        self.state_num == StateNum::Approved && self.status_num == StatusNum::Approved
    }

    pub fn is_open_expense_report(&self) -> bool {
        self.is_expense_report() && self.state_num == StateNum::Open && self.status_num == StatusNum::Open
    }

    /// A report waiting on the payee's bank account is not settled yet.
    pub fn is_settled(&self) -> bool {
        if self.is_waiting_on_bank_account {
            return false;
        }
        self.status_num == StatusNum::Reimbursed
    }
}

// -- Transactions --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptState {
    #[default]
    Open,
    ScanReady,
    Scanning,
    ScanComplete,
    ScanFailed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Receipt {
    pub state: ReceiptState,
    pub source: Option<String>,
}

/// An expense line item referenced by money-request actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    #[serde(rename = "reportID")]
    pub report_id: String,
    pub amount: i64,
    pub currency: String,
    pub merchant: String,
    pub comment: String,
    pub created: String,
    pub category: String,
    pub tag: String,
    pub billable: bool,
    pub reimbursable: bool,
    pub receipt: Option<Receipt>,
    pub is_fetching_waypoints: bool,
    pub is_on_hold: bool,
    pub pending_action: Option<PendingAction>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            transaction_id: String::new(),
            report_id: String::new(),
            amount: 0,
            currency: String::new(),
            merchant: String::new(),
            comment: String::new(),
            created: String::new(),
            category: String::new(),
            tag: String::new(),
            billable: false,
            reimbursable: true,
            receipt: None,
            is_fetching_waypoints: false,
            is_on_hold: false,
            pending_action: None,
        }
    }
}

impl Transaction {
    pub fn has_receipt(&self) -> bool {
        self.receipt.is_some()
    }

    pub fn is_receipt_being_scanned(&self) -> bool {
        matches!(
            self.receipt.as_ref().map(|r| r.state),
            Some(ReceiptState::ScanReady | ReceiptState::Scanning)
        )
    }

    pub fn is_merchant_missing(&self) -> bool {
        self.merchant.is_empty() || self.merchant == UNKNOWN_MERCHANT || self.merchant == PARTIAL_TRANSACTION_MERCHANT
    }

    pub fn is_amount_missing(&self) -> bool {
        self.amount == 0
    }

    pub fn is_created_missing(&self) -> bool {
        self.created.is_empty()
    }

    /// A scanned receipt that came back without merchant, amount or date.
    pub fn has_missing_smartscan_fields(&self) -> bool {
        self.has_receipt()
            && !self.is_receipt_being_scanned()
            && (self.is_merchant_missing() || self.is_amount_missing() || self.is_created_missing())
    }

    /// Display amount. Expense reports store amounts negated, IOU reports store them unsigned.
    pub fn amount_for(&self, is_from_expense_report: bool) -> i64 {
        if !is_from_expense_report {
            return self.amount.abs();
        }
        if self.amount == 0 { 0 } else { -self.amount }
    }
}

// -- Identity and policies --

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalDetails {
    #[serde(rename = "accountID")]
    pub account_id: AccountId,
    pub login: String,
    pub display_name: String,
    pub first_name: String,
    pub avatar: Option<String>,
    pub is_optimistic_personal_detail: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    #[default]
    Personal,
    Team,
    Corporate,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    pub is_instant_submit: bool,
    pub submits_to: Option<AccountId>,
}

impl Policy {
    /// Collect and Control workspaces.
    pub fn is_paid_group(&self) -> bool {
        matches!(self.policy_type, PolicyType::Team | PolicyType::Corporate)
    }
}
