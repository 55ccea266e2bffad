use std::collections::HashMap;

use quill_types::{AccountId, PersonalDetails, Policy, Report, ReportAction};

use crate::config::EngineConfig;
use crate::phrase::{EnglishLocalizer, Localizer, Phrase};
use crate::rich_text::{BasicRichText, MentionNames, RichText};
use crate::source::{ReportSource, TransactionSource};

static ENGLISH: EnglishLocalizer = EnglishLocalizer;
static BASIC_RICH_TEXT: BasicRichText = BasicRichText;

/// Session state the engine reads but never writes. The host refreshes it.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub current_account_id: AccountId,
    pub current_email: String,
    pub is_offline: bool,
    pub environment_url: String,
    pub personal_details: HashMap<AccountId, PersonalDetails>,
    pub policies: HashMap<String, Policy>,
}

impl Snapshot {
    pub fn new(current_account_id: AccountId, current_email: impl Into<String>) -> Self {
        Self {
            current_account_id,
            current_email: current_email.into(),
            ..Default::default()
        }
    }

    pub fn with_person(mut self, details: PersonalDetails) -> Self {
        self.personal_details.insert(details.account_id, details);
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policies.insert(policy.id.clone(), policy);
        self
    }

    pub fn is_current_user(&self, account_id: Option<AccountId>) -> bool {
        account_id == Some(self.current_account_id)
    }

    pub fn mention_names(&self) -> MentionNames {
        MentionNames {
            accounts: self
                .personal_details
                .iter()
                .map(|(id, details)| (*id, effective_name(details)))
                .collect(),
            reports: HashMap::new(),
        }
    }
}

fn effective_name(details: &PersonalDetails) -> String {
    if details.display_name.is_empty() {
        details.login.clone()
    } else {
        details.display_name.clone()
    }
}

/// Everything a read or write operation needs, passed explicitly.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub snapshot: &'a Snapshot,
    pub reports: &'a dyn ReportSource,
    pub transactions: &'a dyn TransactionSource,
    pub localizer: &'a dyn Localizer,
    pub rich_text: &'a dyn RichText,
    pub config: &'a EngineConfig,
}

impl<'a> Context<'a> {
    pub fn new(
        snapshot: &'a Snapshot,
        reports: &'a dyn ReportSource,
        transactions: &'a dyn TransactionSource,
    ) -> Self {
        Self {
            snapshot,
            reports,
            transactions,
            localizer: &ENGLISH,
            rich_text: &BASIC_RICH_TEXT,
            config: &EngineConfig::DEFAULT,
        }
    }

    pub fn with_localizer(mut self, localizer: &'a dyn Localizer) -> Self {
        self.localizer = localizer;
        self
    }

    pub fn with_rich_text(mut self, rich_text: &'a dyn RichText) -> Self {
        self.rich_text = rich_text;
        self
    }

    pub fn with_config(mut self, config: &'a EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn current_account_id(&self) -> AccountId {
        self.snapshot.current_account_id
    }

    pub fn is_current_user(&self, account_id: Option<AccountId>) -> bool {
        self.snapshot.is_current_user(account_id)
    }

    pub fn was_action_taken_by_current_user(&self, action: &ReportAction) -> bool {
        self.is_current_user(action.actor_account_id)
    }

    pub fn tr(&self, phrase: Phrase) -> String {
        self.localizer.translate(&phrase)
    }

    pub fn format_amount(&self, amount: i64, currency: &str) -> String {
        self.localizer.format_amount(amount, currency)
    }

    /// Display name or login, `None` when the person is unknown.
    pub fn effective_display_name(&self, account_id: AccountId) -> Option<String> {
        self.snapshot
            .personal_details
            .get(&account_id)
            .map(effective_name)
            .filter(|name| !name.is_empty())
    }

    /// Name for a participant. The short form prefers the first name.
    pub fn display_name(&self, account_id: Option<AccountId>, short: bool) -> String {
        let Some(details) = account_id.and_then(|id| self.snapshot.personal_details.get(&id)) else {
            return String::new();
        };
        if short && !details.first_name.is_empty() {
            return details.first_name.clone();
        }
        effective_name(details)
    }

    pub fn login(&self, account_id: AccountId) -> String {
        self.snapshot
            .personal_details
            .get(&account_id)
            .map(|d| d.login.clone())
            .unwrap_or_default()
    }

    pub fn policy(&self, policy_id: Option<&str>) -> Option<&'a Policy> {
        policy_id.and_then(|id| self.snapshot.policies.get(id))
    }

    /// Workspace name for a report, falling back to the name stored on the report.
    pub fn policy_name(&self, report: &Report) -> String {
        match self.policy(report.policy_id.as_deref()) {
            Some(policy) if !policy.name.is_empty() => policy.name.clone(),
            _ => report.old_policy_name.clone(),
        }
    }

    pub fn is_paid_group_policy(&self, report: &Report) -> bool {
        self.policy(report.policy_id.as_deref()).is_some_and(Policy::is_paid_group)
    }

    pub fn html_to_text(&self, html: &str) -> String {
        self.rich_text.html_to_text(html, &self.snapshot.mention_names())
    }
}
