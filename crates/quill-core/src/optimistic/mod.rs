//! Provisional records for local edits that have not reached the server.
//!
//! Every action built here carries a generated id, a pending `Add` marker and
//! the current user as author. Messages come from [`PreviewComposer`], so a
//! provisional record renders exactly like its confirmed counterpart.

pub mod batch;
pub mod expense;
pub mod reports;
pub mod thread;

use quill_types::action::{
    ActionPayload, ClosedMessage, CommentMessage, DismissedViolationMessage, FragmentKind, MessageFragment,
    MovedMessage, RenamedMessage, TaskEvent, TaskMessage, ATTACHMENT_TRANSLATION_KEY,
};
use quill_types::{AccountId, PendingAction, ReportAction};
use tracing::debug;

use crate::context::Context;
use crate::ids::IdGenerator;
use crate::preview::PreviewComposer;
use crate::rich_text::escape_html;
use crate::time::Clock;

pub use batch::{MoneyRequest, MoneyRequestArgs};
pub use expense::{IouActionArgs, TransactionChanges};
pub use reports::{ChatReportArgs, MoneyRequestEntities, MoneyRequestEntityArgs};
pub use thread::{ChildCounters, parent_action_updates};

/// Placeholder shown while an attachment uploads.
pub const ATTACHMENT_UPLOADING_HTML: &str = "Uploading attachment...";

pub const DEFAULT_CLOSE_REASON: &str = "default";

/// What a new comment carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentBody<'s> {
    Text(&'s str),
    Attachment,
    TextWithAttachment(&'s str),
}

impl<'s> CommentBody<'s> {
    fn text(self) -> Option<&'s str> {
        match self {
            Self::Text(text) | Self::TextWithAttachment(text) => Some(text),
            Self::Attachment => None,
        }
    }
}

/// A comment action together with the html it was parsed to.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticComment {
    pub comment_html: String,
    pub action: ReportAction,
}

#[derive(Clone, Copy)]
pub struct MutationBuilder<'a> {
    composer: PreviewComposer<'a>,
    ids: &'a dyn IdGenerator,
    clock: &'a dyn Clock,
}

impl<'a> MutationBuilder<'a> {
    pub fn new(ctx: Context<'a>, ids: &'a dyn IdGenerator, clock: &'a dyn Clock) -> Self {
        Self::with_composer(PreviewComposer::new(ctx), ids, clock)
    }

    pub fn with_composer(composer: PreviewComposer<'a>, ids: &'a dyn IdGenerator, clock: &'a dyn Clock) -> Self {
        Self { composer, ids, clock }
    }

    pub fn context(&self) -> &Context<'a> {
        self.composer.context()
    }

    pub fn composer(&self) -> &PreviewComposer<'a> {
        &self.composer
    }

    pub fn ids(&self) -> &'a dyn IdGenerator {
        self.ids
    }

    pub fn clock(&self) -> &'a dyn Clock {
        self.clock
    }

    fn current_user_name(&self) -> String {
        let ctx = self.context();
        ctx.effective_display_name(ctx.current_account_id())
            .unwrap_or_else(|| ctx.snapshot.current_email.clone())
    }

    fn person(&self) -> Vec<MessageFragment> {
        vec![MessageFragment::text(self.current_user_name(), "strong")]
    }

    /// The fields every provisional action shares.
    fn stamp(&self, payload: ActionPayload, message: Vec<MessageFragment>, created: String) -> ReportAction {
        let action = ReportAction {
            report_action_id: self.ids.action_id(),
            payload,
            created,
            actor_account_id: Some(self.context().current_account_id()),
            person: self.person(),
            message,
            pending_action: Some(PendingAction::Add),
            should_show: true,
            is_attachment: Some(false),
            ..Default::default()
        };
        debug!("Built optimistic {} action {}", action.action_name(), action.report_action_id);
        action
    }

    fn now(&self) -> String {
        self.clock.db_now()
    }

    pub fn add_comment(&self, body: CommentBody<'_>, created_offset_ms: i64) -> OptimisticComment {
        let ctx = self.context();
        let comment_html = body.text().map(|t| ctx.rich_text.text_to_html(t)).unwrap_or_default();

        let (html, text) = match body {
            CommentBody::Attachment => (ATTACHMENT_UPLOADING_HTML.to_string(), ATTACHMENT_UPLOADING_HTML.to_string()),
            CommentBody::Text(_) => (comment_html.clone(), ctx.html_to_text(&comment_html)),
            CommentBody::TextWithAttachment(_) => (
                format!("{}\n{}", comment_html, ATTACHMENT_UPLOADING_HTML),
                format!("{}\n{}", ctx.html_to_text(&comment_html), ATTACHMENT_UPLOADING_HTML),
            ),
        };

        let mut fragment = MessageFragment::comment(html.clone(), text);
        if body == CommentBody::Attachment {
            fragment.translation_key = Some(ATTACHMENT_TRANSLATION_KEY.to_string());
        }

        let payload = ActionPayload::AddComment(CommentMessage {
            html,
            ..Default::default()
        });
        let mut action = self.stamp(payload, vec![fragment], self.clock.db_now_offset(created_offset_ms));
        action.is_attachment = Some(body == CommentBody::Attachment);
        action.is_optimistic_action = true;

        OptimisticComment { comment_html, action }
    }

    /// The comment in the parent report that a new task hangs off.
    pub fn task_comment(
        &self,
        task_report_id: &str,
        task_title: &str,
        assignee: Option<AccountId>,
        text: &str,
        parent_report_id: &str,
        actor: Option<AccountId>,
        created_offset_ms: i64,
    ) -> OptimisticComment {
        let mut comment = self.add_comment(CommentBody::Text(text), created_offset_ms);
        let action = &mut comment.action;
        if let Some(fragment) = action.message.first_mut() {
            fragment.task_report_id = Some(task_report_id.to_string());
        }
        action.payload = ActionPayload::AddComment(CommentMessage {
            html: action.message_html().to_string(),
            task_report_id: Some(task_report_id.to_string()),
            ..Default::default()
        });
        action.report_id = Some(parent_report_id.to_string());
        action.child_report_id = Some(task_report_id.to_string());
        action.child_type = Some("task".to_string());
        action.child_report_name = Some(task_title.to_string());
        action.child_manager_account_id = assignee;
        if actor.is_some() {
            action.actor_account_id = actor;
        }
        comment
    }

    /// First action of a new report.
    pub fn created(&self, email_creating_action: &str, created: Option<String>) -> ReportAction {
        let message = vec![
            MessageFragment::text(email_creating_action, "strong"),
            MessageFragment::text(" created this report", "normal"),
        ];
        self.stamp(ActionPayload::Created, message, created.unwrap_or_else(|| self.now()))
    }

    pub fn renamed_room(&self, new_name: &str, old_name: &str) -> ReportAction {
        let now = self.now();
        let message = vec![
            MessageFragment::text("You", "strong"),
            MessageFragment::text(
                format!(" renamed this report. New title is '{}' (previously '{}').", new_name, old_name),
                "normal",
            ),
        ];
        let payload = ActionPayload::Renamed(RenamedMessage {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            html: format!("Room renamed to {}", new_name),
            last_modified: Some(now.clone()),
        });
        self.stamp(payload, message, now)
    }

    /// Archives a chat. `reason` defaults to [`DEFAULT_CLOSE_REASON`].
    pub fn closed(&self, email_closing_report: &str, policy_name: &str, reason: Option<&str>) -> ReportAction {
        let message = vec![
            MessageFragment::text(email_closing_report, "strong"),
            MessageFragment::text(" closed this report", "normal"),
        ];
        let payload = ActionPayload::Closed(ClosedMessage {
            policy_name: policy_name.to_string(),
            reason: reason.unwrap_or(DEFAULT_CLOSE_REASON).to_string(),
            last_modified: None,
        });
        self.stamp(payload, message, self.now())
    }

    /// A report moved to another workspace.
    pub fn moved(
        &self,
        from_policy_id: Option<&str>,
        to_policy_id: &str,
        new_parent_report_id: &str,
        moved_report_id: &str,
        policy_name: &str,
    ) -> ReportAction {
        let html = format!(
            "moved the report to the <a href='{}/r/{}' target='_blank' rel='noreferrer noopener'>{}</a> workspace",
            self.context().snapshot.environment_url,
            new_parent_report_id,
            escape_html(policy_name)
        );
        let text = format!("moved the report to the {} workspace", policy_name);
        let payload = ActionPayload::Moved(MovedMessage {
            from_policy_id: from_policy_id.map(str::to_string),
            to_policy_id: to_policy_id.to_string(),
            new_parent_report_id: new_parent_report_id.to_string(),
            moved_report_id: moved_report_id.to_string(),
        });
        self.stamp(payload, vec![MessageFragment::comment(html, text)], self.now())
    }

    pub fn dismissed_violation(&self, message: DismissedViolationMessage) -> ReportAction {
        let text = self.composer.dismissed_violation_text(&message);
        self.stamp(
            ActionPayload::DismissedViolation(message),
            vec![MessageFragment::text(text, "normal")],
            self.now(),
        )
    }

    /// A status change on a task report: completed, reopened or cancelled.
    pub fn task_action(
        &self,
        task_report_id: &str,
        event: TaskEvent,
        message: &str,
        actor: Option<AccountId>,
        created_offset_ms: i64,
    ) -> ReportAction {
        let fragment = MessageFragment {
            kind: FragmentKind::Text,
            text: message.to_string(),
            task_report_id: Some(task_report_id.to_string()),
            ..Default::default()
        };
        let payload = ActionPayload::Task(
            event,
            TaskMessage {
                task_report_id: task_report_id.to_string(),
                text: message.to_string(),
                ..Default::default()
            },
        );
        let mut action = self.stamp(payload, vec![fragment], self.clock.db_now_offset(created_offset_ms));
        if actor.is_some() {
            action.actor_account_id = actor;
        }
        action
    }

    /// Title and description are edited one at a time; pass exactly one.
    pub fn edited_task_field(&self, task_report_id: &str, title: Option<&str>, description: Option<&str>) -> ReportAction {
        let field = match (title, description) {
            (Some(title), _) => Some(("task title", title)),
            (None, Some(description)) => Some(("description", description)),
            (None, None) => None,
        };
        let changelog = match field {
            Some((field, value)) if !value.is_empty() => format!("updated the {} to {}", field, value),
            Some((field, _)) => format!("removed the {}", field),
            None => "edited this task".to_string(),
        };
        let html = if description.is_some_and(|d| !d.is_empty()) {
            self.context().rich_text.text_to_html(&changelog)
        } else {
            changelog.clone()
        };
        self.task_edit(task_report_id, html, changelog)
    }

    pub fn changed_task_assignee(&self, task_report_id: &str, assignee: AccountId) -> ReportAction {
        let ctx = self.context();
        let name = ctx.effective_display_name(assignee).unwrap_or_default();
        self.task_edit(
            task_report_id,
            format!("assigned to <mention-user accountID={}></mention-user>", assignee),
            format!("assigned to {}", name),
        )
    }

    fn task_edit(&self, task_report_id: &str, html: String, text: String) -> ReportAction {
        let payload = ActionPayload::Task(
            TaskEvent::Edited,
            TaskMessage {
                task_report_id: task_report_id.to_string(),
                html: html.clone(),
                text: text.clone(),
                last_modified: None,
            },
        );
        let mut action = self.stamp(payload, vec![MessageFragment::comment(html, text)], self.now());
        action.should_show = false;
        action
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::context::Snapshot;
    use crate::ids::SequentialIds;
    use crate::time::FixedClock;
    use quill_types::{PersonalDetails, Policy};
    use quill_types::models::PolicyType;

    pub const NOW: &str = "2024-05-01 12:00:00.000";

    pub fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new(1, "me@example.com")
            .with_person(PersonalDetails {
                account_id: 1,
                login: "me@example.com".into(),
                display_name: "Mia Wong".into(),
                first_name: "Mia".into(),
                ..Default::default()
            })
            .with_person(PersonalDetails {
                account_id: 2,
                login: "dana@example.com".into(),
                display_name: "Dana Scully".into(),
                first_name: "Dana".into(),
                ..Default::default()
            })
            .with_policy(Policy {
                id: "pol".into(),
                name: "Acme".into(),
                policy_type: PolicyType::Team,
                is_instant_submit: true,
                submits_to: Some(2),
            });
        snapshot.environment_url = "https://new.quill.chat".into();
        snapshot
    }

    pub fn clock() -> FixedClock {
        FixedClock::at(NOW).expect("fixture time parses")
    }

    pub fn ids() -> SequentialIds {
        SequentialIds::starting_at(100)
    }
}
