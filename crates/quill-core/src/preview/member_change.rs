//! Messages for members invited to or removed from rooms and workspaces.

use quill_types::action::{ActionPayload, ChangeLogMessage, FragmentKind, MemberChangeKind, MessageFragment};
use quill_types::{AccountId, ReportAction};

use crate::context::Context;
use crate::phrase::Phrase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberChangeElement {
    Text(String),
    UserMention { account_id: AccountId, content: String },
    RoomReference { room_id: String, room_name: String },
}

impl MemberChangeElement {
    pub fn content(&self) -> &str {
        match self {
            Self::Text(content) | Self::UserMention { content, .. } => content,
            Self::RoomReference { room_name, .. } => room_name,
        }
    }
}

fn change_log(action: &ReportAction) -> (Option<MemberChangeKind>, Option<&ChangeLogMessage>) {
    match &action.payload {
        ActionPayload::MemberChange(kind, message) => (Some(*kind), Some(message)),
        _ => (None, None),
    }
}

/// Joins items as "A", "A and B" or "A, B, and C", separators included.
pub fn list_elements(ctx: &Context<'_>, items: Vec<MemberChangeElement>) -> Vec<MemberChangeElement> {
    let and = ctx.tr(Phrase::ListAnd);
    let count = items.len();
    let mut out = Vec::with_capacity(count * 2);
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            let separator = match (count, i == count - 1) {
                (2, _) => format!(" {} ", and),
                (_, true) => format!(", {} ", and),
                _ => ", ".to_string(),
            };
            out.push(MemberChangeElement::Text(separator));
        }
        out.push(item);
    }
    out
}

pub fn member_change_elements(ctx: &Context<'_>, action: &ReportAction) -> Vec<MemberChangeElement> {
    let (kind, message) = change_log(action);
    let is_invite = kind.is_some_and(MemberChangeKind::is_invite);

    let verb = match kind {
        Some(kind) if kind.is_leave() => Phrase::LeftWorkspace,
        _ if is_invite => Phrase::Invited,
        _ => Phrase::Removed,
    };

    let mentions = message
        .map(|m| m.target_account_ids.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|&account_id| {
            let handle = ctx
                .effective_display_name(account_id)
                .unwrap_or_else(|| ctx.tr(Phrase::Hidden));
            MemberChangeElement::UserMention {
                account_id,
                content: format!("@{}", handle),
            }
        })
        .collect();

    let mut elements = vec![MemberChangeElement::Text(format!("{} ", ctx.tr(verb)))];
    elements.extend(list_elements(ctx, mentions));

    if let Some((room_name, room_id)) = message.and_then(|m| {
        m.room_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .zip(m.report_id.as_deref())
    }) {
        let preposition = if is_invite { Phrase::To } else { Phrase::From };
        elements.push(MemberChangeElement::Text(format!(" {} ", ctx.tr(preposition))));
        elements.push(MemberChangeElement::RoomReference {
            room_id: room_id.to_string(),
            room_name: room_name.to_string(),
        });
    }
    elements
}

pub fn member_change_plain_text(ctx: &Context<'_>, action: &ReportAction) -> String {
    member_change_elements(ctx, action)
        .iter()
        .map(MemberChangeElement::content)
        .collect()
}

/// A muted html fragment with mention and room-link markup. The text is the
/// action's own first fragment text.
pub fn member_change_fragment(ctx: &Context<'_>, action: &ReportAction) -> MessageFragment {
    let html: String = member_change_elements(ctx, action)
        .iter()
        .map(|element| match element {
            MemberChangeElement::UserMention { account_id, content } => {
                format!("<mention-user accountID={}>{}</mention-user>", account_id, content)
            }
            MemberChangeElement::RoomReference { room_id, room_name } => format!(
                r#"<a href="{}/r/{}" target="_blank">{}</a>"#,
                ctx.snapshot.environment_url, room_id, room_name
            ),
            MemberChangeElement::Text(content) => content.clone(),
        })
        .collect();

    MessageFragment {
        kind: FragmentKind::Comment,
        html: Some(format!("<muted-text>{}</muted-text>", html)),
        text: action.first_fragment().map(|f| f.text.clone()).unwrap_or_default(),
        ..Default::default()
    }
}
