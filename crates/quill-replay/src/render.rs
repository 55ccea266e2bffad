//! Text rendering of one conversation, oldest action first.

use std::fmt;

use quill_core::continuity::chain_window;
use quill_core::grouping::is_consecutive_action_by_previous_actor;
use quill_core::visibility::sorted_for_display;
use quill_core::PreviewComposer;
use quill_types::PendingAction;

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub action_id: String,
    pub created: String,
    /// `None` when the line continues the previous author's run.
    pub author: Option<String>,
    pub text: String,
    pub pending: Option<PendingAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub report_name: String,
    pub last_message: String,
    pub lines: Vec<Line>,
    /// Older actions exist beyond a gap.
    pub has_older: bool,
    /// Newer actions exist beyond a gap.
    pub has_newer: bool,
}

pub fn render(composer: &PreviewComposer<'_>, report_id: &str, anchor: Option<&str>) -> Conversation {
    let ctx = composer.context();
    let actions = ctx.reports.report_actions(report_id);
    let sorted = sorted_for_display(ctx.snapshot, &actions, false);
    let window = chain_window(&sorted, anchor);

    let mut lines: Vec<Line> = window
        .actions
        .iter()
        .enumerate()
        .map(|(offset, action)| {
            let grouped = is_consecutive_action_by_previous_actor(
                &sorted,
                window.start + offset,
                ctx.snapshot.is_offline,
                ctx.config.grouping_window_ms,
            );
            let author = (!grouped).then(|| {
                let name = ctx.display_name(action.actor_account_id, false);
                if name.is_empty() { "Unknown".to_string() } else { name }
            });
            Line {
                action_id: action.report_action_id.clone(),
                created: action.created.clone(),
                author,
                text: composer.report_action_message(action, report_id),
                pending: action.pending_action,
            }
        })
        .collect();
    lines.reverse();

    Conversation {
        report_name: ctx.reports.report(report_id).map(|r| r.report_name).unwrap_or_default(),
        last_message: composer.report_last_visible_message(report_id).text,
        lines,
        has_older: window.gap_after,
        has_newer: window.gap_before,
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.report_name)?;
        if self.has_older {
            writeln!(f, "  ... older messages not loaded")?;
        }
        for line in &self.lines {
            if let Some(author) = &line.author {
                writeln!(f, "[{}] {}", line.created, author)?;
            }
            let marker = match line.pending {
                Some(PendingAction::Add) => " (sending)",
                Some(PendingAction::Update) => " (saving)",
                Some(PendingAction::Delete) => " (deleting)",
                None => "",
            };
            writeln!(f, "    {}{}", line.text, marker)?;
        }
        if self.has_newer {
            writeln!(f, "  ... newer messages not loaded")?;
        }
        write!(f, "last message: {}", self.last_message)
    }
}
