//! Gap detection over a descending action sequence.
//!
//! Actions link to their predecessor through `previousReportActionID`. A
//! window is the longest run of linked actions around an anchor. Breaks that
//! [`is_ignorable_gap`] accepts are walked over instead of ending the window.

use quill_types::ReportAction;

/// Whether a broken link between two neighbours should be treated as continuous.
///
/// Provisional actions and whispers never take part in the server chain. Room
/// invites are logged out of band. CREATED and CLOSED bound the report.
pub fn is_ignorable_gap(current: Option<&ReportAction>, next: Option<&ReportAction>) -> bool {
    let (Some(current), Some(next)) = (current, next) else {
        return false;
    };
    current.is_optimistic()
        || next.is_optimistic()
        || current.is_whisper()
        || next.is_whisper()
        || current.is_room_invite()
        || next.is_created()
        || next.is_closed()
}

/// The contiguous run around an anchor, and whether it stops at a real gap.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainWindow<'a> {
    pub actions: &'a [ReportAction],
    /// Index of the first element of `actions` in the full sequence.
    pub start: usize,
    /// Newer actions exist beyond a gap.
    pub gap_before: bool,
    /// Older actions exist beyond a gap.
    pub gap_after: bool,
}

impl ChainWindow<'_> {
    pub fn is_complete(&self) -> bool {
        !self.gap_before && !self.gap_after
    }

    pub fn ids(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.report_action_id.as_str()).collect()
    }
}

/// Longest gapless run containing `anchor_id`, or the first confirmed action
/// when no anchor is given. `sorted` must be in descending order.
pub fn continuous_chain<'a>(sorted: &'a [ReportAction], anchor_id: Option<&str>) -> &'a [ReportAction] {
    chain_window(sorted, anchor_id).actions
}

pub fn chain_window<'a>(sorted: &'a [ReportAction], anchor_id: Option<&str>) -> ChainWindow<'a> {
    let index = match anchor_id {
        Some(id) => sorted.iter().position(|a| a.report_action_id == id),
        None => sorted.iter().position(|a| !a.is_optimistic()),
    };

    let Some(index) = index else {
        // An unknown anchor yields nothing. Without an anchor every action is
        // provisional, and a provisional run is taken to be whole.
        let actions = if anchor_id.is_some() { &sorted[..0] } else { sorted };
        return ChainWindow {
            actions,
            start: 0,
            gap_before: false,
            gap_after: false,
        };
    };

    let mut end = index;
    while (end + 1 < sorted.len()
        && sorted[end].previous_report_action_id.as_deref() == Some(sorted[end + 1].report_action_id.as_str()))
        || is_ignorable_gap(sorted.get(end), sorted.get(end + 1))
    {
        end += 1;
    }

    let mut start = index;
    while (start > 0
        && sorted[start - 1].previous_report_action_id.as_deref() == Some(sorted[start].report_action_id.as_str()))
        || (start > 0 && is_ignorable_gap(sorted.get(start), sorted.get(start - 1)))
    {
        start -= 1;
    }

    ChainWindow {
        actions: &sorted[start..=end],
        start,
        gap_before: start > 0,
        gap_after: end + 1 < sorted.len(),
    }
}
