//! Deterministic ordering of report actions.

use std::cmp::Ordering;

use quill_types::action::IouType;
use quill_types::{Report, ReportAction, StoreKey, StoreUpdate};
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ascending comparator: created time, then CREATED first, then REPORTPREVIEW
/// last, then action id.
pub fn compare(first: &ReportAction, second: &ReportAction) -> Ordering {
    if first.created != second.created {
        return first.created.cmp(&second.created);
    }

    if first.action_name() != second.action_name() {
        if first.is_created() || second.is_created() {
            return if first.is_created() { Ordering::Less } else { Ordering::Greater };
        }
        if first.is_report_preview() || second.is_report_preview() {
            return if first.is_report_preview() { Ordering::Greater } else { Ordering::Less };
        }
    }

    first.report_action_id.cmp(&second.report_action_id)
}

pub fn sort_actions(actions: &mut [ReportAction], direction: Direction) {
    match direction {
        Direction::Ascending => actions.sort_by(compare),
        Direction::Descending => actions.sort_by(|a, b| compare(a, b).reverse()),
    }
}

pub fn sorted_actions(actions: impl IntoIterator<Item = ReportAction>, direction: Direction) -> Vec<ReportAction> {
    let mut actions: Vec<ReportAction> = actions.into_iter().collect();
    sort_actions(&mut actions, direction);
    actions
}

/// Sorts a JSON array of actions. Anything but an array is rejected; entries
/// that are not actions are skipped.
pub fn sort_json_actions(value: &Value, direction: Direction) -> Result<Vec<ReportAction>> {
    let Value::Array(items) = value else {
        return Err(Error::InvalidInput(format!(
            "report actions must be an array, received {}",
            json_type_name(value)
        )));
    };
    let actions = items
        .iter()
        .filter(|item| !item.is_null())
        .filter_map(|item| match serde_json::from_value::<ReportAction>(item.clone()) {
            Ok(action) => Some(action),
            Err(e) => {
                warn!("Skipping undecodable report action: {}", e);
                None
            }
        });
    Ok(sorted_actions(actions, direction))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Id of the newest create, split or track money-request action.
pub fn most_recent_iou_request_action_id(actions: &[ReportAction]) -> Option<String> {
    actions
        .iter()
        .filter(|a| {
            a.iou()
                .is_some_and(|m| matches!(m.iou_type, IouType::Create | IouType::Split | IouType::Track))
        })
        .max_by(|a, b| compare(a, b))
        .map(|a| a.report_action_id.clone())
}

/// Actions of a one-transaction report merged with those of its only
/// transaction thread, without the previews that would duplicate the thread.
pub fn combined_report_actions(
    report: Option<&Report>,
    report_actions: &[ReportAction],
    thread_actions: &[ReportAction],
) -> Vec<ReportAction> {
    if thread_actions.is_empty() {
        return report_actions.to_vec();
    }
    let is_self_dm = report.is_some_and(Report::is_self_dm);

    let combined = report_actions
        .iter()
        .chain(thread_actions.iter().filter(|a| !a.is_created()))
        .filter(|a| {
            let iou_type = a.iou().map(|m| m.iou_type);
            if iou_type == Some(IouType::Create) || a.is_sent_money_action() {
                return false;
            }
            is_self_dm || iou_type != Some(IouType::Track)
        })
        .cloned();

    sorted_actions(combined, Direction::Descending)
}

/// The newest action carried by the first report-actions update in a batch.
pub fn latest_action_in_updates(updates: &[StoreUpdate]) -> Option<ReportAction> {
    let update = updates
        .iter()
        .find(|u| matches!(u.key, StoreKey::ReportActions(_)))?;
    let Value::Object(map) = &update.value else {
        return None;
    };
    let actions = map
        .values()
        .filter_map(|v| serde_json::from_value::<ReportAction>(v.clone()).ok());
    sorted_actions(actions, Direction::Ascending).pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_types::action::{ActionPayload, CommentMessage, IouDetails, IouMessage, ReportPreviewMessage};
    use serde_json::json;

    fn action(id: &str, created: &str, payload: ActionPayload) -> ReportAction {
        ReportAction {
            report_action_id: id.into(),
            created: created.into(),
            payload,
            ..Default::default()
        }
    }

    fn comment(id: &str, created: &str) -> ReportAction {
        action(id, created, ActionPayload::AddComment(CommentMessage::default()))
    }

    fn ids(actions: &[ReportAction]) -> Vec<&str> {
        actions.iter().map(|a| a.report_action_id.as_str()).collect()
    }

    fn iou(id: &str, created: &str, iou_type: IouType) -> ReportAction {
        action(
            id,
            created,
            ActionPayload::Iou(IouMessage {
                iou_type,
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_ordering_is_permutation_independent() {
        let t1 = comment("5", "2024-01-01 00:00:01.000");
        let created = action("9", "2024-01-01 00:00:02.000", ActionPayload::Created);
        let t2 = comment("1", "2024-01-01 00:00:02.000");
        let t3 = comment("3", "2024-01-01 00:00:03.000");

        let orders = [
            vec![t1.clone(), created.clone(), t2.clone(), t3.clone()],
            vec![t3.clone(), t2.clone(), created.clone(), t1.clone()],
            vec![t2.clone(), t3.clone(), t1.clone(), created.clone()],
            vec![created.clone(), t1.clone(), t3.clone(), t2.clone()],
        ];
        for order in orders {
            let sorted = sorted_actions(order, Direction::Ascending);
            assert_eq!(ids(&sorted), vec!["5", "9", "1", "3"]);
        }
    }

    #[test]
    fn test_descending_inverts_everything() {
        let created = action("9", "2024-01-01 00:00:02.000", ActionPayload::Created);
        let t2 = comment("1", "2024-01-01 00:00:02.000");
        let preview = action(
            "0",
            "2024-01-01 00:00:02.000",
            ActionPayload::ReportPreview(ReportPreviewMessage::default()),
        );
        let sorted = sorted_actions(vec![t2, preview, created], Direction::Descending);
        assert_eq!(ids(&sorted), vec!["0", "1", "9"]);
    }

    #[test]
    fn test_report_preview_sorts_last_at_same_time() {
        let preview = action(
            "1",
            "2024-01-01 00:00:00.000",
            ActionPayload::ReportPreview(ReportPreviewMessage::default()),
        );
        let c = comment("2", "2024-01-01 00:00:00.000");
        let sorted = sorted_actions(vec![preview, c], Direction::Ascending);
        assert_eq!(ids(&sorted), vec!["2", "1"]);
    }

    #[test]
    fn test_json_input_must_be_array() {
        let err = sort_json_actions(&json!({ "a": 1 }), Direction::Ascending).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let sorted = sort_json_actions(
            &json!([
                { "reportActionID": "b", "created": "2024-01-02 00:00:00.000", "actionName": "ADDCOMMENT" },
                { "reportActionID": "a", "created": "2024-01-01 00:00:00.000", "actionName": "ADDCOMMENT" }
            ]),
            Direction::Ascending,
        )
        .unwrap();
        assert_eq!(ids(&sorted), vec!["a", "b"]);
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let sorted = sort_json_actions(
            &json!([
                {
                    "reportActionID": "b",
                    "created": "2024-01-02 00:00:00.000",
                    "actionName": "ADDCOMMENT",
                    "message": null,
                    "whisperedTo": null,
                    "errors": null,
                    "childVisibleActionCount": null,
                    "childCommenterCount": null,
                    "childOldestFourAccountIDs": null,
                    "childMoneyRequestCount": null,
                    "childRecentReceiptTransactionIDs": null
                },
                { "reportActionID": "a", "created": "2024-01-01 00:00:00.000", "actionName": "ADDCOMMENT" },
                { "reportActionID": 7, "created": ["not", "a", "date"] }
            ]),
            Direction::Descending,
        )
        .unwrap();
        assert_eq!(ids(&sorted), vec!["b", "a"]);
        assert!(sorted[0].message.is_empty());
        assert!(sorted[0].whispered_to.is_empty());
        assert!(sorted[0].errors.is_empty());
        assert_eq!(sorted[0].child_visible_action_count, 0);
        assert!(sorted[0].child_oldest_four_account_ids.is_empty());
    }

    #[test]
    fn test_most_recent_iou_request() {
        let actions = vec![
            iou("1", "2024-01-01 00:00:00.000", IouType::Create),
            iou("2", "2024-01-02 00:00:00.000", IouType::Track),
            iou("3", "2024-01-03 00:00:00.000", IouType::Pay),
            comment("4", "2024-01-04 00:00:00.000"),
        ];
        assert_eq!(most_recent_iou_request_action_id(&actions), Some("2".into()));
        assert_eq!(most_recent_iou_request_action_id(&[]), None);
    }

    #[test]
    fn test_combined_actions_drop_duplicates_of_thread() {
        let report_actions = vec![
            action("c", "2024-01-01 00:00:00.000", ActionPayload::Created),
            iou("req", "2024-01-01 00:00:01.000", IouType::Create),
            iou("trk", "2024-01-01 00:00:02.000", IouType::Track),
        ];
        let mut sent = iou("sent", "2024-01-01 00:00:03.000", IouType::Pay);
        if let ActionPayload::Iou(m) = &mut sent.payload {
            m.iou_details = Some(IouDetails::default());
        }
        let thread_actions = vec![
            action("tc", "2024-01-01 00:00:01.500", ActionPayload::Created),
            comment("x", "2024-01-01 00:00:04.000"),
            sent,
        ];
        let combined = combined_report_actions(None, &report_actions, &thread_actions);
        assert_eq!(ids(&combined), vec!["x", "c"]);

        let self_dm = Report {
            chat_type: Some(quill_types::models::ChatType::SelfDm),
            ..Default::default()
        };
        let combined = combined_report_actions(Some(&self_dm), &report_actions, &thread_actions);
        assert_eq!(ids(&combined), vec!["x", "trk", "c"]);
    }

    #[test]
    fn test_combined_without_thread_is_untouched() {
        let report_actions = vec![comment("b", "2024-01-02 00:00:00.000"), comment("a", "2024-01-01 00:00:00.000")];
        let combined = combined_report_actions(None, &report_actions, &[]);
        assert_eq!(ids(&combined), vec!["b", "a"]);
    }

    #[test]
    fn test_latest_action_in_updates() {
        let updates = vec![
            StoreUpdate::merge(StoreKey::Report("1".into()), json!({})),
            StoreUpdate::merge(
                StoreKey::ReportActions("1".into()),
                json!({
                    "a": { "reportActionID": "a", "created": "2024-01-01 00:00:00.000" },
                    "b": { "reportActionID": "b", "created": "2024-01-02 00:00:00.000" }
                }),
            ),
        ];
        assert_eq!(latest_action_in_updates(&updates).map(|a| a.report_action_id), Some("b".into()));
        assert!(latest_action_in_updates(&[]).is_none());
    }
}
