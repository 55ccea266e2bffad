use pretty_assertions::assert_eq;
use quill_core::optimistic::MoneyRequestArgs;
use quill_core::{CommentBody, Context, FixedClock, MutationBuilder, SequentialIds, Snapshot};
use quill_store::Database;
use quill_types::{PendingAction, Phase, StoreChange};
use serde_json::json;

const NOW: &str = "2024-05-01 12:00:00.000";

fn seeded() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.import_json(&json!({
        "reports": {
            "chat": {
                "reportID": "chat",
                "type": "chat",
                "reportName": "General",
                "lastMessageText": "hello",
                "lastVisibleActionCreated": "2024-05-01 09:00:00.000"
            },
            "thread": {
                "reportID": "thread",
                "type": "chat",
                "parentReportID": "chat",
                "parentReportActionID": "1"
            }
        },
        "reportActions": {
            "chat": {
                "1": {
                    "reportActionID": "1",
                    "actionName": "ADDCOMMENT",
                    "created": "2024-05-01 09:00:00.000",
                    "actorAccountID": 2,
                    "originalMessage": { "html": "hello" },
                    "message": [{ "type": "COMMENT", "html": "hello", "text": "hello" }],
                    "childReportID": "thread"
                }
            }
        }
    }))
    .unwrap();
    db
}

#[test]
fn test_comment_batch_through_the_store() {
    let db = seeded();
    let snapshot = Snapshot::new(1, "me@example.com");
    let ids = SequentialIds::starting_at(500);
    let clock = FixedClock::at(NOW).unwrap();

    let (comment, batch) = {
        let ctx = Context::new(&snapshot, &db, &db);
        MutationBuilder::new(ctx, &ids, &clock)
            .add_comment_batch("thread", CommentBody::Text("first reply"))
            .unwrap()
    };
    let mut rx = db.subscribe();

    let published = db.apply_batch(&batch, Phase::Optimistic).unwrap();
    assert!(published >= 3);
    let mut saw_action = false;
    while let Ok(change) = rx.try_recv() {
        if let StoreChange::ReportActionsUpdated { report_id, action_ids } = change {
            saw_action |= report_id == "thread" && action_ids.contains(&comment.action.report_action_id);
        }
    }
    assert!(saw_action);

    let parent = db.get_report_action("chat", "1").unwrap().unwrap();
    assert_eq!(parent.child_visible_action_count, 1);
    assert_eq!(parent.child_commenter_count, 1);
    assert_eq!(parent.child_oldest_four_account_ids, vec![1]);
    assert_eq!(
        db.get_report("thread").unwrap().unwrap().last_message_text.as_deref(),
        Some("first reply")
    );

    db.apply_batch(&batch, Phase::Success).unwrap();
    let stored = db.get_report_action("thread", "500").unwrap().unwrap();
    assert_eq!(stored.pending_action, None);
    assert_eq!(stored.created, NOW);
}

#[test]
fn test_failed_comment_leaves_no_trace() {
    let db = seeded();
    let before = db.get_report_value("thread").unwrap();
    let snapshot = Snapshot::new(1, "me@example.com");
    let ids = SequentialIds::starting_at(500);
    let clock = FixedClock::at(NOW).unwrap();

    let batch = {
        let ctx = Context::new(&snapshot, &db, &db);
        MutationBuilder::new(ctx, &ids, &clock)
            .add_comment_batch("thread", CommentBody::Text("lost"))
            .unwrap()
            .1
    };
    db.apply_batch(&batch, Phase::Optimistic).unwrap();
    db.apply_batch(&batch, Phase::Failure).unwrap();

    assert!(db.get_report_actions("thread").unwrap().is_empty());
    assert_eq!(db.get_report_value("thread").unwrap(), before);
    let parent = db.get_report_action("chat", "1").unwrap().unwrap();
    assert_eq!(parent.child_visible_action_count, 0);
    assert!(parent.child_oldest_four_account_ids.is_empty());
}

#[test]
fn test_delete_then_confirm() {
    let db = seeded();
    let snapshot = Snapshot::new(2, "dana@example.com");
    let ids = SequentialIds::default();
    let clock = FixedClock::at(NOW).unwrap();
    let original = db.get_report_action("chat", "1").unwrap().unwrap();

    let batch = {
        let ctx = Context::new(&snapshot, &db, &db);
        MutationBuilder::new(ctx, &ids, &clock)
            .delete_comment_batch("chat", &original)
            .unwrap()
    };
    db.apply_batch(&batch, Phase::Optimistic).unwrap();
    let pending = db.get_report_action("chat", "1").unwrap().unwrap();
    assert_eq!(pending.pending_action, Some(PendingAction::Delete));
    assert!(pending.is_deleted());

    db.apply_batch(&batch, Phase::Success).unwrap();
    let confirmed = db.get_report_action("chat", "1").unwrap().unwrap();
    assert_eq!(confirmed.pending_action, None);
    assert!(confirmed.is_deleted());
}

#[test]
fn test_money_request_persists_all_records() {
    let db = seeded();
    let snapshot = Snapshot::new(1, "me@example.com");
    let ids = SequentialIds::starting_at(900);
    let clock = FixedClock::at(NOW).unwrap();

    let request = {
        let ctx = Context::new(&snapshot, &db, &db);
        MutationBuilder::new(ctx, &ids, &clock)
            .request_money(MoneyRequestArgs {
                chat_report_id: Some("chat"),
                payer: 2,
                amount: 4200,
                currency: "USD",
                comment: "tickets",
                ..Default::default()
            })
            .unwrap()
    };
    db.apply_batch(&request.batch, Phase::Optimistic).unwrap();

    let chat = db.get_report("chat").unwrap().unwrap();
    assert_eq!(chat.iou_report_id.as_deref(), Some(request.iou_report.report_id.as_str()));
    assert_eq!(chat.report_name, "General");
    let transactions = db.get_report_transactions(&request.iou_report.report_id).unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].amount, 4200);
    assert!(
        db.get_report(&request.entities.transaction_thread.report_id)
            .unwrap()
            .is_some()
    );

    db.apply_batch(&request.batch, Phase::Failure).unwrap();
    let chat = db.get_report("chat").unwrap().unwrap();
    assert_eq!(chat.iou_report_id, None);
    assert_eq!(chat.last_message_text.as_deref(), Some("hello"));
    assert!(db.get_report(&request.iou_report.report_id).unwrap().is_none());
    assert!(db.get_transaction(&request.transaction.transaction_id).unwrap().is_none());
}
