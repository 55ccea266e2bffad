use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, params};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use quill_types::{
    OptimisticBatch, Phase, Report, ReportAction, StoreChange, StoreKey, StoreUpdate, Transaction, UpdateMethod,
    deep_merge,
};

use crate::Database;

impl Database {
    // -- Reports --

    pub fn get_report(&self, report_id: &str) -> Result<Option<Report>> {
        self.get_report_value(report_id)?.map(decode).transpose()
    }

    /// The stored body as written, including fields the record types do not model.
    pub fn get_report_value(&self, report_id: &str) -> Result<Option<Value>> {
        self.with_conn(|conn| query_report(conn, report_id))
    }

    pub fn merge_report(&self, report_id: &str, patch: &Value) -> Result<()> {
        self.write(|conn| merge_report(conn, report_id, patch)).map(drop)
    }

    /// Replaces the report. `null` deletes it.
    pub fn set_report(&self, report_id: &str, value: &Value) -> Result<()> {
        self.write(|conn| set_report(conn, report_id, value)).map(drop)
    }

    // -- Report actions --

    /// Undecodable actions are skipped so one bad record does not hide the rest.
    pub fn get_report_actions(&self, report_id: &str) -> Result<BTreeMap<String, ReportAction>> {
        let rows = self.with_conn(|conn| query_report_actions(conn, report_id))?;
        let actions = rows
            .into_iter()
            .filter_map(|(action_id, body)| match decode(body) {
                Ok(action) => Some((action_id, action)),
                Err(e) => {
                    warn!("Skipping action {} of report {}: {:#}", action_id, report_id, e);
                    None
                }
            })
            .collect();
        Ok(actions)
    }

    pub fn get_report_action(&self, report_id: &str, action_id: &str) -> Result<Option<ReportAction>> {
        self.with_conn(|conn| query_report_action(conn, report_id, action_id))?
            .map(decode)
            .transpose()
    }

    /// Merges an object keyed by action id. A `null` entry removes that action.
    pub fn merge_report_actions(&self, report_id: &str, patch: &Value) -> Result<()> {
        self.write(|conn| merge_report_actions(conn, report_id, patch)).map(drop)
    }

    /// Replaces every action of the report.
    pub fn set_report_actions(&self, report_id: &str, value: &Value) -> Result<()> {
        self.write(|conn| set_report_actions(conn, report_id, value)).map(drop)
    }

    pub fn remove_report_action(&self, report_id: &str, action_id: &str) -> Result<()> {
        self.write(|conn| remove_report_action(conn, report_id, action_id)).map(drop)
    }

    // -- Transactions --

    pub fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        self.with_conn(|conn| query_transaction(conn, transaction_id))?
            .map(decode)
            .transpose()
    }

    pub fn get_report_transactions(&self, report_id: &str) -> Result<Vec<Transaction>> {
        let rows = self.with_conn(|conn| query_report_transactions(conn, report_id))?;
        rows.into_iter().map(decode).collect()
    }

    pub fn merge_transaction(&self, transaction_id: &str, patch: &Value) -> Result<()> {
        self.write(|conn| merge_transaction(conn, transaction_id, patch)).map(drop)
    }

    pub fn set_transaction(&self, transaction_id: &str, value: &Value) -> Result<()> {
        self.write(|conn| set_transaction(conn, transaction_id, value)).map(drop)
    }

    // -- Batches --

    pub fn apply_update(&self, update: &StoreUpdate) -> Result<()> {
        self.write(|conn| apply_update(conn, update)).map(drop)
    }

    /// Applies one phase of a batch atomically. Returns the number of change
    /// events published.
    pub fn apply_batch(&self, batch: &OptimisticBatch, phase: Phase) -> Result<usize> {
        let updates = batch.updates(phase);
        let published = self.write(|conn| {
            let mut changes = Vec::new();
            for update in updates {
                changes.extend(apply_update(conn, update)?);
            }
            Ok(changes)
        })?;
        debug!("Applied {:?} phase: {} updates, {} changes", phase, updates.len(), published);
        Ok(published)
    }

    /// Bulk load of `reports`, `reportActions` and `transactions` sections.
    /// Returns the number of records written.
    pub fn import_json(&self, data: &Value) -> Result<usize> {
        let mut imported = 0;
        self.write(|conn| {
            let mut changes = Vec::new();
            for (report_id, report) in section(data, "reports")? {
                changes.extend(set_report(conn, report_id, report)?);
                imported += 1;
            }
            for (report_id, actions) in section(data, "reportActions")? {
                changes.extend(merge_report_actions(conn, report_id, actions)?);
                imported += actions.as_object().map_or(0, Map::len);
            }
            for (transaction_id, transaction) in section(data, "transactions")? {
                changes.extend(set_transaction(conn, transaction_id, transaction)?);
                imported += 1;
            }
            Ok(changes)
        })?;
        info!("Imported {} records", imported);
        Ok(imported)
    }

    /// Runs `f` inside one SQLite transaction and publishes its changes once
    /// the transaction commits.
    fn write<F>(&self, f: F) -> Result<usize>
    where
        F: FnOnce(&Connection) -> Result<Vec<StoreChange>>,
    {
        let changes = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changes = f(&tx)?;
            tx.commit()?;
            Ok(changes)
        })?;
        let published = changes.len();
        self.feed().publish_all(changes);
        Ok(published)
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).context("Stored record does not match its type")
}

fn parse_body(body: &str) -> Result<Value> {
    serde_json::from_str(body).context("Stored body is not JSON")
}

fn section<'a>(data: &'a Value, name: &str) -> Result<Vec<(&'a String, &'a Value)>> {
    match data.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map.iter().collect()),
        Some(_) => Err(anyhow!("Section {} must be an object", name)),
    }
}

fn apply_update(conn: &Connection, update: &StoreUpdate) -> Result<Vec<StoreChange>> {
    let value = &update.value;
    match (&update.key, update.method) {
        (StoreKey::Report(id), UpdateMethod::Merge) => merge_report(conn, id, value),
        (StoreKey::Report(id), UpdateMethod::Set) => set_report(conn, id, value),
        (StoreKey::ReportActions(id), UpdateMethod::Merge) => merge_report_actions(conn, id, value),
        (StoreKey::ReportActions(id), UpdateMethod::Set) => set_report_actions(conn, id, value),
        (StoreKey::Transaction(id), UpdateMethod::Merge) => merge_transaction(conn, id, value),
        (StoreKey::Transaction(id), UpdateMethod::Set) => set_transaction(conn, id, value),
    }
}

// -- Reports --

fn query_report(conn: &Connection, report_id: &str) -> Result<Option<Value>> {
    let body: Option<String> = conn
        .query_row("SELECT body FROM reports WHERE report_id = ?1", [report_id], |row| row.get(0))
        .optional()?;
    body.as_deref().map(parse_body).transpose()
}

fn write_report(conn: &Connection, report_id: &str, body: &Value) -> Result<()> {
    if body.is_null() {
        conn.execute("DELETE FROM reports WHERE report_id = ?1", [report_id])?;
        return Ok(());
    }
    conn.execute(
        "INSERT INTO reports (report_id, body) VALUES (?1, ?2)
         ON CONFLICT(report_id) DO UPDATE SET body = excluded.body, updated_at = datetime('now')",
        params![report_id, body.to_string()],
    )?;
    Ok(())
}

fn merge_report(conn: &Connection, report_id: &str, patch: &Value) -> Result<Vec<StoreChange>> {
    let mut body = query_report(conn, report_id)?.unwrap_or(Value::Null);
    deep_merge(&mut body, patch);
    write_report(conn, report_id, &body)?;
    Ok(vec![StoreChange::ReportUpdated {
        report_id: report_id.to_string(),
    }])
}

fn set_report(conn: &Connection, report_id: &str, value: &Value) -> Result<Vec<StoreChange>> {
    let mut body = Value::Null;
    deep_merge(&mut body, value);
    write_report(conn, report_id, &body)?;
    Ok(vec![StoreChange::ReportUpdated {
        report_id: report_id.to_string(),
    }])
}

// -- Report actions --

fn query_report_actions(conn: &Connection, report_id: &str) -> Result<Vec<(String, Value)>> {
    let mut stmt = conn.prepare(
        "SELECT report_action_id, body FROM report_actions
         WHERE report_id = ?1
         ORDER BY created, report_action_id",
    )?;

    let rows = stmt
        .query_map([report_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(action_id, body)| Ok((action_id, parse_body(&body)?)))
        .collect()
}

fn query_report_action(conn: &Connection, report_id: &str, action_id: &str) -> Result<Option<Value>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM report_actions WHERE report_id = ?1 AND report_action_id = ?2",
            [report_id, action_id],
            |row| row.get(0),
        )
        .optional()?;
    body.as_deref().map(parse_body).transpose()
}

fn write_report_action(conn: &Connection, report_id: &str, action_id: &str, body: &Value) -> Result<()> {
    let created = body.get("created").and_then(Value::as_str).unwrap_or_default();
    conn.execute(
        "INSERT INTO report_actions (report_id, report_action_id, created, body) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(report_id, report_action_id)
         DO UPDATE SET created = excluded.created, body = excluded.body, updated_at = datetime('now')",
        params![report_id, action_id, created, body.to_string()],
    )?;
    Ok(())
}

fn delete_report_action(conn: &Connection, report_id: &str, action_id: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM report_actions WHERE report_id = ?1 AND report_action_id = ?2",
        [report_id, action_id],
    )?;
    Ok(removed > 0)
}

fn merge_report_actions(conn: &Connection, report_id: &str, patch: &Value) -> Result<Vec<StoreChange>> {
    let Value::Object(entries) = patch else {
        return Err(anyhow!("Actions of report {} must be merged as an object", report_id));
    };

    let mut changes = Vec::new();
    let mut updated = Vec::new();
    for (action_id, value) in entries {
        if value.is_null() {
            if delete_report_action(conn, report_id, action_id)? {
                changes.push(StoreChange::ReportActionRemoved {
                    report_id: report_id.to_string(),
                    action_id: action_id.clone(),
                });
            }
            continue;
        }
        let mut body = query_report_action(conn, report_id, action_id)?.unwrap_or(Value::Null);
        deep_merge(&mut body, value);
        write_report_action(conn, report_id, action_id, &body)?;
        updated.push(action_id.clone());
    }

    if !updated.is_empty() {
        changes.push(StoreChange::ReportActionsUpdated {
            report_id: report_id.to_string(),
            action_ids: updated,
        });
    }
    Ok(changes)
}

fn set_report_actions(conn: &Connection, report_id: &str, value: &Value) -> Result<Vec<StoreChange>> {
    conn.execute("DELETE FROM report_actions WHERE report_id = ?1", [report_id])?;
    let mut changes = match value {
        Value::Null => Vec::new(),
        Value::Object(_) => merge_report_actions(conn, report_id, value)?,
        _ => return Err(anyhow!("Actions of report {} must be set as an object", report_id)),
    };
    if changes.is_empty() {
        changes.push(StoreChange::ReportActionsUpdated {
            report_id: report_id.to_string(),
            action_ids: Vec::new(),
        });
    }
    Ok(changes)
}

fn remove_report_action(conn: &Connection, report_id: &str, action_id: &str) -> Result<Vec<StoreChange>> {
    if !delete_report_action(conn, report_id, action_id)? {
        warn!("Action {} not found in report {}", action_id, report_id);
        return Ok(Vec::new());
    }
    Ok(vec![StoreChange::ReportActionRemoved {
        report_id: report_id.to_string(),
        action_id: action_id.to_string(),
    }])
}

// -- Transactions --

fn query_transaction(conn: &Connection, transaction_id: &str) -> Result<Option<Value>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM transactions WHERE transaction_id = ?1",
            [transaction_id],
            |row| row.get(0),
        )
        .optional()?;
    body.as_deref().map(parse_body).transpose()
}

fn query_report_transactions(conn: &Connection, report_id: &str) -> Result<Vec<Value>> {
    let mut stmt = conn.prepare("SELECT body FROM transactions WHERE report_id = ?1 ORDER BY transaction_id")?;
    let rows = stmt
        .query_map([report_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.iter().map(|body| parse_body(body)).collect()
}

fn write_transaction(conn: &Connection, transaction_id: &str, body: &Value) -> Result<()> {
    if body.is_null() {
        conn.execute("DELETE FROM transactions WHERE transaction_id = ?1", [transaction_id])?;
        return Ok(());
    }
    let report_id = body.get("reportID").and_then(Value::as_str).unwrap_or_default();
    conn.execute(
        "INSERT INTO transactions (transaction_id, report_id, body) VALUES (?1, ?2, ?3)
         ON CONFLICT(transaction_id)
         DO UPDATE SET report_id = excluded.report_id, body = excluded.body, updated_at = datetime('now')",
        params![transaction_id, report_id, body.to_string()],
    )?;
    Ok(())
}

fn merge_transaction(conn: &Connection, transaction_id: &str, patch: &Value) -> Result<Vec<StoreChange>> {
    let mut body = query_transaction(conn, transaction_id)?.unwrap_or(Value::Null);
    deep_merge(&mut body, patch);
    write_transaction(conn, transaction_id, &body)?;
    Ok(vec![StoreChange::TransactionUpdated {
        transaction_id: transaction_id.to_string(),
    }])
}

fn set_transaction(conn: &Connection, transaction_id: &str, value: &Value) -> Result<Vec<StoreChange>> {
    let mut body = Value::Null;
    deep_merge(&mut body, value);
    write_transaction(conn, transaction_id, &body)?;
    Ok(vec![StoreChange::TransactionUpdated {
        transaction_id: transaction_id.to_string(),
    }])
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_merge_removes_null_keys() {
        let db = Database::open_in_memory().unwrap();
        db.merge_report("1", &json!({ "reportID": "1", "reportName": "Trip", "lastMessageText": "hi" }))
            .unwrap();
        db.merge_report("1", &json!({ "lastMessageText": null, "total": 500 })).unwrap();

        let body = db.get_report_value("1").unwrap().unwrap();
        assert_eq!(body, json!({ "reportID": "1", "reportName": "Trip", "total": 500 }));
        assert_eq!(db.get_report("1").unwrap().unwrap().total, 500);
    }

    #[test]
    fn test_set_null_deletes() {
        let db = Database::open_in_memory().unwrap();
        db.set_report("1", &json!({ "reportID": "1" })).unwrap();
        db.set_report("1", &Value::Null).unwrap();
        assert!(db.get_report("1").unwrap().is_none());

        db.set_transaction("t", &json!({ "transactionID": "t", "reportID": "1" })).unwrap();
        db.set_transaction("t", &Value::Null).unwrap();
        assert!(db.get_transaction("t").unwrap().is_none());
    }

    #[test]
    fn test_actions_merge_per_entry() {
        let db = Database::open_in_memory().unwrap();
        db.merge_report_actions(
            "r",
            &json!({
                "b": { "reportActionID": "b", "actionName": "ADDCOMMENT", "created": "2024-01-01 10:00:01.000" },
                "a": { "reportActionID": "a", "actionName": "CREATED", "created": "2024-01-01 10:00:00.000" },
            }),
        )
        .unwrap();
        db.merge_report_actions("r", &json!({ "b": { "pendingAction": "add" } })).unwrap();

        let actions = db.get_report_actions("r").unwrap();
        assert_eq!(actions.len(), 2);
        assert!(actions["b"].pending_action.is_some());
        assert!(actions["a"].is_created());

        let mut rx = db.subscribe();
        db.merge_report_actions("r", &json!({ "b": null })).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreChange::ReportActionRemoved {
                report_id: "r".into(),
                action_id: "b".into()
            }
        );
        assert!(db.get_report_action("r", "b").unwrap().is_none());
    }

    #[test]
    fn test_remove_missing_action_publishes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let mut rx = db.subscribe();
        db.remove_report_action("r", "nope").unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_transactions_by_report() {
        let db = Database::open_in_memory().unwrap();
        db.set_transaction("t1", &json!({ "transactionID": "t1", "reportID": "iou", "amount": 100 }))
            .unwrap();
        db.set_transaction("t2", &json!({ "transactionID": "t2", "reportID": "other" }))
            .unwrap();
        db.merge_transaction("t1", &json!({ "merchant": "Cafe" })).unwrap();

        let transactions = db.get_report_transactions("iou").unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].merchant, "Cafe");
        assert_eq!(transactions[0].amount, 100);
    }

    #[test]
    fn test_import_json() {
        let db = Database::open_in_memory().unwrap();
        let imported = db
            .import_json(&json!({
                "reports": { "1": { "reportID": "1", "reportName": "General" } },
                "reportActions": { "1": {
                    "10": { "reportActionID": "10", "actionName": "CREATED", "created": "2024-01-01 00:00:00.000" }
                } },
                "transactions": {},
            }))
            .unwrap();
        assert_eq!(imported, 2);
        assert_eq!(db.get_report("1").unwrap().unwrap().report_name, "General");
        assert!(db.get_report_action("1", "10").unwrap().is_some());

        assert!(db.import_json(&json!({ "reports": [] })).is_err());
    }

    #[test]
    fn test_apply_update_rejects_non_object_actions() {
        let db = Database::open_in_memory().unwrap();
        let update = StoreUpdate::merge(StoreKey::ReportActions("r".into()), json!([1, 2]));
        assert!(db.apply_update(&update).is_err());
    }
}
