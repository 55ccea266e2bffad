use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reports (
            report_id   TEXT PRIMARY KEY,
            body        TEXT NOT NULL,
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS report_actions (
            report_id           TEXT NOT NULL,
            report_action_id    TEXT NOT NULL,
            created             TEXT NOT NULL DEFAULT '',
            body                TEXT NOT NULL,
            updated_at          TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (report_id, report_action_id)
        );

        CREATE INDEX IF NOT EXISTS idx_report_actions_created
            ON report_actions(report_id, created);

        CREATE TABLE IF NOT EXISTS transactions (
            transaction_id  TEXT PRIMARY KEY,
            report_id       TEXT NOT NULL DEFAULT '',
            body            TEXT NOT NULL,
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_report
            ON transactions(report_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
