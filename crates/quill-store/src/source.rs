//! Lets the engine read straight from the database. Read errors are logged
//! and treated as missing records.

use std::collections::BTreeMap;

use quill_core::source::{ReportSource, TransactionSource};
use quill_types::{Report, ReportAction, Transaction};
use tracing::warn;

use crate::Database;

impl ReportSource for Database {
    fn report(&self, report_id: &str) -> Option<Report> {
        self.get_report(report_id)
            .map_err(|e| warn!("Failed to read report {}: {:#}", report_id, e))
            .ok()
            .flatten()
    }

    fn report_actions(&self, report_id: &str) -> BTreeMap<String, ReportAction> {
        self.get_report_actions(report_id)
            .map_err(|e| warn!("Failed to read actions of report {}: {:#}", report_id, e))
            .unwrap_or_default()
    }

    fn report_action(&self, report_id: &str, action_id: &str) -> Option<ReportAction> {
        self.get_report_action(report_id, action_id)
            .map_err(|e| warn!("Failed to read action {} of report {}: {:#}", action_id, report_id, e))
            .ok()
            .flatten()
    }
}

impl TransactionSource for Database {
    fn transaction(&self, transaction_id: &str) -> Option<Transaction> {
        self.get_transaction(transaction_id)
            .map_err(|e| warn!("Failed to read transaction {}: {:#}", transaction_id, e))
            .ok()
            .flatten()
    }

    fn report_transactions(&self, report_id: &str) -> Vec<Transaction> {
        self.get_report_transactions(report_id)
            .map_err(|e| warn!("Failed to read transactions of report {}: {:#}", report_id, e))
            .unwrap_or_default()
    }
}
