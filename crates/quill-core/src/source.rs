//! Read access to the replica, and an in-memory implementation of it.

use std::collections::BTreeMap;

use quill_types::updates::UpdateMethod;
use quill_types::{
    OptimisticBatch, Phase, Report, ReportAction, StoreKey, StoreUpdate, Transaction, deep_merge,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

pub trait ReportSource {
    fn report(&self, report_id: &str) -> Option<Report>;

    /// All actions of a report, keyed the way they are stored.
    fn report_actions(&self, report_id: &str) -> BTreeMap<String, ReportAction>;

    fn report_action(&self, report_id: &str, action_id: &str) -> Option<ReportAction> {
        self.report_actions(report_id).remove(action_id)
    }
}

pub trait TransactionSource {
    fn transaction(&self, transaction_id: &str) -> Option<Transaction>;

    fn report_transactions(&self, report_id: &str) -> Vec<Transaction>;
}

/// A replica held entirely in memory as raw JSON, so that merges behave the
/// same way they do in the persistent store.
#[derive(Debug, Clone, Default)]
pub struct Replica {
    reports: BTreeMap<String, Value>,
    report_actions: BTreeMap<String, Value>,
    transactions: BTreeMap<String, Value>,
}

fn decode<T: DeserializeOwned>(key: &str, value: &Value) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping undecodable record {}: {}", key, e);
            None
        }
    }
}

impl Replica {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, key: &StoreKey) -> (&mut BTreeMap<String, Value>, String) {
        match key {
            StoreKey::Report(id) => (&mut self.reports, id.clone()),
            StoreKey::ReportActions(id) => (&mut self.report_actions, id.clone()),
            StoreKey::Transaction(id) => (&mut self.transactions, id.clone()),
        }
    }

    pub fn apply(&mut self, update: &StoreUpdate) {
        let (table, id) = self.slot(&update.key);
        match update.method {
            UpdateMethod::Set if update.value.is_null() => {
                table.remove(&id);
            }
            UpdateMethod::Set => {
                table.insert(id, update.value.clone());
            }
            UpdateMethod::Merge => {
                let entry = table.entry(id).or_insert(Value::Null);
                deep_merge(entry, &update.value);
            }
        }
    }

    pub fn apply_all(&mut self, updates: &[StoreUpdate]) {
        for update in updates {
            self.apply(update);
        }
    }

    pub fn apply_batch(&mut self, batch: &OptimisticBatch, phase: Phase) {
        self.apply_all(batch.updates(phase));
    }

    pub fn insert_report(&mut self, report: &Report) {
        if let Ok(value) = serde_json::to_value(report) {
            self.reports.insert(report.report_id.clone(), value);
        }
    }

    pub fn insert_action(&mut self, report_id: &str, action: &ReportAction) {
        if let Ok(value) = serde_json::to_value(action) {
            let entry = self
                .report_actions
                .entry(report_id.to_string())
                .or_insert_with(|| Value::Object(Default::default()));
            if let Value::Object(map) = entry {
                map.insert(action.report_action_id.clone(), value);
            }
        }
    }

    pub fn insert_transaction(&mut self, transaction: &Transaction) {
        if let Ok(value) = serde_json::to_value(transaction) {
            self.transactions.insert(transaction.transaction_id.clone(), value);
        }
    }
}

impl ReportSource for Replica {
    fn report(&self, report_id: &str) -> Option<Report> {
        let value = self.reports.get(report_id)?;
        decode(report_id, value)
    }

    fn report_actions(&self, report_id: &str) -> BTreeMap<String, ReportAction> {
        let Some(Value::Object(map)) = self.report_actions.get(report_id) else {
            return BTreeMap::new();
        };
        map.iter()
            .filter_map(|(key, value)| decode(key, value).map(|action| (key.clone(), action)))
            .collect()
    }
}

impl TransactionSource for Replica {
    fn transaction(&self, transaction_id: &str) -> Option<Transaction> {
        let value = self.transactions.get(transaction_id)?;
        decode(transaction_id, value)
    }

    fn report_transactions(&self, report_id: &str) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter_map(|(key, value)| decode::<Transaction>(key, value))
            .filter(|t| t.report_id == report_id)
            .collect()
    }
}
