use serde::{Deserialize, Serialize};

/// Change notifications published by the replica after each write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StoreChange {
    /// A report record was merged, replaced or created
    ReportUpdated { report_id: String },

    /// One or more actions of a report changed
    ReportActionsUpdated {
        report_id: String,
        action_ids: Vec<String>,
    },

    /// An action was removed outright (rollback of a provisional write)
    ReportActionRemoved { report_id: String, action_id: String },

    /// A transaction record changed
    TransactionUpdated { transaction_id: String },
}

impl StoreChange {
    /// Report the change belongs to, if any.
    pub fn report_id(&self) -> Option<&str> {
        match self {
            Self::ReportUpdated { report_id }
            | Self::ReportActionsUpdated { report_id, .. }
            | Self::ReportActionRemoved { report_id, .. } => Some(report_id),
            Self::TransactionUpdated { .. } => None,
        }
    }
}
