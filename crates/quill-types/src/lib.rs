//! Record types shared by the quill engine, the local store and the replay tool.
//!
//! Field names serialize to the camelCase shapes the sync layer delivers, so a
//! record read from the server can be stored and merged without translation.

pub mod action;
pub mod events;
pub mod models;
pub mod updates;

pub use action::{ActionPayload, IouMessage, IouType, MessageFragment, PaymentType, ReportAction};
pub use events::StoreChange;
pub use models::{AccountId, PendingAction, PersonalDetails, Policy, Report, ReportType, Transaction};
pub use updates::{OptimisticBatch, Phase, StoreKey, StoreUpdate, UpdateMethod, deep_merge, replacement_patch};
