//! Report action reconstruction and optimistic mutations for the quill client.
//!
//! Everything here is synchronous and works on values read through
//! [`source::ReportSource`] and [`source::TransactionSource`]. Writes are never
//! performed directly; the optimistic builders return [`quill_types::OptimisticBatch`]
//! values for the store to apply.

pub mod ancestry;
pub mod config;
pub mod context;
pub mod continuity;
pub mod error;
pub mod grouping;
pub mod ids;
pub mod linkage;
pub mod optimistic;
pub mod ordering;
pub mod phrase;
pub mod preview;
pub mod rich_text;
pub mod source;
pub mod spend;
pub mod time;
pub mod visibility;

pub use config::EngineConfig;
pub use context::{Context, Snapshot};
pub use error::{Error, Result};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use optimistic::{CommentBody, MutationBuilder};
pub use ordering::Direction;
pub use phrase::{EnglishLocalizer, Localizer, Phrase};
pub use preview::PreviewComposer;
pub use rich_text::{BasicRichText, RichText};
pub use source::{Replica, ReportSource, TransactionSource};
pub use time::{Clock, FixedClock, SystemClock};
