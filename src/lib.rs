//! Expense sharing for groups: split an expense among members, then reduce
//! everyone's net balance to a short list of payables.
//!
//! The ledger modules ([`split`], [`balance`], [`settlement`], [`summary`]
//! and the [`Group`] mutations in [`group`]) are pure and take the group as
//! an argument. [`store`], [`mongo`] and [`routes`] wire them to storage and
//! HTTP.
pub mod auth;
pub mod balance;
pub mod error;
pub mod group;
pub mod money;
pub mod mongo;
pub mod routes;
pub mod schemas;
pub mod settings;
pub mod settlement;
pub mod split;
pub mod store;
pub mod summary;

pub use error::{LedgerError, LedgerResult};
pub use group::{EventDraft, SplitRequest, WeightEntry};
pub use schemas::{Event, Group, Member, MemberId, Payable, Split, SplitType};
pub use settlement::{recompute_settlement, settle, Settlement};
pub use split::Splitter;
pub use summary::{summarize, Summary};
