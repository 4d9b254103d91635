//! Offline-first record engine for personal finance tracking.
//!
//! Two pieces live here:
//!
//! - the earnings rule ([`current_earnings`], [`EarningsSnapshot`]): pure
//!   arithmetic over income, expense and goal rows;
//! - the [`SyncManager`]: creates and lists records against a remote store,
//!   keeps them locally when the remote is unreachable and reconciles them
//!   later.
//!
//! Collaborators are injected through traits: [`LocalStore`] (implemented by
//! [`SqliteStore`]), [`RemoteStore`] and [`Connectivity`] (implemented by
//! [`ConnectivitySignal`]).

pub use connectivity::{Connectivity, ConnectivitySignal};
pub use currency::Currency;
pub use earnings::{EarningsSnapshot, budget_utilization, current_earnings, goal_progress};
pub use error::EngineError;
pub use money::Money;
pub use payloads::{
    Asset, BudgetCategory, BudgetPeriod, Goal, Income, Transaction, TransactionKind,
};
pub use records::{Record, RecordId, RecordKind, RecordPayload, StoredRecord, SyncStatus};
pub use remote::{RemoteError, RemoteRecord, RemoteStore};
pub use scheduler::SyncScheduler;
pub use store::{LocalStore, RecordFilter, RecordPatch, SqliteStore};
pub use sync::{
    SkipReason, SweepOutcome, SweepReport, SyncCounts, SyncManager, SyncManagerBuilder,
};

mod connectivity;
mod currency;
mod earnings;
mod error;
mod money;
mod payloads;
mod records;
mod remote;
mod scheduler;
mod store;
mod sync;

pub type ResultEngine<T> = Result<T, EngineError>;
