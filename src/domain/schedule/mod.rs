//! Schedule module.
//!
//! This module contains the scheduling ledger persisting deferred
//! campaigns and the scheduler running them once due.

mod ledger;
pub use ledger::*;

mod sqlite;
pub use sqlite::SqliteLedger;

mod scheduler;
pub use scheduler::*;
