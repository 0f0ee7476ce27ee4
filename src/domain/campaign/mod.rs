//! Campaign module.
//!
//! This module contains the campaign settings, the per-recipient
//! outcomes and the dispatch engine sending one email per recipient
//! over a single submission connection.

pub mod config;
pub use config::CampaignSettings;

mod outcome;
pub use outcome::*;

mod dispatch;
pub use dispatch::*;
