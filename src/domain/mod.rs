//! Domain module.
//!
//! This module contains the mail merge domain: templates, column
//! mapping, recipients, emails, campaigns and their scheduling.

pub mod template;
pub use template::{render, Placeholder, Values};

pub mod table;
pub use table::{Row, Table};

pub mod mapping;
pub use mapping::{autodetect, ColumnMapping};

pub mod recipient;
pub use recipient::{
    build_send_list, is_valid_email, row_values, RenderedRecipient, SendList, Skip,
};

pub mod email;
pub use email::{build_message, Attachment, Email};

pub mod campaign;
pub use campaign::{
    CampaignSettings, Delivery, Dispatcher, LogObserver, Observer, Outcome, Report, Tally,
    DEFAULT_SEND_DELAY,
};

pub mod schedule;
pub use schedule::{
    parse_send_at, CampaignRun, Ledger, ScheduledCampaign, Scheduler, SchedulerHandle,
    SqliteLedger, Status, Submission,
};
