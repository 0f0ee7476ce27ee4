use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Represents the result of one recipient of a campaign.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Sent,
    /// The row had no valid email address, nothing was attempted.
    SkippedInvalidEmail,
    /// The transmission failed. Holds the transport error chain.
    SendFailed(String),
    /// The attachment could not be read. Holds the error chain.
    AttachmentFailed(String),
}

impl Outcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::SendFailed(_) | Self::AttachmentFailed(_))
    }
}

/// Represents the outcome of one row of the table.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    /// Represents the 1-based position of the source row.
    pub row: usize,
    /// Represents the original recipient address, even in test mode.
    pub email: String,
    pub outcome: Outcome,
}

/// Represents the counters of a campaign.
///
/// `total` counts the recipients of the send list only, skipped rows
/// are counted apart. When the campaign completes,
/// `sent + failed == total`.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
}

impl Tally {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Builds the tally of a campaign that could not send anything.
    pub fn aborted(total: usize, skipped: usize) -> Self {
        Self {
            sent: 0,
            failed: total,
            skipped,
            total,
        }
    }

    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Sent => self.sent += 1,
            Outcome::SkippedInvalidEmail => self.skipped += 1,
            Outcome::SendFailed(_) | Outcome::AttachmentFailed(_) => self.failed += 1,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.sent + self.failed == self.total
    }
}

/// Represents the final report of a completed campaign.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub deliveries: Vec<Delivery>,
    pub tally: Tally,
}

impl Report {
    pub fn failures(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(|d| d.outcome.is_failed())
    }
}

/// Receives the events of a running campaign. Events are emitted in
/// order, `campaign_done` always comes last, even when the campaign
/// aborts on a connection or authentication error.
pub trait Observer {
    /// Called after each attempted recipient, with `current` going
    /// from 1 to `total`.
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn outcome(&mut self, _delivery: &Delivery) {}
    fn campaign_done(&mut self, _tally: &Tally) {}
}

impl Observer for () {}

impl<O: Observer + ?Sized> Observer for Box<O> {
    fn progress(&mut self, current: usize, total: usize) {
        (**self).progress(current, total)
    }

    fn outcome(&mut self, delivery: &Delivery) {
        (**self).outcome(delivery)
    }

    fn campaign_done(&mut self, tally: &Tally) {
        (**self).campaign_done(tally)
    }
}

/// Observer reporting the campaign events through the logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn progress(&mut self, current: usize, total: usize) {
        info!("campaign progress: {}/{}", current, total);
    }

    fn outcome(&mut self, delivery: &Delivery) {
        match &delivery.outcome {
            Outcome::Sent => info!("row {}: email sent to {}", delivery.row, delivery.email),
            Outcome::SkippedInvalidEmail => {
                warn!("row {}: invalid email {:?} skipped", delivery.row, delivery.email)
            }
            Outcome::SendFailed(err) => {
                warn!("row {}: cannot send email to {}: {}", delivery.row, delivery.email, err)
            }
            Outcome::AttachmentFailed(err) => {
                warn!("row {}: cannot attach file for {}: {}", delivery.row, delivery.email, err)
            }
        }
    }

    fn campaign_done(&mut self, tally: &Tally) {
        info!(
            "campaign done: {} sent, {} failed, {} skipped, {} total",
            tally.sent, tally.failed, tally.skipped, tally.total
        );
    }
}
