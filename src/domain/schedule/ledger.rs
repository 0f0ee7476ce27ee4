use chrono::{DateTime, Local, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::{fmt, result, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

use crate::{campaign, CampaignSettings, RenderedRecipient, SendList, Skip};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot schedule campaign at {0}: time is in the past")]
    PastSendTimeError(DateTime<Local>),
    #[error("cannot parse send time {0:?}")]
    ParseSendTimeError(String),
    #[error("cannot parse send time {0:?}: local time is ambiguous or does not exist")]
    LocalSendTimeError(String),
    #[error("cannot parse campaign status {0:?}")]
    ParseStatusError(String),
    #[error("cannot serialize campaign {1}")]
    SerializeCampaignError(#[source] serde_json::Error, String),
    #[error("cannot access scheduling ledger: lock is poisoned")]
    LockLedgerError,

    #[error(transparent)]
    CampaignError(#[from] campaign::Error),
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),
}

pub type Result<T> = result::Result<T, Error>;

/// Parses a local send time, either `YYYY-MM-DD HH:MM` or `HH:MM`
/// for today.
pub fn parse_send_at(input: &str) -> Result<DateTime<Local>> {
    let input = input.trim();

    let naive = match NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        Ok(naive) => naive,
        Err(_) => {
            let time = NaiveTime::parse_from_str(input, "%H:%M")
                .map_err(|_| Error::ParseSendTimeError(input.to_owned()))?;
            Local::now().date_naive().and_time(time)
        }
    };

    naive
        .and_local_timezone(Local)
        .single()
        .ok_or_else(|| Error::LocalSendTimeError(input.to_owned()))
}

/// Represents the state of a scheduled campaign.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Pending,
    /// The campaign has been picked up, it never runs again.
    Sent,
    /// The stored send time cannot be read back.
    Invalid,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(status: &str) -> Result<Self> {
        match status {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "invalid" => Ok(Self::Invalid),
            status => Err(Error::ParseStatusError(status.to_owned())),
        }
    }
}

/// Represents a deferred campaign: the settings snapshot and the
/// already built send list, frozen when scheduled.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScheduledCampaign {
    pub id: String,
    pub send_at: DateTime<Local>,
    pub recipients: Vec<RenderedRecipient>,
    /// Rows left out of the send list, reported when the campaign
    /// runs.
    pub skipped: Vec<Skip>,
    pub settings: CampaignSettings,
    pub status: Status,
}

impl ScheduledCampaign {
    pub fn new(send_at: DateTime<Local>, settings: CampaignSettings, list: SendList) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            send_at,
            recipients: list.recipients,
            skipped: list.skipped,
            settings,
            status: Status::Pending,
        }
    }

    pub fn is_due(&self, now: &DateTime<Local>) -> bool {
        self.status == Status::Pending && self.send_at <= *now
    }
}

/// Represents the durable storage of the scheduled campaigns.
///
/// Implementations must survive a restart of the process: a pending
/// campaign saved before a restart is loaded again after.
pub trait Ledger {
    /// Saves the given campaign, replacing any campaign with the same
    /// id.
    fn save(&self, campaign: &ScheduledCampaign) -> Result<()>;
    /// Loads the pending campaigns ordered by send time. Entries
    /// whose send time cannot be read back are marked invalid and
    /// left out.
    fn load_pending(&self) -> Result<Vec<ScheduledCampaign>>;
    fn set_status(&self, id: &str, status: Status) -> Result<()>;
    fn remove(&self, id: &str) -> Result<()>;
}

impl<L: Ledger + ?Sized> Ledger for Box<L> {
    fn save(&self, campaign: &ScheduledCampaign) -> Result<()> {
        (**self).save(campaign)
    }

    fn load_pending(&self) -> Result<Vec<ScheduledCampaign>> {
        (**self).load_pending()
    }

    fn set_status(&self, id: &str, status: Status) -> Result<()> {
        (**self).set_status(id, status)
    }

    fn remove(&self, id: &str) -> Result<()> {
        (**self).remove(id)
    }
}
