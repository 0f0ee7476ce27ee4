use chrono::{DateTime, Local};
use log::{debug, trace, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::{Attachment, CampaignSettings, RenderedRecipient, Skip};

use super::{Error, Ledger, Result, ScheduledCampaign, Status};

const CREATE_CAMPAIGNS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS campaigns (
        id              TEXT     NOT NULL PRIMARY KEY,
        send_at         DATETIME NOT NULL,
        status          TEXT     NOT NULL,
        recipients      TEXT     NOT NULL,
        skipped         TEXT     NOT NULL,
        settings        TEXT     NOT NULL,
        attachment_name TEXT,
        attachment      BLOB
    )
";

const INSERT_CAMPAIGN: &str = "
    INSERT OR REPLACE INTO campaigns
    (id, send_at, status, recipients, skipped, settings, attachment_name, attachment)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
";

const SELECT_PENDING_CAMPAIGNS: &str = "
    SELECT id, send_at, recipients, skipped, settings, attachment_name, attachment
    FROM campaigns
    WHERE status = 'pending'
";

const SELECT_CAMPAIGN_STATUS: &str = "
    SELECT status
    FROM campaigns
    WHERE id = ?
";

const UPDATE_CAMPAIGN_STATUS: &str = "
    UPDATE campaigns
    SET status = ?
    WHERE id = ?
";

const DELETE_CAMPAIGN: &str = "
    DELETE FROM campaigns
    WHERE id = ?
";

type CampaignRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<Vec<u8>>,
);

/// Ledger persisting the scheduled campaigns in a SQLite database.
///
/// The settings and the send list are stored as JSON, an in-memory
/// attachment is stored apart as a blob.
pub struct SqliteLedger {
    db_path: PathBuf,
}

impl SqliteLedger {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            db_path: db_path.as_ref().to_owned(),
        }
    }

    fn db(&self) -> Result<Connection> {
        let db = Connection::open(&self.db_path)?;
        db.execute(CREATE_CAMPAIGNS_TABLE, [])?;
        Ok(db)
    }

    /// Returns the status of the given campaign, if it is still in
    /// the ledger.
    pub fn status(&self, id: &str) -> Result<Option<Status>> {
        let status: Option<String> = self
            .db()?
            .query_row(SELECT_CAMPAIGN_STATUS, [id], |row| row.get(0))
            .optional()?;
        status.map(|status| status.parse()).transpose()
    }

    fn parse_row(&self, row: CampaignRow) -> Option<ScheduledCampaign> {
        let (id, send_at, recipients, skipped, settings, attachment_name, attachment) = row;

        let send_at = match DateTime::parse_from_rfc3339(&send_at) {
            Ok(send_at) => send_at.with_timezone(&Local),
            Err(err) => {
                warn!("invalid send time {:?} of campaign {}: {}", send_at, id, err);
                return None;
            }
        };

        let recipients: Vec<RenderedRecipient> = match serde_json::from_str(&recipients) {
            Ok(recipients) => recipients,
            Err(err) => {
                warn!("invalid recipients of campaign {}: {}", id, err);
                return None;
            }
        };

        let skipped: Vec<Skip> = match serde_json::from_str(&skipped) {
            Ok(skipped) => skipped,
            Err(err) => {
                warn!("invalid skipped rows of campaign {}: {}", id, err);
                return None;
            }
        };

        let mut settings: CampaignSettings = match serde_json::from_str(&settings) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("invalid settings of campaign {}: {}", id, err);
                return None;
            }
        };

        if let (Some(filename), Some(content)) = (attachment_name, attachment) {
            settings.attachment = Some(Attachment::new(filename, content));
        }

        Some(ScheduledCampaign {
            id,
            send_at,
            recipients,
            skipped,
            settings,
            status: Status::Pending,
        })
    }
}

impl Ledger for SqliteLedger {
    fn save(&self, campaign: &ScheduledCampaign) -> Result<()> {
        trace!(">> save campaign {}", campaign.id);

        let mut settings = campaign.settings.clone();
        let (attachment_name, attachment) = match settings.attachment.take() {
            Some(Attachment::Inline { filename, content }) => (Some(filename), Some(content)),
            attachment => {
                settings.attachment = attachment;
                (None, None)
            }
        };

        let settings = serde_json::to_string(&settings)
            .map_err(|err| Error::SerializeCampaignError(err, campaign.id.to_owned()))?;
        let recipients = serde_json::to_string(&campaign.recipients)
            .map_err(|err| Error::SerializeCampaignError(err, campaign.id.to_owned()))?;
        let skipped = serde_json::to_string(&campaign.skipped)
            .map_err(|err| Error::SerializeCampaignError(err, campaign.id.to_owned()))?;

        self.db()?.execute(
            INSERT_CAMPAIGN,
            params![
                campaign.id,
                campaign.send_at.to_rfc3339(),
                campaign.status.as_str(),
                recipients,
                skipped,
                settings,
                attachment_name,
                attachment,
            ],
        )?;

        trace!("<< save campaign");
        Ok(())
    }

    fn load_pending(&self) -> Result<Vec<ScheduledCampaign>> {
        trace!(">> load pending campaigns");

        let db = self.db()?;
        let mut stmt = db.prepare(SELECT_PENDING_CAMPAIGNS)?;
        let rows: Vec<CampaignRow> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;

        let mut campaigns = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.0.to_owned();
            match self.parse_row(row) {
                Some(campaign) => campaigns.push(campaign),
                None => {
                    db.execute(UPDATE_CAMPAIGN_STATUS, [Status::Invalid.as_str(), id.as_str()])?;
                }
            }
        }
        campaigns.sort_by_key(|campaign| campaign.send_at);

        debug!("{} pending campaign(s) loaded", campaigns.len());
        trace!("<< load pending campaigns");
        Ok(campaigns)
    }

    fn set_status(&self, id: &str, status: Status) -> Result<()> {
        debug!("marking campaign {} as {}", id, status);
        self.db()?
            .execute(UPDATE_CAMPAIGN_STATUS, [status.as_str(), id])?;
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        debug!("removing campaign {}", id);
        self.db()?.execute(DELETE_CAMPAIGN, [id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;
    use crate::{Credential, SendList};

    fn ledger() -> (TempDir, SqliteLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SqliteLedger::new(dir.path().join("campaigns.sqlite"));
        (dir, ledger)
    }

    fn campaign(minutes: i64) -> ScheduledCampaign {
        ScheduledCampaign::new(
            Local::now() + Duration::minutes(minutes),
            CampaignSettings {
                sender: "me@example.com".into(),
                credential: Credential::Raw("secret".into()),
                subject: "Hi {{FIRST_NAME}}".into(),
                body: "Dear {{FIRST_NAME}},".into(),
                attachment: Some(Attachment::new("cv.pdf", b"%PDF".to_vec())),
                ..CampaignSettings::default()
            },
            SendList {
                recipients: vec![RenderedRecipient {
                    email: "ada@acme.com".into(),
                    subject: "Hi Ada".into(),
                    body: "Dear Ada,".into(),
                    row: 1,
                }],
                skipped: vec![Skip {
                    row: 2,
                    email: Some("not-an-email".into()),
                }],
            },
        )
    }

    #[test]
    fn save_and_load_pending() {
        let (_dir, ledger) = ledger();
        let later = campaign(10);
        let sooner = campaign(5);
        ledger.save(&later).unwrap();
        ledger.save(&sooner).unwrap();

        let pending = ledger.load_pending().unwrap();

        assert_eq!(2, pending.len());
        assert_eq!(sooner.id, pending[0].id);
        assert_eq!(later.id, pending[1].id);
        assert_eq!(later.recipients, pending[1].recipients);
        assert_eq!(later.skipped, pending[1].skipped);
        assert_eq!(later.settings, pending[1].settings);
        assert_eq!(
            later.send_at.timestamp(),
            pending[1].send_at.timestamp()
        );
    }

    #[test]
    fn keep_path_attachment_in_settings() {
        let (dir, ledger) = ledger();
        let path = dir.path().join("cv.pdf");
        let mut campaign = campaign(5);
        campaign.settings.attachment = Some(Attachment::Path(path.clone()));
        ledger.save(&campaign).unwrap();

        let pending = ledger.load_pending().unwrap();
        assert_eq!(Some(Attachment::Path(path)), pending[0].settings.attachment);
    }

    #[test]
    fn update_and_remove() {
        let (_dir, ledger) = ledger();
        let campaign = campaign(5);
        ledger.save(&campaign).unwrap();

        ledger.set_status(&campaign.id, Status::Sent).unwrap();
        assert_eq!(Some(Status::Sent), ledger.status(&campaign.id).unwrap());
        assert!(ledger.load_pending().unwrap().is_empty());

        ledger.remove(&campaign.id).unwrap();
        assert_eq!(None, ledger.status(&campaign.id).unwrap());
    }

    #[test]
    fn mark_unreadable_send_time_invalid() {
        let (_dir, ledger) = ledger();
        let campaign = campaign(5);
        ledger.save(&campaign).unwrap();
        ledger
            .db()
            .unwrap()
            .execute(
                "UPDATE campaigns SET send_at = 'next monday' WHERE id = ?",
                [&campaign.id],
            )
            .unwrap();

        assert!(ledger.load_pending().unwrap().is_empty());
        assert_eq!(Some(Status::Invalid), ledger.status(&campaign.id).unwrap());
    }

    #[test]
    fn survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campaigns.sqlite");
        let campaign = campaign(5);
        SqliteLedger::new(&path).save(&campaign).unwrap();

        let pending = SqliteLedger::new(&path).load_pending().unwrap();
        assert_eq!(vec![campaign.id], pending.into_iter().map(|c| c.id).collect::<Vec<_>>());
    }
}
