use chrono::{DateTime, Local};
use log::{debug, info, trace, warn};
use proc_lock::{lock, LockPath};
use std::{borrow::Cow, error, io, path::PathBuf, result, thread, time::Duration};
use thiserror::Error;

use crate::{
    build_message, sender, CampaignSettings, Delivery, Observer, Outcome, RenderedRecipient,
    Report, SendList, Sender, Skip, Tally,
};

/// Pause between two consecutive emails of a campaign.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid sender address {0:?}")]
    InvalidSenderError(String),
    #[error("subject template is empty")]
    EmptySubjectError,
    #[error("body template is empty")]
    EmptyBodyError,
    #[error("sender credential is missing")]
    MissingCredentialError,
    #[error("cannot find attachment at {0:?}")]
    MissingAttachmentError(PathBuf),
    #[error("campaign starts at {0}: submit it to the scheduler")]
    DeferredCampaignError(DateTime<Local>),
    #[error("cannot get sender credential")]
    GetCredentialError(#[source] sender::Error),
    #[error("cannot lock campaign of sender {1}")]
    LockCampaignError(#[source] io::Error, String),
    #[error("cannot connect to submission server")]
    ConnectError(#[source] sender::Error, Tally),
    #[error("cannot authenticate to submission server")]
    AuthError(#[source] sender::Error, Tally),
}

impl Error {
    /// Returns the tally of a campaign aborted before sending
    /// anything.
    pub fn tally(&self) -> Option<&Tally> {
        match self {
            Self::ConnectError(_, tally) | Self::AuthError(_, tally) => Some(tally),
            _ => None,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Joins the given error and its sources, so the server response
/// buried in the chain is kept.
pub(crate) fn error_chain(err: &dyn error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        chain.push_str(": ");
        chain.push_str(&err.to_string());
        source = err.source();
    }
    chain
}

fn lock_path(sender: &str) -> LockPath<String> {
    let sender: String = sender
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '@' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    LockPath::Tmp(format!("mailmerge-{}.lock", sender))
}

/// Rewrites the recipient of a test campaign: the email goes to the
/// sender, with a note naming the original recipient.
fn test_recipient(recipient: &RenderedRecipient, sender: &str) -> RenderedRecipient {
    RenderedRecipient {
        email: sender.trim().to_owned(),
        body: format!(
            "{}\n\n[TEST MODE - Original recipient would have been: {}]",
            recipient.body, recipient.email
        ),
        ..recipient.clone()
    }
}

/// Sends one email per recipient over a single session of the
/// wrapped sender.
///
/// A failure for one recipient never stops the campaign. Only a
/// connection or an authentication failure aborts it, before any
/// email is sent.
pub struct Dispatcher<S: Sender> {
    sender: S,
    delay: Duration,
}

impl<S: Sender> Dispatcher<S> {
    pub fn new(sender: S) -> Self {
        Self {
            sender,
            delay: DEFAULT_SEND_DELAY,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn into_sender(self) -> S {
        self.sender
    }

    /// Runs the campaign now. A campaign with a start time is
    /// rejected before connecting, it goes through the scheduler.
    pub fn run(
        &mut self,
        settings: &CampaignSettings,
        recipients: &[RenderedRecipient],
        observer: &mut dyn Observer,
    ) -> Result<Report> {
        self.run_with_skips(settings, recipients, &[], observer)
    }

    /// Runs the campaign of the given send list now. Skipped rows are
    /// reported first, they are never attempted.
    pub fn run_send_list(
        &mut self,
        settings: &CampaignSettings,
        list: &SendList,
        observer: &mut dyn Observer,
    ) -> Result<Report> {
        self.run_with_skips(settings, &list.recipients, &list.skipped, observer)
    }

    fn run_with_skips(
        &mut self,
        settings: &CampaignSettings,
        recipients: &[RenderedRecipient],
        skipped: &[Skip],
        observer: &mut dyn Observer,
    ) -> Result<Report> {
        trace!(">> run campaign of {}", settings.sender);

        settings.validate()?;
        if let Some(send_at) = settings.send_at {
            return Err(Error::DeferredCampaignError(send_at));
        }

        let passwd = settings
            .credential
            .resolve()
            .map_err(Error::GetCredentialError)?;

        let guard = lock(&lock_path(&settings.sender))
            .map_err(|err| Error::LockCampaignError(err, settings.sender.to_owned()))?;

        let total = recipients.len();
        let mut report = Report {
            deliveries: Vec::with_capacity(skipped.len() + total),
            tally: Tally::new(total),
        };

        for skip in skipped {
            let delivery = Delivery {
                row: skip.row,
                email: skip.email.clone().unwrap_or_default(),
                outcome: Outcome::SkippedInvalidEmail,
            };
            report.tally.record(&delivery.outcome);
            observer.outcome(&delivery);
            report.deliveries.push(delivery);
        }

        if settings.test_mode {
            info!("test mode enabled: every email goes to {}", settings.sender);
        }

        info!("connecting to submission server");
        if let Err(err) = self.sender.connect() {
            let tally = Tally::aborted(total, skipped.len());
            observer.campaign_done(&tally);
            drop(guard);
            return Err(Error::ConnectError(err, tally));
        }

        if let Err(err) = self.sender.authenticate(settings.login(), &passwd) {
            if let Err(err) = self.sender.close() {
                debug!("cannot close connection after authentication failure: {}", err);
            }
            let tally = Tally::aborted(total, skipped.len());
            observer.campaign_done(&tally);
            drop(guard);
            return Err(Error::AuthError(err, tally));
        }

        info!("sending {} email(s)", total);

        for (i, recipient) in recipients.iter().enumerate() {
            let outcome = self.send_one(settings, recipient);
            let delivery = Delivery {
                row: recipient.row,
                email: recipient.email.to_owned(),
                outcome,
            };

            report.tally.record(&delivery.outcome);
            observer.outcome(&delivery);
            observer.progress(i + 1, total);
            report.deliveries.push(delivery);

            if i + 1 < total && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }

        if let Err(err) = self.sender.close() {
            warn!("cannot close connection to submission server: {}", err);
        }

        drop(guard);

        info!(
            "campaign done: {} sent, {} failed, {} skipped",
            report.tally.sent, report.tally.failed, report.tally.skipped
        );
        observer.campaign_done(&report.tally);

        trace!("<< run campaign");
        Ok(report)
    }

    fn send_one(&mut self, settings: &CampaignSettings, recipient: &RenderedRecipient) -> Outcome {
        let (recipient, cc) = if settings.test_mode {
            (
                Cow::Owned(test_recipient(recipient, &settings.sender)),
                None,
            )
        } else {
            (Cow::Borrowed(recipient), settings.cc.as_deref())
        };

        let email = match build_message(
            &settings.sender,
            &recipient,
            cc,
            settings.attachment.as_ref(),
        ) {
            Ok(email) => email,
            Err(err) if err.is_attachment_error() => {
                return Outcome::AttachmentFailed(error_chain(&err))
            }
            Err(err) => return Outcome::SendFailed(error_chain(&err)),
        };

        match self.sender.send(&email.envelope, &email.formatted()) {
            Ok(()) => {
                debug!("email sent to {}", recipient.email);
                Outcome::Sent
            }
            Err(err) => Outcome::SendFailed(error_chain(&err)),
        }
    }
}

impl<S: Sender + Send + 'static> Dispatcher<S> {
    /// Runs the campaign on a background thread. The thread gives the
    /// dispatcher back along with the report.
    pub fn spawn<O: Observer + Send + 'static>(
        mut self,
        settings: CampaignSettings,
        recipients: Vec<RenderedRecipient>,
        mut observer: O,
    ) -> thread::JoinHandle<(Self, Result<Report>)> {
        thread::spawn(move || {
            let report = self.run(&settings, &recipients, &mut observer);
            (self, report)
        })
    }
}
