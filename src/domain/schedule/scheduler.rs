use chrono::{DateTime, Local};
use log::{debug, info, trace, warn};
use std::{
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc, Mutex, MutexGuard,
    },
    thread,
    time::Duration,
};

use crate::{
    campaign, CampaignSettings, Dispatcher, Observer, Report, SendList, Sender,
    DEFAULT_SEND_DELAY,
};

use super::{Error, Ledger, Result, ScheduledCampaign, Status};

/// Delay before the first check of the background scheduler.
pub const FIRST_CHECK_DELAY: Duration = Duration::from_secs(2);

/// Delay between two checks of the background scheduler.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Builds a fresh sender for every campaign run.
pub type SenderFactory = dyn Fn() -> Box<dyn Sender> + Send + Sync;

type SharedLedger = Arc<Mutex<Box<dyn Ledger + Send>>>;

/// Represents what happened to a submitted campaign.
#[derive(Debug)]
pub enum Submission {
    /// The campaign had no start time and ran immediately.
    Sent(Report),
    /// The campaign is saved in the ledger under the given id.
    Scheduled(String),
}

/// Represents the run of a due campaign.
#[derive(Debug)]
pub struct CampaignRun {
    pub id: String,
    pub result: campaign::Result<Report>,
}

/// Runs campaigns now or saves them in the ledger until they are
/// due.
///
/// A due campaign is marked sent right before it runs and removed
/// from the ledger after, whatever its outcome: it never runs twice.
#[derive(Clone)]
pub struct Scheduler {
    ledger: SharedLedger,
    sender_factory: Arc<SenderFactory>,
    send_delay: Duration,
    first_check: Duration,
    interval: Duration,
}

impl Scheduler {
    pub fn new<L, F>(ledger: L, sender_factory: F) -> Self
    where
        L: Ledger + Send + 'static,
        F: Fn() -> Box<dyn Sender> + Send + Sync + 'static,
    {
        let ledger: Box<dyn Ledger + Send> = Box::new(ledger);
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            sender_factory: Arc::new(sender_factory),
            send_delay: DEFAULT_SEND_DELAY,
            first_check: FIRST_CHECK_DELAY,
            interval: CHECK_INTERVAL,
        }
    }

    pub fn send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    pub fn check_intervals(mut self, first_check: Duration, interval: Duration) -> Self {
        self.first_check = first_check;
        self.interval = interval;
        self
    }

    fn ledger(&self) -> Result<MutexGuard<Box<dyn Ledger + Send>>> {
        self.ledger.lock().map_err(|_| Error::LockLedgerError)
    }

    fn dispatcher(&self) -> Dispatcher<Box<dyn Sender>> {
        Dispatcher::new((self.sender_factory)()).delay(self.send_delay)
    }

    /// Saves the campaign in the ledger until the given time. A time
    /// not strictly in the future is rejected and nothing is saved.
    pub fn schedule(
        &self,
        send_at: DateTime<Local>,
        mut settings: CampaignSettings,
        list: SendList,
    ) -> Result<String> {
        trace!(">> schedule campaign at {}", send_at);

        if send_at <= Local::now() {
            return Err(Error::PastSendTimeError(send_at));
        }

        settings.validate()?;
        settings.send_at = Some(send_at);

        let campaign = ScheduledCampaign::new(send_at, settings, list);
        self.ledger()?.save(&campaign)?;
        info!(
            "campaign {} scheduled at {} for {} recipient(s), {} skipped row(s)",
            campaign.id,
            send_at,
            campaign.recipients.len(),
            campaign.skipped.len()
        );

        trace!("<< schedule campaign");
        Ok(campaign.id)
    }

    /// Runs the campaign now, or schedules it when it has a start
    /// time.
    pub fn submit(
        &self,
        settings: CampaignSettings,
        list: SendList,
        observer: &mut dyn Observer,
    ) -> Result<Submission> {
        match settings.send_at {
            Some(send_at) => {
                let id = self.schedule(send_at, settings, list)?;
                Ok(Submission::Scheduled(id))
            }
            None => {
                let report = self.dispatcher().run_send_list(&settings, &list, observer)?;
                Ok(Submission::Sent(report))
            }
        }
    }

    pub fn pending(&self) -> Result<Vec<ScheduledCampaign>> {
        self.ledger()?.load_pending()
    }

    /// Runs every pending campaign due at the given time, oldest
    /// first.
    ///
    /// A campaign that cannot be marked sent is left pending and
    /// skipped. A campaign that cannot be removed after its run stays
    /// marked sent, it never runs again.
    pub fn run_due(
        &self,
        now: DateTime<Local>,
        observer: &mut dyn Observer,
    ) -> Result<Vec<CampaignRun>> {
        trace!(">> run campaigns due at {}", now);

        let due: Vec<ScheduledCampaign> = self
            .ledger()?
            .load_pending()?
            .into_iter()
            .filter(|campaign| campaign.is_due(&now))
            .collect();

        debug!("{} campaign(s) due", due.len());

        let mut runs = Vec::with_capacity(due.len());
        for mut campaign in due {
            match self.pick_up(&campaign.id) {
                Ok(true) => (),
                Ok(false) => {
                    debug!("campaign {} already picked up", campaign.id);
                    continue;
                }
                Err(err) => {
                    warn!("cannot pick up scheduled campaign {}: {}", campaign.id, err);
                    continue;
                }
            }

            info!("running scheduled campaign {}", campaign.id);

            campaign.settings.send_at = None;
            let list = SendList {
                recipients: campaign.recipients,
                skipped: campaign.skipped,
            };
            let result = self
                .dispatcher()
                .run_send_list(&campaign.settings, &list, observer);
            if let Err(err) = &result {
                warn!("scheduled campaign {} aborted: {}", campaign.id, err);
            }

            if let Err(err) = self.ledger().and_then(|ledger| ledger.remove(&campaign.id)) {
                warn!("cannot remove scheduled campaign {}: {}", campaign.id, err);
            }

            runs.push(CampaignRun {
                id: campaign.id,
                result,
            });
        }

        trace!("<< run due campaigns");
        Ok(runs)
    }

    /// Marks the campaign sent if it is still pending. Another clone
    /// of the scheduler may have picked it up in the meantime.
    fn pick_up(&self, id: &str) -> Result<bool> {
        let ledger = self.ledger()?;
        let pending = ledger
            .load_pending()?
            .iter()
            .any(|campaign| campaign.id == id);
        if pending {
            ledger.set_status(id, Status::Sent)?;
        }
        Ok(pending)
    }

    /// Checks the ledger on a background thread, first after a short
    /// delay then at a regular interval, until stopped.
    pub fn spawn<O: Observer + Send + 'static>(&self, mut observer: O) -> SchedulerHandle {
        let (stop, stopped) = mpsc::channel::<()>();
        let scheduler = self.clone();

        let thread = thread::spawn(move || {
            let mut wait = scheduler.first_check;
            loop {
                match stopped.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => (),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                if let Err(err) = scheduler.run_due(Local::now(), &mut observer) {
                    warn!("cannot run due campaigns: {}", err);
                }

                wait = scheduler.interval;
            }
            debug!("scheduler stopped");
        });

        SchedulerHandle { stop, thread }
    }
}

/// Represents a running background scheduler.
pub struct SchedulerHandle {
    stop: mpsc::Sender<()>,
    thread: thread::JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops the scheduler and waits for the campaign it may be
    /// running.
    pub fn stop(self) {
        // the thread may already be gone
        let _ = self.stop.send(());
        if self.thread.join().is_err() {
            warn!("scheduler thread panicked");
        }
    }
}
