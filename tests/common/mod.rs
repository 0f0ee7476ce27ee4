#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use lettre::address::Envelope;
use mailmerge_lib::{sender, CampaignSettings, Credential, Delivery, Observer, Sender, Tally};

#[derive(Debug, Default)]
pub struct State {
    pub fail_connect: bool,
    pub fail_auth: bool,
    pub reject: Vec<String>,
    pub connects: usize,
    pub auth: Option<(String, String)>,
    pub sent: Vec<(Envelope, String)>,
    pub closed: bool,
}

/// Sender recording everything it is asked to transmit.
#[derive(Debug, Default, Clone)]
pub struct MockSender {
    state: Arc<Mutex<State>>,
}

impl MockSender {
    pub fn state(&self) -> MutexGuard<State> {
        self.state.lock().unwrap()
    }

    pub fn failing_connect() -> Self {
        let sender = Self::default();
        sender.state().fail_connect = true;
        sender
    }

    pub fn failing_auth() -> Self {
        let sender = Self::default();
        sender.state().fail_auth = true;
        sender
    }

    pub fn rejecting(email: &str) -> Self {
        let sender = Self::default();
        sender.state().reject.push(email.to_owned());
        sender
    }

    pub fn recipients(&self) -> Vec<Vec<String>> {
        self.state()
            .sent
            .iter()
            .map(|(envelope, _)| envelope.to().iter().map(ToString::to_string).collect())
            .collect()
    }
}

impl Sender for MockSender {
    fn connect(&mut self) -> sender::Result<()> {
        let mut state = self.state();
        state.connects += 1;
        if state.fail_connect {
            return Err(sender::Error::RejectedError("connection refused".into()));
        }
        Ok(())
    }

    fn authenticate(&mut self, login: &str, passwd: &str) -> sender::Result<()> {
        let mut state = self.state();
        if state.fail_auth {
            return Err(sender::Error::RejectedError(
                "535 authentication failed".into(),
            ));
        }
        state.auth = Some((login.to_owned(), passwd.to_owned()));
        Ok(())
    }

    fn send(&mut self, envelope: &Envelope, raw: &[u8]) -> sender::Result<()> {
        let mut state = self.state();
        let rejected = envelope
            .to()
            .iter()
            .any(|addr| state.reject.contains(&addr.to_string()));
        if rejected {
            return Err(sender::Error::RejectedError(
                "550 mailbox unavailable".into(),
            ));
        }
        state
            .sent
            .push((envelope.clone(), String::from_utf8_lossy(raw).into()));
        Ok(())
    }

    fn close(&mut self) -> sender::Result<()> {
        self.state().closed = true;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Progress(usize, usize),
    Outcome(Delivery),
    Done(Tally),
}

/// Observer recording the campaign events in order.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl Observer for Recorder {
    fn progress(&mut self, current: usize, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Progress(current, total));
    }

    fn outcome(&mut self, delivery: &Delivery) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Outcome(delivery.clone()));
    }

    fn campaign_done(&mut self, tally: &Tally) {
        self.events.lock().unwrap().push(Event::Done(*tally));
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn settings(sender: &str) -> CampaignSettings {
    CampaignSettings {
        sender: sender.into(),
        credential: Credential::Raw("secret".into()),
        subject: "Internship at {{COMPANY_NAME}}".into(),
        body: "Dear {{FIRST_NAME}},\n\nI would love to join {{COMPANY_NAME}}.".into(),
        ..CampaignSettings::default()
    }
}
