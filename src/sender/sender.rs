//! Sender module.
//!
//! This module contains the mail submission channel interface: the
//! dispatch engine opens it, authenticates, hands it one envelope and
//! raw message per recipient, then closes it.

use lettre::address::Envelope;
use serde::{Deserialize, Serialize};
use std::{fmt, result};
use thiserror::Error;

use crate::process;

#[cfg(feature = "smtp-sender")]
use crate::sender::smtp;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot get credential")]
    GetCredentialError(#[source] process::Error),
    #[error("cannot get credential: credential is empty")]
    GetCredentialEmptyError,
    #[error("cannot use sender: sender is not connected")]
    NotConnectedError,
    #[error("submission server rejected the request: {0}")]
    RejectedError(String),

    #[cfg(feature = "smtp-sender")]
    #[error(transparent)]
    SmtpError(#[from] smtp::Error),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents the mail submission channel.
///
/// Implementations are stateful and must not be shared between two
/// running campaigns.
pub trait Sender {
    /// Opens the connection to the submission server.
    fn connect(&mut self) -> Result<()>;
    /// Presents the sender credential on the opened connection.
    fn authenticate(&mut self, login: &str, passwd: &str) -> Result<()>;
    /// Transmits one raw message to the envelope recipients.
    fn send(&mut self, envelope: &Envelope, raw: &[u8]) -> Result<()>;
    /// Gracefully terminates the connection.
    fn close(&mut self) -> Result<()>;
}

impl<S: Sender + ?Sized> Sender for Box<S> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn authenticate(&mut self, login: &str, passwd: &str) -> Result<()> {
        (**self).authenticate(login, passwd)
    }

    fn send(&mut self, envelope: &Envelope, raw: &[u8]) -> Result<()> {
        (**self).send(envelope, raw)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Represents the sender credential.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credential {
    /// The secret itself.
    Raw(String),
    /// A shell command printing the secret on its first output line.
    Cmd(String),
}

impl Default for Credential {
    fn default() -> Self {
        Self::Raw(String::default())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(_) => write!(f, "Raw(<redacted>)"),
            Self::Cmd(cmd) => write!(f, "Cmd({:?})", cmd),
        }
    }
}

impl Credential {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Raw(passwd) => passwd.is_empty(),
            Self::Cmd(cmd) => cmd.trim().is_empty(),
        }
    }

    /// Resolves the secret, running the command if needed.
    pub fn resolve(&self) -> Result<String> {
        let passwd = match self {
            Self::Raw(passwd) => passwd.to_owned(),
            Self::Cmd(cmd) => process::run(cmd)
                .map_err(Error::GetCredentialError)?
                .lines()
                .next()
                .map(ToOwned::to_owned)
                .unwrap_or_default(),
        };

        if passwd.is_empty() {
            return Err(Error::GetCredentialEmptyError);
        }

        Ok(passwd)
    }
}
