//! SMTP module.
//!
//! This module contains the SMTP implementation of the mail
//! submission channel. It drives a single low-level connection so
//! that connection, authentication and per-message failures surface
//! at distinct steps.

use lettre::{
    address::Envelope,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{SmtpConnection, TlsParameters},
        extension::ClientId,
    },
};
use log::{debug, trace};
use std::result;
use thiserror::Error;

use crate::{sender, Sender, SmtpConfig};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot build smtp tls parameters")]
    BuildTlsParamsError(#[source] lettre::transport::smtp::Error),
    #[error("cannot connect to smtp server {1}:{2}")]
    ConnectError(#[source] lettre::transport::smtp::Error, String, u16),
    #[error("cannot upgrade smtp connection with starttls")]
    StartTlsError(#[source] lettre::transport::smtp::Error),
    #[error("cannot authenticate to smtp server as {1}")]
    AuthError(#[source] lettre::transport::smtp::Error, String),
    #[error("cannot send email")]
    SendError(#[source] lettre::transport::smtp::Error),
    #[error("cannot close smtp connection")]
    QuitError(#[source] lettre::transport::smtp::Error),
}

pub type Result<T> = result::Result<T, Error>;

pub struct Smtp {
    config: SmtpConfig,
    conn: Option<SmtpConnection>,
}

impl Smtp {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config, conn: None }
    }

    fn tls_params(&self) -> Result<TlsParameters> {
        TlsParameters::builder(self.config.host.to_owned())
            .dangerous_accept_invalid_hostnames(self.config.insecure())
            .dangerous_accept_invalid_certs(self.config.insecure())
            .build()
            .map_err(Error::BuildTlsParamsError)
    }

    fn open(&self) -> Result<SmtpConnection> {
        let hello_name = ClientId::Domain(self.config.hello_name());
        let host = self.config.host.as_str();
        let port = self.config.port;
        let timeout = Some(self.config.timeout());

        let wrapper_tls = if self.config.ssl() && !self.config.starttls() {
            Some(self.tls_params()?)
        } else {
            None
        };

        let mut conn = SmtpConnection::connect::<(&str, u16)>(
            (host, port),
            timeout,
            &hello_name,
            wrapper_tls.as_ref(),
            None,
        )
        .map_err(|err| Error::ConnectError(err, host.to_owned(), port))?;

        if self.config.ssl() && self.config.starttls() {
            let tls = self.tls_params()?;
            conn.starttls(&tls, &hello_name)
                .map_err(Error::StartTlsError)?;
        }

        Ok(conn)
    }

    fn conn(&mut self) -> sender::Result<&mut SmtpConnection> {
        self.conn.as_mut().ok_or(sender::Error::NotConnectedError)
    }
}

impl Sender for Smtp {
    fn connect(&mut self) -> sender::Result<()> {
        trace!(">> connect smtp sender");
        debug!("smtp server: {}:{}", self.config.host, self.config.port);

        if let Some(mut conn) = self.conn.take() {
            conn.abort();
        }
        self.conn = Some(self.open()?);

        trace!("<< connect smtp sender");
        Ok(())
    }

    fn authenticate(&mut self, login: &str, passwd: &str) -> sender::Result<()> {
        trace!(">> authenticate smtp sender");

        let credentials = Credentials::new(login.to_owned(), passwd.to_owned());
        self.conn()?
            .auth(&[Mechanism::Plain, Mechanism::Login], &credentials)
            .map_err(|err| Error::AuthError(err, login.to_owned()))?;

        trace!("<< authenticate smtp sender");
        Ok(())
    }

    fn send(&mut self, envelope: &Envelope, raw: &[u8]) -> sender::Result<()> {
        self.conn()?
            .send(envelope, raw)
            .map_err(Error::SendError)?;
        Ok(())
    }

    fn close(&mut self) -> sender::Result<()> {
        trace!(">> close smtp sender");

        if let Some(mut conn) = self.conn.take() {
            if let Err(err) = conn.quit() {
                conn.abort();
                return Err(Error::QuitError(err).into());
            }
        }

        trace!("<< close smtp sender");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_before_connect() {
        let mut smtp = Smtp::new(SmtpConfig::default());
        let envelope = Envelope::new(
            Some("alice@localhost".parse().unwrap()),
            vec!["bob@localhost".parse().unwrap()],
        )
        .unwrap();

        assert!(matches!(
            smtp.send(&envelope, b""),
            Err(sender::Error::NotConnectedError)
        ));
        assert!(matches!(
            smtp.authenticate("alice@localhost", "password"),
            Err(sender::Error::NotConnectedError)
        ));
        assert!(smtp.close().is_ok());
    }

    #[test]
    fn connect_refused() {
        let mut smtp = Smtp::new(SmtpConfig {
            host: "127.0.0.1".into(),
            port: 1,
            ssl: Some(false),
            timeout: Some(2),
            ..SmtpConfig::default()
        });

        assert!(matches!(
            smtp.connect(),
            Err(sender::Error::SmtpError(Error::ConnectError(_, _, 1)))
        ));
    }
}
