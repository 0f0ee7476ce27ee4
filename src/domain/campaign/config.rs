//! Campaign config module.
//!
//! This module contains the settings snapshot a campaign runs with.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{
    build_send_list, campaign::Error, is_valid_email, recipient, Attachment, ColumnMapping,
    Credential, SendList, Table,
};

use super::Result;

/// Represents the settings of a campaign. The dispatch engine works
/// on its own copy, so editing the caller's settings never affects a
/// running campaign.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CampaignSettings {
    /// Represents the sender email address.
    pub sender: String,
    /// Represents the login presented to the submission server.
    /// Defaults to the sender address.
    pub login: Option<String>,
    /// Represents the sender credential.
    pub credential: Credential,
    /// Represents the subject template.
    pub subject: String,
    /// Represents the body template.
    pub body: String,
    /// Represents the file attached to every email.
    pub attachment: Option<Attachment>,
    /// Represents the address copied on every email.
    pub cc: Option<String>,
    /// Represents the deferred start time of the campaign.
    pub send_at: Option<DateTime<Local>>,
    /// Delivers every email to the sender instead of the recipient.
    pub test_mode: bool,
}

impl CampaignSettings {
    pub fn login(&self) -> &str {
        self.login
            .as_deref()
            .filter(|login| !login.trim().is_empty())
            .unwrap_or_else(|| self.sender.trim())
    }

    /// Checks that the campaign can start at all.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_email(&self.sender) {
            return Err(Error::InvalidSenderError(self.sender.to_owned()));
        }

        if self.subject.trim().is_empty() {
            return Err(Error::EmptySubjectError);
        }

        if self.body.trim().is_empty() {
            return Err(Error::EmptyBodyError);
        }

        if self.credential.is_empty() {
            return Err(Error::MissingCredentialError);
        }

        if let Some(Attachment::Path(path)) = self.attachment.as_ref() {
            if !path.is_file() {
                return Err(Error::MissingAttachmentError(path.to_owned()));
            }
        }

        Ok(())
    }

    /// Renders the send list of the given table with the subject and
    /// body templates of these settings.
    pub fn send_list(&self, table: &Table, mapping: &ColumnMapping) -> recipient::Result<SendList> {
        build_send_list(
            table,
            mapping.email_column(&table.headers),
            mapping,
            &self.subject,
            &self.body,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Placeholder;

    fn settings() -> CampaignSettings {
        CampaignSettings {
            sender: "me@example.com".into(),
            credential: Credential::Raw("secret".into()),
            subject: "Hello {{FIRST_NAME}}".into(),
            body: "Dear {{FIRST_NAME}},".into(),
            ..CampaignSettings::default()
        }
    }

    #[test]
    fn validate_settings() {
        assert!(settings().validate().is_ok());

        let invalid = CampaignSettings {
            sender: "me".into(),
            ..settings()
        };
        assert!(matches!(
            invalid.validate(),
            Err(Error::InvalidSenderError(sender)) if sender == "me"
        ));

        let invalid = CampaignSettings {
            subject: " ".into(),
            ..settings()
        };
        assert!(matches!(invalid.validate(), Err(Error::EmptySubjectError)));

        let invalid = CampaignSettings {
            body: "\n".into(),
            ..settings()
        };
        assert!(matches!(invalid.validate(), Err(Error::EmptyBodyError)));

        let invalid = CampaignSettings {
            credential: Credential::default(),
            ..settings()
        };
        assert!(matches!(invalid.validate(), Err(Error::MissingCredentialError)));

        let invalid = CampaignSettings {
            attachment: Some(Attachment::Path("/nonexistent/cv.pdf".into())),
            ..settings()
        };
        assert!(matches!(
            invalid.validate(),
            Err(Error::MissingAttachmentError(_))
        ));
    }

    #[test]
    fn login_defaults_to_sender() {
        assert_eq!("me@example.com", settings().login());

        let settings = CampaignSettings {
            login: Some("me".into()),
            ..settings()
        };
        assert_eq!("me", settings.login());
    }

    #[test]
    fn send_list_uses_templates() {
        let table = Table::from_records(["Email", "First Name"], vec![vec!["a@b.com", "Ada"]]);
        let mapping = ColumnMapping::default().autodetect(&table.headers);
        assert_eq!(Some("First Name"), mapping.get(Placeholder::FirstName));

        let list = settings().send_list(&table, &mapping).unwrap();
        assert_eq!("Hello Ada", list.recipients[0].subject);
        assert_eq!("Dear Ada,", list.recipients[0].body);
    }

    #[test]
    fn settings_round_trip_through_json() {
        let settings = CampaignSettings {
            cc: Some("boss@example.com".into()),
            test_mode: true,
            ..settings()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(settings, serde_json::from_str(&json).unwrap());
    }
}
