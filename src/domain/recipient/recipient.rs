use log::{info, trace, warn};
use serde::{Deserialize, Serialize};
use std::result;
use thiserror::Error;

use crate::{render, ColumnMapping, Placeholder, Row, Table, Values};

use super::is_valid_email;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot build send list: email column is not mapped")]
    MissingEmailColumnError,
    #[error("cannot build send list: email column {0:?} does not exist")]
    UnknownEmailColumnError(String),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents a send-ready recipient: the address and the message
/// rendered from its row.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RenderedRecipient {
    pub email: String,
    pub subject: String,
    pub body: String,
    /// Represents the 1-based position of the source row.
    pub row: usize,
}

/// Represents a row excluded from the send list because its email
/// address is missing or malformed.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Skip {
    /// Represents the 1-based position of the source row.
    pub row: usize,
    /// Represents the rejected cell value, if any.
    pub email: Option<String>,
}

/// Represents the outcome of the table normalization.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct SendList {
    pub recipients: Vec<RenderedRecipient>,
    pub skipped: Vec<Skip>,
}

impl SendList {
    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

impl From<Vec<RenderedRecipient>> for SendList {
    fn from(recipients: Vec<RenderedRecipient>) -> Self {
        Self {
            recipients,
            skipped: vec![],
        }
    }
}

/// Collects the placeholder values of the given row. Unmapped
/// placeholders and absent cells give empty values.
pub fn row_values(row: &Row, mapping: &ColumnMapping) -> Values {
    Placeholder::ALL
        .iter()
        .map(|placeholder| {
            let value = mapping
                .get(*placeholder)
                .and_then(|column| row.get(column))
                .unwrap_or_default();
            (*placeholder, value.to_owned())
        })
        .collect()
}

/// Turns the table rows into send-ready recipients.
///
/// Rows without a valid email address are skipped, not rejected.
/// Row order is preserved and duplicate addresses are kept.
pub fn build_send_list(
    table: &Table,
    email_column: Option<&str>,
    mapping: &ColumnMapping,
    subject_tpl: &str,
    body_tpl: &str,
) -> Result<SendList> {
    trace!(">> build send list");

    let email_column = email_column.ok_or(Error::MissingEmailColumnError)?;
    if !table.has_column(email_column) {
        return Err(Error::UnknownEmailColumnError(email_column.to_owned()));
    }

    let mut list = SendList::default();

    for (i, row) in table.rows.iter().enumerate() {
        let position = i + 1;

        let email = match row.get(email_column).map(str::trim) {
            Some(email) if is_valid_email(email) => email,
            email => {
                warn!("skipping row {}: invalid or missing email {:?}", position, email);
                list.skipped.push(Skip {
                    row: position,
                    email: email.map(ToOwned::to_owned),
                });
                continue;
            }
        };

        let values = row_values(row, mapping);
        list.recipients.push(RenderedRecipient {
            email: email.to_owned(),
            subject: render(subject_tpl, &values),
            body: render(body_tpl, &values),
            row: position,
        });
    }

    info!(
        "send list built: {} recipient(s), {} skipped row(s)",
        list.recipients.len(),
        list.skipped.len()
    );
    trace!("<< build send list");
    Ok(list)
}
