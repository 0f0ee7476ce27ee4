use lettre::{
    address::{AddressError, Envelope},
    message::{
        header::{ContentDisposition, ContentTransferEncoding, ContentType, ContentTypeErr},
        Mailbox, MultiPart, SinglePart,
    },
};
use log::{trace, warn};
use std::{env, io, path::PathBuf, result};
use thiserror::Error;

use crate::{is_valid_email, Attachment, RenderedRecipient};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot expand attachment path {1}")]
    ExpandAttachmentPathError(#[source] shellexpand::LookupError<env::VarError>, String),
    #[error("cannot read attachment at {1:?}")]
    ReadAttachmentError(#[source] io::Error, PathBuf),
    #[error("cannot find attachment at {0:?}")]
    FindAttachmentError(PathBuf),
    #[error("cannot get file name of attachment {0:?}")]
    GetAttachmentFilenameError(PathBuf),
    #[error("cannot parse content type of attachment {1}")]
    ParseAttachmentContentTypeError(#[source] ContentTypeErr, String),
    #[error("cannot parse address {1:?}")]
    ParseAddressError(#[source] AddressError, String),
    #[error("cannot build email")]
    BuildEmailError(#[source] lettre::error::Error),
    #[error("cannot build envelope")]
    BuildEnvelopeError(#[source] lettre::error::Error),
}

impl Error {
    /// Tells whether the error comes from the attachment rather than
    /// from the email itself.
    pub fn is_attachment_error(&self) -> bool {
        matches!(
            self,
            Self::ExpandAttachmentPathError(..)
                | Self::ReadAttachmentError(..)
                | Self::FindAttachmentError(..)
                | Self::GetAttachmentFilenameError(..)
                | Self::ParseAttachmentContentTypeError(..)
        )
    }
}

pub type Result<T> = result::Result<T, Error>;

const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

/// Represents an outgoing email ready to be transmitted: the message
/// and the envelope actually used for delivery.
#[derive(Debug, Clone)]
pub struct Email {
    pub envelope: Envelope,
    pub message: lettre::Message,
}

impl Email {
    /// Returns the raw RFC 5322 message.
    pub fn formatted(&self) -> Vec<u8> {
        self.message.formatted()
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox> {
    addr.trim()
        .parse()
        .map_err(|err| Error::ParseAddressError(err, addr.to_owned()))
}

fn attachment_part(attachment: &Attachment) -> Result<SinglePart> {
    let (filename, content) = attachment.read()?;
    let content_type = ContentType::parse(ATTACHMENT_CONTENT_TYPE)
        .map_err(|err| Error::ParseAttachmentContentTypeError(err, filename.to_owned()))?;

    Ok(SinglePart::builder()
        .header(content_type)
        .header(ContentDisposition::attachment(&filename))
        .header(ContentTransferEncoding::Base64)
        .body(content.into_owned()))
}

/// Builds the email of one recipient.
///
/// A valid CC address is added both to the headers and to the
/// envelope, an invalid one is ignored. The attachment is sent as a
/// base64 encoded binary part.
pub fn build_message(
    sender: &str,
    recipient: &RenderedRecipient,
    cc: Option<&str>,
    attachment: Option<&Attachment>,
) -> Result<Email> {
    trace!(">> build email for {:?}", recipient.email);

    let from = parse_mailbox(sender)?;
    let to = parse_mailbox(&recipient.email)?;
    let cc = match cc.map(str::trim) {
        Some(cc) if is_valid_email(cc) => Some(parse_mailbox(cc)?),
        Some(cc) => {
            warn!("ignoring invalid cc address {:?}", cc);
            None
        }
        None => None,
    };

    let mut builder = lettre::Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(recipient.subject.to_owned());
    let mut rcpts = vec![to.email];

    if let Some(cc) = cc {
        rcpts.push(cc.email.clone());
        builder = builder.cc(cc);
    }

    let text = SinglePart::plain(recipient.body.to_owned());
    let message = match attachment {
        Some(attachment) => builder.multipart(
            MultiPart::mixed()
                .singlepart(text)
                .singlepart(attachment_part(attachment)?),
        ),
        None => builder.singlepart(text),
    }
    .map_err(Error::BuildEmailError)?;

    let envelope = Envelope::new(Some(from.email), rcpts).map_err(Error::BuildEnvelopeError)?;

    trace!("<< build email");
    Ok(Email { envelope, message })
}
