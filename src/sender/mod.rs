pub mod sender;
pub use sender::{Credential, Error, Result, Sender};

pub mod smtp;
#[cfg(feature = "smtp-sender")]
pub use smtp::{Smtp, SmtpConfig};
