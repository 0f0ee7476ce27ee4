pub(crate) mod process;

pub mod sender;
pub use sender::{Credential, Sender};
#[cfg(feature = "smtp-sender")]
pub use sender::{Smtp, SmtpConfig};

pub mod domain;
pub use domain::*;
