//! Email module.
//!
//! This module contains the attachment sources and the message
//! builder assembling one outgoing email per recipient.

mod attachment;
pub use attachment::*;

mod email;
pub use email::*;
