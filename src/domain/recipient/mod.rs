//! Recipient module.
//!
//! This module contains the email syntax check and the normalizer
//! turning table rows into send-ready recipients.

mod validate;
pub use validate::*;

mod recipient;
pub use recipient::*;
