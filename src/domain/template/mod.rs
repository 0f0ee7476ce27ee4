//! Template module.
//!
//! This module contains the placeholder set and the template
//! renderer used to personalize subjects and bodies.

mod placeholder;
pub use placeholder::*;

mod tpl;
pub use tpl::*;
