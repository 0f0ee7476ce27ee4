//! Mapping module.
//!
//! This module contains the column mapping, which associates the
//! recipient email address and each placeholder to a column of the
//! loaded table, and the heuristic auto-mapper filling it.

mod mapping;
pub use mapping::*;
