//! Placement CLI Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Command-line front end of the copy interface: submit a replica plan and
//! follow the status of the requests it produced.

pub mod commands;
pub mod plan;
