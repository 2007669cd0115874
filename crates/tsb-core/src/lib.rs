//! Core domain + sync pipeline for the timetable sync bot.
//!
//! Framework-agnostic: the gRPC-Web schedule service, SQLite state and the
//! messengers live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod diff;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod report;
pub mod scheduler;
pub mod subscriptions;
pub mod sync;

pub use errors::{Error, Result};
