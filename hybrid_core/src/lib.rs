#![forbid(unsafe_code)]

//! Core domain model and business logic for the Hybrid Master 51 tracker.
//!
//! This crate provides:
//! - Domain types (program weeks, sessions, exercises, journal)
//! - Program generation
//! - Rest and global countdown timers
//! - Persistence (key-value stores, versioned envelope, import/export)
//! - Derived stats and the volume chart
//! - Drive backup and the built-in self-test

pub mod types;
pub mod error;
pub mod journal;
pub mod program;
pub mod config;
pub mod logging;
pub mod timer;
pub mod store;
pub mod persistence;
pub mod export;
pub mod stats;
pub mod drive;
pub mod tracker;
pub mod view;
pub mod selftest;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use journal::{Journal, JournalEntry, JournalKey};
pub use program::Program;
pub use config::Config;
pub use persistence::{Gateway, SaveReceipt};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use timer::{Clock, SystemClock, TimerEvent, TimerRegistry};
pub use tracker::{Tracker, WeekChange};
pub use view::DashboardView;
pub use selftest::SelfTestReport;
