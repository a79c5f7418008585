//! taskdeck - in-memory record store for tasks, epics and subtasks
//!
//! This library provides the core of the taskdeck CLI: a store that keeps
//! scheduled records from overlapping, derives each epic's status and time
//! window from its subtasks, and remembers which records were viewed most
//! recently.
//!
//! # Core Concepts
//!
//! - **Records**: tasks, epics and subtasks sharing one id space
//! - **Interval index**: start-ordered view of every scheduled record
//! - **Epic rollup**: status and window computed from an epic's subtasks
//! - **View history**: duplicate-free recency order with O(1) updates
//! - **Snapshot**: flat CSV text the store can be saved to and rebuilt from
//!
//! # Module Organization
//!
//! - `record`: Record model and time parsing helpers
//! - `interval`: Ordered interval index and overlap checks
//! - `aggregate`: Epic status and window rollup
//! - `history`: Recency tracker behind the `ViewHistory` trait
//! - `store`: The record store
//! - `snapshot`: CSV encoding and decoding
//! - `storage`: File-backed store with atomic saves
//! - `config`: Configuration loading from `.taskdeck.toml`
//! - `error`: Error types and result aliases
//! - `output`: Human and JSON output for the CLI
//! - `cli`: Command-line interface using clap

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod interval;
pub mod output;
pub mod record;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use error::{Error, Result};
