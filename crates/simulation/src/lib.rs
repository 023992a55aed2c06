//! Deterministic in-memory grid.
//!
//! [`SimGrid`] implements [`GridStore`](conductor_core::GridStore) in process
//! memory so command processing can run end to end without a cluster. Keys
//! are placed into partitions by hashing their affinity, the same way every
//! run.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                     SimGrid                      │
//! │                                                  │
//! │  partition 0      partition 1   ...  partition n │
//! │  ┌────────────┐  ┌────────────┐     ┌──────────┐ │
//! │  │ cache →    │  │ cache →    │     │          │ │
//! │  │  key → ▣   │  │  key → ▣   │     │   ...    │ │
//! │  └────────────┘  └────────────┘     └──────────┘ │
//! │                                                  │
//! │  ▣ = entry with its own lock (held by invoke)    │
//! └──────────────────────────────────────────────────┘
//! ```

mod config;
mod grid;

pub use config::SimGridConfig;
pub use grid::{partition_for, SimGrid};
