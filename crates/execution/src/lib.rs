//! Context registration, command submission and ordered execution.
//!
//! This crate drives commands through their lifecycle on top of a
//! [`GridStore`](conductor_core::GridStore):
//!
//! - [`ContextsManager`] registers contexts and reads them back
//! - [`CommandSubmitter`] issues a ticket to each command, stores it and
//!   cancels it while it has not started
//! - [`CommandExecutor`] runs submitted commands in ticket order, each in an
//!   [`ExecutionEnvironment`], and replays interrupted ones
//!
//! ```text
//! PendingContext ──register──▶ Submitted ──claim──▶ Executing ──▶ removed
//!                                  │                    ▲
//!                                  └──cancel──▶ removed └──recover
//! ```

mod command;
mod config;
mod contexts;
pub mod entries;
mod environment;
mod error;
mod executor;
mod registry;
mod submitter;
mod tickets;

pub use command::{Command, Context};
pub use config::SubmitterConfig;
pub use contexts::ContextsManager;
pub use entries::{CommandExecutionRequest, RequestStatus};
pub use environment::{ExecutionEnvironment, ExecutionFrame};
pub use error::{CommandError, EnvironmentError, ExecutionError, SubmissionError};
pub use executor::{CommandExecutor, CommandOutcome, ExecutionReport};
pub use registry::CommandRegistry;
pub use submitter::CommandSubmitter;
