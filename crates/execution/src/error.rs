//! Error types for submission and execution.

use conductor_core::{CodecError, StoreError};
use conductor_types::{ContextIdentifier, RangeError, RequestIdentifier};
use thiserror::Error;

/// Errors from registering contexts and submitting or cancelling commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("no context is registered as {0}")]
    UnknownContext(ContextIdentifier),

    #[error("context {0} is already registered")]
    ContextAlreadyRegistered(ContextIdentifier),

    #[error("a request is already stored for {0}")]
    TicketInUse(RequestIdentifier),

    #[error("issuer {0} has no sequence numbers left")]
    TicketsExhausted(i64),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("ticket tracking error: {0}")]
    Range(#[from] RangeError),
}

/// Errors from driving command execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("no context is registered as {0}")]
    UnknownContext(ContextIdentifier),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ticket tracking error: {0}")]
    Range(#[from] RangeError),
}

/// Errors from the environment a command executes in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvironmentError {
    #[error("context cannot be cleared while a command executes")]
    NullContext,

    #[error("request {0} is no longer stored")]
    MissingRequest(RequestIdentifier),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Errors a command execution ends with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command failed: {0}")]
    Failed(String),

    #[error("no command is registered as {0}")]
    UnknownCommand(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("environment error: {0}")]
    Environment(#[from] EnvironmentError),
}
