//! Value types for ordered command processing.
//!
//! This crate has no I/O. It provides:
//!
//! - The [`Range`] algebra: immutable sets of `i64` values that are
//!   contiguous, sparse or infinite
//! - [`Ticket`]s, the order tokens issued to commands, and the
//!   [`TicketGenerator`] that issues them
//! - [`TicketBook`], a compact block of consecutive tickets
//! - Identifiers, [`ContextConfiguration`] and [`SubmissionOutcome`]

mod context;
mod error;
mod identifiers;
mod outcome;
mod range;
mod ticket;
mod ticket_book;

pub use context::{ContextConfiguration, ManagementStrategy};
pub use error::RangeError;
pub use identifiers::{ContextIdentifier, EntryKey, RequestIdentifier};
pub use outcome::SubmissionOutcome;
pub use range::{ContiguousRange, Range, RangeIter, SparseRange};
pub use ticket::{Ticket, TicketGenerator};
pub use ticket_book::{TicketBook, TicketIter};
