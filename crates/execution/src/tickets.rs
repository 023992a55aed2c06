//! Durable issuance of tickets.

use crate::entries::Caches;
use crate::SubmissionError;
use conductor_core::GridCache;
use conductor_types::{EntryKey, Ticket, TicketBook};
use parking_lot::Mutex;
use tracing::debug;

/// Issues the tickets of one issuer from blocks reserved in the store.
///
/// Blocks are reserved atomically under the issuer's entry, so sources
/// sharing an issuer never hand out the same ticket, whether they live on
/// different members or one replaced another after a restart. Tickets left
/// in the block of a dropped source are never issued.
///
/// Within one source tickets increase in issuance order.
#[derive(Debug)]
pub(crate) struct TicketSource {
    issuer_id: i64,
    key: EntryKey,
    reservations: GridCache<i64>,
    block_size: i64,
    reserved: Mutex<TicketBook>,
}

impl TicketSource {
    /// Create a source for `issuer_id`. Sources with different `purpose`s
    /// number their tickets independently.
    pub fn new(caches: &Caches, issuer_id: i64, purpose: &str, block_size: i64) -> Self {
        Self {
            issuer_id,
            key: EntryKey::new(format!("{issuer_id}/{purpose}")),
            reservations: caches.issuers.clone(),
            block_size: block_size.max(1),
            reserved: Mutex::new(TicketBook::new(issuer_id)),
        }
    }

    /// Issue the next ticket, reserving a new block when the current one is
    /// used up.
    pub fn next(&self) -> Result<Ticket, SubmissionError> {
        let mut reserved = self.reserved.lock();
        if reserved.is_empty() {
            *reserved = self.reserve()?;
        }

        let ticket = Ticket::new(self.issuer_id, reserved.from());
        reserved.consume(1);
        Ok(ticket)
    }

    fn reserve(&self) -> Result<TicketBook, SubmissionError> {
        let (issuer_id, block_size) = (self.issuer_id, self.block_size);
        let book = self.reservations.invoke(&self.key, |last| {
            let from = last.unwrap_or(0).checked_add(1)?;
            let to = from.saturating_add(block_size - 1);
            *last = Some(to);
            Some(TicketBook::with_bounds(issuer_id, from, to))
        })?;

        let book = book.ok_or(SubmissionError::TicketsExhausted(issuer_id))?;
        debug!(issuer = issuer_id, book = %book, "Reserved tickets");
        Ok(book)
    }
}
