//! Compact blocks of consecutive tickets for a single issuer.

use crate::Ticket;
use sbor::prelude::*;
use std::fmt;

/// The tickets `[from, to]` of one issuer.
///
/// Mutated in place and not synchronised: the owner must serialise access,
/// which in practice means the book is only touched while the entry holding
/// it is exclusively locked.
///
/// Books order by issuer, then by `from`, then by `to`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
pub struct TicketBook {
    issuer_id: i64,
    from: i64,
    to: i64,
}

impl TicketBook {
    /// Create an empty book for `issuer_id`.
    pub fn new(issuer_id: i64) -> Self {
        Self::with_bounds(issuer_id, 1, 0)
    }

    /// Create a book holding exactly `ticket`.
    pub fn from_ticket(ticket: Ticket) -> Self {
        Self::with_bounds(
            ticket.issuer_id(),
            ticket.sequence_number(),
            ticket.sequence_number(),
        )
    }

    /// Create a book for `[from, to]`. The book is empty if `from > to`.
    pub fn with_bounds(issuer_id: i64, from: i64, to: i64) -> Self {
        Self { issuer_id, from, to }
    }

    pub fn issuer_id(&self) -> i64 {
        self.issuer_id
    }

    pub fn from(&self) -> i64 {
        self.from
    }

    pub fn to(&self) -> i64 {
        self.to
    }

    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    /// Number of tickets in the book.
    pub fn size(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.to.abs_diff(self.from).saturating_add(1)
        }
    }

    pub fn contains(&self, ticket: &Ticket) -> bool {
        ticket.issuer_id() == self.issuer_id
            && self.from <= ticket.sequence_number()
            && ticket.sequence_number() <= self.to
    }

    /// Check whether both books belong to the same issuer and share a ticket.
    pub fn intersects(&self, other: &TicketBook) -> bool {
        self.issuer_id == other.issuer_id
            && !self.is_empty()
            && !other.is_empty()
            && self.from <= other.to
            && other.from <= self.to
    }

    /// Check whether both books belong to the same issuer and touch with no
    /// gap between them.
    pub fn is_adjacent(&self, other: &TicketBook) -> bool {
        self.issuer_id == other.issuer_id
            && !self.is_empty()
            && !other.is_empty()
            && (other.to.checked_add(1) == Some(self.from)
                || self.to.checked_add(1) == Some(other.from))
    }

    /// Add `ticket` if it is already held or directly extends either end.
    ///
    /// Returns `false`, leaving the book untouched, for any other ticket.
    pub fn add(&mut self, ticket: Ticket) -> bool {
        if self.contains(&ticket) {
            return true;
        }
        if ticket.issuer_id() != self.issuer_id {
            return false;
        }

        let sequence_number = ticket.sequence_number();
        if self.is_empty() {
            self.from = sequence_number;
            self.to = sequence_number;
            true
        } else if self.to.checked_add(1) == Some(sequence_number) {
            self.to = sequence_number;
            true
        } else if self.from.checked_sub(1) == Some(sequence_number) {
            self.from = sequence_number;
            true
        } else {
            false
        }
    }

    /// Absorb `other` if it belongs to the same issuer and intersects or
    /// touches this book.
    pub fn combine(&mut self, other: &TicketBook) -> bool {
        if !(self.intersects(other) || self.is_adjacent(other)) {
            return false;
        }
        self.from = self.from.min(other.from);
        self.to = self.to.max(other.to);
        true
    }

    /// Preview the first `n` tickets without taking them.
    pub fn first(&self, n: i64) -> TicketIter {
        let Some(to) = self.last_of_first(n) else {
            return TicketIter::empty(self.issuer_id);
        };
        TicketIter::new(self.issuer_id, self.from, to)
    }

    /// Take up to `n` tickets from the front of the book.
    ///
    /// Tickets returned here are never returned by a later call.
    pub fn issue(&mut self, n: i64) -> TicketIter {
        let issued = self.first(n);
        self.consume(n);
        issued
    }

    /// Drop up to `n` tickets from the front of the book.
    pub fn consume(&mut self, n: i64) {
        let Some(to) = self.last_of_first(n) else {
            return;
        };
        match to.checked_add(1) {
            Some(next) => self.from = next,
            // Nothing follows the last sequence number
            None => {
                self.from = 1;
                self.to = 0;
            }
        }
    }

    /// Iterate every ticket in the book.
    pub fn iter(&self) -> TicketIter {
        if self.is_empty() {
            return TicketIter::empty(self.issuer_id);
        }
        TicketIter::new(self.issuer_id, self.from, self.to)
    }

    /// Sequence number of the last ticket among the first `n`.
    fn last_of_first(&self, n: i64) -> Option<i64> {
        if n <= 0 || self.is_empty() {
            return None;
        }
        Some(self.from.saturating_add(n - 1).min(self.to))
    }
}

impl<'a> IntoIterator for &'a TicketBook {
    type Item = Ticket;
    type IntoIter = TicketIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for TicketBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TicketBook({}, {}..{})", self.issuer_id, self.from, self.to)
    }
}

/// Iterator over a block of consecutive tickets.
#[derive(Debug, Clone)]
pub struct TicketIter {
    issuer_id: i64,
    next: i64,
    to: i64,
    exhausted: bool,
}

impl TicketIter {
    fn new(issuer_id: i64, from: i64, to: i64) -> Self {
        Self {
            issuer_id,
            next: from,
            to,
            exhausted: from > to,
        }
    }

    fn empty(issuer_id: i64) -> Self {
        Self::new(issuer_id, 1, 0)
    }
}

impl Iterator for TicketIter {
    type Item = Ticket;

    fn next(&mut self) -> Option<Ticket> {
        if self.exhausted {
            return None;
        }
        let ticket = Ticket::new(self.issuer_id, self.next);
        if self.next == self.to {
            self.exhausted = true;
        } else {
            self.next += 1;
        }
        Some(ticket)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted {
            return (0, Some(0));
        }
        let remaining = usize::try_from(self.to.abs_diff(self.next))
            .ok()
            .and_then(|n| n.checked_add(1));
        (remaining.unwrap_or(usize::MAX), remaining)
    }
}

impl std::iter::FusedIterator for TicketIter {}
