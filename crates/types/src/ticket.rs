//! Ordering tokens issued to submitted commands.

use sbor::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// A position in the global command order.
///
/// Tickets order by issuer first, then by sequence number within the issuer.
/// A ticket is a plain value; equal tickets denote the same submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
pub struct Ticket {
    issuer_id: i64,
    sequence_number: i64,
}

impl Ticket {
    /// Sentinel for "no ticket assigned".
    ///
    /// Only meaningful in an explicit `is_none` check, never in ordering.
    pub const NONE: Self = Self {
        issuer_id: -1,
        sequence_number: -1,
    };

    pub const fn new(issuer_id: i64, sequence_number: i64) -> Self {
        Self {
            issuer_id,
            sequence_number,
        }
    }

    pub fn issuer_id(&self) -> i64 {
        self.issuer_id
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.issuer_id, self.sequence_number)
    }
}

/// Issues tickets for a single issuer.
///
/// Sequence numbers start at 1 and are handed out through an atomic counter,
/// so concurrent callers never receive the same number.
#[derive(Debug)]
pub struct TicketGenerator {
    issuer_id: i64,
    next_sequence_number: AtomicI64,
}

impl TicketGenerator {
    /// Create a generator whose first ticket has sequence number 1.
    pub fn new(issuer_id: i64) -> Self {
        Self::starting_at(issuer_id, 1)
    }

    /// Create a generator that continues from `next_sequence_number`.
    ///
    /// Used when an issuer is rebuilt after its previous owner went away and
    /// the highest issued ticket is known.
    pub fn starting_at(issuer_id: i64, next_sequence_number: i64) -> Self {
        Self {
            issuer_id,
            next_sequence_number: AtomicI64::new(next_sequence_number),
        }
    }

    pub fn issuer_id(&self) -> i64 {
        self.issuer_id
    }

    /// Issue the next ticket.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Ticket {
        let sequence_number = self.next_sequence_number.fetch_add(1, Ordering::SeqCst);
        Ticket::new(self.issuer_id, sequence_number)
    }

    /// Sequence number the next call to [`Self::next`] will use.
    pub fn peek_next(&self) -> i64 {
        self.next_sequence_number.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_ticket_ordering() {
        let a = Ticket::new(1, 5);
        let b = Ticket::new(1, 6);
        let c = Ticket::new(2, 1);

        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
        assert_eq!(a, Ticket::new(1, 5));

        // Exactly one relation holds for every pair
        let tickets = [a, b, c, Ticket::new(0, 100), Ticket::new(2, 0)];
        for x in &tickets {
            for y in &tickets {
                let relations = [x < y, x == y, x > y];
                assert_eq!(relations.iter().filter(|r| **r).count(), 1);
            }
        }
    }

    #[test]
    fn test_none_sentinel() {
        assert!(Ticket::NONE.is_none());
        assert!(!Ticket::new(-1, 0).is_none());
        assert_eq!(Ticket::NONE.issuer_id(), -1);
        assert_eq!(Ticket::NONE.sequence_number(), -1);
    }

    #[test]
    fn test_generator_sequence() {
        let generator = TicketGenerator::new(7);
        assert_eq!(generator.next(), Ticket::new(7, 1));
        assert_eq!(generator.next(), Ticket::new(7, 2));
        assert_eq!(generator.peek_next(), 3);

        let resumed = TicketGenerator::starting_at(7, 40);
        assert_eq!(resumed.next(), Ticket::new(7, 40));
    }

    #[test]
    fn test_generator_concurrent_uniqueness() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 1_250;

        let generator = TicketGenerator::new(3);

        let issued: Vec<Vec<i64>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        (0..PER_THREAD)
                            .map(|_| generator.next().sequence_number())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let all: Vec<i64> = issued.into_iter().flatten().collect();
        assert_eq!(all.len(), THREADS * PER_THREAD);

        let distinct: BTreeSet<i64> = all.into_iter().collect();
        let expected: BTreeSet<i64> = (1..=(THREADS * PER_THREAD) as i64).collect();
        assert_eq!(distinct, expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Ticket::new(4, 12).to_string(), "4.12");
    }
}
