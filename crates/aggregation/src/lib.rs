//! Ticket aggregation across partitions.
//!
//! Tickets of outstanding work are scattered over every partition of the
//! store. Aggregation compacts them into the minimal list of disjoint,
//! maximal [`TicketBook`]s in two passes:
//!
//! 1. [`reduce_partition`] packs the tickets seen by one partition into
//!    books. Partitions are reduced independently and in parallel.
//! 2. [`merge_partials`] merges the partial results of every partition.
//!
//! Reducing locally first keeps the merge input small: a partition holding a
//! thousand consecutive tickets contributes a single book.
//!
//! The merge does not depend on the order partial results arrive in. Books
//! order by issuer and then by bounds, so the merged sequence is the same
//! however the partials were produced.

use conductor_types::{Ticket, TicketBook};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Books of one partition, sorted by issuer and then by bounds.
pub type SortedTicketBooks = BTreeSet<TicketBook>;

/// First pass: pack the tickets seen by one partition into books.
///
/// Tickets may arrive in any order and may repeat.
pub fn reduce_partition(tickets: impl IntoIterator<Item = Ticket>) -> SortedTicketBooks {
    let mut by_issuer: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for ticket in tickets {
        by_issuer
            .entry(ticket.issuer_id())
            .or_default()
            .insert(ticket.sequence_number());
    }

    let mut books = SortedTicketBooks::new();
    for (issuer_id, sequence_numbers) in by_issuer {
        let mut current: Option<TicketBook> = None;
        for sequence_number in sequence_numbers {
            let ticket = Ticket::new(issuer_id, sequence_number);
            if !current.as_mut().is_some_and(|book| book.add(ticket)) {
                if let Some(done) = current.replace(TicketBook::from_ticket(ticket)) {
                    books.insert(done);
                }
            }
        }
        books.extend(current);
    }
    books
}

/// Second pass: merge the partial results of every partition.
///
/// Returns disjoint, maximal books ordered by issuer and then by `from`.
pub fn merge_partials(partials: impl IntoIterator<Item = SortedTicketBooks>) -> Vec<TicketBook> {
    let all: SortedTicketBooks = partials.into_iter().flatten().collect();

    let mut merged: Vec<TicketBook> = Vec::with_capacity(all.len());
    for book in all {
        if !merged
            .last_mut()
            .is_some_and(|previous| previous.combine(&book))
        {
            merged.push(book);
        }
    }
    merged
}

/// Run both passes over tickets already split by partition.
pub fn aggregate_parallel(partitions: Vec<Vec<Ticket>>) -> Vec<TicketBook> {
    let partition_count = partitions.len();
    let partials: Vec<SortedTicketBooks> = partitions
        .into_par_iter()
        .map(reduce_partition)
        .collect();

    let partial_books: usize = partials.iter().map(BTreeSet::len).sum();
    let merged = merge_partials(partials);

    debug!(
        partitions = partition_count,
        partial_books,
        books = merged.len(),
        "Aggregated tickets"
    );
    merged
}

/// Run both passes, collecting each partition's tickets with `collect`.
///
/// `collect` is called once per partition, in parallel. The first error
/// aborts the aggregation.
pub fn try_aggregate_partitions<E, F>(partition_count: u32, collect: F) -> Result<Vec<TicketBook>, E>
where
    E: Send,
    F: Fn(u32) -> Result<Vec<Ticket>, E> + Sync,
{
    let partials: Vec<SortedTicketBooks> = (0..partition_count)
        .into_par_iter()
        .map(|partition| collect(partition).map(reduce_partition))
        .collect::<Result<_, E>>()?;

    let merged = merge_partials(partials);
    debug!(
        partitions = partition_count,
        books = merged.len(),
        "Aggregated tickets"
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn tickets(pairs: &[(i64, i64)]) -> Vec<Ticket> {
        pairs.iter().map(|&(i, s)| Ticket::new(i, s)).collect()
    }

    #[test]
    fn test_reduce_single_partition() {
        let books = reduce_partition(tickets(&[(1, 5), (1, 2), (1, 1), (1, 3), (1, 2)]));
        assert_eq!(
            books.into_iter().collect::<Vec<_>>(),
            vec![
                TicketBook::with_bounds(1, 1, 3),
                TicketBook::with_bounds(1, 5, 5)
            ]
        );
    }

    #[test]
    fn test_reduce_groups_by_issuer() {
        let books = reduce_partition(tickets(&[(2, 1), (1, 1), (2, 2), (1, 2)]));
        assert_eq!(
            books.into_iter().collect::<Vec<_>>(),
            vec![
                TicketBook::with_bounds(1, 1, 2),
                TicketBook::with_bounds(2, 1, 2)
            ]
        );
    }

    #[test]
    fn test_split_across_partitions() {
        // Duplicates and out-of-order arrival over three partitions
        let partitions = vec![
            tickets(&[(1, 3), (1, 5)]),
            tickets(&[(1, 2), (1, 3)]),
            tickets(&[(1, 1), (1, 5), (1, 1)]),
        ];

        assert_eq!(
            aggregate_parallel(partitions),
            vec![
                TicketBook::with_bounds(1, 1, 3),
                TicketBook::with_bounds(1, 5, 5)
            ]
        );
    }

    #[test]
    fn test_merge_is_order_insensitive() {
        let a = reduce_partition(tickets(&[(1, 1), (1, 2)]));
        let b = reduce_partition(tickets(&[(1, 3), (2, 7)]));
        let c = reduce_partition(tickets(&[(1, 4), (2, 8), (1, 10)]));

        let forward = merge_partials(vec![a.clone(), b.clone(), c.clone()]);
        let backward = merge_partials(vec![c, b, a]);

        assert_eq!(forward, backward);
        assert_eq!(
            forward,
            vec![
                TicketBook::with_bounds(1, 1, 4),
                TicketBook::with_bounds(1, 10, 10),
                TicketBook::with_bounds(2, 7, 8),
            ]
        );
    }

    #[test]
    fn test_sampled_partitioning_matches_single_pass() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..50 {
            let mut all: Vec<Ticket> = (0..200)
                .map(|_| Ticket::new(rng.gen_range(0..3), rng.gen_range(1..60)))
                .collect();
            let expected = merge_partials([reduce_partition(all.clone())]);

            all.shuffle(&mut rng);
            let partition_count = rng.gen_range(1..8);
            let mut partitions = vec![Vec::new(); partition_count];
            for ticket in all {
                partitions[rng.gen_range(0..partition_count)].push(ticket);
            }

            let merged = aggregate_parallel(partitions);
            assert_eq!(merged, expected);
            // Maximal: no two neighbouring books can be combined
            for pair in merged.windows(2) {
                let mut first = pair[0].clone();
                assert!(!first.combine(&pair[1]));
            }
        }
    }

    #[test]
    fn test_try_aggregate_propagates_errors() {
        let result: Result<Vec<TicketBook>, String> = try_aggregate_partitions(4, |partition| {
            if partition == 2 {
                Err(format!("partition {partition} lost"))
            } else {
                Ok(vec![Ticket::new(1, i64::from(partition) + 1)])
            }
        });
        assert_eq!(result, Err("partition 2 lost".to_string()));

        let ok: Result<Vec<TicketBook>, String> =
            try_aggregate_partitions(4, |partition| Ok(vec![Ticket::new(1, i64::from(partition) + 1)]));
        assert_eq!(ok, Ok(vec![TicketBook::with_bounds(1, 1, 4)]));
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_parallel(Vec::new()).is_empty());
        assert!(merge_partials(Vec::<SortedTicketBooks>::new()).is_empty());
    }
}
