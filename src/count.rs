//! Frequency tables and top-N selection.
//!
//! One table per worker during the run (exclusively owned, so the increment
//! path is a plain hash-map bump with no synchronization), one master table
//! after the post-join merge. Counts are `u64`: overflow would take 2^64
//! occurrences of one key.

use ahash::AHashMap;

/// Occurrence counts keyed by 32-bit IP key.
#[derive(Clone, Debug, Default)]
pub struct FreqTable {
    counts: AHashMap<u32, u64>,
}

impl FreqTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments `key`, inserting a zero entry on first sight.
    #[inline]
    pub fn bump(&mut self, key: u32) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// Adds every entry of `other` into `self`.
    pub fn merge_from(&mut self, other: &FreqTable) {
        for (&key, &count) in &other.counts {
            *self.counts.entry(key).or_insert(0) += count;
        }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Count for `key`, zero if never seen.
    pub fn get(&self, key: u32) -> u64 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.counts.iter().map(|(&k, &v)| (k, v))
    }
}

/// Selects the `n` most frequent entries, descending by count.
///
/// Ties break deterministically: lowest key first. Result length is
/// `min(n, distinct keys)`.
pub fn top_n(table: &FreqTable, n: usize) -> Vec<(u32, u64)> {
    let mut entries: Vec<(u32, u64)> = table.iter().collect();
    entries.sort_unstable_by_key(|&(key, count)| (std::cmp::Reverse(count), key));
    entries.truncate(n);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_of(pairs: &[(u32, u64)]) -> FreqTable {
        let mut t = FreqTable::new();
        for &(key, count) in pairs {
            for _ in 0..count {
                t.bump(key);
            }
        }
        t
    }

    #[test]
    fn bump_inserts_then_increments() {
        let mut t = FreqTable::new();
        assert_eq!(t.get(7), 0);
        t.bump(7);
        t.bump(7);
        t.bump(9);
        assert_eq!(t.get(7), 2);
        assert_eq!(t.get(9), 1);
        assert_eq!(t.len(), 2);
        assert_eq!(t.total(), 3);
    }

    #[test]
    fn merge_adds_counts_per_key() {
        let mut a = table_of(&[(1, 3), (2, 1)]);
        let b = table_of(&[(2, 4), (3, 2)]);
        a.merge_from(&b);
        assert_eq!(a.get(1), 3);
        assert_eq!(a.get(2), 5);
        assert_eq!(a.get(3), 2);
    }

    #[test]
    fn merge_is_commutative() {
        let parts = [
            table_of(&[(10, 2), (20, 5)]),
            table_of(&[(20, 1), (30, 7)]),
            table_of(&[(10, 4)]),
        ];

        let mut forward = FreqTable::new();
        for p in &parts {
            forward.merge_from(p);
        }
        let mut backward = FreqTable::new();
        for p in parts.iter().rev() {
            backward.merge_from(p);
        }

        for key in [10, 20, 30] {
            assert_eq!(forward.get(key), backward.get(key));
        }
    }

    #[test]
    fn top_n_orders_by_count_descending() {
        let t = table_of(&[(1, 5), (2, 9), (3, 1)]);
        assert_eq!(top_n(&t, 3), vec![(2, 9), (1, 5), (3, 1)]);
    }

    #[test]
    fn top_n_truncates_to_n() {
        let t = table_of(&[(1, 5), (2, 9), (3, 1), (4, 7)]);
        assert_eq!(top_n(&t, 2), vec![(2, 9), (4, 7)]);
    }

    #[test]
    fn equal_counts_break_ties_by_lowest_key() {
        let t = table_of(&[(50, 3), (10, 3), (30, 3)]);
        assert_eq!(top_n(&t, 2), vec![(10, 3), (30, 3)]);
    }

    #[test]
    fn top_n_of_empty_table_is_empty() {
        assert!(top_n(&FreqTable::new(), 5).is_empty());
    }
}
