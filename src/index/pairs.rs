use std::collections::HashSet;

/// Unordered pair of positions, stored with `a < b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidatePair {
    a: usize,
    b: usize,
}

impl CandidatePair {
    /// Canonical pair for `i` and `j`, or `None` for a self pair.
    pub fn new(i: usize, j: usize) -> Option<Self> {
        match i.cmp(&j) {
            std::cmp::Ordering::Less => Some(Self { a: i, b: j }),
            std::cmp::Ordering::Greater => Some(Self { a: j, b: i }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn a(&self) -> usize {
        self.a
    }

    pub fn b(&self) -> usize {
        self.b
    }
}

/// Canonicalizes raw index output into a set with no self pairs and no duplicates.
pub fn generate_pairs<I>(raw: I) -> HashSet<CandidatePair>
where
    I: IntoIterator<Item = (usize, usize)>,
{
    raw.into_iter()
        .filter_map(|(i, j)| CandidatePair::new(i, j))
        .collect()
}
