use std::fmt;

const WORD: usize = 64;

/// A set of element indices drawn from a fixed universe `0..universe`.
///
/// Bitset-backed, so equal sets hash equally regardless of construction order;
/// the resolver uses it directly as a memoization key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ElementSet {
    universe: usize,
    words: Vec<u64>,
}

impl ElementSet {
    pub fn empty(universe: usize) -> Self {
        ElementSet { universe, words: vec![0; universe.div_ceil(WORD)] }
    }

    pub fn full(universe: usize) -> Self {
        Self::from_indices(universe, 0..universe)
    }

    pub fn from_indices(universe: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::empty(universe);
        for i in indices {
            set.insert(i);
        }
        set
    }

    pub fn universe(&self) -> usize {
        self.universe
    }

    pub fn insert(&mut self, i: usize) -> bool {
        debug_assert!(i < self.universe, "element {i} outside universe {}", self.universe);
        let (w, bit) = (i / WORD, 1u64 << (i % WORD));
        let fresh = self.words[w] & bit == 0;
        self.words[w] |= bit;
        fresh
    }

    pub fn remove(&mut self, i: usize) -> bool {
        let (w, bit) = (i / WORD, 1u64 << (i % WORD));
        let present = self.words.get(w).is_some_and(|word| word & bit != 0);
        if present {
            self.words[w] &= !bit;
        }
        present
    }

    pub fn contains(&self, i: usize) -> bool {
        self.words.get(i / WORD).is_some_and(|word| word & (1u64 << (i % WORD)) != 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Smallest member.
    pub fn first(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * WORD + w.trailing_zeros() as usize)
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, word)| {
            let mut rest = *word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(wi * WORD + bit)
            })
        })
    }

    fn zip_with(&self, other: &ElementSet, op: impl Fn(u64, u64) -> u64) -> ElementSet {
        debug_assert_eq!(self.universe, other.universe);
        ElementSet { universe: self.universe, words: self.words.iter().zip(&other.words).map(|(a, b)| op(*a, *b)).collect() }
    }

    pub fn union(&self, other: &ElementSet) -> ElementSet {
        self.zip_with(other, |a, b| a | b)
    }

    pub fn intersection(&self, other: &ElementSet) -> ElementSet {
        self.zip_with(other, |a, b| a & b)
    }

    pub fn difference(&self, other: &ElementSet) -> ElementSet {
        self.zip_with(other, |a, b| a & !b)
    }

    pub fn union_with(&mut self, other: &ElementSet) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
    }

    pub fn is_disjoint(&self, other: &ElementSet) -> bool {
        self.words.iter().zip(&other.words).all(|(a, b)| a & b == 0)
    }

    pub fn is_subset(&self, other: &ElementSet) -> bool {
        self.words.iter().zip(&other.words).all(|(a, b)| a & !b == 0)
    }

    pub fn is_strict_subset(&self, other: &ElementSet) -> bool {
        self != other && self.is_subset(other)
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

impl fmt::Debug for ElementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_algebra_across_word_boundaries() {
        let a = ElementSet::from_indices(130, [0, 63, 64, 129]);
        let b = ElementSet::from_indices(130, [63, 100]);
        assert_eq!(a.len(), 4);
        assert_eq!(a.first(), Some(0));
        assert_eq!(a.to_vec(), vec![0, 63, 64, 129]);
        assert_eq!(a.intersection(&b).to_vec(), vec![63]);
        assert_eq!(a.difference(&b).to_vec(), vec![0, 64, 129]);
        assert_eq!(a.union(&b).len(), 5);
        assert!(!a.is_disjoint(&b));
        assert!(a.intersection(&b).is_strict_subset(&a));
        assert!(ElementSet::empty(130).is_subset(&b));
        assert_eq!(ElementSet::full(70).len(), 70);
    }

    #[test]
    fn equal_sets_hash_equal() {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        seen.insert(ElementSet::from_indices(10, [3, 1, 2]));
        let mut other = ElementSet::from_indices(10, [1, 2, 3, 4]);
        assert!(other.remove(4));
        assert!(!other.remove(4));
        assert!(seen.contains(&other));
    }
}
