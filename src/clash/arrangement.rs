use super::element_set::ElementSet;

/// A growable conflict-free selection.
///
/// `incompatible` accumulates every element clashing with some member, so the
/// admission check is a single bit test.
#[derive(Debug, Clone)]
pub struct Arrangement {
    members: ElementSet,
    incompatible: ElementSet,
}

impl Arrangement {
    pub fn new(universe: usize) -> Self {
        Arrangement { members: ElementSet::empty(universe), incompatible: ElementSet::empty(universe) }
    }

    pub fn members(&self) -> &ElementSet {
        &self.members
    }

    pub fn incompatible(&self) -> &ElementSet {
        &self.incompatible
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn can_add(&self, element: usize) -> bool {
        !self.members.contains(element) && !self.incompatible.contains(element)
    }

    /// Add `element` if it does not clash; `clashes[i]` is the clash set of element `i`.
    pub fn try_add(&mut self, element: usize, clashes: &[ElementSet]) -> bool {
        if !self.can_add(element) {
            return false;
        }
        self.members.insert(element);
        self.incompatible.union_with(&clashes[element]);
        true
    }

    /// Copy of `self` grown by the compatible members of `extra`, in ascending
    /// order, stopping once `limit` members are reached.
    pub fn grown(&self, extra: &ElementSet, clashes: &[ElementSet], limit: Option<usize>) -> Arrangement {
        let mut next = self.clone();
        for element in extra.iter() {
            if limit.is_some_and(|limit| next.len() >= limit) {
                break;
            }
            next.try_add(element, clashes);
        }
        next
    }
}

impl PartialEq for Arrangement {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for Arrangement {}

/// Drop duplicates and arrangements strictly contained in another one.
pub fn retain_longest_only(arrangements: &mut Vec<Arrangement>) {
    arrangements.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.members.to_vec().cmp(&b.members.to_vec())));
    arrangements.dedup();
    let mut kept: Vec<Arrangement> = Vec::with_capacity(arrangements.len());
    for candidate in arrangements.drain(..) {
        if !kept.iter().any(|k| candidate.members.is_subset(&k.members)) {
            kept.push(candidate);
        }
    }
    *arrangements = kept;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clashes() -> Vec<ElementSet> {
        // 0 - 1 clash, 2 is free
        vec![ElementSet::from_indices(3, [1]), ElementSet::from_indices(3, [0]), ElementSet::empty(3)]
    }

    #[test]
    fn tracks_incompatible_elements() {
        let clashes = clashes();
        let mut a = Arrangement::new(3);
        assert!(a.try_add(0, &clashes));
        assert!(!a.can_add(1));
        assert!(!a.try_add(1, &clashes));
        assert!(a.try_add(2, &clashes));
        assert_eq!(a.members().to_vec(), vec![0, 2]);
        assert_eq!(a.incompatible().to_vec(), vec![1]);
    }

    #[test]
    fn growth_respects_limit() {
        let clashes = clashes();
        let grown = Arrangement::new(3).grown(&ElementSet::full(3), &clashes, Some(1));
        assert_eq!(grown.members().to_vec(), vec![0]);
        let grown = Arrangement::new(3).grown(&ElementSet::full(3), &clashes, None);
        assert_eq!(grown.members().to_vec(), vec![0, 2]);
    }

    #[test]
    fn keeps_only_maximal() {
        let clashes = clashes();
        let small = Arrangement::new(3).grown(&ElementSet::from_indices(3, [2]), &clashes, None);
        let big = Arrangement::new(3).grown(&ElementSet::from_indices(3, [0, 2]), &clashes, None);
        let other = Arrangement::new(3).grown(&ElementSet::from_indices(3, [1, 2]), &clashes, None);
        let mut all = vec![small, big.clone(), other.clone(), big.clone()];
        retain_longest_only(&mut all);
        assert_eq!(all, vec![big, other]);
    }
}
