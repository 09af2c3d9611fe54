use super::arrangement::{Arrangement, retain_longest_only};
use super::element_set::ElementSet;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

/// How two elements are known to clash.
pub enum Conflict<'a, T, C = ()> {
    /// Symmetric pairwise predicate (`f(a, b) || f(b, a)`).
    Predicate(Box<dyn Fn(&T, &T) -> bool + 'a>),
    /// Elements clash iff their component sets intersect.
    Components(Box<dyn Fn(&T) -> Vec<C> + 'a>),
}

impl<'a, T> Conflict<'a, T, ()> {
    pub fn predicate(f: impl Fn(&T, &T) -> bool + 'a) -> Self {
        Conflict::Predicate(Box::new(f))
    }
}

impl<'a, T, C> Conflict<'a, T, C> {
    pub fn components<I>(f: impl Fn(&T) -> I + 'a) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        Conflict::Components(Box::new(move |t| f(t).into_iter().collect()))
    }
}

/// All maximal conflict-free subsets of `elements`.
///
/// Each arrangement keeps the input order; the arrangements themselves are
/// sorted by their index sequence. Empty input yields no arrangements.
pub fn resolve<T: Clone, C: Hash + Eq>(
    elements: &[T],
    conflict: Conflict<'_, T, C>,
    element_limit: Option<usize>,
) -> Vec<Vec<T>> {
    ClashResolver::new(elements.to_vec(), conflict).element_limit(element_limit).resolve()
}

/// Clash resolution over an owned element list.
///
/// The clash graph is computed once at construction; every later query only
/// works on element indices.
pub struct ClashResolver<T> {
    elements: Vec<T>,
    clashes: Vec<ElementSet>,
    element_limit: Option<usize>,
}

impl<T> ClashResolver<T> {
    pub fn new<C: Hash + Eq>(elements: Vec<T>, conflict: Conflict<'_, T, C>) -> Self {
        let n = elements.len();
        let mut clashes = vec![ElementSet::empty(n); n];
        match conflict {
            Conflict::Predicate(f) => {
                for i in 0..n {
                    for j in (i + 1)..n {
                        if f(&elements[i], &elements[j]) || f(&elements[j], &elements[i]) {
                            clashes[i].insert(j);
                            clashes[j].insert(i);
                        }
                    }
                }
            }
            Conflict::Components(f) => {
                let mut owners: HashMap<C, Vec<usize>> = HashMap::new();
                for (i, element) in elements.iter().enumerate() {
                    for component in f(element) {
                        owners.entry(component).or_default().push(i);
                    }
                }
                for sharing in owners.values() {
                    for &i in sharing {
                        for &j in sharing {
                            if i != j {
                                clashes[i].insert(j);
                            }
                        }
                    }
                }
            }
        }
        ClashResolver { elements, clashes, element_limit: None }
    }

    /// Stop growing arrangements past `limit` members.
    pub fn element_limit(mut self, limit: Option<usize>) -> Self {
        self.element_limit = limit;
        self
    }

    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    pub fn clashes_of(&self, index: usize) -> &ElementSet {
        &self.clashes[index]
    }

    /// Index-level arrangements, deterministic order.
    pub fn arrangements(&self) -> Vec<Arrangement> {
        let n = self.elements.len();
        if n == 0 {
            return Vec::new();
        }
        let mut search = Search {
            clashes: &self.clashes,
            limit: self.element_limit,
            resolved: HashMap::new(),
            spots: HashMap::new(),
        };
        let mut found = search.resolve(&ElementSet::full(n)).as_ref().clone();
        found.sort_by_key(|a| a.members().to_vec());
        tracing::debug!(
            elements = n,
            arrangements = found.len(),
            memo = search.resolved.len() + search.spots.len(),
            "clashes resolved"
        );
        found
    }

    /// Arrangements as element lists.
    pub fn resolve(&self) -> Vec<Vec<T>>
    where
        T: Clone,
    {
        self.arrangements()
            .iter()
            .map(|a| a.members().iter().map(|i| self.elements[i].clone()).collect())
            .collect()
    }

    /// The arrangement maximizing `score`; ties keep the earliest.
    pub fn best_by<K: PartialOrd>(&self, score: impl Fn(&[&T]) -> K) -> Vec<&T> {
        let mut best: Option<(K, Vec<&T>)> = None;
        for arrangement in self.arrangements() {
            let members: Vec<&T> = arrangement.members().iter().map(|i| &self.elements[i]).collect();
            let key = score(&members);
            if best.as_ref().is_none_or(|(top, _)| key > *top) {
                best = Some((key, members));
            }
        }
        best.map(|(_, members)| members).unwrap_or_default()
    }
}

type Memo = HashMap<ElementSet, Rc<Vec<Arrangement>>>;

/// One resolution run: the clash graph plus the memo tables of both recursive
/// steps, keyed by the exact sub-problem.
struct Search<'a> {
    clashes: &'a [ElementSet],
    limit: Option<usize>,
    resolved: Memo,
    spots: Memo,
}

impl Search<'_> {
    fn universe(&self) -> usize {
        self.clashes.len()
    }

    fn clashes_within(&self, element: usize, set: &ElementSet) -> ElementSet {
        self.clashes[element].intersection(set)
    }

    /// Free elements join every arrangement; the conflicting rest is split
    /// into connected spots whose local arrangements combine independently.
    fn resolve(&mut self, set: &ElementSet) -> Rc<Vec<Arrangement>> {
        if let Some(hit) = self.resolved.get(set) {
            return Rc::clone(hit);
        }

        let free = ElementSet::from_indices(
            self.universe(),
            set.iter().filter(|&i| self.clashes[i].is_disjoint(set)),
        );
        let (clashes, limit) = (self.clashes, self.limit);
        let mut combined = vec![Arrangement::new(self.universe()).grown(&free, clashes, limit)];

        let mut pending = set.difference(&free);
        while let Some(seed) = pending.first() {
            let spot = self.connected_spot(seed, &pending);
            pending = pending.difference(&spot);
            let local = self.spot_arrangements(&spot);
            combined = combined
                .iter()
                .flat_map(|ready| local.iter().map(move |sub| ready.grown(sub.members(), clashes, limit)))
                .collect();
            retain_longest_only(&mut combined);
        }

        let result = Rc::new(combined);
        self.resolved.insert(set.clone(), Rc::clone(&result));
        result
    }

    /// Breadth-first closure of `seed` over clash edges inside `within`.
    fn connected_spot(&self, seed: usize, within: &ElementSet) -> ElementSet {
        let mut spot = ElementSet::from_indices(self.universe(), [seed]);
        let mut frontier = vec![seed];
        while let Some(current) = frontier.pop() {
            for next in self.clashes_within(current, within).iter() {
                if spot.insert(next) {
                    frontier.push(next);
                }
            }
        }
        spot
    }

    /// Maximal arrangements of one connected spot.
    ///
    /// Fork on the spot's first element: arrangements holding it extend the
    /// resolution of what remains outside its clash set; arrangements without
    /// it come from the rest of the spot and must hold one of its rivals,
    /// otherwise the seed could still be added.
    fn spot_arrangements(&mut self, spot: &ElementSet) -> Rc<Vec<Arrangement>> {
        if let Some(hit) = self.spots.get(spot) {
            return Rc::clone(hit);
        }
        let Some(seed) = spot.first() else {
            return Rc::new(vec![Arrangement::new(self.universe())]);
        };

        let rivals = self.clashes_within(seed, spot);
        let mut with_seed = spot.difference(&rivals);
        with_seed.remove(seed);
        let mut without_seed = spot.clone();
        without_seed.remove(seed);

        let mut local = Vec::new();
        let anchor = Arrangement::new(self.universe()).grown(
            &ElementSet::from_indices(self.universe(), [seed]),
            self.clashes,
            self.limit,
        );
        for sub in self.resolve(&with_seed).iter() {
            local.push(anchor.grown(sub.members(), self.clashes, self.limit));
        }
        for sub in self.resolve(&without_seed).iter() {
            if !sub.members().is_disjoint(&rivals) || self.limit.is_some_and(|limit| sub.len() >= limit) {
                local.push(sub.clone());
            }
        }
        retain_longest_only(&mut local);

        let result = Rc::new(local);
        self.spots.insert(spot.clone(), Rc::clone(&result));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn chars(words: &[&'static str]) -> Vec<Vec<&'static str>> {
        resolve(words, Conflict::components(|w: &&str| w.chars().collect::<Vec<_>>()), None)
    }

    #[test]
    fn shared_characters_literal_case() {
        assert_eq!(chars(&["0", "1", "2x", "3", "4x"]), vec![vec!["0", "1", "2x", "3"], vec!["0", "1", "3", "4x"]]);
    }

    #[test]
    fn all_free_is_one_arrangement() {
        assert_eq!(chars(&["0", "1", "2", "3", "4"]), vec![vec!["0", "1", "2", "3", "4"]]);
    }

    #[test]
    fn all_conflicting_are_singletons() {
        let found = chars(&["x0", "x1", "x2", "x3", "x4"]);
        assert_eq!(found, vec![vec!["x0"], vec!["x1"], vec!["x2"], vec!["x3"], vec!["x4"]]);
    }

    #[test]
    fn empty_input_has_no_arrangements() {
        assert!(chars(&[]).is_empty());
        assert_eq!(chars(&["only"]), vec![vec!["only"]]);
    }

    #[test]
    fn independent_clusters_multiply() {
        // {a1, a2} compete, {b1, b2} compete, c is free.
        let found = chars(&["a1", "a2", "b3", "b4", "c"]);
        assert_eq!(found.len(), 4);
        assert!(found.iter().all(|a| a.len() == 3 && a.contains(&"c")));
    }

    #[test]
    fn predicate_conflicts_on_a_path() {
        // 0-1-2-3 path: maximal independent sets are {0,2}, {0,3}, {1,3}.
        let adjacent = |a: &i32, b: &i32| (a - b).abs() == 1;
        let found = resolve(&[0, 1, 2, 3], Conflict::predicate(adjacent), None);
        assert_eq!(found, vec![vec![0, 2], vec![0, 3], vec![1, 3]]);
    }

    #[test]
    fn element_limit_truncates_growth() {
        let found = resolve(&[0, 1, 2, 3, 4], Conflict::predicate(|_: &i32, _: &i32| false), Some(2));
        assert_eq!(found, vec![vec![0, 1]]);
    }

    #[test]
    fn best_by_scores_arrangements() {
        let resolver = ClashResolver::new(vec!["ab", "b", "c", "ac"], Conflict::components(|w: &&str| w.chars().collect::<Vec<_>>()));
        let best = resolver.best_by(|members| members.iter().map(|w| w.len()).sum::<usize>());
        assert_eq!(best, vec![&"ab", &"c"]);
    }

    fn check_maximal_cover(n: usize, edges: &[(usize, usize)]) {
        let clash = |a: &usize, b: &usize| edges.contains(&(*a, *b)) || edges.contains(&(*b, *a));
        let elements: Vec<usize> = (0..n).collect();
        let found = resolve(&elements, Conflict::predicate(clash), None);

        let distinct: BTreeSet<_> = found.iter().collect();
        assert_eq!(distinct.len(), found.len(), "duplicate arrangements");
        let mut covered = BTreeSet::new();
        for arrangement in &found {
            for x in arrangement {
                covered.insert(*x);
                assert!(arrangement.iter().all(|y| x == y || !clash(x, y)), "clash inside {arrangement:?}");
            }
            for y in elements.iter().filter(|y| !arrangement.contains(*y)) {
                assert!(arrangement.iter().any(|x| clash(x, y)), "{y} could extend {arrangement:?}");
            }
        }
        assert_eq!(covered.len(), n);
    }

    proptest! {
        #[test]
        fn arrangements_are_maximal_and_cover_everything(
            n in 1usize..9,
            raw in proptest::collection::vec((0usize..9, 0usize..9), 0..14),
        ) {
            let edges: Vec<(usize, usize)> =
                raw.into_iter().filter(|(a, b)| a != b && *a < n && *b < n).collect();
            check_maximal_cover(n, &edges);
        }
    }
}
