//! Cut sets over signed working-graph variables.
//!
//! A cut set is a sorted vector of signed literals; the collection type
//! maintains minimality (no set is a proper superset of another) and the
//! deterministic lexicographic order required for stable reporting.

use serde::{Deserialize, Serialize};

/// Signed reference to a working-graph variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub variable: usize,
    pub complement: bool,
}

impl Literal {
    pub fn positive(variable: usize) -> Self {
        Self { variable, complement: false }
    }

    pub fn negative(variable: usize) -> Self {
        Self { variable, complement: true }
    }

    pub fn complemented(self) -> Self {
        Self { variable: self.variable, complement: !self.complement }
    }
}

/// A set of signed literals, sorted ascending by (variable, sign).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CutSet {
    literals: Vec<Literal>,
}

impl CutSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_literals(mut literals: Vec<Literal>) -> Self {
        literals.sort_unstable();
        literals.dedup();
        Self { literals }
    }

    /// Number of literals; the *order* of the cut set.
    pub fn order(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn contains(&self, literal: Literal) -> bool {
        self.literals.binary_search(&literal).is_ok()
    }

    /// Inserts a literal keeping the sorted order.
    ///
    /// Returns `false` when the complementary literal is already present;
    /// such a set is contradictory and absorbs to FALSE.
    #[must_use]
    pub fn insert(&mut self, literal: Literal) -> bool {
        if self.contains(literal.complemented()) {
            return false;
        }
        if let Err(position) = self.literals.binary_search(&literal) {
            self.literals.insert(position, literal);
        }
        true
    }

    pub fn remove(&mut self, literal: Literal) {
        if let Ok(position) = self.literals.binary_search(&literal) {
            self.literals.remove(position);
        }
    }

    pub fn is_subset_of(&self, other: &CutSet) -> bool {
        if self.literals.len() > other.literals.len() {
            return false;
        }
        self.literals.iter().all(|l| other.contains(*l))
    }

    /// Union with another set; `None` when the union is contradictory.
    pub fn union(&self, other: &CutSet) -> Option<CutSet> {
        let mut merged = self.clone();
        for &literal in &other.literals {
            if !merged.insert(literal) {
                return None;
            }
        }
        Some(merged)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.literals.iter()
    }
}

/// The result container of cut set generation.
///
/// UNITY (a tautological top) is a single empty set; NULL (an unsatisfiable
/// top) is the empty collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CutSetCollection {
    sets: Vec<CutSet>,
}

impl CutSetCollection {
    pub fn new(sets: Vec<CutSet>) -> Self {
        Self { sets }
    }

    /// The collection of a tautological top event.
    pub fn unity() -> Self {
        Self { sets: vec![CutSet::empty()] }
    }

    /// The collection of an unsatisfiable top event.
    pub fn null() -> Self {
        Self { sets: Vec::new() }
    }

    pub fn is_unity(&self) -> bool {
        self.sets.len() == 1 && self.sets[0].is_empty()
    }

    pub fn is_null(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn sets(&self) -> &[CutSet] {
        &self.sets
    }

    pub fn iter(&self) -> impl Iterator<Item = &CutSet> {
        self.sets.iter()
    }

    /// Highest cut set order in the collection.
    pub fn max_order(&self) -> usize {
        self.sets.iter().map(CutSet::order).max().unwrap_or(0)
    }

    /// Minimizes, reduces, and sorts the collection.
    ///
    /// Three steps:
    /// 1. subsumption: proper supersets of retained sets are removed;
    /// 2. consensus reduction of irreducible negations: a negative literal
    ///    `!v` is dropped from a set S whenever some retained set is
    ///    contained in `(S minus !v) + v`, by `x | (!x & y) = x | y`;
    /// 3. lexicographic sort over the sorted literal vectors.
    pub fn minimize(&mut self) {
        self.subsume();
        loop {
            let mut changed = false;
            for i in 0..self.sets.len() {
                let negatives: Vec<Literal> = self.sets[i]
                    .iter()
                    .copied()
                    .filter(|l| l.complement)
                    .collect();
                for literal in negatives {
                    let mut witness = self.sets[i].clone();
                    witness.remove(literal);
                    if !witness.insert(literal.complemented()) {
                        continue;
                    }
                    let reducible = self
                        .sets
                        .iter()
                        .enumerate()
                        .any(|(j, t)| j != i && t.is_subset_of(&witness));
                    if reducible {
                        self.sets[i].remove(literal);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
            self.subsume();
        }
        self.sets.sort_unstable();
    }

    fn subsume(&mut self) {
        // Size-ascending order guarantees subsets are retained before any
        // superset is examined; the secondary lexicographic key makes
        // duplicates adjacent for dedup.
        self.sets
            .sort_unstable_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.cmp(b)));
        self.sets.dedup();
        let mut kept: Vec<CutSet> = Vec::with_capacity(self.sets.len());
        for set in self.sets.drain(..) {
            if !kept.iter().any(|k| k.is_subset_of(&set)) {
                kept.push(set);
            }
        }
        self.sets = kept;
    }

    /// Count of cut sets per order, indexed by order.
    pub fn distribution(&self) -> Vec<usize> {
        let mut counts = vec![0; self.max_order() + 1];
        for set in &self.sets {
            counts[set.order()] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(literals: &[(usize, bool)]) -> CutSet {
        CutSet::from_literals(
            literals
                .iter()
                .map(|&(v, c)| Literal { variable: v, complement: c })
                .collect(),
        )
    }

    #[test]
    fn test_insert_rejects_contradiction() {
        let mut s = CutSet::empty();
        assert!(s.insert(Literal::positive(3)));
        assert!(s.insert(Literal::positive(1)));
        assert!(!s.insert(Literal::negative(3)));
        assert_eq!(s.order(), 2);
    }

    #[test]
    fn test_subsumption() {
        let mut collection = CutSetCollection::new(vec![
            set(&[(0, false), (1, false)]),
            set(&[(0, false)]),
            set(&[(0, false), (2, false), (3, false)]),
            set(&[(1, false), (2, false)]),
        ]);
        collection.minimize();
        assert_eq!(
            collection.sets(),
            &[set(&[(0, false)]), set(&[(1, false), (2, false)])]
        );
    }

    #[test]
    fn test_unity_absorbs_everything() {
        let mut collection =
            CutSetCollection::new(vec![set(&[(0, false)]), CutSet::empty()]);
        collection.minimize();
        assert!(collection.is_unity());
    }

    #[test]
    fn test_consensus_reduction() {
        // a | (!a & b) == a | b
        let mut collection = CutSetCollection::new(vec![
            set(&[(0, false)]),
            set(&[(0, true), (1, false)]),
        ]);
        collection.minimize();
        assert_eq!(collection.sets(), &[set(&[(0, false)]), set(&[(1, false)])]);
    }

    #[test]
    fn test_parity_sets_are_irreducible() {
        // The four odd-parity patterns of three variables stay intact.
        let parity = vec![
            set(&[(0, false), (1, false), (2, false)]),
            set(&[(0, false), (1, true), (2, true)]),
            set(&[(0, true), (1, false), (2, true)]),
            set(&[(0, true), (1, true), (2, false)]),
        ];
        let mut collection = CutSetCollection::new(parity.clone());
        collection.minimize();
        assert_eq!(collection.sets(), parity.as_slice());
    }

    #[test]
    fn test_distribution() {
        let collection = CutSetCollection::new(vec![
            set(&[(0, false)]),
            set(&[(1, false), (2, false)]),
            set(&[(3, false), (4, false)]),
        ]);
        assert_eq!(collection.distribution(), vec![0, 1, 2]);
    }
}
