//! Bounded history of attempted candidates

use std::collections::{HashSet, VecDeque};

use crate::types::Candidate;

/// Set of recently attempted names.
///
/// Once the set grows past its capacity the oldest names are dropped, so a
/// long run may probe a name twice. That only costs a wasted probe.
#[derive(Debug, Clone)]
pub struct RecentSet {
    capacity: usize,
    members: HashSet<Candidate>,
    order: VecDeque<Candidate>,
}

impl RecentSet {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            members: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    pub fn contains(&self, candidate: &Candidate) -> bool {
        self.members.contains(candidate)
    }

    /// Record a candidate. Returns false if it was already present.
    pub fn insert(&mut self, candidate: Candidate) -> bool {
        if !self.members.insert(candidate.clone()) {
            return false;
        }
        self.order.push_back(candidate);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut recent = RecentSet::new(10);
        assert!(recent.insert(Candidate::new("abc")));
        assert!(!recent.insert(Candidate::new("abc")));
        assert!(recent.contains(&Candidate::new("abc")));
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn test_trims_oldest_past_capacity() {
        let mut recent = RecentSet::new(3);
        for name in ["aaa", "bbb", "ccc", "ddd"] {
            recent.insert(Candidate::new(name));
        }
        assert_eq!(recent.len(), 3);
        assert!(!recent.contains(&Candidate::new("aaa")));
        assert!(recent.contains(&Candidate::new("ddd")));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut recent = RecentSet::new(50);
        for i in 0..1000 {
            recent.insert(Candidate::new(format!("n{}", i)));
            assert!(recent.len() <= recent.capacity());
        }
    }

    #[test]
    fn test_clear() {
        let mut recent = RecentSet::new(5);
        recent.insert(Candidate::new("xyz"));
        recent.clear();
        assert!(recent.is_empty());
        assert!(!recent.contains(&Candidate::new("xyz")));
    }
}
