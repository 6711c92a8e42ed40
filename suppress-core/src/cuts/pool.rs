//! Append-only cut pool.
//!
//! Cuts are never removed: every feasibility cut stays valid for the rest
//! of the run, and the master selector mirrors the pool row by row. The pool
//! filters duplicates (same cut up to positive scaling) and cuts that cannot
//! bind.

use super::FeasibilityCut;

/// A cut with pool metadata.
#[derive(Debug, Clone)]
pub struct PooledCut {
    /// The underlying cut.
    pub cut: FeasibilityCut,

    /// Position in the pool.
    pub id: usize,

    /// Dive iteration when the cut was added.
    pub added_iter: usize,
}

/// Statistics for the cut pool.
#[derive(Debug, Default, Clone)]
pub struct CutPoolStats {
    /// Cuts accepted.
    pub total_added: usize,

    /// Cuts rejected as duplicates.
    pub duplicates: usize,

    /// Cuts rejected as invalid or non-binding.
    pub rejected: usize,
}

/// Pool of feasibility cuts shared by the dive and the exact search.
#[derive(Debug, Default)]
pub struct CutPool {
    cuts: Vec<PooledCut>,
    iteration: usize,
    stats: CutPoolStats,
}

impl CutPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cut.
    ///
    /// Returns the id of the stored cut (or of the cut it duplicates) and
    /// whether it was a duplicate; `None` if the cut was rejected.
    pub fn add(&mut self, cut: FeasibilityCut) -> Option<(usize, bool)> {
        if !cut.is_valid() {
            self.stats.rejected += 1;
            return None;
        }

        if let Some(existing) = self.cuts.iter().find(|p| is_duplicate(&cut, &p.cut)) {
            self.stats.duplicates += 1;
            return Some((existing.id, true));
        }

        let id = self.cuts.len();
        self.cuts.push(PooledCut {
            cut,
            id,
            added_iter: self.iteration,
        });
        self.stats.total_added += 1;
        Some((id, false))
    }

    /// Add several cuts; returns how many were new.
    pub fn extend(&mut self, cuts: impl IntoIterator<Item = FeasibilityCut>) -> usize {
        cuts.into_iter()
            .filter_map(|c| self.add(c))
            .filter(|&(_, dup)| !dup)
            .count()
    }

    /// Cut by id.
    pub fn get(&self, id: usize) -> Option<&PooledCut> {
        self.cuts.get(id)
    }

    /// All cuts in insertion order.
    pub fn cuts(&self) -> &[PooledCut] {
        &self.cuts
    }

    /// Cuts added at or after position `start`.
    pub fn since(&self, start: usize) -> &[PooledCut] {
        &self.cuts[start.min(self.cuts.len())..]
    }

    /// Advance the iteration tag used for new cuts.
    pub fn next_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Current iteration tag.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Get pool statistics.
    pub fn stats(&self) -> &CutPoolStats {
        &self.stats
    }

    /// Number of cuts.
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// Check if pool is empty.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }
}

/// Same support and coefficients up to a positive factor.
fn is_duplicate(a: &FeasibilityCut, b: &FeasibilityCut) -> bool {
    if a.terms.len() != b.terms.len() {
        return false;
    }

    let scale_a = a.terms.iter().map(|(_, c)| c.abs()).fold(a.rhs.abs(), f64::max);
    let scale_b = b.terms.iter().map(|(_, c)| c.abs()).fold(b.rhs.abs(), f64::max);
    if scale_a < 1e-12 || scale_b < 1e-12 {
        return false;
    }

    let same_terms = a.terms.iter().zip(&b.terms).all(|(&(ja, ca), &(jb, cb))| {
        ja == jb && (ca / scale_a - cb / scale_b).abs() < 1e-9
    });
    same_terms && (a.rhs / scale_a - b.rhs / scale_b).abs() < 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cuts::CutSource;

    fn make_cut(terms: Vec<(usize, f64)>, rhs: f64) -> FeasibilityCut {
        FeasibilityCut::new(terms, rhs, CutSource::UpperProtection { cell: 0 })
    }

    #[test]
    fn test_pool_add_and_get() {
        let mut pool = CutPool::new();

        let (id1, dup1) = pool.add(make_cut(vec![(0, 1.0), (1, 2.0)], 3.0)).unwrap();
        let (id2, dup2) = pool.add(make_cut(vec![(0, 4.0), (2, 5.0)], 6.0)).unwrap();

        assert!(!dup1);
        assert!(!dup2);
        assert_ne!(id1, id2);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(id2).unwrap().cut.rhs, 6.0);
    }

    #[test]
    fn test_duplicate_detection() {
        let mut pool = CutPool::new();

        let (id1, _) = pool.add(make_cut(vec![(0, 1.0), (1, 2.0)], 3.0)).unwrap();
        let (id2, dup2) = pool.add(make_cut(vec![(1, 2.0), (0, 1.0)], 3.0)).unwrap();
        let (id3, dup3) = pool.add(make_cut(vec![(0, 2.0), (1, 4.0)], 6.0)).unwrap();
        let (_, dup4) = pool.add(make_cut(vec![(0, 1.0), (1, 2.0)], 2.0)).unwrap();

        assert!(dup2);
        assert!(dup3);
        assert!(!dup4);
        assert_eq!(id1, id2);
        assert_eq!(id1, id3);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.stats().duplicates, 2);
    }

    #[test]
    fn test_rejects_non_binding_cuts() {
        let mut pool = CutPool::new();
        assert!(pool.add(make_cut(vec![(0, 1.0)], 0.0)).is_none());
        assert!(pool.add(make_cut(Vec::new(), 0.0)).is_none());
        assert_eq!(pool.stats().rejected, 2);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_since_and_iteration_tags() {
        let mut pool = CutPool::new();
        pool.add(make_cut(vec![(0, 1.0)], 1.0));
        pool.next_iteration();
        let added = pool.extend(vec![make_cut(vec![(1, 1.0)], 1.0), make_cut(vec![(0, 1.0)], 1.0)]);

        assert_eq!(added, 1);
        assert_eq!(pool.since(1).len(), 1);
        assert_eq!(pool.since(1)[0].added_iter, 1);
        assert!(pool.since(10).is_empty());
    }
}
