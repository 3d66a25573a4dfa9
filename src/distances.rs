//! Robinson-Foulds distance and topology equality on tree snapshots.
//!
//! Two kinds of comparison are used by the rooting pipeline:
//!
//! 1. **Unrooted RF**: symmetric difference of the nontrivial split sets. Two
//!    rootings of the same unrooted tree are at distance 0.
//! 2. **Rooted (clade) RF**: symmetric difference of the nontrivial clade sets.
//!    Used when both trees are rooted, so a moved root counts.
//!
//! A comparison involving at least one unrooted tree is always unrooted.

use std::collections::HashSet;

use crate::bitset::Bitset;
use crate::error::{QuintetError, Result};
use crate::snapshot::TreeSnapshot;

/// Compute the Robinson-Foulds distance between two trees.
///
/// # Algorithm
/// RF = |A ∪ B| - |A ∩ B| = |A| + |B| - 2|A ∩ B|
///
/// Where A and B are the clade sets (both rooted) or split sets (otherwise).
///
/// # Example
/// ```text
/// Tree 1:  ((((1,2),3),4),5)     Clades: {1,2} {1,2,3} {1,2,3,4}
/// Tree 2:  (((1,2),3),(4,5))     Clades: {1,2} {1,2,3} {4,5}
///
/// Intersection: 2 clades match
/// RF = 3 + 3 - 2*2 = 2
/// ```
///
/// # Errors
/// `InvalidInput` if the trees are not over the same namespace size.
pub fn rf_distance(a: &TreeSnapshot, b: &TreeSnapshot) -> Result<usize> {
    if a.num_taxa() != b.num_taxa() {
        return Err(QuintetError::InvalidInput(format!(
            "cannot compare a tree on {} taxa with a tree on {} taxa",
            a.num_taxa(),
            b.num_taxa()
        )));
    }
    if a.is_rooted() && b.is_rooted() {
        Ok(symmetric_difference(a.clades(), b.clades()))
    } else {
        Ok(symmetric_difference(a.splits(), b.splits()))
    }
}

/// True iff the two trees have the same topology (RF distance 0).
pub fn equal_topology(a: &TreeSnapshot, b: &TreeSnapshot) -> Result<bool> {
    Ok(rf_distance(a, b)? == 0)
}

fn symmetric_difference(a: &HashSet<Bitset>, b: &HashSet<Bitset>) -> usize {
    let inter = a.intersection(b).count();
    a.len() + b.len() - 2 * inter
}
