//! Carry a taxon map over to the 15 canonical quintets.
//!
//! Relabelling canonical quintet `i` through a [`TaxonMap`] gives another unrooted
//! quintet, which is canonical quintet `k` for exactly one `k`. Collecting the `k`s
//! gives a permutation of the catalog indices:
//!
//! ```text
//!   map 4<->5:   ((1,2),3,(4,5)) -> ((1,2),3,(5,4))   0 -> 0
//!                ((1,2),4,(3,5)) -> ((1,2),5,(3,4))   1 -> 2
//!                ((1,2),5,(3,4)) -> ((1,2),4,(3,5))   2 -> 1
//! ```

use std::ops::Index;

use crate::catalog::{NUM_QUINTETS, QuintetCatalog};
use crate::distances::equal_topology;
use crate::error::{QuintetError, Result};
use crate::taxa::TaxonMap;

/// A permutation of the canonical quintet indices `0..15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuintetPermutation([usize; NUM_QUINTETS]);

impl QuintetPermutation {
    pub fn identity() -> Self {
        let mut p = [0; NUM_QUINTETS];
        for (i, slot) in p.iter_mut().enumerate() {
            *slot = i;
        }
        QuintetPermutation(p)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl Index<usize> for QuintetPermutation {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.0[i]
    }
}

/// `result[i] = k` where canonical quintet `i` relabelled by `map` is canonical
/// quintet `k`.
///
/// # Errors
/// - `UnmappableQuintet(i)` if the relabelled quintet `i` matches no catalog entry
/// - `MappingError` if two quintets land on the same entry
pub fn map_quintet_indices(catalog: &QuintetCatalog, map: &TaxonMap) -> Result<QuintetPermutation> {
    let quintets = catalog.unrooted_quintets();
    let mut result = [0usize; NUM_QUINTETS];
    let mut hit = [false; NUM_QUINTETS];

    for (i, q) in quintets.iter().enumerate() {
        let moved = q.relabel(map)?;
        let mut found = None;
        for (k, candidate) in quintets.iter().enumerate() {
            if equal_topology(&moved, candidate)? {
                found = Some(k);
                break;
            }
        }
        let k = found.ok_or(QuintetError::UnmappableQuintet(i))?;
        if std::mem::replace(&mut hit[k], true) {
            return Err(QuintetError::MappingError(format!(
                "quintets map twice onto canonical quintet {k}"
            )));
        }
        result[i] = k;
    }
    Ok(QuintetPermutation(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Family;
    use crate::taxa::build_taxon_map;

    fn catalog() -> QuintetCatalog {
        QuintetCatalog::embedded().unwrap()
    }

    #[test]
    fn test_identity_map_gives_identity_permutation() {
        let catalog = catalog();
        let perm = map_quintet_indices(&catalog, &TaxonMap::identity(5)).unwrap();
        assert_eq!(perm, QuintetPermutation::identity());
    }

    #[test]
    fn test_base_onto_itself_is_identity() {
        let catalog = catalog();
        for family in Family::ALL {
            let base = catalog.family_base(family);
            let map = build_taxon_map(base, base).unwrap();
            let perm = map_quintet_indices(&catalog, &map).unwrap();
            assert_eq!(perm, QuintetPermutation::identity());
        }
    }

    #[test]
    fn test_swap_of_last_two_taxa() {
        let catalog = catalog();
        let base = catalog.family_base(Family::Caterpillar);
        let candidate = catalog.rooted(1).unwrap();
        let map = build_taxon_map(base, candidate).unwrap();
        assert_eq!(map.targets(), &[0, 1, 2, 4, 3]);

        let perm = map_quintet_indices(&catalog, &map).unwrap();
        assert_eq!(
            perm.as_slice(),
            &[0, 2, 1, 3, 5, 4, 9, 10, 11, 6, 7, 8, 12, 14, 13]
        );
    }

    #[test]
    fn test_swap_of_taxa_three_and_five() {
        let catalog = catalog();
        let ns = catalog.namespace();
        let base = catalog.family_base(Family::Caterpillar);
        let candidate = catalog.rooted(5).unwrap();
        assert_eq!(candidate.to_newick(ns), "((((1,2),5),4),3);");

        let map = build_taxon_map(base, candidate).unwrap();
        let perm = map_quintet_indices(&catalog, &map).unwrap();
        assert_eq!(
            perm.as_slice(),
            &[2, 1, 0, 9, 11, 10, 6, 8, 7, 3, 5, 4, 14, 13, 12]
        );
    }

    #[test]
    fn test_every_candidate_yields_a_permutation() {
        let catalog = catalog();
        for (_, family, candidate) in catalog.candidates() {
            let map = build_taxon_map(catalog.family_base(family), candidate).unwrap();
            let perm = map_quintet_indices(&catalog, &map).unwrap();
            let mut seen = perm.as_slice().to_vec();
            seen.sort_unstable();
            assert_eq!(seen, (0..NUM_QUINTETS).collect::<Vec<_>>());
        }
    }
}
