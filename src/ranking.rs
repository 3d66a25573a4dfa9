//! Score every rooted candidate, rank, and check the winners against the truth.
//!
//! Candidates whose unrooted shape differs from the observed species topology
//! are not scored; they get [`MAX_VAL`]. The rest are scored against their
//! family's base tree in parallel, then stably sorted by cost.

use log::debug;
use rayon::prelude::*;

use crate::catalog::{Family, NUM_ROOTED, QuintetCatalog};
use crate::distances::rf_distance;
use crate::distribution::GeneDistribution;
use crate::error::{QuintetError, Result};
use crate::scoring::{ScoringRules, score};
use crate::snapshot::TreeSnapshot;

/// Cost assigned to candidates inconsistent with the observed unrooted topology.
pub const MAX_VAL: f64 = 100.0;

/// Default number of candidates kept after ranking.
pub const CANDIDATE_SIZE: usize = 7;

/// Cost of every rooted candidate, in global catalog order.
pub fn score_candidates(
    catalog: &QuintetCatalog,
    rules: &ScoringRules,
    observed_unrooted: &TreeSnapshot,
    u: &GeneDistribution,
) -> Result<Vec<f64>> {
    let observed = observed_unrooted.unrooted();
    let candidates: Vec<(usize, Family, &TreeSnapshot)> = catalog.candidates().collect();

    let scores = candidates
        .into_par_iter()
        .map(|(_, family, tree)| {
            if rf_distance(&tree.unrooted(), &observed)? != 0 {
                return Ok(MAX_VAL);
            }
            score(tree, catalog.family_base(family), u, catalog, rules.rule(family))
        })
        .collect::<Result<Vec<f64>>>()?;

    debug!(
        "{} of {NUM_ROOTED} candidates are consistent with the observed topology",
        scores.iter().filter(|&&s| s < MAX_VAL).count()
    );
    Ok(scores)
}

/// Indices of the `k` cheapest candidates, ties broken by lower catalog index.
///
/// # Example
/// ```
/// # use quintet_rooting::ranking::rank_candidates;
/// let order = rank_candidates(&[0.5, 0.1, 100.0, 0.1], 3);
/// assert_eq!(order, vec![1, 3, 0]);
/// ```
pub fn rank_candidates(scores: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    order.truncate(k);
    order
}

/// One ranked candidate.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub index: usize,
    pub family: Family,
    pub tree: TreeSnapshot,
    pub score: f64,
    /// Rooted RF distance to the true species tree.
    pub rooted_rf: usize,
}

/// Everything a run reports.
#[derive(Debug, Clone)]
pub struct RootingReport {
    pub distribution: GeneDistribution,
    pub species_tree: TreeSnapshot,
    /// Best first; never empty.
    pub candidates: Vec<RankedCandidate>,
    pub true_in_top_k: bool,
    pub best_equals_true: bool,
    pub topology_equals_true: bool,
    /// Unrooted RF of the best candidate to the species topology.
    pub unrooted_rf: usize,
    /// Rooted RF of the best candidate to the species tree.
    pub rooted_rf: usize,
}

impl RootingReport {
    pub fn best(&self) -> &RankedCandidate {
        &self.candidates[0]
    }
}

/// Rank all candidates for a rooted species tree and validate the top `k`.
///
/// # Errors
/// `InvalidInput` if the species tree is unrooted, is not over five taxa, or `k`
/// is zero.
pub fn infer_rooting(
    catalog: &QuintetCatalog,
    rules: &ScoringRules,
    species_tree: &TreeSnapshot,
    u: &GeneDistribution,
    k: usize,
) -> Result<RootingReport> {
    if !species_tree.is_rooted() {
        return Err(QuintetError::InvalidInput(
            "species tree must be rooted".into(),
        ));
    }
    if k == 0 {
        return Err(QuintetError::InvalidInput(
            "number of candidates to keep must be positive".into(),
        ));
    }

    let species_topology = species_tree.unrooted();
    let scores = score_candidates(catalog, rules, &species_topology, u)?;

    let candidates = rank_candidates(&scores, k)
        .into_iter()
        .map(|index| -> Result<RankedCandidate> {
            let (family, _) = catalog.locate(index).ok_or_else(|| {
                QuintetError::MappingError(format!("candidate {index} is not in the catalog"))
            })?;
            let tree = catalog
                .rooted(index)
                .ok_or_else(|| {
                    QuintetError::MappingError(format!("candidate {index} is not in the catalog"))
                })?
                .clone();
            let rooted_rf = rf_distance(&tree, species_tree)?;
            Ok(RankedCandidate {
                index,
                family,
                tree,
                score: scores[index],
                rooted_rf,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let best = &candidates[0];
    let unrooted_rf = rf_distance(&best.tree.unrooted(), &species_topology)?;
    let rooted_rf = best.rooted_rf;

    Ok(RootingReport {
        true_in_top_k: candidates.iter().any(|c| c.rooted_rf == 0),
        best_equals_true: rooted_rf == 0,
        topology_equals_true: unrooted_rf == 0,
        unrooted_rf,
        rooted_rf,
        candidates,
        distribution: u.clone(),
        species_tree: species_tree.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NUM_QUINTETS;
    use crate::distribution::{UnmatchedPolicy, estimate_distribution};
    use crate::taxa::TaxonNamespace;

    fn class_counts(rule: &crate::scoring::FamilyRule, per_member: &[usize]) -> [usize; NUM_QUINTETS] {
        let mut counts = [0; NUM_QUINTETS];
        for (class, &c) in rule.classes.iter().zip(per_member) {
            for &p in class {
                counts[p] = c;
            }
        }
        counts
    }

    fn sorted(indices: &[usize]) -> Vec<usize> {
        let mut v = indices.to_vec();
        v.sort_unstable();
        v
    }

    /// Expand bin counts into gene trees written as the canonical quintets.
    fn gene_trees(catalog: &QuintetCatalog, counts: &[usize; NUM_QUINTETS]) -> Vec<TreeSnapshot> {
        catalog
            .unrooted_quintets()
            .iter()
            .zip(counts)
            .flat_map(|(q, &c)| std::iter::repeat_n(q.clone(), c))
            .collect()
    }

    fn setup(family: Family, per_member: &[usize]) -> (QuintetCatalog, ScoringRules, GeneDistribution) {
        let catalog = QuintetCatalog::embedded().unwrap();
        let rules = ScoringRules::default();
        let counts = class_counts(rules.rule(family), per_member);
        let genes = gene_trees(&catalog, &counts);
        assert_eq!(genes.len(), 1000);
        let u = estimate_distribution(&genes, &catalog, UnmatchedPolicy::Deflate).unwrap();
        (catalog, rules, u)
    }

    #[test]
    fn test_caterpillar_end_to_end() {
        let (catalog, rules, u) = setup(Family::Caterpillar, &[290, 100, 120, 110, 55, 65, 5]);
        let species = catalog.rooted(0).unwrap().clone();
        let report = infer_rooting(&catalog, &rules, &species, &u, CANDIDATE_SIZE).unwrap();

        let order: Vec<usize> = report.candidates.iter().map(|c| c.index).collect();
        assert_eq!(order[0], 0);
        assert_eq!(sorted(&order[1..3]), vec![1, 75]);
        assert_eq!(sorted(&order[3..6]), vec![58, 59, 104]);
        assert_eq!(order[6], 66);
        assert!(report.best().score.abs() < 1e-12);
        assert_eq!(report.best().family, Family::Caterpillar);
        assert!(report.true_in_top_k);
        assert!(report.best_equals_true);
        assert!(report.topology_equals_true);
        assert_eq!(report.unrooted_rf, 0);
        assert_eq!(report.rooted_rf, 0);

        // Rooted RF to caterpillar 0: candidate 1 and balanced 75 are both at 2.
        assert!(report.candidates[1..3].iter().all(|c| c.rooted_rf == 2));
        assert!((report.candidates[1].score - 0.04).abs() < 1e-9);
        assert!((report.candidates[6].score - 0.47).abs() < 1e-9);
    }

    #[test]
    fn test_pseudo_caterpillar_end_to_end() {
        let (catalog, rules, u) = setup(Family::PseudoCaterpillar, &[324, 75, 130, 45, 22]);
        let species = catalog.rooted(66).unwrap().clone();
        let report = infer_rooting(&catalog, &rules, &species, &u, CANDIDATE_SIZE).unwrap();

        assert_eq!(report.best().index, 66);
        assert_eq!(report.best().family, Family::PseudoCaterpillar);
        assert!(report.best().score.abs() < 1e-12);
        assert!(report.best_equals_true);
        for c in &report.candidates[1..] {
            assert!(c.score > 0.1);
        }
    }

    #[test]
    fn test_balanced_ties_break_by_catalog_index() {
        let (catalog, rules, u) = setup(Family::Balanced, &[408, 50, 180, 27, 4]);
        let species = catalog.rooted(75).unwrap().clone();
        let report = infer_rooting(&catalog, &rules, &species, &u, CANDIDATE_SIZE).unwrap();

        // Caterpillars 0 and 1 fit this distribution as well as the balanced base.
        let order: Vec<usize> = report.candidates.iter().map(|c| c.index).collect();
        assert_eq!(order[..3], [0, 1, 75]);
        assert_eq!(sorted(&order[3..6]), vec![58, 59, 104]);
        assert!(report.candidates[..3].iter().all(|c| c.score.abs() < 1e-12));
        assert!(report.true_in_top_k);
        assert!(!report.best_equals_true);
        assert!(report.topology_equals_true);
        assert_eq!(report.rooted_rf, 2);
    }

    #[test]
    fn test_inconsistent_candidates_get_max_val() {
        let (catalog, rules, u) = setup(Family::Caterpillar, &[290, 100, 120, 110, 55, 65, 5]);
        let observed = &catalog.unrooted_quintets()[0];
        let scores = score_candidates(&catalog, &rules, observed, &u).unwrap();
        assert_eq!(scores.len(), NUM_ROOTED);

        for (global, _, tree) in catalog.candidates() {
            let consistent = rf_distance(&tree.unrooted(), observed).unwrap() == 0;
            if consistent {
                assert!(scores[global] < MAX_VAL);
            } else {
                assert_eq!(scores[global], MAX_VAL);
            }
        }
        assert_eq!(scores.iter().filter(|&&s| s < MAX_VAL).count(), 7);
        assert!(scores[rank_candidates(&scores, 1)[0]] < MAX_VAL);
    }

    #[test]
    fn test_unrooted_species_tree_is_rejected() {
        let (catalog, rules, u) = setup(Family::Caterpillar, &[290, 100, 120, 110, 55, 65, 5]);
        let species = TreeSnapshot::from_newick("((1,2),3,(4,5));", &TaxonNamespace::quintet()).unwrap();
        let result = infer_rooting(&catalog, &rules, &species, &u, CANDIDATE_SIZE);
        assert!(matches!(result, Err(QuintetError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_distribution_still_ranks() {
        let catalog = QuintetCatalog::embedded().unwrap();
        let rules = ScoringRules::default();
        let u = estimate_distribution(&[], &catalog, UnmatchedPolicy::Deflate).unwrap();
        let species = catalog.rooted(0).unwrap().clone();
        let report = infer_rooting(&catalog, &rules, &species, &u, 3).unwrap();
        assert_eq!(report.candidates.len(), 3);
        // Every consistent candidate costs 0, so catalog order decides.
        assert_eq!(report.best().index, 0);
    }

    #[test]
    fn test_rank_truncates_to_available() {
        assert_eq!(rank_candidates(&[1.0, 0.0], 7), vec![1, 0]);
        assert!(rank_candidates(&[], 7).is_empty());
    }
}
