//! Combinatorial cost of a rooted candidate against a gene-tree distribution.
//!
//! # Class tables
//! For each family, the 15 canonical quintets (as seen from the family's base
//! tree) fall into equivalence classes whose gene-tree frequencies should be
//! equal under the coalescent, and some classes should be more frequent than
//! others:
//!
//! ```text
//!   caterpillar   {0} {1} {2} {3,12} {4,11} {5,8} {6,7,9,10,13,14}
//!                 0>1  0>3  1>4  3>4  4>6  2>1  2>5  5>4
//! ```
//!
//! A candidate is scored by mapping its labelling onto the base, reading the
//! distribution through the resulting quintet permutation, and charging every
//! violated equality or inequality. A perfect fit costs 0.

use log::trace;

use crate::catalog::{Family, NUM_QUINTETS, QuintetCatalog};
use crate::distribution::GeneDistribution;
use crate::error::{QuintetError, Result};
use crate::mapper::{QuintetPermutation, map_quintet_indices};
use crate::snapshot::TreeSnapshot;
use crate::taxa::build_taxon_map;

/// Equivalence and inequality classes of one family.
///
/// Classes hold canonical quintet positions; an inequality `(a, b)` says class
/// `a` should be at least as frequent as class `b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRule {
    pub classes: Vec<Vec<usize>>,
    pub inequalities: Vec<(usize, usize)>,
}

impl FamilyRule {
    pub fn new(classes: Vec<Vec<usize>>, inequalities: Vec<(usize, usize)>) -> Self {
        FamilyRule {
            classes,
            inequalities,
        }
    }

    fn read(u: &GeneDistribution, perm: &QuintetPermutation, position: usize) -> f64 {
        u[perm[position]]
    }

    /// Spread within each class: all ordered pairs, self-pairs included, divided
    /// by the class size.
    pub fn invariant_cost(&self, u: &GeneDistribution, perm: &QuintetPermutation) -> f64 {
        self.classes
            .iter()
            .map(|class| {
                let mut spread = 0.0;
                for &a in class {
                    for &b in class {
                        spread += (Self::read(u, perm, a) - Self::read(u, perm, b)).abs();
                    }
                }
                spread / class.len() as f64
            })
            .sum()
    }

    /// Amount by which members of `b` exceed members of `a`, divided by `|a|`.
    pub fn inequality_cost(&self, u: &GeneDistribution, perm: &QuintetPermutation) -> f64 {
        self.inequalities
            .iter()
            .map(|&(a, b)| {
                let (high, low) = (&self.classes[a], &self.classes[b]);
                let mut excess = 0.0;
                for &i in high {
                    for &j in low {
                        excess += (Self::read(u, perm, j) - Self::read(u, perm, i)).max(0.0);
                    }
                }
                excess / high.len() as f64
            })
            .sum()
    }

    pub fn cost(&self, u: &GeneDistribution, perm: &QuintetPermutation) -> f64 {
        self.invariant_cost(u, perm) + self.inequality_cost(u, perm)
    }

    /// Check that the classes partition `0..15` and inequalities name real classes.
    pub fn validate(&self) -> Result<()> {
        let mut seen = [false; NUM_QUINTETS];
        for class in &self.classes {
            if class.is_empty() {
                return Err(QuintetError::InvalidInput("empty equivalence class".into()));
            }
            for &p in class {
                if p >= NUM_QUINTETS {
                    return Err(QuintetError::InvalidInput(format!(
                        "class member {p} is not a quintet position"
                    )));
                }
                if std::mem::replace(&mut seen[p], true) {
                    return Err(QuintetError::InvalidInput(format!(
                        "quintet position {p} is in more than one class"
                    )));
                }
            }
        }
        if let Some(p) = seen.iter().position(|&s| !s) {
            return Err(QuintetError::InvalidInput(format!(
                "quintet position {p} is in no class"
            )));
        }
        for &(a, b) in &self.inequalities {
            if a >= self.classes.len() || b >= self.classes.len() || a == b {
                return Err(QuintetError::InvalidInput(format!(
                    "inequality ({a}, {b}) does not relate two distinct classes"
                )));
            }
        }
        Ok(())
    }
}

/// One [`FamilyRule`] per family. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringRules {
    caterpillar: FamilyRule,
    pseudo_caterpillar: FamilyRule,
    balanced: FamilyRule,
}

impl ScoringRules {
    /// Build and validate a rule set.
    pub fn new(
        caterpillar: FamilyRule,
        pseudo_caterpillar: FamilyRule,
        balanced: FamilyRule,
    ) -> Result<Self> {
        let rules = ScoringRules {
            caterpillar,
            pseudo_caterpillar,
            balanced,
        };
        rules.validate()?;
        Ok(rules)
    }

    pub fn rule(&self, family: Family) -> &FamilyRule {
        match family {
            Family::Caterpillar => &self.caterpillar,
            Family::PseudoCaterpillar => &self.pseudo_caterpillar,
            Family::Balanced => &self.balanced,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for family in Family::ALL {
            self.rule(family).validate().map_err(|e| {
                QuintetError::InvalidInput(format!("{family:?} scoring rule: {e}"))
            })?;
        }
        Ok(())
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        ScoringRules {
            caterpillar: FamilyRule::new(
                vec![
                    vec![0],
                    vec![1],
                    vec![2],
                    vec![3, 12],
                    vec![4, 11],
                    vec![5, 8],
                    vec![6, 7, 9, 10, 13, 14],
                ],
                vec![(0, 1), (0, 3), (1, 4), (3, 4), (4, 6), (2, 1), (2, 5), (5, 4)],
            ),
            pseudo_caterpillar: FamilyRule::new(
                vec![
                    vec![0],
                    vec![1, 2],
                    vec![3, 12],
                    vec![7, 10],
                    vec![4, 5, 6, 8, 9, 11, 13, 14],
                ],
                vec![(0, 1), (0, 2), (0, 3), (1, 4), (2, 4), (3, 4)],
            ),
            balanced: FamilyRule::new(
                vec![
                    vec![0],
                    vec![1, 2],
                    vec![3, 12],
                    vec![4, 5, 8, 11],
                    vec![6, 7, 9, 10, 13, 14],
                ],
                vec![(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)],
            ),
        }
    }
}

/// Cost of `candidate` under `rule`, reading `u` through the labelling that
/// carries `base` onto `candidate`.
///
/// # Errors
/// `TopologyMismatch` if the two trees differ in shape; mapping errors from the
/// taxon map or quintet mapper.
pub fn score(
    candidate: &TreeSnapshot,
    base: &TreeSnapshot,
    u: &GeneDistribution,
    catalog: &QuintetCatalog,
    rule: &FamilyRule,
) -> Result<f64> {
    let map = build_taxon_map(base, candidate)?;
    let perm = map_quintet_indices(catalog, &map)?;
    let cost = rule.cost(u, &perm);
    trace!("map {:?} -> quintets {:?}, cost {cost}", map.targets(), perm.as_slice());
    Ok(cost)
}
