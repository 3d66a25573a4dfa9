//! Gene-tree frequency distribution over the 15 canonical quintets.

use std::fmt;
use std::ops::Index;

use log::{debug, warn};

use crate::catalog::{NUM_QUINTETS, QuintetCatalog};
use crate::distances::equal_topology;
use crate::error::Result;
use crate::snapshot::TreeSnapshot;

/// What to divide the bin counts by when some gene trees match no quintet.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UnmatchedPolicy {
    /// Divide by the number of gene trees. Unmatched trees lower every frequency.
    #[default]
    Deflate,
    /// Divide by the number of classified gene trees.
    Renormalize,
}

/// Estimated frequency of each canonical unrooted quintet.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneDistribution {
    freqs: [f64; NUM_QUINTETS],
    total: usize,
    classified: usize,
}

impl GeneDistribution {
    /// Wrap already-normalised frequencies, e.g. for rule experiments.
    pub fn from_frequencies(freqs: [f64; NUM_QUINTETS]) -> Self {
        GeneDistribution {
            freqs,
            total: 0,
            classified: 0,
        }
    }

    /// Normalise raw bin counts.
    ///
    /// With no trees, or no classified trees, every frequency is zero.
    pub fn from_counts(
        counts: [usize; NUM_QUINTETS],
        total: usize,
        policy: UnmatchedPolicy,
    ) -> Self {
        let classified: usize = counts.iter().sum();
        let denom = match policy {
            UnmatchedPolicy::Deflate => total,
            UnmatchedPolicy::Renormalize => classified,
        };
        let mut freqs = [0.0; NUM_QUINTETS];
        if denom > 0 && classified > 0 {
            for (f, &c) in freqs.iter_mut().zip(counts.iter()) {
                *f = c as f64 / denom as f64;
            }
        }
        GeneDistribution {
            freqs,
            total,
            classified,
        }
    }

    pub fn frequencies(&self) -> &[f64; NUM_QUINTETS] {
        &self.freqs
    }

    /// Number of gene trees the estimate was built from.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of gene trees that matched a canonical quintet.
    pub fn classified(&self) -> usize {
        self.classified
    }

    pub fn unmatched(&self) -> usize {
        self.total - self.classified
    }
}

impl Index<usize> for GeneDistribution {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.freqs[i]
    }
}

impl fmt::Display for GeneDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (k, v) in self.freqs.iter().enumerate() {
            if k > 0 {
                write!(f, " ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

/// Bin every gene tree into the first canonical quintet it equals.
///
/// Gene trees are compared unrooted. Trees that match nothing (unresolved
/// polytomies) fall in no bin but still count towards the total.
///
/// # Errors
/// `InvalidInput` if a gene tree is not over the catalog's five taxa.
pub fn estimate_distribution(
    gene_trees: &[TreeSnapshot],
    catalog: &QuintetCatalog,
    policy: UnmatchedPolicy,
) -> Result<GeneDistribution> {
    let mut counts = [0usize; NUM_QUINTETS];
    let mut unmatched = 0usize;

    for (g, gene) in gene_trees.iter().enumerate() {
        let mut bin = None;
        for (i, q) in catalog.unrooted_quintets().iter().enumerate() {
            if equal_topology(q, gene)? {
                bin = Some(i);
                break;
            }
        }
        match bin {
            Some(i) => counts[i] += 1,
            None => {
                debug!("Gene tree {g} matches no canonical quintet");
                unmatched += 1;
            }
        }
    }
    if unmatched > 0 {
        warn!(
            "{unmatched} of {} gene trees matched no canonical quintet",
            gene_trees.len()
        );
    }

    Ok(GeneDistribution::from_counts(counts, gene_trees.len(), policy))
}
