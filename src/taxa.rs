//! Taxon namespaces and structural taxon maps.
//!
//! A [`TaxonNamespace`] fixes the index of every taxon for one run. A [`TaxonMap`]
//! is a permutation of those indices, obtained by laying one tree over another of
//! the same shape.
//!
//! # Structural correspondence
//! Two trees of the same shape are walked from the root in lock step. At each
//! internal node the children of both trees are ordered by their shape key, the
//! key sequences must agree, and children are paired in that order:
//!
//! ```text
//!   base:   ((((1,2),3),4),5)        target: (3,(5,(4,(2,1))))
//!   pairs:  1->2  2->1  3->4  4->5  5->3
//! ```
//!
//! When sibling subtrees share a key (e.g. the two leaves of a cherry) the walk
//! keeps their written order. Any such choice differs from another by an
//! automorphism of the base tree.

use std::collections::HashMap;

use itertools::Itertools;

use crate::bitset::MAX_TAXA;
use crate::error::{QuintetError, Result};
use crate::snapshot::TreeSnapshot;

/// Number of taxa in a quintet.
pub const QUINTET_TAXA: usize = 5;

/// Ordered, deduplicated taxon labels shared by every tree of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonNamespace {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl TaxonNamespace {
    /// Build a namespace from labels in the given order.
    ///
    /// # Errors
    /// `InvalidInput` on empty or duplicated labels, or more taxa than a bitset holds.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.len() > MAX_TAXA {
            return Err(QuintetError::InvalidInput(format!(
                "namespace of {} taxa exceeds the supported {MAX_TAXA}",
                labels.len()
            )));
        }
        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(QuintetError::InvalidInput("empty taxon label".into()));
            }
            if index.insert(label.clone(), i).is_some() {
                return Err(QuintetError::InvalidInput(format!(
                    "taxon '{label}' appears twice in the namespace"
                )));
            }
        }
        Ok(TaxonNamespace { labels, index })
    }

    /// The synthetic namespace `{1,2,3,4,5}` the quintet catalog is written in.
    pub fn quintet() -> Self {
        let labels: Vec<String> = (1..=QUINTET_TAXA).map(|i| i.to_string()).collect();
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        TaxonNamespace { labels, index }
    }

    /// Namespace with the labels sorted lexicographically.
    ///
    /// Sorting makes the index assignment independent of how an input tree was
    /// written down; labels `1..5` keep the catalog's own order.
    pub fn from_sorted_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: Vec<String> = labels.into_iter().map(Into::into).sorted().collect();
        Self::new(sorted)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A permutation of namespace indices: base taxon `i` corresponds to target taxon
/// `targets[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonMap {
    targets: Vec<usize>,
}

impl TaxonMap {
    /// Wrap a target vector, checking that it is a bijection on `0..len`.
    ///
    /// # Errors
    /// `MappingError` if an index is out of range or hit twice.
    pub fn new(targets: Vec<usize>) -> Result<Self> {
        let n = targets.len();
        let mut hit = vec![false; n];
        for (i, &t) in targets.iter().enumerate() {
            if t >= n {
                return Err(QuintetError::MappingError(format!(
                    "taxon {i} maps to {t}, outside a namespace of {n}"
                )));
            }
            if std::mem::replace(&mut hit[t], true) {
                return Err(QuintetError::MappingError(format!(
                    "taxon {t} is the image of more than one taxon"
                )));
            }
        }
        Ok(TaxonMap { targets })
    }

    pub fn identity(n: usize) -> Self {
        TaxonMap {
            targets: (0..n).collect(),
        }
    }

    #[inline]
    pub fn apply(&self, taxon: usize) -> usize {
        self.targets[taxon]
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Map the taxa of `base` onto the taxa of `target` by structural correspondence.
///
/// # Errors
/// - `InvalidInput` if the trees are over namespaces of different size
/// - `TopologyMismatch` if the trees do not have the same shape
/// - `MappingError` if the resulting map is not a bijection
pub fn build_taxon_map(base: &TreeSnapshot, target: &TreeSnapshot) -> Result<TaxonMap> {
    if base.num_taxa() != target.num_taxa() {
        return Err(QuintetError::InvalidInput(format!(
            "cannot map a tree on {} taxa onto a tree on {} taxa",
            base.num_taxa(),
            target.num_taxa()
        )));
    }
    if base.is_rooted() != target.is_rooted() {
        return Err(QuintetError::TopologyMismatch(
            "cannot map a rooted tree onto an unrooted one".into(),
        ));
    }

    let mut slots: Vec<Option<usize>> = vec![None; base.num_taxa()];
    pair_nodes(base, base.root(), target, target.root(), &mut slots)?;

    let targets = slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| QuintetError::MappingError(format!("taxon {i} was not reached")))
        })
        .collect::<Result<Vec<_>>>()?;
    TaxonMap::new(targets)
}

fn pair_nodes(
    base: &TreeSnapshot,
    b: usize,
    target: &TreeSnapshot,
    t: usize,
    slots: &mut [Option<usize>],
) -> Result<()> {
    match (base.taxon(b), target.taxon(t)) {
        (Some(from), Some(to)) => {
            if slots[from].replace(to).is_some() {
                return Err(QuintetError::MappingError(format!(
                    "taxon {from} was paired twice"
                )));
            }
            Ok(())
        }
        (None, None) => {
            let base_children = ordered_children(base, b);
            let target_children = ordered_children(target, t);
            if base_children.len() != target_children.len() {
                return Err(QuintetError::TopologyMismatch(format!(
                    "node with {} children paired with node with {}",
                    base_children.len(),
                    target_children.len()
                )));
            }
            for ((base_key, bc), (target_key, tc)) in base_children.into_iter().zip(target_children) {
                if base_key != target_key {
                    return Err(QuintetError::TopologyMismatch(format!(
                        "subtree shapes differ: {base_key} vs {target_key}"
                    )));
                }
                pair_nodes(base, bc, target, tc, slots)?;
            }
            Ok(())
        }
        _ => Err(QuintetError::TopologyMismatch(
            "leaf paired with an internal node".into(),
        )),
    }
}

/// Children of `node` with their shape keys, in stable key order.
fn ordered_children(tree: &TreeSnapshot, node: usize) -> Vec<(String, usize)> {
    tree.children(node)
        .iter()
        .map(|&c| (tree.shape_key_of(c), c))
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .collect()
}
